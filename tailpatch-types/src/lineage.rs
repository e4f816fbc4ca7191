use serde::{Deserialize, Serialize};
use std::fmt;

/// Major-version family of the upstream project.
///
/// The lineage decides which compiler, file layout and patch strategy apply.
/// It is always derived from a version string; nothing caches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lineage {
    /// v3: monolithic `standalone.js` stub, packaged with `pkg`.
    Legacy,
    /// v4: structured loader source, compiled with `bun`.
    Modern,
    /// v5.
    FutureA,
    /// v6.
    FutureB,
    Unsupported,
}

impl Lineage {
    pub fn is_supported(self) -> bool {
        !matches!(self, Lineage::Unsupported)
    }

    /// True for every lineage that patches the structured loader source.
    pub fn uses_loader_source(self) -> bool {
        matches!(self, Lineage::Modern | Lineage::FutureA | Lineage::FutureB)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lineage::Legacy => "legacy",
            Lineage::Modern => "modern",
            Lineage::FutureA => "future_a",
            Lineage::FutureB => "future_b",
            Lineage::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version string together with the lineage it classified into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    pub version: String,
    pub lineage: Lineage,
}

impl VersionSpec {
    pub fn new(version: impl Into<String>, lineage: Lineage) -> Self {
        Self {
            version: version.into(),
            lineage,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.lineage)
    }
}
