use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Where the fragment goes relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    Before,
    After,
}

/// A literal insertion point inside a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchAnchor {
    pub text: String,
    pub mode: InsertMode,
    /// Appended directly after the fragment, e.g. `,` in object literals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    /// Indentation placed at the start of the line that follows the inserted newline.
    #[serde(default)]
    pub spacer: String,
}

impl PatchAnchor {
    pub fn after(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: InsertMode::After,
            delimiter: None,
            spacer: String::new(),
        }
    }

    pub fn before(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: InsertMode::Before,
            delimiter: None,
            spacer: String::new(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_spacer(mut self, spacer: impl Into<String>) -> Self {
        self.spacer = spacer.into();
        self
    }
}

/// Which patch strategy a file is handled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchTarget {
    /// `package.json`.
    Manifest,
    /// Legacy `standalone.js` bundler stub.
    LegacyStub,
    /// Modern `src/index.ts` loader source.
    LoaderSource,
}

impl PatchTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchTarget::Manifest => "manifest",
            PatchTarget::LegacyStub => "legacy_stub",
            PatchTarget::LoaderSource => "loader_source",
        }
    }
}

/// A single registration point touched within a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPoint {
    DependencyEntry,
    ModuleTable,
    IdPrefix,
    SpecialPath,
    RequireDispatch,
    BundledImport,
    Subpath(String),
}

impl InsertionPoint {
    pub fn label(&self) -> String {
        match self {
            InsertionPoint::DependencyEntry => "dependency_entry".to_string(),
            InsertionPoint::ModuleTable => "module_table".to_string(),
            InsertionPoint::IdPrefix => "id_prefix".to_string(),
            InsertionPoint::SpecialPath => "special_path".to_string(),
            InsertionPoint::RequireDispatch => "require_dispatch".to_string(),
            InsertionPoint::BundledImport => "bundled_import".to_string(),
            InsertionPoint::Subpath(s) => format!("subpath:{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Inserted,
    AlreadyPresent,
    AnchorNotFound,
    AnchorAmbiguous { count: usize },
}

impl SectionStatus {
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            SectionStatus::AnchorNotFound | SectionStatus::AnchorAmbiguous { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutcome {
    pub point: InsertionPoint,
    pub status: SectionStatus,
}

/// File-level status. `AlreadyPatched` is a success, reported distinctly so
/// callers can detect no-op runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Patched,
    AlreadyPatched,
    /// Some loader insertions could not find their anchor; the rest were applied.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOutcome {
    /// Path relative to the lineage root.
    pub path: Utf8PathBuf,
    pub plugin: String,
    pub target: PatchTarget,
    pub status: PatchStatus,
    /// The structured manifest parse failed and the textual fallback was used.
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub sections: Vec<SectionOutcome>,
    pub sha256_before: String,
    pub sha256_after: String,
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        self.sha256_before != self.sha256_after
    }
}
