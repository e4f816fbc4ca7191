use crate::lineage::Lineage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The compiler that turns the patched tree into standalone binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerKind {
    /// Vercel `pkg`, driven through npm scripts.
    Pkg,
    /// `bun build --compile`.
    Bun,
    None,
}

/// Where the patch targets live, relative to the extracted project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLayout {
    /// Lineage root, relative to `<project>-<version>`.
    pub root: String,
    /// Package manifest, relative to the lineage root.
    pub manifest: String,
    /// Plugin registration source, relative to the lineage root.
    pub entry: String,
    /// Directory of built binaries, relative to the lineage root.
    pub dist: String,
}

/// A runtime tool-version requirement, e.g. `node >=20`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConstraint {
    pub tool: String,
    pub requirement: String,
}

/// Immutable technical facts for one lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub lineage: Lineage,
    pub compiler: CompilerKind,
    pub cross_compile: bool,
    pub targets: BTreeSet<String>,
    pub required_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<FileLayout>,
    /// Manifest section that receives plugin dependencies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_section: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_constraints: Vec<ToolConstraint>,
}

impl CapabilityProfile {
    /// The fail-closed profile: no tools, no targets, no layout.
    pub fn unsupported() -> Self {
        Self {
            lineage: Lineage::Unsupported,
            compiler: CompilerKind::None,
            cross_compile: false,
            targets: BTreeSet::new(),
            required_tools: Vec::new(),
            optional_tools: Vec::new(),
            layout: None,
            dependency_section: None,
            tool_constraints: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
            && self.required_tools.is_empty()
            && self.optional_tools.is_empty()
            && self.layout.is_none()
            && self.dependency_section.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_profile_is_empty() {
        let p = CapabilityProfile::unsupported();
        assert!(p.is_empty());
        assert!(!p.cross_compile);
        assert_eq!(p.compiler, CompilerKind::None);
    }

    #[test]
    fn empty_fields_are_skipped_in_json() {
        let json = serde_json::to_value(CapabilityProfile::unsupported()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("layout"));
        assert!(!obj.contains_key("dependency_section"));
        assert!(!obj.contains_key("optional_tools"));
    }
}
