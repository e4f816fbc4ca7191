//! Error types for tailpatch-edit.
//!
//! Unrecognized input never panics; it comes back as one of these variants.
//! `AlreadyPatched` is not here: it is a successful [`PatchStatus`].
//!
//! [`PatchStatus`]: tailpatch_types::patch::PatchStatus

use camino::Utf8PathBuf;
use tailpatch_types::PluginSpecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    /// The registry could not classify the version.
    #[error("version {version:?} is not supported")]
    VersionUnsupported { version: String },

    /// A patch target expected by the lineage layout is missing.
    #[error("file not found: {path}")]
    FileNotFound { path: Utf8PathBuf },

    /// Strict anchor missing; the file was left untouched.
    #[error("anchor {anchor:?} not found in {path}")]
    AnchorNotFound { path: Utf8PathBuf, anchor: String },

    /// Strict anchor occurs more than once; the file was left untouched.
    #[error("anchor {anchor:?} occurs {count} times in {path}")]
    AnchorAmbiguous {
        path: Utf8PathBuf,
        anchor: String,
        count: usize,
    },

    #[error("invalid plugin spec: {0}")]
    InvalidPluginSpec(#[from] PluginSpecError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    /// Stable snake_case code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            PatchError::VersionUnsupported { .. } => "version_unsupported",
            PatchError::FileNotFound { .. } => "file_not_found",
            PatchError::AnchorNotFound { .. } => "anchor_not_found",
            PatchError::AnchorAmbiguous { .. } => "anchor_ambiguous",
            PatchError::InvalidPluginSpec(_) => "invalid_plugin_spec",
            PatchError::Io { .. } => "io",
        }
    }

    /// True for errors caused by the input tree rather than the environment.
    pub fn is_anchor_failure(&self) -> bool {
        matches!(
            self,
            PatchError::AnchorNotFound { .. } | PatchError::AnchorAmbiguous { .. }
        )
    }
}

/// Result type alias using PatchError.
pub type PatchResult<T> = Result<T, PatchError>;
