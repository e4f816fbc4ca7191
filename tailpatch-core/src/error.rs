//! Pipeline error types.

use camino::Utf8PathBuf;
use std::time::Duration;
use tailpatch_domain::RouteError;
use tailpatch_edit::PatchError;
use tailpatch_types::pipeline::Stage;
use thiserror::Error;

/// Why a single stage failed.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("version {version:?} is not supported")]
    VersionUnsupported { version: String },

    #[error("blocked by policy: {reason}")]
    PolicyBlocked { reason: String },

    #[error("work dir {path} is in use by another run")]
    WorkdirBusy { path: Utf8PathBuf },

    #[error("required tool {tool:?} not found")]
    ToolMissing { tool: String },

    #[error("fetch failed: {0:#}")]
    FetchFailed(#[source] anyhow::Error),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("`{command}` failed with exit code {}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    BuildProcessFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("build timed out after {}s", .after.as_secs())]
    BuildTimeout { after: Duration },

    #[error("deploy failed: {0:#}")]
    DeployFailed(#[source] anyhow::Error),
}

impl From<RouteError> for StageError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::VersionUnsupported { version } => StageError::VersionUnsupported { version },
        }
    }
}

impl StageError {
    /// Stable snake_case code for reports and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            StageError::VersionUnsupported { .. } => "version_unsupported",
            StageError::PolicyBlocked { .. } => "policy_blocked",
            StageError::WorkdirBusy { .. } => "workdir_busy",
            StageError::ToolMissing { .. } => "tool_missing",
            StageError::FetchFailed(_) => "fetch_failed",
            StageError::Patch(e) => e.code(),
            StageError::BuildProcessFailed { .. } => "build_process_failed",
            StageError::BuildTimeout { .. } => "build_timeout",
            StageError::DeployFailed(_) => "deploy_failed",
        }
    }
}

/// The first failing stage of a pipeline run and its cause.
#[derive(Debug, Error)]
#[error("stage {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: StageError) -> Self {
        Self { stage, source }
    }

    pub fn code(&self) -> &'static str {
        self.source.code()
    }
}
