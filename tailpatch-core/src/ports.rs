//! Port traits abstracting all I/O away from the pipeline.
//!
//! Every port is `Send + Sync` so one set of adapters can serve
//! [`run_pipelines`](crate::pipeline::run_pipelines) across threads.

use crate::error::StageError;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tailpatch_types::PluginSpec;
use tailpatch_types::build::BuildStep;
use tailpatch_types::pipeline::{DeployReceipt, Stage};

/// What the downloader is asked to retrieve.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub project: String,
    pub version: String,
    /// Directory the archive is extracted into.
    pub dest: Utf8PathBuf,
    pub timeout: Option<Duration>,
}

/// A verified, extracted upstream archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The `<project>-<version>` directory.
    pub root_path: Utf8PathBuf,
    pub version: String,
}

/// Retrieves and verifies upstream source archives.
pub trait Downloader: Send + Sync {
    fn fetch(&self, req: &FetchRequest) -> anyhow::Result<Extraction>;
}

#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Directory of built binaries.
    pub source_dir: Utf8PathBuf,
    pub version: String,
    pub bucket: String,
    pub prefix: String,
    pub timeout: Option<Duration>,
}

/// Publishes built binaries.
pub trait Deployer: Send + Sync {
    fn deploy(&self, req: &DeployRequest) -> anyhow::Result<DeployReceipt>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Blocked { reason: String },
}

/// Inputs to a policy decision.
#[derive(Debug, Clone, Copy)]
pub struct PolicyQuery<'a> {
    pub stage: Stage,
    pub version: &'a str,
    pub plugins: &'a [PluginSpec],
}

/// Environment-specific policy: which versions and plugins may run, and
/// how long each stage may take.
pub trait ConfigProvider: Send + Sync {
    fn decide(&self, query: &PolicyQuery<'_>) -> PolicyDecision;
    fn timeout(&self, stage: Stage) -> Option<Duration>;
}

/// Stage lifecycle events. Observability only; never affects control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Started { stage: Stage },
    Succeeded { stage: Stage, duration_ms: u64 },
    Failed { stage: Stage, code: String, message: String },
}

pub trait Telemetry: Send + Sync {
    fn record(&self, run_id: &str, event: &StageEvent);
}

/// Runs one build command to completion.
///
/// Implementations kill the process when `timeout` elapses and report
/// [`StageError::BuildTimeout`]; a non-zero exit is
/// [`StageError::BuildProcessFailed`]. On success the combined output is
/// returned.
pub trait BuildRunner: Send + Sync {
    fn run(
        &self,
        step: &BuildStep,
        cwd: &Utf8Path,
        timeout: Option<Duration>,
    ) -> Result<String, StageError>;
}

/// Answers whether an external tool can be spawned.
pub trait ToolProbe: Send + Sync {
    fn is_available(&self, tool: &str) -> bool;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
