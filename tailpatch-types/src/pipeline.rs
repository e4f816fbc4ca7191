use crate::lineage::Lineage;
use crate::patch::{PatchOutcome, PatchStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Patch,
    Build,
    Deploy,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Fetch, Stage::Patch, Stage::Build, Stage::Deploy];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Patch => "patch",
            Stage::Build => "build",
            Stage::Deploy => "deploy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state. `Failed` is terminal and remembers the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Fetched,
    Patched,
    Built,
    Deployed,
    Failed(Stage),
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Deployed | PipelineState::Failed(_))
    }

    /// The stage that runs next from this state, if any.
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            PipelineState::Idle => Some(Stage::Fetch),
            PipelineState::Fetched => Some(Stage::Patch),
            PipelineState::Patched => Some(Stage::Build),
            PipelineState::Built => Some(Stage::Deploy),
            PipelineState::Deployed | PipelineState::Failed(_) => None,
        }
    }

    /// State reached when `stage` succeeds.
    pub fn after(stage: Stage) -> Self {
        match stage {
            Stage::Fetch => PipelineState::Fetched,
            Stage::Patch => PipelineState::Patched,
            Stage::Build => PipelineState::Built,
            Stage::Deploy => PipelineState::Deployed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
    /// Never attempted because an earlier stage failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployReceipt {
    pub uploaded: Vec<String>,
    pub location: String,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub schema: String,
    pub run_id: String,
    pub version: String,
    pub lineage: Lineage,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub state: PipelineState,
    pub status: PipelineStatus,
    pub stages: Vec<StageOutcome>,
    #[serde(default)]
    pub patches: Vec<PatchOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn new(run_id: String, version: String, lineage: Lineage) -> Self {
        Self {
            schema: crate::schema::TAILPATCH_PIPELINE_V1.to_string(),
            run_id,
            version,
            lineage,
            started_at: Utc::now(),
            ended_at: None,
            state: PipelineState::Idle,
            status: PipelineStatus::Failed,
            stages: Vec::new(),
            patches: Vec::new(),
            deploy: None,
            error: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self.state {
            PipelineState::Failed(stage) => Some(stage),
            _ => None,
        }
    }

    /// True when every patched file was already patched before this run.
    pub fn was_noop_patch(&self) -> bool {
        !self.patches.is_empty()
            && self
                .patches
                .iter()
                .all(|p| p.status == PatchStatus::AlreadyPatched)
    }
}
