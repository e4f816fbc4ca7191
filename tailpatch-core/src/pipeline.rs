//! The fetch → patch → build → deploy pipeline.
//!
//! This entry point is I/O-agnostic: downloading, spawning, deploying and
//! artifact writes all go through the port traits. Transitions are
//! synchronous and there is no rollback; the first failing stage ends the
//! run and later stages are recorded as skipped.

use crate::error::{PipelineError, StageError};
use crate::guard::WorkdirGuard;
use crate::ports::{
    BuildRunner, ConfigProvider, DeployRequest, Deployer, Downloader, Extraction, FetchRequest,
    PolicyDecision, PolicyQuery, StageEvent, Telemetry, ToolProbe, WritePort,
};
use crate::settings::PipelineSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::time::Instant;
use tailpatch_render::render_pipeline_md;
use tailpatch_types::pipeline::{
    PipelineResult, PipelineState, PipelineStatus, Stage, StageOutcome, StageStatus,
};
use tailpatch_types::CapabilityProfile;
use tracing::{debug, info, warn};

/// The collaborators one run talks to.
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    pub downloader: &'a dyn Downloader,
    pub deployer: &'a dyn Deployer,
    pub config: &'a dyn ConfigProvider,
    pub telemetry: &'a dyn Telemetry,
    pub builder: &'a dyn BuildRunner,
    pub tools: &'a dyn ToolProbe,
}

/// Outcome of `run_pipeline`: the report is always produced, the error only
/// when a stage failed.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub result: PipelineResult,
    pub error: Option<PipelineError>,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<PipelineResult, PipelineError> {
        match self.error {
            None => Ok(self.result),
            Some(err) => Err(err),
        }
    }
}

/// Run one pipeline to completion or first failure.
///
/// The version is classified before anything else; an unsupported version
/// fails at `fetch` without calling any port.
pub fn run_pipeline(settings: &PipelineSettings, ports: &Ports<'_>) -> PipelineOutcome {
    let run_id = uuid::Uuid::new_v4().to_string();
    let version = settings.version.trim().to_string();
    let profile = tailpatch_domain::resolve(&version);
    let mut result = PipelineResult::new(run_id, version.clone(), profile.lineage);

    if !profile.lineage.is_supported() {
        warn!(version = %version, "refusing unsupported version");
        let err = PipelineError::new(Stage::Fetch, StageError::VersionUnsupported { version });
        return finish(result, Some(err));
    }

    let _guard = match WorkdirGuard::acquire(&settings.work_dir) {
        Ok(guard) => guard,
        Err(err) => return finish(result, Some(PipelineError::new(Stage::Fetch, err))),
    };

    let mut run = Run {
        settings,
        ports,
        profile: &profile,
        version: &version,
        extraction: None,
    };

    info!(run_id = %result.run_id, version = %version, lineage = %profile.lineage, "pipeline started");
    let mut error = None;
    while let Some(stage) = result.state.next_stage() {
        match run.stage(stage, &mut result) {
            Ok(()) => result.state = PipelineState::after(stage),
            Err(source) => {
                error = Some(PipelineError::new(stage, source));
                break;
            }
        }
    }

    finish(result, error)
}

/// Run several independent pipelines concurrently, one thread each.
///
/// Outcomes are returned in input order. Jobs that share a work dir are not
/// serialized: all but one fail with `WorkdirBusy`.
pub fn run_pipelines(jobs: &[PipelineSettings], ports: &Ports<'_>) -> Vec<PipelineOutcome> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|settings| scope.spawn(move || run_pipeline(settings, ports)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

/// Write `report.json` and `report.md` to the output directory.
pub fn write_pipeline_artifacts(
    result: &PipelineResult,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let json = serde_json::to_string_pretty(result).context("serialize pipeline report")?;
    writer.write_file(&out_dir.join("report.json"), json.as_bytes())?;

    let md = render_pipeline_md(result);
    writer.write_file(&out_dir.join("report.md"), md.as_bytes())?;

    Ok(())
}

struct Run<'r> {
    settings: &'r PipelineSettings,
    ports: &'r Ports<'r>,
    profile: &'r CapabilityProfile,
    version: &'r str,
    extraction: Option<Extraction>,
}

impl Run<'_> {
    fn stage(&mut self, stage: Stage, result: &mut PipelineResult) -> Result<(), StageError> {
        let started = Instant::now();
        let telemetry = self.ports.telemetry;
        let run_id = result.run_id.clone();

        let query = PolicyQuery {
            stage,
            version: self.version,
            plugins: &self.settings.plugins,
        };
        let outcome = match self.ports.config.decide(&query) {
            PolicyDecision::Blocked { reason } => {
                info!(stage = %stage, reason = %reason, "stage blocked by policy");
                Err(StageError::PolicyBlocked { reason })
            }
            PolicyDecision::Allow => {
                telemetry.record(&run_id, &StageEvent::Started { stage });
                match stage {
                    Stage::Fetch => self.fetch(),
                    Stage::Patch => self.patch(result),
                    Stage::Build => self.build(),
                    Stage::Deploy => self.deploy(result),
                }
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(()) => {
                telemetry.record(&run_id, &StageEvent::Succeeded { stage, duration_ms });
                result.stages.push(StageOutcome {
                    stage,
                    status: StageStatus::Succeeded,
                    message: None,
                    duration_ms: Some(duration_ms),
                });
            }
            Err(err) => {
                telemetry.record(
                    &run_id,
                    &StageEvent::Failed {
                        stage,
                        code: err.code().to_string(),
                        message: err.to_string(),
                    },
                );
                result.stages.push(StageOutcome {
                    stage,
                    status: StageStatus::Failed,
                    message: Some(err.to_string()),
                    duration_ms: Some(duration_ms),
                });
            }
        }
        outcome
    }

    fn fetch(&mut self) -> Result<(), StageError> {
        let req = FetchRequest {
            project: self.settings.project.clone(),
            version: self.version.to_string(),
            dest: self.settings.work_dir.clone(),
            timeout: self.ports.config.timeout(Stage::Fetch),
        };
        let extraction = self
            .ports
            .downloader
            .fetch(&req)
            .map_err(StageError::FetchFailed)?;
        debug!(root = %extraction.root_path, "archive extracted");
        self.extraction = Some(extraction);
        Ok(())
    }

    fn patch(&mut self, result: &mut PipelineResult) -> Result<(), StageError> {
        let root = self.lineage_root()?;
        let outcomes = tailpatch_edit::apply_plugins(&self.settings.plugins, self.version, &root)?;
        let written = outcomes.iter().filter(|o| o.changed()).count();
        result.patches = outcomes;
        if result.was_noop_patch() {
            info!(root = %root, "tree already patched; nothing written");
        } else {
            info!(root = %root, files_changed = written, "plugins registered");
        }
        Ok(())
    }

    fn build(&mut self) -> Result<(), StageError> {
        let strategy =
            tailpatch_domain::select_build_strategy_for(&self.settings.project, self.version)?;

        for tool in &self.profile.required_tools {
            if !self.ports.tools.is_available(tool) {
                return Err(StageError::ToolMissing { tool: tool.clone() });
            }
        }
        for tool in &self.profile.optional_tools {
            if !self.ports.tools.is_available(tool) {
                debug!(tool = %tool, "optional tool not found");
            }
        }

        let project_dir = self.project_dir()?;
        let timeout = self.ports.config.timeout(Stage::Build);
        let targets = tailpatch_domain::compilable_targets(self.version, &self.settings.host_arch);
        info!(
            toolchain = strategy.toolchain.program(),
            targets = targets.len(),
            "building"
        );
        for step in &strategy.steps {
            let cwd = project_dir.join(&step.working_dir);
            info!(command = %step.command_line(), cwd = %cwd, "build step");
            let output = self.ports.builder.run(step, &cwd, timeout)?;
            debug!(bytes = output.len(), "build step finished");
        }
        Ok(())
    }

    fn deploy(&mut self, result: &mut PipelineResult) -> Result<(), StageError> {
        let layout = self
            .profile
            .layout
            .as_ref()
            .ok_or_else(|| self.unsupported())?;
        let req = DeployRequest {
            source_dir: self.lineage_root()?.join(&layout.dist),
            version: self.version.to_string(),
            bucket: self.settings.bucket.clone(),
            prefix: self.settings.prefix.clone(),
            timeout: self.ports.config.timeout(Stage::Deploy),
        };
        let receipt = self
            .ports
            .deployer
            .deploy(&req)
            .map_err(StageError::DeployFailed)?;
        info!(location = %receipt.location, uploaded = receipt.uploaded.len(), "deployed");
        result.deploy = Some(receipt);
        Ok(())
    }

    fn project_dir(&self) -> Result<Utf8PathBuf, StageError> {
        match &self.extraction {
            Some(x) => Ok(x.root_path.clone()),
            None => Err(StageError::FetchFailed(anyhow::anyhow!(
                "no extracted tree for {}",
                self.version
            ))),
        }
    }

    fn lineage_root(&self) -> Result<Utf8PathBuf, StageError> {
        let sub = tailpatch_domain::root_subdir(self.profile.lineage, &self.settings.project)
            .ok_or_else(|| self.unsupported())?;
        Ok(self.project_dir()?.join(sub))
    }

    fn unsupported(&self) -> StageError {
        StageError::VersionUnsupported {
            version: self.version.to_string(),
        }
    }
}

fn finish(mut result: PipelineResult, error: Option<PipelineError>) -> PipelineOutcome {
    if let Some(err) = &error {
        result.state = PipelineState::Failed(err.stage);
        result.status = PipelineStatus::Failed;
        result.error = Some(err.to_string());
        for stage in Stage::ALL {
            if result.stage(stage).is_none() {
                result.stages.push(StageOutcome {
                    stage,
                    status: if stage == err.stage {
                        StageStatus::Failed
                    } else {
                        StageStatus::Skipped
                    },
                    message: (stage == err.stage).then(|| err.source.to_string()),
                    duration_ms: None,
                });
            }
        }
        result.stages.sort_by_key(|s| s.stage);
        warn!(run_id = %result.run_id, error = %err, "pipeline failed");
    } else {
        result.status = PipelineStatus::Succeeded;
        info!(run_id = %result.run_id, "pipeline succeeded");
    }
    result.ended_at = Some(Utc::now());
    PipelineOutcome { result, error }
}
