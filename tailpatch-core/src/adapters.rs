//! Default port implementations.

use crate::error::StageError;
use crate::ports::{
    BuildRunner, ConfigProvider, PolicyDecision, PolicyQuery, StageEvent, Telemetry, ToolProbe,
    WritePort,
};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tailpatch_types::build::BuildStep;
use tailpatch_types::pipeline::Stage;
use tracing::{debug, info, warn};

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        std::fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

/// Spawns build commands with `tokio::process` on a private current-thread
/// runtime, so callers stay synchronous.
///
/// The child is spawned with `kill_on_drop`; when the timeout elapses the
/// wait future is dropped and the process is killed.
#[derive(Debug, Clone, Default)]
pub struct ProcessBuildRunner {
    /// Extra environment for every step, e.g. `CI=1`.
    pub env: Vec<(String, String)>,
}

impl BuildRunner for ProcessBuildRunner {
    fn run(
        &self,
        step: &BuildStep,
        cwd: &Utf8Path,
        timeout: Option<Duration>,
    ) -> Result<String, StageError> {
        let command = step.command_line();
        let failed = |exit_code: Option<i32>, output: String| StageError::BuildProcessFailed {
            command: command.clone(),
            exit_code,
            output,
        };

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| failed(None, format!("start runtime: {e}")))?;

        debug!(command = %command, cwd = %cwd, "spawning build step");
        rt.block_on(async {
            let mut cmd = tokio::process::Command::new(&step.program);
            cmd.args(&step.args)
                .current_dir(cwd)
                .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = cmd.spawn().map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    StageError::ToolMissing {
                        tool: step.program.clone(),
                    }
                } else {
                    failed(None, format!("spawn in {cwd}: {e}"))
                }
            })?;

            let wait = child.wait_with_output();
            let output = match timeout {
                Some(after) => match tokio::time::timeout(after, wait).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(command = %command, secs = after.as_secs(), "build step timed out; killed");
                        return Err(StageError::BuildTimeout { after });
                    }
                },
                None => wait.await,
            }
            .map_err(|e| failed(None, format!("wait: {e}")))?;

            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));

            if output.status.success() {
                Ok(combined)
            } else {
                Err(failed(output.status.code(), combined))
            }
        })
    }
}

/// Looks tools up on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct PathToolProbe {
    /// Overrides the process `PATH` when set.
    pub search_path: Option<Vec<Utf8PathBuf>>,
}

impl PathToolProbe {
    fn dirs(&self) -> Vec<std::path::PathBuf> {
        match &self.search_path {
            Some(dirs) => dirs.iter().map(|d| d.as_std_path().to_path_buf()).collect(),
            None => std::env::var_os("PATH")
                .map(|p| std::env::split_paths(&p).collect())
                .unwrap_or_default(),
        }
    }
}

impl ToolProbe for PathToolProbe {
    fn is_available(&self, tool: &str) -> bool {
        let names: Vec<String> = if cfg!(windows) {
            ["exe", "cmd", "bat"]
                .iter()
                .map(|ext| format!("{tool}.{ext}"))
                .chain(std::iter::once(tool.to_string()))
                .collect()
        } else {
            vec![tool.to_string()]
        };
        let found = self
            .dirs()
            .iter()
            .any(|dir| names.iter().any(|n| dir.join(n).is_file()));
        debug!(tool, found, "probed tool");
        found
    }
}

/// Forwards stage events to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, run_id: &str, event: &StageEvent) {
        match event {
            StageEvent::Started { stage } => info!(run_id, stage = %stage, "stage started"),
            StageEvent::Succeeded { stage, duration_ms } => {
                info!(run_id, stage = %stage, duration_ms, "stage succeeded")
            }
            StageEvent::Failed {
                stage,
                code,
                message,
            } => warn!(run_id, stage = %stage, code = %code, "stage failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _run_id: &str, _event: &StageEvent) {}
}

/// Allows everything, with fixed per-stage timeouts.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    pub fetch_timeout: Option<Duration>,
    pub build_timeout: Option<Duration>,
    pub deploy_timeout: Option<Duration>,
}

impl ConfigProvider for StaticConfigProvider {
    fn decide(&self, _query: &PolicyQuery<'_>) -> PolicyDecision {
        PolicyDecision::Allow
    }

    fn timeout(&self, stage: Stage) -> Option<Duration> {
        match stage {
            Stage::Fetch => self.fetch_timeout,
            Stage::Patch => None,
            Stage::Build => self.build_timeout,
            Stage::Deploy => self.deploy_timeout,
        }
    }
}
