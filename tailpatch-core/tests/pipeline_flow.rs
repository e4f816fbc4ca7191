//! Pipeline runs against fake ports.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tailpatch_core::adapters::{NoopTelemetry, StaticConfigProvider};
use tailpatch_core::config::{FileConfigProvider, parse_config};
use tailpatch_core::ports::{
    BuildRunner, DeployRequest, Deployer, Downloader, Extraction, FetchRequest, StageEvent,
    Telemetry, ToolProbe, WritePort,
};
use tailpatch_core::settings::PipelineSettings;
use tailpatch_core::{Ports, StageError, run_pipeline, run_pipelines, write_pipeline_artifacts};
use tailpatch_types::PluginSpec;
use tailpatch_types::build::BuildStep;
use tailpatch_types::patch::PatchStatus;
use tailpatch_types::pipeline::{
    DeployReceipt, PipelineState, PipelineStatus, Stage, StageStatus,
};
use tempfile::TempDir;

const LEGACY_MANIFEST: &str = "{\n  \"name\": \"tailwindcss-standalone\",\n  \"devDependencies\": {\n    \"pkg\": \"^5.8.1\"\n  }\n}\n";
const LEGACY_STUB: &str =
    "let localModules = {\n  'tailwindcss/colors': require('tailwindcss/colors'),\n}\n";
const MODERN_MANIFEST: &str = "{\n  \"name\": \"@tailwindcss/standalone\",\n  \"dependencies\": {\n    \"@tailwindcss/forms\": \"^0.5.10\"\n  }\n}\n";
const MODERN_LOADER: &str = "const likely =\n    id.startsWith('@tailwindcss/') ||\n    embedded\n\n  switch (id) {\n    default:\n      return false\n  }\n\nglobalThis.__tw_load = async (id) => {\n  if (id.endsWith('@tailwindcss/forms')) {\n    return require('@tailwindcss/forms')\n  } else {\n    return import(id)\n  }\n}\n\nconst bundledModules = {\n  '@tailwindcss/forms': () => import('@tailwindcss/forms'),\n}\n";

/// Extracts a minimal upstream tree, unless it is already there.
#[derive(Default)]
struct FakeDownloader {
    calls: AtomicUsize,
}

impl Downloader for FakeDownloader {
    fn fetch(&self, req: &FetchRequest) -> anyhow::Result<Extraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let root = req.dest.join(format!("{}-{}", req.project, req.version));
        if !root.exists() {
            if req.version.starts_with('3') {
                let lr = root.join("standalone-cli");
                fs::create_dir_all(&lr)?;
                fs::write(lr.join("package.json"), LEGACY_MANIFEST)?;
                fs::write(lr.join("standalone.js"), LEGACY_STUB)?;
            } else {
                let lr = root.join(format!("packages/{}-standalone", req.project));
                fs::create_dir_all(lr.join("src"))?;
                fs::write(lr.join("package.json"), MODERN_MANIFEST)?;
                fs::write(lr.join("src/index.ts"), MODERN_LOADER)?;
            }
        }
        Ok(Extraction {
            root_path: root,
            version: req.version.clone(),
        })
    }
}

struct FailingDownloader;

impl Downloader for FailingDownloader {
    fn fetch(&self, _req: &FetchRequest) -> anyhow::Result<Extraction> {
        anyhow::bail!("checksum mismatch")
    }
}

#[derive(Default)]
struct FakeDeployer {
    requests: Mutex<Vec<DeployRequest>>,
}

impl Deployer for FakeDeployer {
    fn deploy(&self, req: &DeployRequest) -> anyhow::Result<DeployReceipt> {
        self.requests.lock().expect("lock").push(req.clone());
        Ok(DeployReceipt {
            uploaded: vec![format!("tailwindcss-{}-linux-x64", req.version)],
            location: format!("s3://{}/{}/{}", req.bucket, req.prefix, req.version),
        })
    }
}

#[derive(Default)]
struct RecordingBuilder {
    steps: Mutex<Vec<(String, Utf8PathBuf)>>,
    fail_with: Mutex<Option<StageError>>,
}

impl BuildRunner for RecordingBuilder {
    fn run(
        &self,
        step: &BuildStep,
        cwd: &Utf8Path,
        _timeout: Option<Duration>,
    ) -> Result<String, StageError> {
        if let Some(err) = self.fail_with.lock().expect("lock").take() {
            return Err(err);
        }
        self.steps
            .lock()
            .expect("lock")
            .push((step.command_line(), cwd.to_path_buf()));
        Ok(String::new())
    }
}

struct Tools(BTreeSet<&'static str>);

impl Tools {
    fn all() -> Self {
        Tools(["node", "npm", "pnpm", "bun", "cargo"].into_iter().collect())
    }
}

impl ToolProbe for Tools {
    fn is_available(&self, tool: &str) -> bool {
        self.0.contains(tool)
    }
}

#[derive(Default)]
struct RecordingTelemetry {
    events: Mutex<Vec<StageEvent>>,
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, _run_id: &str, event: &StageEvent) {
        self.events.lock().expect("lock").push(event.clone());
    }
}

#[derive(Default)]
struct MemWritePort {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl WritePort for MemWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        let key = path.as_str().replace('\\', "/");
        self.files.lock().expect("lock").insert(key, contents.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, _path: &Utf8Path) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Fixture {
    downloader: FakeDownloader,
    deployer: FakeDeployer,
    config: StaticConfigProvider,
    telemetry: RecordingTelemetry,
    builder: RecordingBuilder,
    tools: Tools,
}

impl Fixture {
    fn new() -> Self {
        Self {
            downloader: FakeDownloader::default(),
            deployer: FakeDeployer::default(),
            config: StaticConfigProvider::default(),
            telemetry: RecordingTelemetry::default(),
            builder: RecordingBuilder::default(),
            tools: Tools::all(),
        }
    }

    fn ports(&self) -> Ports<'_> {
        Ports {
            downloader: &self.downloader,
            deployer: &self.deployer,
            config: &self.config,
            telemetry: &self.telemetry,
            builder: &self.builder,
            tools: &self.tools,
        }
    }
}

fn work_dir() -> (TempDir, Utf8PathBuf) {
    let td = tempfile::tempdir().expect("tempdir");
    let dir = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    (td, dir)
}

fn modern_settings(dir: &Utf8Path) -> PipelineSettings {
    let mut s = PipelineSettings::new(dir, "4.1.11").with_plugins(vec![
        PluginSpec::new(r#""daisyui": "^5.0.43""#)
            .unwrap()
            .with_subpaths(["theme"])
            .unwrap(),
    ]);
    s.bucket = "builds".to_string();
    s.prefix = "standalone".to_string();
    s.host_arch = "linux-x64".to_string();
    s
}

fn legacy_settings(dir: &Utf8Path) -> PipelineSettings {
    PipelineSettings::new(dir, "3.4.17").with_plugins(vec![
        PluginSpec::new(r#""daisyui": "^4.12.23""#)
            .unwrap()
            .with_legacy_require("'daisyui': require('daisyui')"),
    ])
}

#[test]
fn modern_run_reaches_deployed() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();

    let outcome = run_pipeline(&modern_settings(&dir), &fx.ports());

    assert!(outcome.succeeded(), "{:?}", outcome.error);
    let result = &outcome.result;
    assert_eq!(result.state, PipelineState::Deployed);
    assert_eq!(result.status, PipelineStatus::Succeeded);
    assert_eq!(
        result.stages.iter().map(|s| s.stage).collect::<Vec<_>>(),
        Stage::ALL
    );
    assert!(result.stages.iter().all(|s| s.status == StageStatus::Succeeded));
    assert!(result.patches.iter().all(|p| p.status == PatchStatus::Patched));

    let project = dir.join("tailwindcss-4.1.11");
    let steps = fx.builder.steps.lock().unwrap().clone();
    assert_eq!(
        steps,
        vec![
            ("pnpm install".to_string(), project.join(".")),
            ("pnpm run build".to_string(), project.join(".")),
            (
                "pnpm run build".to_string(),
                project.join("packages/tailwindcss-standalone")
            ),
        ]
    );

    let deploys = fx.deployer.requests.lock().unwrap();
    assert_eq!(
        deploys[0].source_dir,
        project.join("packages/tailwindcss-standalone/dist")
    );
    assert_eq!(deploys[0].bucket, "builds");
    assert_eq!(
        result.deploy.as_ref().unwrap().location,
        "s3://builds/standalone/4.1.11"
    );
}

#[test]
fn renamed_project_patches_builds_and_deploys_one_root() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let mut settings = modern_settings(&dir);
    settings.project = "twfork".to_string();

    let outcome = run_pipeline(&settings, &fx.ports());

    assert!(outcome.succeeded(), "{:?}", outcome.error);
    let root = dir.join("twfork-4.1.11/packages/twfork-standalone");
    let loader = fs::read_to_string(root.join("src/index.ts")).unwrap();
    assert!(loader.contains("'daisyui': () => import('daisyui'),"));

    let steps = fx.builder.steps.lock().unwrap().clone();
    assert_eq!(steps.last().unwrap().1, root);
    let deploys = fx.deployer.requests.lock().unwrap();
    assert_eq!(deploys[0].source_dir, root.join("dist"));
}

#[test]
fn second_run_is_already_patched_and_still_builds() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let settings = legacy_settings(&dir);

    let first = run_pipeline(&settings, &fx.ports());
    assert!(first.succeeded());
    let lineage_root = dir.join("tailwindcss-3.4.17/standalone-cli");
    let manifest = fs::read_to_string(lineage_root.join("package.json")).unwrap();
    let stub = fs::read_to_string(lineage_root.join("standalone.js")).unwrap();
    assert!(manifest.contains("\"daisyui\": \"^4.12.23\""));
    assert!(stub.contains("'daisyui': require('daisyui'),"));

    let second = run_pipeline(&settings, &fx.ports());

    assert!(second.succeeded());
    assert!(second.result.was_noop_patch());
    assert_eq!(second.result.state, PipelineState::Deployed);
    assert_eq!(fs::read_to_string(lineage_root.join("package.json")).unwrap(), manifest);
    assert_eq!(fs::read_to_string(lineage_root.join("standalone.js")).unwrap(), stub);
    // Both runs built: npm install/build at root and in standalone-cli.
    assert_eq!(fx.builder.steps.lock().unwrap().len(), 8);
}

#[test]
fn unsupported_version_touches_no_port() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let settings = PipelineSettings::new(&dir, "999.0.0");

    let outcome = run_pipeline(&settings, &fx.ports());

    let err = outcome.error.as_ref().expect("error");
    assert_eq!(err.stage, Stage::Fetch);
    assert!(matches!(err.source, StageError::VersionUnsupported { .. }));
    assert_eq!(outcome.result.state, PipelineState::Failed(Stage::Fetch));
    assert_eq!(fx.downloader.calls.load(Ordering::SeqCst), 0);
    assert!(fx.telemetry.events.lock().unwrap().is_empty());
    assert_eq!(
        outcome.result.stage(Stage::Deploy).unwrap().status,
        StageStatus::Skipped
    );
}

#[test]
fn policy_block_stops_before_patching() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let file_config = FileConfigProvider::new(
        parse_config("[policy]\nblocked_stages = [\"patch\"]\n").unwrap(),
    );
    let ports = Ports {
        config: &file_config,
        ..fx.ports()
    };

    let outcome = run_pipeline(&modern_settings(&dir), &ports);

    let err = outcome.error.expect("error");
    assert_eq!(err.stage, Stage::Patch);
    assert_eq!(err.to_string(), "stage patch: blocked by policy: stage patch is disabled");
    assert!(outcome.result.patches.is_empty());
    let loader = dir.join("tailwindcss-4.1.11/packages/tailwindcss-standalone/src/index.ts");
    assert_eq!(fs::read_to_string(loader).unwrap(), MODERN_LOADER);
    assert!(fx.builder.steps.lock().unwrap().is_empty());
}

#[test]
fn missing_tool_fails_before_any_spawn() {
    let (_td, dir) = work_dir();
    let mut fx = Fixture::new();
    fx.tools = Tools(["node", "pnpm"].into_iter().collect());

    let outcome = run_pipeline(&modern_settings(&dir), &fx.ports());

    let err = outcome.error.expect("error");
    assert_eq!(err.stage, Stage::Build);
    assert!(matches!(&err.source, StageError::ToolMissing { tool } if tool == "bun"));
    assert!(fx.builder.steps.lock().unwrap().is_empty());
    assert_eq!(outcome.result.state, PipelineState::Failed(Stage::Build));
}

#[test]
fn build_timeout_is_reported_with_stage() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    *fx.builder.fail_with.lock().unwrap() = Some(StageError::BuildTimeout {
        after: Duration::from_secs(30),
    });

    let outcome = run_pipeline(&modern_settings(&dir), &fx.ports());

    assert_eq!(
        outcome.result.error.as_deref(),
        Some("stage build: build timed out after 30s")
    );
    assert_eq!(
        outcome.result.stage(Stage::Deploy).unwrap().status,
        StageStatus::Skipped
    );
    assert!(fx.deployer.requests.lock().unwrap().is_empty());

    let events = fx.telemetry.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        StageEvent::Failed { stage: Stage::Build, code, .. } if code == "build_timeout"
    )));
}

#[test]
fn fetch_failure_wraps_downloader_error() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let ports = Ports {
        downloader: &FailingDownloader,
        ..fx.ports()
    };

    let outcome = run_pipeline(&modern_settings(&dir), &ports);

    let err = outcome.error.expect("error");
    assert_eq!(err.code(), "fetch_failed");
    assert!(err.to_string().contains("checksum mismatch"));
}

#[test]
fn concurrent_runs_on_distinct_dirs_both_succeed() {
    let (_a, dir_a) = work_dir();
    let (_b, dir_b) = work_dir();
    let fx = Fixture::new();
    let jobs = vec![modern_settings(&dir_a), legacy_settings(&dir_b)];

    let outcomes = run_pipelines(&jobs, &fx.ports());

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.succeeded()));
    assert_eq!(outcomes[0].result.version, "4.1.11");
    assert_eq!(outcomes[1].result.version, "3.4.17");
}

#[test]
fn artifacts_are_written_through_the_port() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let outcome = run_pipeline(&modern_settings(&dir), &fx.ports());

    let writer = MemWritePort::default();
    write_pipeline_artifacts(&outcome.result, Utf8Path::new("out"), &writer).unwrap();

    let files = writer.files.lock().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&files["out/report.json"]).unwrap();
    assert_eq!(json["schema"], "tailpatch.pipeline.v1");
    assert_eq!(json["state"]["state"], "deployed");
    assert_eq!(json["lineage"], "modern");
    let md = String::from_utf8(files["out/report.md"].clone()).unwrap();
    assert!(md.starts_with("# tailpatch pipeline"));
}

#[test]
fn noop_telemetry_is_silent() {
    let (_td, dir) = work_dir();
    let fx = Fixture::new();
    let ports = Ports {
        telemetry: &NoopTelemetry,
        ..fx.ports()
    };
    assert!(run_pipeline(&modern_settings(&dir), &ports).succeeded());
    assert!(fx.telemetry.events.lock().unwrap().is_empty());
}
