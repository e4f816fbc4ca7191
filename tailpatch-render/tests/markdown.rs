use chrono::Duration;
use pretty_assertions::assert_eq;
use tailpatch_render::{render_patches_md, render_pipeline_md, render_profile_md};
use tailpatch_types::Lineage;
use tailpatch_types::patch::{
    InsertionPoint, PatchOutcome, PatchStatus, PatchTarget, SectionOutcome, SectionStatus,
};
use tailpatch_types::pipeline::{
    DeployReceipt, PipelineResult, PipelineState, PipelineStatus, Stage, StageOutcome, StageStatus,
};

fn outcome(status: PatchStatus, before: &str, after: &str) -> PatchOutcome {
    PatchOutcome {
        path: "src/index.ts".into(),
        plugin: "daisyui".to_string(),
        target: PatchTarget::LoaderSource,
        status,
        degraded: false,
        sections: vec![
            SectionOutcome {
                point: InsertionPoint::IdPrefix,
                status: SectionStatus::Inserted,
            },
            SectionOutcome {
                point: InsertionPoint::BundledImport,
                status: SectionStatus::AnchorAmbiguous { count: 2 },
            },
        ],
        sha256_before: before.to_string(),
        sha256_after: after.to_string(),
    }
}

#[test]
fn patches_list_sections_and_short_hashes() {
    let md = render_patches_md(&[outcome(
        PatchStatus::Partial,
        "aaaaaaaaaaaaaaaaaaaa",
        "bbbbbbbbbbbbbbbbbbbb",
    )]);
    assert_eq!(
        md,
        "## Patches\n\n\
         ### 1. daisyui → `src/index.ts`\n\n\
         - Target: `loader_source`\n\
         - Status: `partial`\n\
         - sha256: aaaaaaaaaaaa → bbbbbbbbbbbb\n\
         \n\
         - `id_prefix` inserted\n\
         - `bundled_import` anchor ambiguous (2 matches)\n\n"
    );
}

#[test]
fn unchanged_file_has_no_hash_line() {
    let md = render_patches_md(&[outcome(PatchStatus::AlreadyPatched, "same", "same")]);
    assert!(md.contains("`already_patched`"));
    assert!(!md.contains("sha256"));
}

#[test]
fn empty_patch_list() {
    assert_eq!(render_patches_md(&[]), "## Patches\n\n_No files patched._\n");
}

#[test]
fn pipeline_report_shows_failed_stage_and_error() {
    let mut result = PipelineResult::new("run-1".into(), "4.1.11".into(), Lineage::Modern);
    result.ended_at = Some(result.started_at + Duration::milliseconds(1500));
    result.state = PipelineState::Failed(Stage::Build);
    result.status = PipelineStatus::Failed;
    result.error = Some("stage build: build timed out after 30s".to_string());
    result.stages = vec![
        StageOutcome {
            stage: Stage::Fetch,
            status: StageStatus::Succeeded,
            message: None,
            duration_ms: Some(12),
        },
        StageOutcome {
            stage: Stage::Build,
            status: StageStatus::Failed,
            message: Some("build timed out\nafter 30s".to_string()),
            duration_ms: None,
        },
        StageOutcome {
            stage: Stage::Deploy,
            status: StageStatus::Skipped,
            message: None,
            duration_ms: None,
        },
    ];

    let md = render_pipeline_md(&result);

    assert!(md.starts_with("# tailpatch pipeline\n\n- Run: `run-1`\n- Version: `4.1.11` (modern)\n"));
    assert!(md.contains("- State: `failed(build)`\n"));
    assert!(md.contains("- Error: stage build: build timed out after 30s\n"));
    assert!(md.contains("- Duration: 1500 ms\n"));
    assert!(md.contains("| fetch | `succeeded` | 12 ms | - |\n"));
    assert!(md.contains("| build | `failed` | - | build timed out after 30s |\n"));
    assert!(md.contains("| deploy | `skipped` | - | - |\n"));
    assert!(!md.contains("## Deploy"));
}

#[test]
fn pipeline_report_lists_uploads() {
    let mut result = PipelineResult::new("run-2".into(), "3.4.17".into(), Lineage::Legacy);
    result.deploy = Some(DeployReceipt {
        uploaded: vec!["tailwindcss-linux-x64".to_string()],
        location: "s3://bucket/standalone/3.4.17".to_string(),
    });
    let md = render_pipeline_md(&result);
    assert!(md.contains("_No stages ran._"));
    assert!(md.contains("- Location: `s3://bucket/standalone/3.4.17`\n- Uploaded: 1\n  - `tailwindcss-linux-x64`\n"));
}

#[test]
fn profile_for_modern_and_unsupported() {
    let md = render_profile_md("4.1.11", &tailpatch_domain::resolve("4.1.11"));
    assert!(md.contains("- Compiler: `bun`\n- Cross-compile: `false`\n"));
    assert!(md.contains("- Dependency section: `dependencies`\n"));
    assert!(md.contains("- `linux-x64-musl`\n"));

    let md = render_profile_md("999.0.0", &tailpatch_domain::resolve("999.0.0"));
    assert_eq!(
        md,
        "# Capabilities for `999.0.0`\n\n- Lineage: `unsupported`\n\n_Unsupported version: no capabilities._\n"
    );
}
