//! Rendering helpers (markdown) for human-readable artifacts.

use tailpatch_types::CapabilityProfile;
use tailpatch_types::patch::{PatchOutcome, PatchStatus, SectionStatus};
use tailpatch_types::pipeline::{PipelineResult, PipelineState, PipelineStatus, StageStatus};
use tailpatch_types::profile::CompilerKind;

pub fn render_pipeline_md(result: &PipelineResult) -> String {
    let mut out = String::new();
    out.push_str("# tailpatch pipeline\n\n");
    out.push_str(&format!("- Run: `{}`\n", result.run_id));
    out.push_str(&format!(
        "- Version: `{}` ({})\n",
        result.version, result.lineage
    ));
    out.push_str(&format!("- Status: `{}`\n", pipeline_status_label(result.status)));
    out.push_str(&format!("- State: `{}`\n", state_label(result.state)));
    if let Some(err) = &result.error {
        out.push_str(&format!("- Error: {}\n", err));
    }
    if let Some(ended) = result.ended_at {
        let ms = (ended - result.started_at).num_milliseconds().max(0);
        out.push_str(&format!("- Duration: {} ms\n", ms));
    }
    out.push('\n');

    out.push_str("## Stages\n\n");
    if result.stages.is_empty() {
        out.push_str("_No stages ran._\n\n");
    } else {
        out.push_str("| Stage | Status | Duration | Message |\n");
        out.push_str("|---|---|---|---|\n");
        for s in &result.stages {
            let duration = s
                .duration_ms
                .map(|ms| format!("{} ms", ms))
                .unwrap_or_else(|| "-".to_string());
            let message = s.message.as_deref().unwrap_or("-").replace('\n', " ");
            out.push_str(&format!(
                "| {} | `{}` | {} | {} |\n",
                s.stage,
                stage_status_label(s.status),
                duration,
                message
            ));
        }
        out.push('\n');
    }

    out.push_str(&render_patches_md(&result.patches));

    if let Some(deploy) = &result.deploy {
        out.push_str("\n## Deploy\n\n");
        out.push_str(&format!("- Location: `{}`\n", deploy.location));
        out.push_str(&format!("- Uploaded: {}\n", deploy.uploaded.len()));
        for item in &deploy.uploaded {
            out.push_str(&format!("  - `{}`\n", item));
        }
    }

    out
}

pub fn render_patches_md(patches: &[PatchOutcome]) -> String {
    let mut out = String::new();
    out.push_str("## Patches\n\n");
    if patches.is_empty() {
        out.push_str("_No files patched._\n");
        return out;
    }

    for (i, p) in patches.iter().enumerate() {
        out.push_str(&format!("### {}. {} → `{}`\n\n", i + 1, p.plugin, p.path));
        out.push_str(&format!("- Target: `{}`\n", p.target.as_str()));
        out.push_str(&format!("- Status: `{}`\n", patch_status_label(p.status)));
        if p.degraded {
            out.push_str("- Degraded: manifest was not valid JSON; textual insertion used\n");
        }
        if p.changed() {
            out.push_str(&format!(
                "- sha256: {} → {}\n",
                short(&p.sha256_before),
                short(&p.sha256_after)
            ));
        }
        if !p.sections.is_empty() {
            out.push('\n');
            for s in &p.sections {
                out.push_str(&format!(
                    "- `{}` {}\n",
                    s.point.label(),
                    section_status_label(&s.status)
                ));
            }
        }
        out.push('\n');
    }

    out
}

pub fn render_profile_md(version: &str, profile: &CapabilityProfile) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Capabilities for `{}`\n\n", version));
    out.push_str(&format!("- Lineage: `{}`\n", profile.lineage));
    if profile.is_empty() {
        out.push_str("\n_Unsupported version: no capabilities._\n");
        return out;
    }

    out.push_str(&format!("- Compiler: `{}`\n", compiler_label(profile.compiler)));
    out.push_str(&format!("- Cross-compile: `{}`\n", profile.cross_compile));
    if let Some(section) = &profile.dependency_section {
        out.push_str(&format!("- Dependency section: `{}`\n", section));
    }
    if let Some(layout) = &profile.layout {
        out.push_str(&format!(
            "- Layout: `{}` (manifest `{}`, entry `{}`)\n",
            layout.root, layout.manifest, layout.entry
        ));
    }
    out.push_str(&format!(
        "- Required tools: {}\n",
        profile.required_tools.join(", ")
    ));
    if !profile.optional_tools.is_empty() {
        out.push_str(&format!(
            "- Optional tools: {}\n",
            profile.optional_tools.join(", ")
        ));
    }
    for c in &profile.tool_constraints {
        out.push_str(&format!("- Constraint: `{} {}`\n", c.tool, c.requirement));
    }

    out.push_str("\n## Targets\n\n");
    for t in &profile.targets {
        out.push_str(&format!("- `{}`\n", t));
    }

    out
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}

fn pipeline_status_label(s: PipelineStatus) -> &'static str {
    match s {
        PipelineStatus::Succeeded => "succeeded",
        PipelineStatus::Failed => "failed",
    }
}

fn state_label(s: PipelineState) -> String {
    match s {
        PipelineState::Idle => "idle".to_string(),
        PipelineState::Fetched => "fetched".to_string(),
        PipelineState::Patched => "patched".to_string(),
        PipelineState::Built => "built".to_string(),
        PipelineState::Deployed => "deployed".to_string(),
        PipelineState::Failed(stage) => format!("failed({})", stage),
    }
}

fn stage_status_label(s: StageStatus) -> &'static str {
    match s {
        StageStatus::Succeeded => "succeeded",
        StageStatus::Failed => "failed",
        StageStatus::Skipped => "skipped",
    }
}

fn patch_status_label(s: PatchStatus) -> &'static str {
    match s {
        PatchStatus::Patched => "patched",
        PatchStatus::AlreadyPatched => "already_patched",
        PatchStatus::Partial => "partial",
    }
}

fn section_status_label(s: &SectionStatus) -> String {
    match s {
        SectionStatus::Inserted => "inserted".to_string(),
        SectionStatus::AlreadyPresent => "already present".to_string(),
        SectionStatus::AnchorNotFound => "anchor not found".to_string(),
        SectionStatus::AnchorAmbiguous { count } => format!("anchor ambiguous ({} matches)", count),
    }
}

fn compiler_label(c: CompilerKind) -> &'static str {
    match c {
        CompilerKind::Pkg => "pkg",
        CompilerKind::Bun => "bun",
        CompilerKind::None => "none",
    }
}
