//! Patch engine for extracted upstream trees.
//!
//! Responsibilities:
//! - Register plugins in the lineage's manifest and entry source.
//! - Compute every edit in memory before anything is written.
//! - Write changed files atomically and report per-file outcomes.
//! - Generate a unified diff preview.

pub mod anchor;
mod error;
mod loader;
mod manifest;
mod source;
mod stub;

pub use anchor::{AnchorMatch, count_occurrences, insert_at_anchor, render_insertion, split_unique};
pub use error::{PatchError, PatchResult};
pub use source::{SourceFile, write_atomic};
pub use stub::{module_table_anchor, require_statement};

use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use std::collections::BTreeMap;
use tailpatch_types::patch::{PatchOutcome, PatchStatus, PatchTarget, SectionOutcome};
use tailpatch_types::PluginSpec;
use tracing::{debug, info};

/// The computed result of patching one file; not yet on disk.
#[derive(Debug, Clone)]
pub(crate) struct FileEdit {
    pub target: PatchTarget,
    pub content: String,
    pub status: PatchStatus,
    pub degraded: bool,
    pub sections: Vec<SectionOutcome>,
}

impl FileEdit {
    pub(crate) fn unchanged(
        file: &SourceFile,
        target: PatchTarget,
        sections: Vec<SectionOutcome>,
    ) -> Self {
        Self {
            target,
            content: file.content.clone(),
            status: PatchStatus::AlreadyPatched,
            degraded: false,
            sections,
        }
    }
}

/// Register `plugin` in the tree rooted at `root` (the lineage root).
///
/// Outcomes come back in target order: manifest first, then the entry
/// source. Files whose content did not change are not rewritten.
pub fn apply_plugin(
    plugin: &PluginSpec,
    version: &str,
    root: &Utf8Path,
) -> PatchResult<Vec<PatchOutcome>> {
    apply_plugins(std::slice::from_ref(plugin), version, root)
}

/// Register several plugins in order.
///
/// Each plugin sees the edits of the ones before it. All plugins are
/// computed first; if any of them fails, no file is written.
pub fn apply_plugins(
    plugins: &[PluginSpec],
    version: &str,
    root: &Utf8Path,
) -> PatchResult<Vec<PatchOutcome>> {
    let plan = execute(plugins, version, root)?;

    for (rel, file) in &plan.originals {
        let Some(new_contents) = plan.current.get(rel) else {
            continue;
        };
        if &file.content == new_contents {
            continue;
        }
        write_atomic(&file.path, new_contents)?;
        info!(path = %rel, "patched file written");
    }

    Ok(plan.outcomes)
}

/// Compute the edits for `plugin` and render them as a unified diff.
/// Nothing is written. An already patched tree yields an empty string.
pub fn preview_plugin(plugin: &PluginSpec, version: &str, root: &Utf8Path) -> PatchResult<String> {
    preview_plugins(std::slice::from_ref(plugin), version, root)
}

pub fn preview_plugins(
    plugins: &[PluginSpec],
    version: &str,
    root: &Utf8Path,
) -> PatchResult<String> {
    let plan = execute(plugins, version, root)?;
    let before: BTreeMap<Utf8PathBuf, String> = plan
        .originals
        .into_iter()
        .map(|(rel, file)| (rel, file.content))
        .collect();
    Ok(render_patch(&before, &plan.current))
}

struct ExecuteOutcome {
    originals: BTreeMap<Utf8PathBuf, SourceFile>,
    current: BTreeMap<Utf8PathBuf, String>,
    outcomes: Vec<PatchOutcome>,
}

fn execute(plugins: &[PluginSpec], version: &str, root: &Utf8Path) -> PatchResult<ExecuteOutcome> {
    let profile = tailpatch_domain::resolve(version);
    let (Some(layout), Some(section)) = (profile.layout, profile.dependency_section) else {
        return Err(PatchError::VersionUnsupported {
            version: version.to_string(),
        });
    };
    let lineage = profile.lineage;

    let targets = [
        Utf8PathBuf::from(&layout.manifest),
        Utf8PathBuf::from(&layout.entry),
    ];
    let mut originals = BTreeMap::new();
    let mut current = BTreeMap::new();
    for rel in &targets {
        let file = SourceFile::read(root, rel, lineage)?;
        current.insert(rel.clone(), file.content.clone());
        originals.insert(rel.clone(), file);
    }

    let mut outcomes = Vec::with_capacity(plugins.len() * targets.len());
    for plugin in plugins {
        debug!(plugin = plugin.name(), lineage = %lineage, "patching plugin");
        for (idx, rel) in targets.iter().enumerate() {
            let Some(original) = originals.get(rel) else {
                continue;
            };
            let Some(content) = current.get_mut(rel) else {
                continue;
            };
            let file = SourceFile {
                content: std::mem::take(content),
                ..original.clone()
            };
            let edit = patch_file(&file, idx == 0, &section, plugin)?;

            outcomes.push(PatchOutcome {
                path: rel.clone(),
                plugin: plugin.name().to_string(),
                target: edit.target,
                status: edit.status,
                degraded: edit.degraded,
                sections: edit.sections,
                sha256_before: source::sha256_hex(file.content.as_bytes()),
                sha256_after: source::sha256_hex(edit.content.as_bytes()),
            });
            *content = edit.content;
        }
    }

    Ok(ExecuteOutcome {
        originals,
        current,
        outcomes,
    })
}

fn patch_file(
    file: &SourceFile,
    is_manifest: bool,
    section: &str,
    plugin: &PluginSpec,
) -> PatchResult<FileEdit> {
    if is_manifest {
        return manifest::patch_manifest(file, section, plugin);
    }
    if file.lineage.uses_loader_source() {
        Ok(loader::patch_loader(file, plugin))
    } else {
        stub::patch_stub(file, plugin)
    }
}

fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy emits its own ---/+++ header; keep only the hunks.
        let hunks = body.find("@@").map_or(body.as_str(), |i| &body[i..]);
        out.push_str(hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
