//! `package.json` patching.
//!
//! Structure-aware first: the manifest is parsed as an insertion-ordered JSON
//! object, the dependency entry is inserted or overwritten, and the document
//! is re-serialized with two-space indentation. If the manifest does not
//! parse, a textual anchor insertion is used instead and the outcome is
//! marked `degraded`. A manifest that already carries the exact entry is
//! reported `AlreadyPatched` before any header or parse check.

use crate::FileEdit;
use crate::anchor::{self, AnchorMatch};
use crate::error::{PatchError, PatchResult};
use crate::source::SourceFile;
use serde_json::{Map, Value};
use tailpatch_types::PluginSpec;
use tailpatch_types::patch::{
    InsertionPoint, PatchAnchor, PatchStatus, PatchTarget, SectionOutcome, SectionStatus,
};
use tracing::{debug, warn};

pub(crate) fn patch_manifest(
    file: &SourceFile,
    section: &str,
    plugin: &PluginSpec,
) -> PatchResult<FileEdit> {
    // Signature first: an entry written by an earlier run is left alone even
    // if the manifest has since grown a second section header.
    if file.content.contains(&entry_text(plugin)) {
        debug!(path = %file.rel, plugin = plugin.name(), "dependency signature present");
        return Ok(FileEdit::unchanged(file, PatchTarget::Manifest, vec![present()]));
    }

    // The section header must be unique no matter which path runs: a
    // duplicated key would otherwise be silently collapsed by the parser.
    let header = format!("\"{section}\"");
    match anchor::split_unique(&file.content, &header) {
        AnchorMatch::Found { .. } => {}
        AnchorMatch::NotFound => {
            return Err(PatchError::AnchorNotFound {
                path: file.rel.clone(),
                anchor: header,
            });
        }
        AnchorMatch::Ambiguous { count } => {
            return Err(PatchError::AnchorAmbiguous {
                path: file.rel.clone(),
                anchor: header,
                count,
            });
        }
    }

    match serde_json::from_str::<Map<String, Value>>(&file.content) {
        Ok(doc) => structured(file, doc, section, plugin),
        Err(err) => {
            warn!(
                path = %file.rel,
                error = %err,
                "manifest is not valid JSON; falling back to textual patch"
            );
            textual(file, section, plugin)
        }
    }
}

fn structured(
    file: &SourceFile,
    mut doc: Map<String, Value>,
    section: &str,
    plugin: &PluginSpec,
) -> PatchResult<FileEdit> {
    let Some(Value::Object(deps)) = doc.get_mut(section) else {
        return Err(PatchError::AnchorNotFound {
            path: file.rel.clone(),
            anchor: format!("\"{section}\": {{"),
        });
    };

    if deps.get(plugin.name()).and_then(Value::as_str) == Some(plugin.range()) {
        debug!(path = %file.rel, plugin = plugin.name(), "dependency already present");
        return Ok(FileEdit::unchanged(file, PatchTarget::Manifest, vec![present()]));
    }

    deps.insert(
        plugin.name().to_string(),
        Value::String(plugin.range().to_string()),
    );

    let mut content = serde_json::to_string_pretty(&Value::Object(doc)).map_err(|e| {
        PatchError::Io {
            path: file.rel.clone(),
            source: e.into(),
        }
    })?;
    if file.content.ends_with('\n') {
        content.push('\n');
    }

    Ok(FileEdit {
        target: PatchTarget::Manifest,
        content,
        status: PatchStatus::Patched,
        degraded: false,
        sections: vec![inserted()],
    })
}

/// Degraded path for manifests the JSON parser rejects.
fn textual(file: &SourceFile, section: &str, plugin: &PluginSpec) -> PatchResult<FileEdit> {
    let entry = entry_text(plugin);
    let text = format!("\"{section}\": {{");
    let mut anchor = PatchAnchor::after(&text).with_spacer("    ");

    let AnchorMatch::Found { suffix, .. } = anchor::split_unique(&file.content, &text) else {
        return Err(PatchError::AnchorNotFound {
            path: file.rel.clone(),
            anchor: text,
        });
    };
    if !suffix.trim_start().starts_with('}') {
        anchor = anchor.with_delimiter(",");
    }

    let content = anchor::insert_at_anchor(&file.content, &anchor, &entry).map_err(|status| {
        miss_to_error(file, &text, status)
    })?;

    Ok(FileEdit {
        target: PatchTarget::Manifest,
        content,
        status: PatchStatus::Patched,
        degraded: true,
        sections: vec![inserted()],
    })
}

/// `"name": "range"`, as both the pretty printer and the textual path write it.
fn entry_text(plugin: &PluginSpec) -> String {
    format!("\"{}\": \"{}\"", plugin.name(), plugin.range())
}

fn miss_to_error(file: &SourceFile, anchor: &str, status: SectionStatus) -> PatchError {
    match status {
        SectionStatus::AnchorAmbiguous { count } => PatchError::AnchorAmbiguous {
            path: file.rel.clone(),
            anchor: anchor.to_string(),
            count,
        },
        _ => PatchError::AnchorNotFound {
            path: file.rel.clone(),
            anchor: anchor.to_string(),
        },
    }
}

fn inserted() -> SectionOutcome {
    SectionOutcome {
        point: InsertionPoint::DependencyEntry,
        status: SectionStatus::Inserted,
    }
}

fn present() -> SectionOutcome {
    SectionOutcome {
        point: InsertionPoint::DependencyEntry,
        status: SectionStatus::AlreadyPresent,
    }
}
