//! Legacy `standalone.js` bundler stub: one entry in the `localModules` table.

use crate::FileEdit;
use crate::anchor;
use crate::error::{PatchError, PatchResult};
use crate::source::SourceFile;
use tailpatch_types::{PluginSpec, PluginSpecError};
use tailpatch_types::patch::{
    InsertionPoint, PatchAnchor, PatchStatus, PatchTarget, SectionOutcome, SectionStatus,
};
use tracing::debug;

pub const MODULE_TABLE_ANCHOR: &str = "let localModules = {";

pub fn module_table_anchor() -> PatchAnchor {
    PatchAnchor::after(MODULE_TABLE_ANCHOR)
        .with_delimiter(",")
        .with_spacer("  ")
}

/// The require-table entry for a plugin. Legacy trees cannot be patched
/// without one.
pub fn require_statement(plugin: &PluginSpec) -> PatchResult<&str> {
    plugin.legacy_require().ok_or_else(|| {
        PatchError::InvalidPluginSpec(PluginSpecError::MissingLegacyRequire {
            name: plugin.name().to_string(),
        })
    })
}

pub(crate) fn patch_stub(file: &SourceFile, plugin: &PluginSpec) -> PatchResult<FileEdit> {
    let statement = require_statement(plugin)?;
    let point = InsertionPoint::ModuleTable;

    if file.content.contains(statement) {
        debug!(path = %file.rel, plugin = plugin.name(), "require statement already present");
        return Ok(FileEdit::unchanged(
            file,
            PatchTarget::LegacyStub,
            vec![SectionOutcome {
                point,
                status: SectionStatus::AlreadyPresent,
            }],
        ));
    }

    let content = anchor::insert_at_anchor(&file.content, &module_table_anchor(), statement)
        .map_err(|status| match status {
            SectionStatus::AnchorAmbiguous { count } => PatchError::AnchorAmbiguous {
                path: file.rel.clone(),
                anchor: MODULE_TABLE_ANCHOR.to_string(),
                count,
            },
            _ => PatchError::AnchorNotFound {
                path: file.rel.clone(),
                anchor: MODULE_TABLE_ANCHOR.to_string(),
            },
        })?;

    Ok(FileEdit {
        target: PatchTarget::LegacyStub,
        content,
        status: PatchStatus::Patched,
        degraded: false,
        sections: vec![SectionOutcome {
            point,
            status: SectionStatus::Inserted,
        }],
    })
}
