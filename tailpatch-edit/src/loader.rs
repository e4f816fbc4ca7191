//! Modern loader source (`src/index.ts`).
//!
//! The loader resolves plugins through five separate registration points,
//! each patched independently:
//!
//! 1. the id-prefix list that decides whether an id is embedded,
//! 2. a bundled-path rule placed just before the resolve `switch`,
//! 3. a `require` branch in `__tw_load`, before the terminal `import(id)` branch,
//! 4. an entry in the `bundledModules` dynamic-import table,
//! 5. one `case` per declared subpath inside the resolve `switch`.
//!
//! Unlike the manifest and legacy stub, a missing or duplicated anchor here
//! only skips that insertion; the rest of the file is still patched.

use crate::FileEdit;
use crate::anchor;
use crate::source::SourceFile;
use tailpatch_types::PluginSpec;
use tailpatch_types::patch::{
    InsertionPoint, PatchAnchor, PatchStatus, PatchTarget, SectionOutcome, SectionStatus,
};
use tracing::{debug, warn};

pub const ID_PREFIX_ANCHOR: &str = "id.startsWith('@tailwindcss/') ||";
pub const RESOLVE_SWITCH_ANCHOR: &str = "switch (id) {";
pub const IMPORT_FALLBACK_ANCHOR: &str = "} else {\n    return import(id)\n  }";
pub const BUNDLED_MODULES_ANCHOR: &str = "const bundledModules = {";

/// One planned insertion.
#[derive(Debug, Clone)]
pub(crate) struct Insertion {
    pub point: InsertionPoint,
    pub anchor: PatchAnchor,
    pub fragment: String,
}

/// All insertions for `plugin`, in application order.
pub(crate) fn insertions(plugin: &PluginSpec) -> Vec<Insertion> {
    let name = plugin.name();
    let mut out = vec![
        Insertion {
            point: InsertionPoint::IdPrefix,
            anchor: PatchAnchor::after(ID_PREFIX_ANCHOR).with_spacer("    "),
            fragment: format!("id.startsWith('{name}') ||"),
        },
        Insertion {
            point: InsertionPoint::SpecialPath,
            anchor: PatchAnchor::before(RESOLVE_SWITCH_ANCHOR).with_spacer("  "),
            fragment: format!(
                "if (id === '{name}' || id.startsWith('{name}/')) {{\n    return localResolve(id)\n  }}\n"
            ),
        },
        Insertion {
            point: InsertionPoint::RequireDispatch,
            anchor: PatchAnchor::before(IMPORT_FALLBACK_ANCHOR).with_spacer("  "),
            fragment: format!("}} else if (id.endsWith('{name}')) {{\n    return require('{name}')"),
        },
        Insertion {
            point: InsertionPoint::BundledImport,
            anchor: PatchAnchor::after(BUNDLED_MODULES_ANCHOR)
                .with_delimiter(",")
                .with_spacer("  "),
            fragment: format!("'{name}': () => import('{name}')"),
        },
    ];

    for sub in plugin.subpaths() {
        out.push(Insertion {
            point: InsertionPoint::Subpath(sub.clone()),
            anchor: PatchAnchor::after(RESOLVE_SWITCH_ANCHOR).with_spacer("    "),
            fragment: format!("case '{name}/{sub}':\n      return localResolve('{name}/{sub}')"),
        });
    }

    out
}

pub(crate) fn patch_loader(file: &SourceFile, plugin: &PluginSpec) -> FileEdit {
    let mut content = file.content.clone();
    let mut sections = Vec::new();

    for ins in insertions(plugin) {
        let status = if content.contains(&ins.fragment) {
            SectionStatus::AlreadyPresent
        } else {
            match anchor::insert_at_anchor(&content, &ins.anchor, &ins.fragment) {
                Ok(next) => {
                    content = next;
                    SectionStatus::Inserted
                }
                Err(miss) => {
                    warn!(
                        path = %file.rel,
                        point = %ins.point.label(),
                        anchor = %ins.anchor.text,
                        status = ?miss,
                        "loader anchor unusable; leaving section unmodified"
                    );
                    miss
                }
            }
        };
        debug!(path = %file.rel, point = %ins.point.label(), status = ?status, "loader section");
        sections.push(SectionOutcome {
            point: ins.point,
            status,
        });
    }

    let status = if sections.iter().any(|s| s.status.is_miss()) {
        PatchStatus::Partial
    } else if sections
        .iter()
        .all(|s| s.status == SectionStatus::AlreadyPresent)
    {
        PatchStatus::AlreadyPatched
    } else {
        PatchStatus::Patched
    };

    FileEdit {
        target: PatchTarget::LoaderSource,
        content,
        status,
        degraded: false,
        sections,
    }
}
