//! Version router: picks the build strategy and lineage root for a version.

use crate::registry;
use camino::{Utf8Path, Utf8PathBuf};
use tailpatch_types::build::{BuildPass, BuildStep, BuildStrategy, Toolchain};
use tailpatch_types::{DEFAULT_PROJECT, Lineage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("version {version:?} is not supported")]
    VersionUnsupported { version: String },
}

/// Select install/build commands for a version of the default project.
///
/// Both supported families run a root pass followed by a pass in the
/// standalone package. For the loader lineages the second pass is what
/// bundles the native platform packages into the binary, so it is never
/// dropped.
pub fn select_build_strategy(version: &str) -> Result<BuildStrategy, RouteError> {
    select_build_strategy_for(DEFAULT_PROJECT, version)
}

/// [`select_build_strategy`] for an upstream checkout named `project`.
pub fn select_build_strategy_for(project: &str, version: &str) -> Result<BuildStrategy, RouteError> {
    let lineage = registry::classify(version);
    let root = registry::root_subdir(lineage, project).ok_or_else(|| unsupported(version))?;

    match lineage {
        Lineage::Legacy => {
            let tc = Toolchain::Npm;
            let mut steps = install_and_build(tc, ".", BuildPass::Root);
            steps.extend(install_and_build(tc, &root, BuildPass::Standalone));
            Ok(BuildStrategy { toolchain: tc, steps })
        }
        Lineage::Modern | Lineage::FutureA | Lineage::FutureB => {
            let tc = Toolchain::Pnpm;
            let mut steps = install_and_build(tc, ".", BuildPass::Root);
            steps.push(step(tc, &root, &["run", "build"], BuildPass::Standalone));
            Ok(BuildStrategy { toolchain: tc, steps })
        }
        Lineage::Unsupported => Err(unsupported(version)),
    }
}

fn install_and_build(tc: Toolchain, dir: &str, pass: BuildPass) -> Vec<BuildStep> {
    vec![
        step(tc, dir, &["install"], pass),
        step(tc, dir, &["run", "build"], pass),
    ]
}

fn step(tc: Toolchain, dir: &str, args: &[&str], pass: BuildPass) -> BuildStep {
    BuildStep {
        working_dir: dir.to_string(),
        program: tc.program().to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        pass,
    }
}

fn unsupported(version: &str) -> RouteError {
    RouteError::VersionUnsupported {
        version: version.to_string(),
    }
}

/// `<src>/<project>-<version>`.
pub fn project_dir(src: &Utf8Path, project: &str, version: &str) -> Utf8PathBuf {
    src.join(format!("{project}-{}", version.trim()))
}

/// Lineage root holding the patch targets.
///
/// Legacy: `<src>/<project>-<version>/standalone-cli`.
/// Loader lineages: `<src>/<project>-<version>/packages/<project>-standalone`.
pub fn lineage_root(src: &Utf8Path, project: &str, version: &str) -> Result<Utf8PathBuf, RouteError> {
    let sub = registry::root_subdir(registry::classify(version), project)
        .ok_or_else(|| unsupported(version))?;
    Ok(project_dir(src, project, version).join(sub))
}

/// Where the compiler leaves the built binaries.
pub fn dist_dir(src: &Utf8Path, project: &str, version: &str) -> Result<Utf8PathBuf, RouteError> {
    let root = lineage_root(src, project, version)?;
    let layout = registry::file_layout(version).ok_or_else(|| unsupported(version))?;
    Ok(root.join(layout.dist))
}
