//! Capability registry: version string → lineage → immutable profile.
//!
//! Every query re-derives the lineage from the version string. The tables are
//! plain functions of [`Lineage`], so adding a lineage means adding a match arm.

use semver::Version;
use std::collections::BTreeSet;
use tailpatch_types::profile::{CompilerKind, FileLayout, ToolConstraint};
use tailpatch_types::{CapabilityProfile, Lineage, VersionSpec};
use tracing::debug;

/// Majors that are reserved as "clearly invalid" test sentinels.
const SENTINEL_MAJOR: u64 = 999;

const LEGACY_TARGETS: &[&str] = &[
    "linux-arm64",
    "linux-armv7",
    "linux-x64",
    "macos-arm64",
    "macos-x64",
    "windows-x64",
];

const LOADER_TARGETS: &[&str] = &[
    "linux-arm64",
    "linux-arm64-musl",
    "linux-x64",
    "linux-x64-musl",
    "macos-arm64",
    "macos-x64",
    "windows-x64",
];

/// Classify a version string into its lineage.
///
/// A textual major-prefix match (`3.`, `4.`, `5.`, `6.`) wins; otherwise the
/// leniently parsed semantic version is compared against the 4.0.0 / 5.0.0 /
/// 6.0.0 boundaries. Unparseable input and sentinels are `Unsupported`.
pub fn classify(version: &str) -> Lineage {
    let raw = version.trim();
    let Some(parsed) = parse_lenient(raw) else {
        debug!(version = raw, "unparseable version");
        return Lineage::Unsupported;
    };
    if is_sentinel(&parsed) {
        debug!(version = raw, "sentinel version");
        return Lineage::Unsupported;
    }

    let by_prefix = match raw.split_once('.').map(|(major, _)| major) {
        Some("3") => Some(Lineage::Legacy),
        Some("4") => Some(Lineage::Modern),
        Some("5") => Some(Lineage::FutureA),
        Some("6") => Some(Lineage::FutureB),
        _ => None,
    };

    by_prefix.unwrap_or_else(|| classify_by_boundaries(&parsed))
}

fn classify_by_boundaries(v: &Version) -> Lineage {
    let b = |major| Version::new(major, 0, 0);
    if *v < b(3) {
        Lineage::Unsupported
    } else if *v < b(4) {
        Lineage::Legacy
    } else if *v < b(5) {
        Lineage::Modern
    } else if *v < b(6) {
        Lineage::FutureA
    } else if *v < b(7) {
        Lineage::FutureB
    } else {
        Lineage::Unsupported
    }
}

fn is_sentinel(v: &Version) -> bool {
    v.major == SENTINEL_MAJOR || (v.major == 0 && v.minor == 0 && v.patch == 0)
}

/// Accepts `v4.1`, `4`, `4.1.11-beta.1+build` and friends.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let s = raw.trim();
    let s = s
        .strip_prefix('v')
        .or_else(|| s.strip_prefix('V'))
        .unwrap_or(s);
    if s.is_empty() {
        return None;
    }

    // Pad the numeric core up to three components, keeping any pre-release/build suffix.
    let core_end = s.find(['-', '+']).unwrap_or(s.len());
    let (core, rest) = s.split_at(core_end);
    let parts = core.split('.').count();
    let padded = match parts {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => s.to_string(),
    };
    Version::parse(&padded).ok()
}

pub fn version_spec(version: &str) -> VersionSpec {
    VersionSpec::new(version.trim(), classify(version))
}

/// Resolve the capability profile for a version.
pub fn resolve(version: &str) -> CapabilityProfile {
    profile_for(classify(version))
}

/// The profile table. Pure function of the lineage.
pub fn profile_for(lineage: Lineage) -> CapabilityProfile {
    match lineage {
        Lineage::Legacy => CapabilityProfile {
            lineage,
            compiler: CompilerKind::Pkg,
            cross_compile: true,
            targets: target_set(LEGACY_TARGETS),
            required_tools: strings(&["node", "npm"]),
            optional_tools: Vec::new(),
            layout: Some(FileLayout {
                root: "standalone-cli".to_string(),
                manifest: "package.json".to_string(),
                entry: "standalone.js".to_string(),
                dist: "dist".to_string(),
            }),
            dependency_section: Some("devDependencies".to_string()),
            tool_constraints: vec![constraint("node", ">=14")],
        },
        Lineage::Modern | Lineage::FutureA | Lineage::FutureB => CapabilityProfile {
            lineage,
            compiler: CompilerKind::Bun,
            cross_compile: lineage == Lineage::FutureB,
            targets: target_set(LOADER_TARGETS),
            required_tools: strings(&["node", "pnpm", "bun"]),
            optional_tools: strings(&["cargo"]),
            layout: Some(loader_layout()),
            dependency_section: Some("dependencies".to_string()),
            tool_constraints: match lineage {
                Lineage::Modern => vec![constraint("node", ">=20"), constraint("bun", ">=1.1")],
                Lineage::FutureA => vec![constraint("node", ">=20"), constraint("bun", ">=1.2")],
                _ => vec![constraint("node", ">=22"), constraint("bun", ">=1.2")],
            },
        },
        Lineage::Unsupported => CapabilityProfile::unsupported(),
    }
}

/// Lineage root relative to `<project>-<version>`.
///
/// Legacy: `standalone-cli`. Loader lineages: `packages/<project>-standalone`.
pub fn root_subdir(lineage: Lineage, project: &str) -> Option<String> {
    match lineage {
        Lineage::Legacy => Some("standalone-cli".to_string()),
        Lineage::Modern | Lineage::FutureA | Lineage::FutureB => {
            Some(format!("packages/{project}-standalone"))
        }
        Lineage::Unsupported => None,
    }
}

fn loader_layout() -> FileLayout {
    FileLayout {
        root: format!("packages/{}-standalone", tailpatch_types::DEFAULT_PROJECT),
        manifest: "package.json".to_string(),
        entry: "src/index.ts".to_string(),
        dist: "dist".to_string(),
    }
}

pub fn supports_cross_compile(version: &str) -> bool {
    resolve(version).cross_compile
}

/// Targets this host can produce for `version`.
///
/// Cross-compiling lineages return their full declared set; others return
/// exactly `{host_arch}`. Unsupported versions fail closed with an empty set.
pub fn compilable_targets(version: &str, host_arch: &str) -> BTreeSet<String> {
    let profile = resolve(version);
    if !profile.lineage.is_supported() {
        return BTreeSet::new();
    }
    if profile.cross_compile {
        profile.targets
    } else {
        BTreeSet::from([host_arch.to_string()])
    }
}

pub fn required_tools(version: &str) -> Vec<String> {
    resolve(version).required_tools
}

pub fn file_layout(version: &str) -> Option<FileLayout> {
    resolve(version).layout
}

pub fn dependency_section(version: &str) -> Option<String> {
    resolve(version).dependency_section
}

fn target_set(targets: &[&str]) -> BTreeSet<String> {
    targets.iter().map(|t| t.to_string()).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn constraint(tool: &str, requirement: &str) -> ToolConstraint {
    ToolConstraint {
        tool: tool.to_string(),
        requirement: requirement.to_string(),
    }
}
