//! Domain logic: what a version can do and how it is built.
//!
//! This crate owns the capability matrix and the build routing. It does not
//! touch source files; that is the `tailpatch-edit` crate.

pub mod host;
pub mod registry;
pub mod router;

pub use host::{host_architecture, normalize_host};
pub use registry::{
    classify, compilable_targets, profile_for, resolve, root_subdir, supports_cross_compile,
    version_spec,
};
pub use router::{
    RouteError, dist_dir, lineage_root, project_dir, select_build_strategy,
    select_build_strategy_for,
};
