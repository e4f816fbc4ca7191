//! Shared DTOs for the tailpatch workspace.
//!
//! # Design constraints
//! - These types are serialized into pipeline reports.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod build;
pub mod lineage;
pub mod patch;
pub mod pipeline;
pub mod plugin;
pub mod profile;

pub use lineage::{Lineage, VersionSpec};
pub use plugin::{PluginSpec, PluginSpecError};
pub use profile::CapabilityProfile;

/// Schema identifiers.
pub mod schema {
    pub const TAILPATCH_PIPELINE_V1: &str = "tailpatch.pipeline.v1";
}

/// Upstream project name; used for archive directories (`<project>-<version>`).
pub const DEFAULT_PROJECT: &str = "tailwindcss";
