//! Embeddable pipeline for tailpatch.
//!
//! Provides a clap-free, I/O-abstracted entry point that fetches an upstream
//! tailwindcss release, registers plugins in it, builds the standalone
//! binaries and deploys them.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`Downloader`](ports::Downloader) and [`Deployer`](ports::Deployer) for the outside world
//! - [`ConfigProvider`](ports::ConfigProvider) for policy and timeouts
//! - [`BuildRunner`](ports::BuildRunner) and [`ToolProbe`](ports::ToolProbe) for subprocesses
//! - [`Telemetry`](ports::Telemetry) and [`WritePort`](ports::WritePort) for reporting
//!
//! The [`adapters`] module provides default implementations for all but the
//! downloader and deployer.
//!
//! # Entry points
//!
//! - [`run_pipeline`](pipeline::run_pipeline) runs one version end to end
//! - [`run_pipelines`](pipeline::run_pipelines) runs independent versions concurrently
//! - [`write_pipeline_artifacts`](pipeline::write_pipeline_artifacts) writes the report

pub mod adapters;
pub mod config;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use error::{PipelineError, StageError};
pub use pipeline::{PipelineOutcome, Ports, run_pipeline, run_pipelines, write_pipeline_artifacts};

// Re-export the patch engine entry points so embedders need only this crate.
pub use tailpatch_edit::{PatchError, apply_plugin, apply_plugins, preview_plugin};
