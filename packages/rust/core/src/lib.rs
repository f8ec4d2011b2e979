//! Core pipeline orchestration and domain logic for algocatalog.
//!
//! This crate ties together acquisition, discovery, rendering, and artifact
//! writing into the end-to-end `build` workflow.

pub mod catalog;
pub mod discover;
pub mod pipeline;

pub use catalog::{Catalog, Registration};
pub use pipeline::{
    BuildConfig, BuildResult, EXPLANATIONS_SOURCE, ProgressReporter, SilentProgress,
    build_catalog,
};
