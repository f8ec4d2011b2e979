//! Source acquisition and source-tree discovery.
//!
//! This crate provides:
//! - [`acquire`] — clones git sources and downloads listing documents into the
//!   scratch workspace, with bounded concurrency and per-source status
//! - [`walker`] — lazy, sorted tree walking and the candidate filter policy

pub mod acquire;
pub mod walker;

pub use acquire::{
    AcquiredSource, LISTING_FILE_NAME, SourceLocation, SourceSpec, acquire_all, clone_repo,
    prepare_workspace, teardown_workspace,
};
pub use walker::{Candidate, FileFilter, SourceTree, walk};
