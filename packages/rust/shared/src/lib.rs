//! Shared types, error model, and configuration for algocatalog.
//!
//! This crate is the foundation depended on by all other algocatalog crates.
//! It provides:
//! - [`CatalogError`] — the unified error type
//! - Domain types ([`Algorithm`], [`Implementation`], [`BuildManifest`], [`RunId`])
//! - Configuration ([`AppConfig`], [`AcquireConfig`], config loading)
//! - Name/category normalization ([`normalize`])

pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AcquireConfig, AppConfig, DefaultsConfig, ExplanationsConfig, RepositoryConfig,
    RepositoryKind, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CatalogError, Result};
pub use types::{
    Algorithm, ArtifactMeta, BuildManifest, CURRENT_SCHEMA_VERSION, Implementation,
    MinimalAlgorithm, RunId, SlugIndex, SourceReport, SourceStatus,
};
