//! Error types for algocatalog.
//!
//! Library crates use [`CatalogError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all catalog build operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a listing or a source file.
    #[error("network error: {0}")]
    Network(String),

    /// Git clone or repository error.
    #[error("git error: {0}")]
    Git(String),

    /// Listing or notebook parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Markdown, notebook or code rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unavailable source in strict mode, bad input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON/TOML serialization error.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// A fatal error tagged with the pipeline stage where the run halted.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<CatalogError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag this error with the name of the stage that failed.
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }
}
