//! Discovery: turning acquired sources into implementation records,
//! explanation bodies and notebook renders.
//!
//! Functions here only read the workspace and return plain data; merging into
//! the [`Catalog`](crate::catalog::Catalog) is left to the pipeline.

use std::collections::HashSet;
use std::path::Path;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use algocatalog_discovery::{ListingEntry, fetch_text, parse_listing, raw_url};
use algocatalog_render::{CodeRenderer, render_markdown, render_notebook};
use algocatalog_shared::normalize::normalize_strong;
use algocatalog_shared::{CatalogError, Implementation, RepositoryConfig, Result};
use algocatalog_sources::{LISTING_FILE_NAME, SourceTree, walk};

/// Language tag used when rendering a notebook's raw JSON as code.
const NOTEBOOK_SOURCE_LANGUAGE: &str = "json";

/// Extension of explanation documents.
const EXPLANATION_EXTENSION: &str = "md";

/// One implementation found in a source, ready for registration.
#[derive(Debug, Clone)]
pub struct Discovered {
    /// Strong-normalized merge key.
    pub key: String,
    /// Display name.
    pub name: String,
    pub categories: Vec<String>,
    pub implementation: Implementation,
}

// ---------------------------------------------------------------------------
// Tree repositories
// ---------------------------------------------------------------------------

/// Walk a cloned repository and render every accepted source file.
///
/// Files that cannot be read as UTF-8 text are skipped with a warning.
#[instrument(skip_all, fields(language = %repo.language))]
pub fn discover_tree(
    repo_root: &Path,
    repo: &RepositoryConfig,
    renderer: &dyn CodeRenderer,
) -> Vec<Discovered> {
    let tree = SourceTree::for_repository(repo_root, repo);
    let language_tag = if repo.notebook {
        NOTEBOOK_SOURCE_LANGUAGE
    } else {
        repo.highlight_tag()
    };

    let mut found = Vec::new();
    for candidate in tree.candidates() {
        let source = match std::fs::read_to_string(&candidate.path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %candidate.path.display(), error = %e, "unreadable source file, skipping");
                continue;
            }
        };

        found.push(Discovered {
            key: normalize_strong(&candidate.name),
            implementation: Implementation {
                url: repo.tree_url(&candidate.repo_relative),
                code: renderer.render(&source, language_tag),
                dir: candidate.repo_relative,
            },
            name: candidate.name,
            categories: candidate.categories,
        });
    }

    debug!(count = found.len(), "tree discovered");
    found
}

// ---------------------------------------------------------------------------
// Listing repositories
// ---------------------------------------------------------------------------

/// Parse the acquired listing document and fetch each linked file, one at a time.
///
/// A file that fails to download is skipped with a warning. A missing listing
/// document is an error: acquisition reported the source as available.
#[instrument(skip_all, fields(language = %repo.language))]
pub async fn discover_listing(
    source_dir: &Path,
    repo: &RepositoryConfig,
    client: &Client,
    renderer: &dyn CodeRenderer,
) -> Result<Vec<Discovered>> {
    let listing_path = source_dir.join(LISTING_FILE_NAME);
    let listing = tokio::fs::read_to_string(&listing_path)
        .await
        .map_err(|e| CatalogError::io(&listing_path, e))?;

    let parsed = parse_listing(&listing);
    let blob_prefix = repo.blob_prefix();
    let mut found = Vec::with_capacity(parsed.entries.len());

    for entry in parsed.entries {
        if !listing_entry_allowed(&entry, repo) {
            debug!(file = %entry.file_name, "listing entry not an allowed file, skipping");
            continue;
        }

        let source = match fetch_text(client, &raw_url(&entry.url)).await {
            Ok(source) => source,
            Err(e) => {
                warn!(name = %entry.name, error = %e, "listing file fetch failed, skipping");
                continue;
            }
        };

        let dir = entry
            .url
            .strip_prefix(blob_prefix.as_str())
            .unwrap_or(&entry.url)
            .to_string();

        found.push(Discovered {
            key: normalize_strong(&entry.name),
            implementation: Implementation {
                dir,
                code: renderer.render(&source, repo.highlight_tag()),
                url: entry.url,
            },
            name: entry.name,
            categories: entry.categories,
        });
    }

    debug!(count = found.len(), "listing discovered");
    Ok(found)
}

fn listing_entry_allowed(entry: &ListingEntry, repo: &RepositoryConfig) -> bool {
    repo.allowed_files.is_empty()
        || repo
            .allowed_files
            .iter()
            .any(|suffix| entry.file_name.ends_with(suffix.as_str()))
}

// ---------------------------------------------------------------------------
// Explanations
// ---------------------------------------------------------------------------

/// Render every explanation under one locale directory whose key is in `known`.
///
/// Returns `(key, html)` pairs in walk order. The document's first line (its
/// title) is dropped before rendering. Unknown keys are dropped silently.
pub fn collect_explanations(locale_dir: &Path, known: &HashSet<String>) -> Vec<(String, String)> {
    let mut rendered = Vec::new();

    for path in walk(locale_dir) {
        if path.extension().and_then(|e| e.to_str()) != Some(EXPLANATION_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let key = normalize_strong(stem);
        if !known.contains(&key) {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let body = text.split_once('\n').map_or("", |(_, rest)| rest);
                rendered.push((key, render_markdown(body)));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "unreadable explanation, skipping"),
        }
    }

    rendered
}

// ---------------------------------------------------------------------------
// Notebooks
// ---------------------------------------------------------------------------

/// Read and render one notebook file.
pub fn render_notebook_file(
    path: &Path,
    renderer: &dyn CodeRenderer,
    fallback_language: &str,
) -> Result<String> {
    let json = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    render_notebook(&json, renderer, fallback_language)
}
