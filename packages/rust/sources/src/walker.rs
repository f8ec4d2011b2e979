//! Source-tree walking and candidate filtering.
//!
//! [`walk`] lazily yields every file under a root, depth-first, in file-name
//! order. [`SourceTree`] applies a repository's filter policy on top of it and
//! derives the algorithm name and categories from each accepted path.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use algocatalog_shared::RepositoryConfig;
use algocatalog_shared::normalize::normalize_title;

/// Minimum number of path components below the algorithm root.
/// Files directly at the root are READMEs and config, not algorithms.
const MIN_DEPTH: usize = 2;

/// Lazily walk all files under `root`, depth-first, sorted by file name.
///
/// A missing or empty root yields nothing. `.git` directories are skipped.
/// Each call starts a fresh walk; the returned iterator is single-pass.
pub fn walk(root: &Path) -> impl Iterator<Item = PathBuf> + use<> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable walk entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
}

// ---------------------------------------------------------------------------
// FileFilter
// ---------------------------------------------------------------------------

/// Suffix allow-list and substring deny-list applied to walked files.
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Accepted file-name suffixes (e.g. `.py`).
    pub allowed_suffixes: Vec<String>,
    /// Substrings that exclude a path (e.g. `test`, `__init__`).
    pub forbidden: Vec<String>,
}

impl FileFilter {
    /// Decide whether a path relative to the algorithm root is an algorithm source.
    pub fn accepts(&self, relative: &str) -> bool {
        let file_name = relative.rsplit('/').next().unwrap_or(relative);

        self.allowed_suffixes.iter().any(|s| file_name.ends_with(s.as_str()))
            && !self.forbidden.iter().any(|f| relative.contains(f.as_str()))
            && relative.split('/').count() >= MIN_DEPTH
    }
}

impl From<&RepositoryConfig> for FileFilter {
    fn from(repo: &RepositoryConfig) -> Self {
        Self {
            allowed_suffixes: repo.allowed_files.clone(),
            forbidden: repo.exclude.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceTree
// ---------------------------------------------------------------------------

/// An accepted algorithm source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute (workspace) path of the file.
    pub path: PathBuf,
    /// Path relative to the repository root, `/`-separated.
    pub repo_relative: String,
    /// Title-cased algorithm name derived from the file stem.
    pub name: String,
    /// Title-cased directory segments between the algorithm root and the file.
    ///
    /// These are display names (`dynamic_programming` becomes
    /// `Dynamic Programming`). They are not category-normalized here; the
    /// normalized form is only used as the category-index key when the
    /// candidate is registered.
    pub categories: Vec<String>,
}

/// A cloned repository plus the policy for finding algorithms in it.
#[derive(Debug, Clone)]
pub struct SourceTree {
    repo_root: PathBuf,
    base_dir: String,
    filter: FileFilter,
}

impl SourceTree {
    pub fn new(repo_root: impl Into<PathBuf>, base_dir: &str, filter: FileFilter) -> Self {
        Self {
            repo_root: repo_root.into(),
            base_dir: base_dir.trim_matches('/').to_string(),
            filter,
        }
    }

    /// Build from a repository config and its checkout directory.
    pub fn for_repository(repo_root: impl Into<PathBuf>, repo: &RepositoryConfig) -> Self {
        Self::new(repo_root, &repo.base_dir, FileFilter::from(repo))
    }

    /// Directory the walk starts from.
    pub fn algorithm_root(&self) -> PathBuf {
        if self.base_dir.is_empty() {
            self.repo_root.clone()
        } else {
            self.repo_root.join(&self.base_dir)
        }
    }

    /// Lazily yield the accepted candidates in walk order.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        let root = self.algorithm_root();
        walk(&root).filter_map(move |path| self.candidate(&root, path))
    }

    fn candidate(&self, root: &Path, path: PathBuf) -> Option<Candidate> {
        let segments = relative_segments(root, &path)?;
        let relative = segments.join("/");
        if !self.filter.accepts(&relative) {
            return None;
        }

        let (file_name, dirs) = segments.split_last()?;
        let stem = file_name.split('.').next().unwrap_or(file_name);
        let name = normalize_title(&stem.replace('_', " "));
        let categories = dirs.iter().map(|d| normalize_title(d)).collect();

        let repo_relative = if self.base_dir.is_empty() {
            relative
        } else {
            format!("{}/{relative}", self.base_dir)
        };

        Some(Candidate {
            path,
            repo_relative,
            name,
            categories,
        })
    }
}

/// Normal path components of `path` below `root`, as strings.
fn relative_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str().map(String::from),
            _ => None,
        })
        .collect()
}
