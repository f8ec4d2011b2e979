//! Application configuration for algocatalog.
//!
//! User config lives at `~/.algocatalog/algocatalog.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "algocatalog.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".algocatalog";

/// Host serving the default upstream repositories.
const UPSTREAM_ORG: &str = "https://github.com/TheAlgorithms";

// ---------------------------------------------------------------------------
// Config structs (matching algocatalog.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Prose explanations repository.
    #[serde(default)]
    pub explanations: ExplanationsConfig,

    /// Source repositories, one per language.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<RepositoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            explanations: ExplanationsConfig::default(),
            repositories: default_repositories(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory receiving the catalog artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Scratch directory repositories are acquired into.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,

    /// Maximum number of concurrent acquisitions.
    #[serde(default = "default_acquire_concurrency")]
    pub acquire_concurrency: u32,

    /// Timeout for every HTTP request.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Clone depth for git sources; 0 fetches the full history.
    #[serde(default = "default_clone_depth")]
    pub clone_depth: u32,

    /// Leave the scratch workspace on disk after the run.
    #[serde(default)]
    pub keep_workspace: bool,

    /// Abort the run when any source cannot be acquired.
    #[serde(default)]
    pub fail_on_unavailable: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            workspace_dir: default_workspace_dir(),
            acquire_concurrency: default_acquire_concurrency(),
            http_timeout_secs: default_http_timeout(),
            clone_depth: default_clone_depth(),
            keep_workspace: false,
            fail_on_unavailable: false,
        }
    }
}

fn default_output_dir() -> String {
    "tmp".into()
}
fn default_workspace_dir() -> String {
    "tmp/repositories".into()
}
fn default_acquire_concurrency() -> u32 {
    8
}
fn default_http_timeout() -> u64 {
    30
}
fn default_clone_depth() -> u32 {
    1
}

/// `[explanations]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationsConfig {
    /// Git remote of the explanations repository.
    #[serde(default = "default_explanations_remote")]
    pub remote: String,

    /// Branch to clone.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Locales looked up as top-level directories of the repository.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
}

impl Default for ExplanationsConfig {
    fn default() -> Self {
        Self {
            remote: default_explanations_remote(),
            branch: default_branch(),
            locales: default_locales(),
        }
    }
}

fn default_explanations_remote() -> String {
    format!("{UPSTREAM_ORG}/Algorithms-Explanation.git")
}
fn default_branch() -> String {
    "master".into()
}
fn default_locales() -> Vec<String> {
    ["en", "es", "fr", "de", "it", "pt-br", "ru", "uk", "he", "ja", "ko", "zh-CN"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// How a repository exposes its algorithm sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    /// A git repository whose file tree is walked.
    Tree,
    /// A repository publishing a nested-bullet text listing of its files.
    Listing,
}

/// `[[repositories]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Language identifier, also used as the workspace directory name.
    pub language: String,

    /// Acquisition and discovery mode.
    pub kind: RepositoryKind,

    /// Git remote for `tree` sources, listing document URL for `listing` sources.
    pub remote: String,

    /// Browse URL of the repository on its origin host.
    pub web_url: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Algorithm root relative to the repository root (tree sources only).
    #[serde(default)]
    pub base_dir: String,

    /// Accepted file-name suffixes.
    #[serde(default)]
    pub allowed_files: Vec<String>,

    /// Path substrings that exclude a file.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Language tag handed to the code renderer (defaults to `language`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,

    /// Implementations are notebooks, rendered into the algorithm body.
    #[serde(default)]
    pub notebook: bool,
}

impl RepositoryConfig {
    /// Language tag for the code renderer.
    pub fn highlight_tag(&self) -> &str {
        self.highlight.as_deref().unwrap_or(&self.language)
    }

    /// Canonical browse URL of a file, given its path relative to the repository root.
    pub fn tree_url(&self, relative: &str) -> String {
        format!(
            "{}/tree/{}/{}",
            self.web_url.trim_end_matches('/'),
            self.branch,
            relative
        )
    }

    /// Prefix of listing links that is stripped to obtain the repository-relative path.
    pub fn blob_prefix(&self) -> String {
        format!("{}/blob/{}/", self.web_url.trim_end_matches('/'), self.branch)
    }
}

fn default_exclude() -> Vec<String> {
    vec!["test".into(), "__init__".into()]
}

/// Build a tree-kind upstream repository entry.
fn upstream_tree(language: &str, repo: &str, base_dir: &str, suffix: &str) -> RepositoryConfig {
    RepositoryConfig {
        language: language.into(),
        kind: RepositoryKind::Tree,
        remote: format!("{UPSTREAM_ORG}/{repo}.git"),
        web_url: format!("{UPSTREAM_ORG}/{repo}"),
        branch: default_branch(),
        base_dir: base_dir.into(),
        allowed_files: vec![suffix.into()],
        exclude: default_exclude(),
        highlight: None,
        notebook: false,
    }
}

fn default_repositories() -> Vec<RepositoryConfig> {
    let mut rust = upstream_tree("rust", "Rust", "src", ".rs");
    rust.exclude.push("mod.rs".into());
    rust.exclude.push("lib.rs".into());

    let mut cpp = upstream_tree("c-plus-plus", "C-Plus-Plus", "", ".cpp");
    cpp.highlight = Some("cpp".into());

    let mut jupyter = upstream_tree("jupyter", "Jupyter", "", ".ipynb");
    jupyter.notebook = true;
    jupyter.highlight = Some("python".into());
    jupyter.exclude.push(".ipynb_checkpoints".into());

    let c_sharp = RepositoryConfig {
        language: "c-sharp".into(),
        kind: RepositoryKind::Listing,
        remote: "https://raw.githubusercontent.com/TheAlgorithms/C-Sharp/master/DIRECTORY.md"
            .into(),
        web_url: format!("{UPSTREAM_ORG}/C-Sharp"),
        branch: default_branch(),
        base_dir: String::new(),
        allowed_files: vec![".cs".into()],
        exclude: Vec::new(),
        highlight: Some("csharp".into()),
        notebook: false,
    };

    vec![
        upstream_tree("python", "Python", "", ".py"),
        upstream_tree("java", "Java", "src/main/java/com/thealgorithms", ".java"),
        upstream_tree("javascript", "JavaScript", "", ".js"),
        upstream_tree("c", "C", "", ".c"),
        cpp,
        upstream_tree("go", "Go", "", ".go"),
        rust,
        upstream_tree("ruby", "Ruby", "", ".rb"),
        jupyter,
        c_sharp,
    ]
}

// ---------------------------------------------------------------------------
// Acquire config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime acquisition settings, merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Scratch directory sources are acquired into.
    pub workspace_dir: PathBuf,
    /// Maximum number of concurrent acquisitions.
    pub concurrency: u32,
    /// Clone depth; 0 means full history.
    pub clone_depth: u32,
    /// Timeout for HTTP fetches.
    pub http_timeout_secs: u64,
}

impl From<&AppConfig> for AcquireConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            workspace_dir: PathBuf::from(&config.defaults.workspace_dir),
            concurrency: config.defaults.acquire_concurrency,
            clone_depth: config.defaults.clone_depth,
            http_timeout_secs: config.defaults.http_timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Check the repository table for mistakes that would corrupt a run.
    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(CatalogError::config("no repositories configured"));
        }
        if self.defaults.acquire_concurrency == 0 {
            return Err(CatalogError::config("acquire_concurrency must be at least 1"));
        }

        let mut seen = HashSet::new();
        for repo in &self.repositories {
            if repo.language.trim().is_empty() {
                return Err(CatalogError::config("repository with empty language"));
            }
            if !seen.insert(repo.language.as_str()) {
                return Err(CatalogError::config(format!(
                    "duplicate repository language '{}'",
                    repo.language
                )));
            }
            if repo.kind == RepositoryKind::Tree && repo.allowed_files.is_empty() {
                return Err(CatalogError::config(format!(
                    "repository '{}' has no allowed_files",
                    repo.language
                )));
            }
        }
        Ok(())
    }

    /// Look up a repository by language identifier.
    pub fn repository(&self, language: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.language == language)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.algocatalog/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.algocatalog/algocatalog.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CatalogError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CatalogError::Serialize(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("workspace_dir"));
        assert!(toml_str.contains("Algorithms-Explanation"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.acquire_concurrency, 8);
        assert_eq!(parsed.repositories.len(), config.repositories.len());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn empty_file_uses_default_repositories() {
        let parsed: AppConfig = toml::from_str("").expect("deserialize");
        assert!(parsed.repository("python").is_some());
        assert_eq!(
            parsed.repository("c-sharp").map(|r| r.kind),
            Some(RepositoryKind::Listing)
        );
    }

    #[test]
    fn config_with_repositories() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/catalog"

[explanations]
locales = ["en"]

[[repositories]]
language = "python"
kind = "tree"
remote = "https://example.com/python.git"
web_url = "https://example.com/python"
allowed_files = [".py"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.repositories.len(), 1);
        let python = &config.repositories[0];
        assert_eq!(python.branch, "master");
        assert_eq!(python.exclude, vec!["test", "__init__"]);
        assert_eq!(python.highlight_tag(), "python");
        assert_eq!(config.explanations.locales, vec!["en"]);
    }

    #[test]
    fn repository_urls() {
        let config = AppConfig::default();
        let python = config.repository("python").unwrap();
        assert_eq!(
            python.tree_url("sorts/bubble_sort.py"),
            "https://github.com/TheAlgorithms/Python/tree/master/sorts/bubble_sort.py"
        );
        let c_sharp = config.repository("c-sharp").unwrap();
        assert_eq!(
            c_sharp.blob_prefix(),
            "https://github.com/TheAlgorithms/C-Sharp/blob/master/"
        );
    }

    #[test]
    fn duplicate_language_rejected() {
        let mut config = AppConfig::default();
        let dup = config.repositories[0].clone();
        config.repositories.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate repository language"));
    }

    #[test]
    fn acquire_config_from_app_config() {
        let app = AppConfig::default();
        let acquire = AcquireConfig::from(&app);
        assert_eq!(acquire.workspace_dir, PathBuf::from("tmp/repositories"));
        assert_eq!(acquire.concurrency, 8);
        assert_eq!(acquire.clone_depth, 1);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[defaults]\nkeep_workspace = true\n").expect("write");
        let config = load_config_from(&path).expect("load");
        assert!(config.defaults.keep_workspace);
        assert!(!config.repositories.is_empty());
    }
}
