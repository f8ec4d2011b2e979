//! End-to-end `build` pipeline:
//! prepare → acquire → discover → explanations → notebooks → write → teardown.
//!
//! Every stage drains completely before the next one starts. The [`Catalog`]
//! stays owned by this task; concurrent stages return plain data that is
//! merged here in configuration order, so a run's output depends only on its
//! inputs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use algocatalog_render::CodeRenderer;
use algocatalog_shared::{
    AcquireConfig, AppConfig, ArtifactMeta, BuildManifest, CURRENT_SCHEMA_VERSION, CatalogError,
    ExplanationsConfig, RepositoryConfig, RepositoryKind, Result, RunId, SourceReport,
    SourceStatus,
};
use algocatalog_sources::{
    AcquiredSource, SourceLocation, SourceSpec, acquire_all, prepare_workspace,
    teardown_workspace,
};

use crate::catalog::Catalog;
use crate::discover::{self, Discovered};

/// Workspace directory (and manifest source name) of the explanations repository.
pub const EXPLANATIONS_SOURCE: &str = "_explanations";

pub const STAGE_PREPARE: &str = "prepare";
pub const STAGE_ACQUIRE: &str = "acquire";
pub const STAGE_DISCOVER: &str = "discover";
pub const STAGE_EXPLANATIONS: &str = "explanations";
pub const STAGE_NOTEBOOKS: &str = "notebooks";
pub const STAGE_WRITE: &str = "write";
pub const STAGE_TEARDOWN: &str = "teardown";

/// Configuration for one catalog build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory the artifacts are written to.
    pub output_dir: PathBuf,
    /// Workspace location and acquisition limits.
    pub acquire: AcquireConfig,
    pub explanations: ExplanationsConfig,
    /// Repositories in processing order.
    pub repositories: Vec<RepositoryConfig>,
    /// Leave the workspace on disk after a successful run.
    pub keep_workspace: bool,
    /// Abort in the acquire stage when any source is unavailable.
    pub fail_on_unavailable: bool,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
}

impl BuildConfig {
    /// Resolve a build from the loaded application config.
    pub fn from_app(config: &AppConfig, tool_version: impl Into<String>) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            acquire: AcquireConfig::from(config),
            explanations: config.explanations.clone(),
            repositories: config.repositories.clone(),
            keep_workspace: config.defaults.keep_workspace,
            fail_on_unavailable: config.defaults.fail_on_unavailable,
            tool_version: tool_version.into(),
        }
    }

    /// Keep only the repositories for `languages`, in configuration order.
    /// Unknown language identifiers are an error.
    pub fn restrict_languages(&mut self, languages: &[String]) -> Result<()> {
        if languages.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = languages
            .iter()
            .find(|l| !self.repositories.iter().any(|r| &r.language == *l))
        {
            return Err(CatalogError::config(format!(
                "unknown language '{unknown}'"
            )));
        }
        self.repositories.retain(|r| languages.contains(&r.language));
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(CatalogError::config("no repositories to build"));
        }
        if self
            .repositories
            .iter()
            .any(|r| r.language == EXPLANATIONS_SOURCE)
        {
            return Err(CatalogError::config(format!(
                "'{EXPLANATIONS_SOURCE}' is reserved and cannot be a repository language"
            )));
        }
        Ok(())
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildResult {
    pub run_id: RunId,
    pub output_dir: PathBuf,
    pub algorithm_count: usize,
    pub category_count: usize,
    pub language_count: usize,
    /// Per-source acquisition outcome, explanations last.
    pub sources: Vec<SourceReport>,
    /// Checksums of the aggregate artifacts.
    pub artifacts: Vec<ArtifactMeta>,
    pub elapsed: Duration,
}

impl BuildResult {
    /// Sources that could not be acquired.
    pub fn unavailable(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.status.is_available())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, name: &str);
    /// Called after a repository has been discovered.
    fn discovered(&self, language: &str, implementations: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _name: &str) {}
    fn discovered(&self, _language: &str, _implementations: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full build pipeline.
///
/// A failure is returned as [`CatalogError::Stage`] naming the stage that
/// halted the run. The workspace is removed after a successful run unless
/// `keep_workspace` is set; after a failure it is left for inspection.
#[instrument(skip_all, fields(output = %config.output_dir.display(), repositories = config.repositories.len()))]
pub async fn build_catalog(
    config: &BuildConfig,
    renderer: Arc<dyn CodeRenderer>,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();
    let run_id = RunId::new();
    config.validate()?;

    info!(%run_id, "starting build pipeline");

    // --- Stage 1: Workspace ---
    progress.stage("Preparing workspace");
    let workspace = &config.acquire.workspace_dir;
    prepare_workspace(workspace)
        .await
        .map_err(|e| e.in_stage(STAGE_PREPARE))?;

    let outcome = run_stages(config, renderer, progress, &run_id).await;

    let (sources, artifacts, counts) = match outcome {
        Ok(done) => done,
        Err(e) => {
            info!(path = %workspace.display(), "workspace kept after failure");
            return Err(e);
        }
    };

    // --- Stage 7: Teardown ---
    if config.keep_workspace {
        debug!(path = %workspace.display(), "keeping workspace");
    } else {
        progress.stage("Removing workspace");
        teardown_workspace(workspace)
            .await
            .map_err(|e| e.in_stage(STAGE_TEARDOWN))?;
    }

    let result = BuildResult {
        run_id,
        output_dir: config.output_dir.clone(),
        algorithm_count: counts.algorithms,
        category_count: counts.categories,
        language_count: counts.languages,
        sources,
        artifacts,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        run_id = %result.run_id,
        algorithms = result.algorithm_count,
        categories = result.category_count,
        languages = result.language_count,
        unavailable = result.unavailable().count(),
        elapsed_ms = result.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}

struct Counts {
    algorithms: usize,
    categories: usize,
    languages: usize,
}

async fn run_stages(
    config: &BuildConfig,
    renderer: Arc<dyn CodeRenderer>,
    progress: &dyn ProgressReporter,
    run_id: &RunId,
) -> Result<(Vec<SourceReport>, Vec<ArtifactMeta>, Counts)> {
    // --- Stage 2: Acquire ---
    progress.stage("Acquiring sources");
    let acquired = acquire(config).await.map_err(|e| e.in_stage(STAGE_ACQUIRE))?;
    let (repo_sources, explanations_source) = acquired.split_at(config.repositories.len());

    // --- Stage 3: Discover ---
    progress.stage("Collecting algorithms and rendering code");
    let mut catalog = Catalog::new();
    let mut sources = discover_all(config, repo_sources, &mut catalog, renderer.clone(), progress)
        .await
        .map_err(|e| e.in_stage(STAGE_DISCOVER))?;

    // --- Stage 4: Explanations ---
    progress.stage("Collecting and rendering explanations");
    let explanations = match explanations_source.first() {
        Some(source) if source.status.is_available() => {
            merge_explanations(&config.explanations.locales, &source.dir, &mut catalog)
                .await
                .map_err(|e| e.in_stage(STAGE_EXPLANATIONS))?
        }
        _ => 0,
    };
    if let Some(source) = explanations_source.first() {
        sources.push(SourceReport {
            language: EXPLANATIONS_SOURCE.into(),
            status: source.status.clone(),
            implementations: explanations,
        });
    }

    // --- Stage 5: Notebooks ---
    progress.stage("Rendering notebooks");
    merge_notebooks(config, repo_sources, &mut catalog, renderer)
        .await
        .map_err(|e| e.in_stage(STAGE_NOTEBOOKS))?;

    // --- Stage 6: Write ---
    progress.stage("Writing algorithms to files");
    let artifacts = write(config, &catalog, &sources, run_id).map_err(|e| e.in_stage(STAGE_WRITE))?;

    let counts = Counts {
        algorithms: catalog.len(),
        categories: catalog.categories().len(),
        languages: catalog.languages().len(),
    };
    Ok((sources, artifacts, counts))
}

// ---------------------------------------------------------------------------
// Acquire
// ---------------------------------------------------------------------------

/// Acquire every repository plus the explanations repository (last).
async fn acquire(config: &BuildConfig) -> Result<Vec<AcquiredSource>> {
    let mut specs: Vec<SourceSpec> = config.repositories.iter().map(SourceSpec::from).collect();
    specs.push(SourceSpec {
        name: EXPLANATIONS_SOURCE.into(),
        location: SourceLocation::Git {
            remote: config.explanations.remote.clone(),
            branch: config.explanations.branch.clone(),
        },
    });

    let acquired = acquire_all(&specs, &config.acquire).await?;

    let unavailable: Vec<&str> = acquired
        .iter()
        .filter(|a| !a.status.is_available())
        .map(|a| a.name.as_str())
        .collect();
    if config.fail_on_unavailable && !unavailable.is_empty() {
        return Err(CatalogError::validation(format!(
            "unavailable sources: {}",
            unavailable.join(", ")
        )));
    }

    Ok(acquired)
}

// ---------------------------------------------------------------------------
// Discover
// ---------------------------------------------------------------------------

/// Discover every available repository in configuration order and register
/// its implementations. Returns one report per repository.
#[instrument(skip_all)]
async fn discover_all(
    config: &BuildConfig,
    acquired: &[AcquiredSource],
    catalog: &mut Catalog,
    renderer: Arc<dyn CodeRenderer>,
    progress: &dyn ProgressReporter,
) -> Result<Vec<SourceReport>> {
    let client = algocatalog_discovery::build_client(config.acquire.http_timeout_secs)?;
    let mut reports = Vec::with_capacity(config.repositories.len());

    for (repo, source) in config.repositories.iter().zip(acquired) {
        let registered = match &source.status {
            SourceStatus::Available => {
                let found = match repo.kind {
                    RepositoryKind::Tree => {
                        let repo = repo.clone();
                        let dir = source.dir.clone();
                        let renderer = renderer.clone();
                        tokio::task::spawn_blocking(move || {
                            discover::discover_tree(&dir, &repo, renderer.as_ref())
                        })
                        .await
                        .map_err(|e| {
                            CatalogError::Render(format!("{} discovery task failed: {e}", source.name))
                        })?
                    }
                    RepositoryKind::Listing => {
                        discover::discover_listing(&source.dir, repo, &client, renderer.as_ref())
                            .await?
                    }
                };
                register_all(catalog, &repo.language, found)
            }
            SourceStatus::Unavailable { reason } => {
                warn!(language = %repo.language, %reason, "skipping unavailable source");
                0
            }
        };

        progress.discovered(&repo.language, registered);
        info!(language = %repo.language, implementations = registered, "language collected");

        reports.push(SourceReport {
            language: repo.language.clone(),
            status: source.status.clone(),
            implementations: registered,
        });
    }

    info!(algorithms = catalog.len(), "discovery complete");
    Ok(reports)
}

/// Register discovered records in order; returns how many were accepted.
fn register_all(catalog: &mut Catalog, language: &str, found: Vec<Discovered>) -> usize {
    let mut accepted = 0;
    for item in found {
        let outcome = catalog.register_implementation(
            &item.key,
            language,
            item.implementation,
            &item.categories,
            &item.name,
        );
        if outcome.is_accepted() {
            accepted += 1;
        } else {
            warn!(language, name = %item.name, ?outcome, "implementation dropped");
        }
    }
    accepted
}

// ---------------------------------------------------------------------------
// Explanations
// ---------------------------------------------------------------------------

/// Render explanations with one task per locale, then merge them in locale order.
/// Returns the number of bodies attached.
#[instrument(skip_all, fields(locales = locales.len()))]
async fn merge_explanations(
    locales: &[String],
    root: &Path,
    catalog: &mut Catalog,
) -> Result<usize> {
    let known = Arc::new(catalog.keys());
    let mut tasks = JoinSet::new();

    for (index, locale) in locales.iter().enumerate() {
        let dir = root.join(locale);
        let known = known.clone();
        tasks.spawn_blocking(move || (index, discover::collect_explanations(&dir, &known)));
    }

    let mut per_locale: Vec<Vec<(String, String)>> = vec![Vec::new(); locales.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, rendered) = joined
            .map_err(|e| CatalogError::Render(format!("explanation task failed: {e}")))?;
        per_locale[index] = rendered;
    }

    let mut attached = 0;
    for (locale, rendered) in locales.iter().zip(per_locale) {
        let count = rendered.len();
        for (key, html) in rendered {
            if catalog.merge_explanation(&key, locale, html) {
                attached += 1;
            }
        }
        debug!(%locale, explanations = count, "locale merged");
    }

    info!(attached, "explanations merged");
    Ok(attached)
}

// ---------------------------------------------------------------------------
// Notebooks
// ---------------------------------------------------------------------------

/// Render every notebook implementation concurrently and append each render
/// to its algorithm's body in every locale. Malformed notebooks are skipped.
#[instrument(skip_all)]
async fn merge_notebooks(
    config: &BuildConfig,
    acquired: &[AcquiredSource],
    catalog: &mut Catalog,
    renderer: Arc<dyn CodeRenderer>,
) -> Result<()> {
    let notebook_repos: Vec<(&RepositoryConfig, &AcquiredSource)> = config
        .repositories
        .iter()
        .zip(acquired)
        .filter(|(repo, source)| repo.notebook && source.status.is_available())
        .collect();
    if notebook_repos.is_empty() {
        return Ok(());
    }

    // (merge key, notebook path, fallback kernel language)
    let mut jobs: Vec<(String, PathBuf, String)> = Vec::new();
    for (key, algorithm) in catalog.iter() {
        for (repo, source) in &notebook_repos {
            if let Some(imp) = algorithm.implementations.get(&repo.language) {
                jobs.push((
                    key.to_string(),
                    source.dir.join(&imp.dir),
                    repo.highlight_tag().to_string(),
                ));
            }
        }
    }

    let mut tasks = JoinSet::new();
    for (index, (_, path, language)) in jobs.iter().enumerate() {
        let path = path.clone();
        let language = language.clone();
        let renderer = renderer.clone();
        tasks.spawn_blocking(move || {
            let rendered = discover::render_notebook_file(&path, renderer.as_ref(), &language);
            (index, path, rendered)
        });
    }

    let mut rendered: Vec<Option<String>> = vec![None; jobs.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, path, result) =
            joined.map_err(|e| CatalogError::Render(format!("notebook task failed: {e}")))?;
        match result {
            Ok(html) => rendered[index] = Some(html),
            Err(e) => warn!(path = %path.display(), error = %e, "malformed notebook, skipping"),
        }
    }

    let mut merged = 0;
    for ((key, _, _), html) in jobs.iter().zip(rendered) {
        if let Some(html) = html {
            if catalog.merge_notebook(key, &html, &config.explanations.locales) {
                merged += 1;
            }
        }
    }

    info!(notebooks = jobs.len(), merged, "notebooks merged");
    Ok(())
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Write the catalog artifacts, then the manifest.
fn write(
    config: &BuildConfig,
    catalog: &Catalog,
    sources: &[SourceReport],
    run_id: &RunId,
) -> Result<Vec<ArtifactMeta>> {
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir).map_err(|e| CatalogError::io(output_dir, e))?;

    let algorithms: Vec<_> = catalog.algorithms().collect();
    let artifacts = algocatalog_artifacts::write_catalog(
        output_dir,
        &algorithms,
        catalog.categories(),
        catalog.languages(),
    )?;

    let manifest = BuildManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id: run_id.clone(),
        tool_version: config.tool_version.clone(),
        generated_at: chrono::Utc::now(),
        algorithm_count: catalog.len(),
        category_count: catalog.categories().len(),
        language_count: catalog.languages().len(),
        sources: sources.to_vec(),
        artifacts: artifacts.clone(),
    };
    algocatalog_artifacts::write_manifest(output_dir, &manifest)?;

    Ok(artifacts)
}
