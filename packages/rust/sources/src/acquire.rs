//! Source acquisition into the scratch workspace.
//!
//! Git sources are cloned with `git2` on the blocking pool; listing sources
//! have their listing document downloaded. All sources are acquired
//! concurrently, bounded by [`AcquireConfig::concurrency`], and every source
//! reports an explicit [`SourceStatus`] instead of failing the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use algocatalog_shared::{
    AcquireConfig, CatalogError, RepositoryConfig, RepositoryKind, Result, SourceStatus,
};

/// File name a listing document is stored under inside its workspace directory.
pub const LISTING_FILE_NAME: &str = "DIRECTORY.md";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where and how to acquire one source.
#[derive(Debug, Clone)]
pub enum SourceLocation {
    /// Clone a git remote at the given branch.
    Git { remote: String, branch: String },
    /// Download a directory listing document.
    Listing { url: String },
}

/// A source to acquire, named by the workspace directory it lands in.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Workspace directory name and report key (the language identifier).
    pub name: String,
    pub location: SourceLocation,
}

impl From<&RepositoryConfig> for SourceSpec {
    fn from(repo: &RepositoryConfig) -> Self {
        let location = match repo.kind {
            RepositoryKind::Tree => SourceLocation::Git {
                remote: repo.remote.clone(),
                branch: repo.branch.clone(),
            },
            RepositoryKind::Listing => SourceLocation::Listing {
                url: repo.remote.clone(),
            },
        };
        Self {
            name: repo.language.clone(),
            location,
        }
    }
}

/// Outcome of acquiring one source.
#[derive(Debug, Clone)]
pub struct AcquiredSource {
    pub name: String,
    /// Workspace directory holding the checkout or the listing document.
    pub dir: PathBuf,
    pub status: SourceStatus,
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// Discard any previous workspace and create an empty one.
pub async fn prepare_workspace(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir)
        .await
        .map_err(|e| CatalogError::io(dir, e))?
    {
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| CatalogError::io(dir, e))?;
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CatalogError::io(dir, e))?;
    debug!(path = %dir.display(), "workspace prepared");
    Ok(())
}

/// Remove the workspace and everything acquired into it.
pub async fn teardown_workspace(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!(path = %dir.display(), "workspace removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CatalogError::io(dir, e)),
    }
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

/// Acquire every source into `config.workspace_dir`.
///
/// Returns one [`AcquiredSource`] per spec, in spec order, once every
/// acquisition has settled. Individual failures become
/// [`SourceStatus::Unavailable`]; only building the HTTP client can fail the call.
#[instrument(skip_all, fields(sources = specs.len(), concurrency = config.concurrency))]
pub async fn acquire_all(
    specs: &[SourceSpec],
    config: &AcquireConfig,
) -> Result<Vec<AcquiredSource>> {
    let client = algocatalog_discovery::build_client(config.http_timeout_secs)?;
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1) as usize));
    let mut tasks = JoinSet::new();

    for (index, spec) in specs.iter().cloned().enumerate() {
        let dir = config.workspace_dir.join(&spec.name);
        let semaphore = semaphore.clone();
        let client = client.clone();
        let depth = config.clone_depth;

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let status = match acquire_one(&spec, &dir, &client, depth).await {
                Ok(()) => {
                    info!(source = %spec.name, "acquired");
                    SourceStatus::Available
                }
                Err(e) => {
                    warn!(source = %spec.name, error = %e, "source unavailable");
                    SourceStatus::Unavailable {
                        reason: e.to_string(),
                    }
                }
            };
            (
                index,
                AcquiredSource {
                    name: spec.name,
                    dir,
                    status,
                },
            )
        });
    }

    let mut settled: Vec<Option<AcquiredSource>> = vec![None; specs.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, acquired)) => settled[index] = Some(acquired),
            Err(e) => warn!(error = %e, "acquisition task aborted"),
        }
    }

    let results = specs
        .iter()
        .zip(settled)
        .map(|(spec, acquired)| {
            acquired.unwrap_or_else(|| AcquiredSource {
                name: spec.name.clone(),
                dir: config.workspace_dir.join(&spec.name),
                status: SourceStatus::Unavailable {
                    reason: "acquisition task aborted".into(),
                },
            })
        })
        .collect::<Vec<_>>();

    let unavailable = results.iter().filter(|r| !r.status.is_available()).count();
    info!(total = results.len(), unavailable, "acquisition complete");

    Ok(results)
}

async fn acquire_one(
    spec: &SourceSpec,
    dir: &Path,
    client: &reqwest::Client,
    depth: u32,
) -> Result<()> {
    match &spec.location {
        SourceLocation::Git { remote, branch } => {
            let remote = remote.clone();
            let branch = branch.clone();
            let dest = dir.to_path_buf();
            tokio::task::spawn_blocking(move || clone_repo(&remote, &branch, &dest, depth))
                .await
                .map_err(|e| CatalogError::Git(format!("clone task failed: {e}")))?
        }
        SourceLocation::Listing { url } => {
            let listing = algocatalog_discovery::fetch_listing(client, url).await?;
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CatalogError::io(dir, e))?;
            let path = dir.join(LISTING_FILE_NAME);
            tokio::fs::write(&path, listing)
                .await
                .map_err(|e| CatalogError::io(&path, e))
        }
    }
}

/// Clone `remote` at `branch` into `dest`. A `depth` of 0 fetches full history.
pub fn clone_repo(remote: &str, branch: &str, dest: &Path, depth: u32) -> Result<()> {
    let mut fetch = git2::FetchOptions::new();
    if depth > 0 {
        fetch.depth(i32::try_from(depth).unwrap_or(i32::MAX));
    }

    git2::build::RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch)
        .clone(remote, dest)
        .map_err(|e| CatalogError::Git(format!("{remote}: {}", e.message())))?;

    debug!(remote, dest = %dest.display(), "cloned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a repository with one commit on `master` containing `files`.
    fn init_repo(dir: &Path, files: &[(&str, &str)]) {
        let repo = git2::Repository::init(dir).unwrap();
        for (relative, content) in files {
            let path = dir.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        repo.commit(Some("refs/heads/master"), &sig, &sig, "init", &tree, &[])
            .unwrap();
        repo.set_head("refs/heads/master").unwrap();
    }

    fn acquire_config(workspace: &Path) -> AcquireConfig {
        AcquireConfig {
            workspace_dir: workspace.to_path_buf(),
            concurrency: 2,
            clone_depth: 0,
            http_timeout_secs: 5,
        }
    }

    #[test]
    fn clone_local_repository() {
        let td = TempDir::new().unwrap();
        let origin = td.path().join("origin");
        init_repo(&origin, &[("sorts/bubble_sort.py", "def bubble_sort(): pass\n")]);

        let dest = td.path().join("clone");
        clone_repo(origin.to_str().unwrap(), "master", &dest, 0).unwrap();
        assert!(dest.join("sorts/bubble_sort.py").exists());
    }

    #[tokio::test]
    async fn acquire_all_reports_each_source() {
        let td = TempDir::new().unwrap();
        let origin = td.path().join("origin");
        init_repo(&origin, &[("graphs/bfs.py", "pass\n")]);

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/DIRECTORY.md"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("## S\n  * [A](https://h/A.cs)\n"),
            )
            .mount(&server)
            .await;

        let specs = vec![
            SourceSpec {
                name: "python".into(),
                location: SourceLocation::Git {
                    remote: origin.to_string_lossy().into_owned(),
                    branch: "master".into(),
                },
            },
            SourceSpec {
                name: "go".into(),
                location: SourceLocation::Git {
                    remote: td.path().join("missing").to_string_lossy().into_owned(),
                    branch: "master".into(),
                },
            },
            SourceSpec {
                name: "c-sharp".into(),
                location: SourceLocation::Listing {
                    url: format!("{}/DIRECTORY.md", server.uri()),
                },
            },
        ];

        let workspace = td.path().join("workspace");
        prepare_workspace(&workspace).await.unwrap();
        let results = acquire_all(&specs, &acquire_config(&workspace)).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["python", "go", "c-sharp"]);
        assert!(results[0].status.is_available());
        assert!(matches!(results[1].status, SourceStatus::Unavailable { .. }));
        assert!(results[2].status.is_available());
        assert!(workspace.join("python/graphs/bfs.py").exists());
        assert!(workspace.join("c-sharp").join(LISTING_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn workspace_is_replaced_and_removed() {
        let td = TempDir::new().unwrap();
        let workspace = td.path().join("ws");
        std::fs::create_dir_all(workspace.join("stale")).unwrap();

        prepare_workspace(&workspace).await.unwrap();
        assert!(workspace.exists());
        assert!(!workspace.join("stale").exists());

        teardown_workspace(&workspace).await.unwrap();
        assert!(!workspace.exists());
        // Tearing down twice is fine.
        teardown_workspace(&workspace).await.unwrap();
    }
}
