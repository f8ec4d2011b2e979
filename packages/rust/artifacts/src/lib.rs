//! Catalog artifact writer.
//!
//! Serializes a finished catalog to the output directory:
//!
//! ```text
//! <output_dir>/
//! ├── algorithms/
//! │   ├── bubble-sort.json     (full record, pretty)
//! │   └── ...
//! ├── algorithms.json          (all records)
//! ├── algorithms-min.json      (name, slug, categories)
//! ├── categories.json          (category key → slugs)
//! ├── languages.json           (language → slugs)
//! └── manifest.json            (run metadata + checksums, written last)
//! ```
//!
//! Every file is written to a temp file and renamed into place. Aggregates
//! carry no timestamps, so identical catalogs produce identical bytes.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use algocatalog_shared::{
    Algorithm, ArtifactMeta, BuildManifest, CatalogError, MinimalAlgorithm, Result, SlugIndex,
};

/// Directory holding one file per algorithm slug.
pub const ALGORITHMS_DIR: &str = "algorithms";
pub const ALGORITHMS_FILE: &str = "algorithms.json";
pub const ALGORITHMS_MIN_FILE: &str = "algorithms-min.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const LANGUAGES_FILE: &str = "languages.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Write every catalog artifact except the manifest.
///
/// The previous `algorithms/` directory is removed first so slugs from an
/// earlier run cannot survive. Returns checksums of the four aggregate files
/// in write order. Any failure is fatal and leaves earlier writes in place.
#[instrument(skip_all, fields(output = %output_dir.display(), algorithms = algorithms.len()))]
pub fn write_catalog(
    output_dir: &Path,
    algorithms: &[&Algorithm],
    categories: &SlugIndex,
    languages: &SlugIndex,
) -> Result<Vec<ArtifactMeta>> {
    let per_slug_dir = output_dir.join(ALGORITHMS_DIR);
    match std::fs::remove_dir_all(&per_slug_dir) {
        Ok(()) => debug!(path = %per_slug_dir.display(), "removed previous per-slug artifacts"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(CatalogError::io(&per_slug_dir, e)),
    }
    std::fs::create_dir_all(&per_slug_dir).map_err(|e| CatalogError::io(&per_slug_dir, e))?;

    for algorithm in algorithms {
        let path = per_slug_dir.join(format!("{}.json", algorithm.slug));
        write_atomic(&path, &to_json_pretty(algorithm)?)?;
    }
    debug!(count = algorithms.len(), "wrote per-slug artifacts");

    let minimal: Vec<MinimalAlgorithm> = algorithms.iter().map(|a| a.minimal()).collect();

    let metas = vec![
        write_atomic(&output_dir.join(ALGORITHMS_FILE), &to_json(&algorithms)?)?,
        write_atomic(&output_dir.join(ALGORITHMS_MIN_FILE), &to_json(&minimal)?)?,
        write_atomic(&output_dir.join(CATEGORIES_FILE), &to_json(categories)?)?,
        write_atomic(&output_dir.join(LANGUAGES_FILE), &to_json(languages)?)?,
    ];

    info!(
        algorithms = algorithms.len(),
        categories = categories.len(),
        languages = languages.len(),
        "catalog artifacts written"
    );

    Ok(metas)
}

/// Write `manifest.json`. Called after [`write_catalog`] so the manifest only
/// exists alongside a complete set of artifacts.
pub fn write_manifest(output_dir: &Path, manifest: &BuildManifest) -> Result<ArtifactMeta> {
    let meta = write_atomic(&output_dir.join(MANIFEST_FILE), &to_json_pretty(manifest)?)?;
    debug!(run_id = %manifest.run_id, "manifest written");
    Ok(meta)
}

/// Write `content` to `path` via a sibling temp file and rename.
fn write_atomic(path: &Path, content: &str) -> Result<ArtifactMeta> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CatalogError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| CatalogError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| CatalogError::io(path, e))?;

    let sha256 = format!("{:x}", Sha256::digest(content.as_bytes()));
    debug!(file = %filename, size = content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        filename,
        sha256,
        size_bytes: content.len(),
    })
}

fn to_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|e| CatalogError::Serialize(format!("JSON serialization failed: {e}")))
}

fn to_json_pretty<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| CatalogError::Serialize(format!("JSON serialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use algocatalog_shared::{
        CURRENT_SCHEMA_VERSION, Implementation, RunId, SourceReport, SourceStatus,
    };
    use indexmap::{IndexMap, IndexSet};
    use tempfile::TempDir;

    use super::*;

    fn algorithm(name: &str, slug: &str, category: &str) -> Algorithm {
        Algorithm {
            slug: slug.into(),
            name: name.into(),
            categories: vec![category.into()],
            body: BTreeMap::from([("en".to_string(), format!("<p>{name}</p>\n"))]),
            implementations: IndexMap::from([(
                "python".to_string(),
                Implementation {
                    dir: format!("sorts/{slug}.py"),
                    url: format!("https://example.com/tree/master/sorts/{slug}.py"),
                    code: "<pre><code>pass\n</code></pre>\n".into(),
                },
            )]),
        }
    }

    fn fixture() -> (Vec<Algorithm>, SlugIndex, SlugIndex) {
        let algorithms = vec![
            algorithm("Bubble Sort", "bubble-sort", "Sorts"),
            algorithm("Quick Sort", "quick-sort", "Sorts"),
        ];
        let slugs: IndexSet<String> = ["bubble-sort".to_string(), "quick-sort".to_string()].into();
        let categories = IndexMap::from([("sorts".to_string(), slugs.clone())]);
        let languages = IndexMap::from([("python".to_string(), slugs)]);
        (algorithms, categories, languages)
    }

    fn read(dir: &Path, file: &str) -> String {
        std::fs::read_to_string(dir.join(file)).unwrap()
    }

    #[test]
    fn writes_all_artifacts() {
        let td = TempDir::new().unwrap();
        let (algorithms, categories, languages) = fixture();
        let refs: Vec<&Algorithm> = algorithms.iter().collect();

        let metas = write_catalog(td.path(), &refs, &categories, &languages).unwrap();

        let names: Vec<&str> = metas.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![ALGORITHMS_FILE, ALGORITHMS_MIN_FILE, CATEGORIES_FILE, LANGUAGES_FILE]
        );
        assert!(metas.iter().all(|m| m.sha256.len() == 64));
        assert!(td.path().join("algorithms/bubble-sort.json").exists());
        assert!(td.path().join("algorithms/quick-sort.json").exists());

        let per_slug: Algorithm =
            serde_json::from_str(&read(td.path(), "algorithms/quick-sort.json")).unwrap();
        assert_eq!(per_slug, algorithms[1]);

        assert_eq!(
            read(td.path(), CATEGORIES_FILE),
            r#"{"sorts":["bubble-sort","quick-sort"]}"#
        );

        // No temp files left behind.
        let leftovers = std::fs::read_dir(td.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn minimal_listing_has_no_bodies() {
        let td = TempDir::new().unwrap();
        let (algorithms, categories, languages) = fixture();
        let refs: Vec<&Algorithm> = algorithms.iter().collect();
        write_catalog(td.path(), &refs, &categories, &languages).unwrap();

        let min: serde_json::Value =
            serde_json::from_str(&read(td.path(), ALGORITHMS_MIN_FILE)).unwrap();
        assert_eq!(
            min,
            serde_json::json!([
                {"name": "Bubble Sort", "slug": "bubble-sort", "categories": ["Sorts"]},
                {"name": "Quick Sort", "slug": "quick-sort", "categories": ["Sorts"]}
            ])
        );
    }

    #[test]
    fn rewrite_is_byte_identical_and_drops_stale_slugs() {
        let td = TempDir::new().unwrap();
        let (algorithms, categories, languages) = fixture();
        let refs: Vec<&Algorithm> = algorithms.iter().collect();

        std::fs::create_dir_all(td.path().join(ALGORITHMS_DIR)).unwrap();
        std::fs::write(td.path().join("algorithms/removed.json"), "{}").unwrap();

        let first = write_catalog(td.path(), &refs, &categories, &languages).unwrap();
        let full = read(td.path(), ALGORITHMS_FILE);
        let second = write_catalog(td.path(), &refs, &categories, &languages).unwrap();

        assert_eq!(read(td.path(), ALGORITHMS_FILE), full);
        let first_hashes: Vec<&str> = first.iter().map(|m| m.sha256.as_str()).collect();
        let second_hashes: Vec<&str> = second.iter().map(|m| m.sha256.as_str()).collect();
        assert_eq!(first_hashes, second_hashes);
        assert!(!td.path().join("algorithms/removed.json").exists());
    }

    #[test]
    fn empty_catalog_writes_empty_aggregates() {
        let td = TempDir::new().unwrap();
        write_catalog(td.path(), &[], &SlugIndex::new(), &SlugIndex::new()).unwrap();

        assert_eq!(read(td.path(), ALGORITHMS_FILE), "[]");
        assert_eq!(read(td.path(), LANGUAGES_FILE), "{}");
        assert!(td.path().join(ALGORITHMS_DIR).is_dir());
    }

    #[test]
    fn manifest_roundtrips() {
        let td = TempDir::new().unwrap();
        let manifest = BuildManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: RunId::new(),
            tool_version: "0.1.0-test".into(),
            generated_at: chrono::Utc::now(),
            algorithm_count: 2,
            category_count: 1,
            language_count: 1,
            sources: vec![SourceReport {
                language: "go".into(),
                status: SourceStatus::Available,
                implementations: 2,
            }],
            artifacts: Vec::new(),
        };

        let meta = write_manifest(td.path(), &manifest).unwrap();
        assert_eq!(meta.filename, MANIFEST_FILE);

        let loaded: BuildManifest =
            serde_json::from_str(&read(td.path(), MANIFEST_FILE)).unwrap();
        assert_eq!(loaded.run_id, manifest.run_id);
        assert_eq!(loaded.sources.len(), 1);
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let td = TempDir::new().unwrap();
        let blocker = td.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_catalog(&blocker, &[], &SlugIndex::new(), &SlugIndex::new()).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
