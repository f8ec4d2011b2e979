//! Core domain types for the algorithm catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the build manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Ordered key → slugs index, used for both the category and the language index.
pub type SlugIndex = IndexMap<String, IndexSet<String>>;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// One language's concrete source artifact for an algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Path of the source file relative to its repository root.
    pub dir: String,
    /// Canonical URL of the source on its origin host.
    pub url: String,
    /// Rendered code.
    pub code: String,
}

/// The unit of the catalog, persisted as `algorithms/<slug>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    /// URL-safe identifier derived from `name`.
    pub slug: String,
    /// Canonical display name (first registration wins).
    pub name: String,
    /// Category display names, in first-seen order.
    pub categories: Vec<String>,
    /// Rendered HTML explanation per locale.
    pub body: BTreeMap<String, String>,
    /// Implementation per language identifier, in discovery order.
    pub implementations: IndexMap<String, Implementation>,
}

impl Algorithm {
    /// Project to the lightweight listing/search shape.
    pub fn minimal(&self) -> MinimalAlgorithm {
        MinimalAlgorithm {
            name: self.name.clone(),
            slug: self.slug.clone(),
            categories: self.categories.clone(),
        }
    }
}

/// Minimal projection written to `algorithms-min.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalAlgorithm {
    pub name: String,
    pub slug: String,
    pub categories: Vec<String>,
}

// ---------------------------------------------------------------------------
// Source status
// ---------------------------------------------------------------------------

/// Outcome of acquiring one source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source was cloned or fetched into the workspace.
    Available,
    /// The source could not be acquired; its language contributes nothing.
    Unavailable { reason: String },
}

impl SourceStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Per-source line of the build manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    /// Language identifier (or `explanations` for the prose repository).
    pub language: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    /// Number of implementations this source contributed.
    pub implementations: usize,
}

// ---------------------------------------------------------------------------
// BuildManifest
// ---------------------------------------------------------------------------

/// Checksum metadata for a single written aggregate artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// The `manifest.json` written next to the catalog artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Identifier of the run that produced this output.
    pub run_id: RunId,
    /// Tool version that built the catalog.
    pub tool_version: String,
    /// When the catalog was written.
    pub generated_at: DateTime<Utc>,
    pub algorithm_count: usize,
    pub category_count: usize,
    pub language_count: usize,
    /// Acquisition outcome of every configured source.
    pub sources: Vec<SourceReport>,
    /// Aggregate artifacts with checksums.
    pub artifacts: Vec<ArtifactMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Algorithm {
        let mut implementations = IndexMap::new();
        implementations.insert(
            "python".to_string(),
            Implementation {
                dir: "sorts/bubble_sort.py".into(),
                url: "https://github.com/TheAlgorithms/Python/tree/master/sorts/bubble_sort.py"
                    .into(),
                code: "<pre><code>def bubble_sort(): ...</code></pre>".into(),
            },
        );
        Algorithm {
            slug: "bubble-sort".into(),
            name: "Bubble Sort".into(),
            categories: vec!["Sorts".into()],
            body: BTreeMap::from([("en".to_string(), "<p>Swap.</p>".to_string())]),
            implementations,
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn algorithm_field_order_matches_artifact_shape() {
        let json = serde_json::to_string(&sample()).expect("serialize");
        let slug = json.find("\"slug\"").unwrap();
        let name = json.find("\"name\"").unwrap();
        let implementations = json.find("\"implementations\"").unwrap();
        assert!(slug < name && name < implementations);
    }

    #[test]
    fn minimal_projection_strips_bodies_and_code() {
        let min = sample().minimal();
        let json = serde_json::to_value(&min).expect("serialize");
        assert_eq!(json["slug"], "bubble-sort");
        assert!(json.get("body").is_none());
        assert!(json.get("implementations").is_none());
    }

    #[test]
    fn source_status_serializes_flat() {
        let report = SourceReport {
            language: "go".into(),
            status: SourceStatus::Unavailable {
                reason: "clone failed".into(),
            },
            implementations: 0,
        };
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "clone failed");
        assert_eq!(json["language"], "go");
    }
}
