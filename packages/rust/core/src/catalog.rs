//! The in-memory catalog built during one run.
//!
//! [`Catalog`] owns the algorithm table and both slug indexes. It is mutated
//! only by the pipeline's single owner task and serialized once at the end.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use algocatalog_shared::normalize::{normalize_category, normalize_weak};
use algocatalog_shared::{Algorithm, Implementation, SlugIndex};

/// What [`Catalog::register_implementation`] did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new algorithm was created under this slug.
    Created { slug: String },
    /// The implementation was added to an existing algorithm.
    Merged { slug: String },
    /// The record was dropped (empty key, empty slug or a slug owned by another key).
    Rejected { reason: String },
}

impl Registration {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// Algorithms keyed by strong-normalized name, plus the category and language indexes.
#[derive(Debug, Default)]
pub struct Catalog {
    algorithms: IndexMap<String, Algorithm>,
    categories: SlugIndex,
    languages: SlugIndex,
    /// slug → owning key
    slugs: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an implementation of the algorithm with merge key `key`.
    ///
    /// The first registration of a key fixes the algorithm's name, slug and
    /// categories. Later registrations only set `implementations[language]`
    /// (last writer wins) and add the slug to the language index.
    pub fn register_implementation(
        &mut self,
        key: &str,
        language: &str,
        implementation: Implementation,
        categories: &[String],
        display_name: &str,
    ) -> Registration {
        if key.is_empty() {
            return Registration::Rejected {
                reason: format!("'{display_name}' has an empty merge key"),
            };
        }

        let created = if self.algorithms.contains_key(key) {
            false
        } else {
            let slug = normalize_weak(display_name);
            if slug.is_empty() {
                return Registration::Rejected {
                    reason: format!("'{display_name}' has an empty slug"),
                };
            }
            if let Some(owner) = self.slugs.get(&slug) {
                warn!(%slug, key, owner = %owner, "slug already taken, dropping implementation");
                return Registration::Rejected {
                    reason: format!("slug '{slug}' already belongs to '{owner}'"),
                };
            }

            for category in categories {
                let category_key = normalize_category(category);
                if category_key.is_empty() {
                    continue;
                }
                self.categories
                    .entry(category_key)
                    .or_default()
                    .insert(slug.clone());
            }

            self.slugs.insert(slug.clone(), key.to_string());
            self.algorithms.insert(
                key.to_string(),
                Algorithm {
                    slug,
                    name: display_name.to_string(),
                    categories: categories.to_vec(),
                    body: Default::default(),
                    implementations: IndexMap::new(),
                },
            );
            true
        };

        let Some(algorithm) = self.algorithms.get_mut(key) else {
            return Registration::Rejected {
                reason: format!("'{key}' vanished during registration"),
            };
        };
        algorithm
            .implementations
            .insert(language.to_string(), implementation);
        self.languages
            .entry(language.to_string())
            .or_default()
            .insert(algorithm.slug.clone());

        let slug = algorithm.slug.clone();
        if created {
            debug!(%slug, language, "algorithm created");
            Registration::Created { slug }
        } else {
            Registration::Merged { slug }
        }
    }

    /// Set the prose body of `key` for `locale`. Unknown keys are ignored.
    /// Returns whether the explanation was attached.
    pub fn merge_explanation(&mut self, key: &str, locale: &str, html: String) -> bool {
        match self.algorithms.get_mut(key) {
            Some(algorithm) => {
                algorithm.body.insert(locale.to_string(), html);
                true
            }
            None => false,
        }
    }

    /// Append a rendered notebook to the body of `key` in every locale,
    /// newline separated, or set the body where a locale has none yet.
    pub fn merge_notebook(&mut self, key: &str, html: &str, locales: &[String]) -> bool {
        let Some(algorithm) = self.algorithms.get_mut(key) else {
            return false;
        };
        for locale in locales {
            algorithm
                .body
                .entry(locale.clone())
                .and_modify(|body| {
                    body.push('\n');
                    body.push_str(html);
                })
                .or_insert_with(|| html.to_string());
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.algorithms.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Algorithm> {
        self.algorithms.get(key)
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Snapshot of the known merge keys, for matching explanations off-thread.
    pub fn keys(&self) -> HashSet<String> {
        self.algorithms.keys().cloned().collect()
    }

    /// Algorithms in first-registration order.
    pub fn algorithms(&self) -> impl Iterator<Item = &Algorithm> {
        self.algorithms.values()
    }

    /// `(merge key, algorithm)` pairs in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Algorithm)> {
        self.algorithms.iter().map(|(k, a)| (k.as_str(), a))
    }

    pub fn categories(&self) -> &SlugIndex {
        &self.categories
    }

    pub fn languages(&self) -> &SlugIndex {
        &self.languages
    }

    /// Slugs with an implementation in `language`.
    pub fn language_slugs(&self, language: &str) -> Option<&IndexSet<String>> {
        self.languages.get(language)
    }
}
