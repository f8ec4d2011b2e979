//! Name and category normalization.
//!
//! Every source repository spells the same algorithm differently
//! (`binary_search.py`, `BinarySearch.java`, `[Binary Search](...)`). These pure
//! functions map such spellings onto stable keys and slugs, so results depend
//! only on the input text and never on which repository produced it.

use heck::ToTitleCase;

/// Merge key: lower-cased, with every non-alphanumeric character removed.
pub fn normalize_strong(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Slug: lower-cased, runs of non-alphanumerics collapsed to one `-`, no edge hyphens.
pub fn normalize_weak(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Display name: identifier or snake-case text to Title Case.
pub fn normalize_title(raw: &str) -> String {
    raw.to_title_case()
}

/// Category-index key.
pub fn normalize_category(raw: &str) -> String {
    normalize_strong(raw)
}
