//! Nested-bullet directory listing parser.
//!
//! Parses the `DIRECTORY.md` format some repositories publish instead of a
//! browsable tree:
//! - `## Section` resets the category path to a single top-level category
//! - `  * Label` (no link) names the category at that indentation depth
//! - `    * [Name](path/File.ext)` is a leaf entry under the categories in scope
//!
//! Depth is the number of leading indentation groups, where one group is either
//! two spaces or one tab, so space- and tab-indented listings parse alike.
//! Unindented bullets sit outside the category tree and are ignored.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed representation of a directory listing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListingParsed {
    /// Section titles (from `##` headings), in document order.
    pub sections: Vec<String>,
    /// All leaf entries, in document order.
    pub entries: Vec<ListingEntry>,
}

/// A single linked file in the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    /// Category path in scope when the entry was read, outermost first.
    pub categories: Vec<String>,
    /// Display name of the link.
    pub name: String,
    /// Link target.
    pub url: String,
    /// Last path segment of the link target.
    pub file_name: String,
}

impl ListingEntry {
    /// File name without its extension.
    pub fn file_stem(&self) -> &str {
        self.file_name
            .split_once('.')
            .map_or(self.file_name.as_str(), |(stem, _)| stem)
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `## Section Title`.
static H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s+(.+)$").expect("H2 regex"));

/// Matches `[Name](url)` at the start of a bullet body, where the link's last
/// path segment is a file name with an extension.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\]\(([^)\s]*/[^/)\s]*\.[^/)\s]+)\)").expect("link regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a directory listing into categorized entries.
///
/// Never fails: lines that are neither headings nor indented bullets are
/// ignored, and a bullet whose body is not a file link (a plain label or a link
/// to a directory) is taken as a category label.
pub fn parse_listing(content: &str) -> ListingParsed {
    let mut parsed = ListingParsed::default();
    // Slot `d` holds the category label at depth `d`; `None` marks a hole.
    let mut stack: Vec<Option<String>> = Vec::new();

    for line in content.lines() {
        let line = line.trim_end();

        if let Some(caps) = H2_RE.captures(line) {
            let title = caps[1].trim().to_string();
            stack = vec![Some(title.clone())];
            parsed.sections.push(title);
            continue;
        }

        let Some((depth, body)) = bullet(line) else {
            continue;
        };
        if depth == 0 {
            continue;
        }

        stack.resize(depth, None);

        match LINK_RE.captures(body) {
            Some(caps) => {
                let url = caps[2].trim().to_string();
                parsed.entries.push(ListingEntry {
                    categories: stack.iter().flatten().cloned().collect(),
                    name: caps[1].trim().to_string(),
                    file_name: last_segment(&url),
                    url,
                });
            }
            None => {
                let label = body.trim();
                stack.push((!label.is_empty()).then(|| label.to_string()));
            }
        }
    }

    parsed
}

/// Split a bullet line into its structural depth and the text after the marker.
///
/// Returns `None` for anything that is not an indented `*`/`-` bullet.
fn bullet(line: &str) -> Option<(usize, &str)> {
    let mut depth = 0;
    let mut rest = line;

    loop {
        if let Some(r) = rest.strip_prefix('\t') {
            rest = r;
        } else if let Some(r) = rest.strip_prefix("  ") {
            rest = r;
        } else {
            break;
        }
        depth += 1;
    }

    let body = rest.strip_prefix('*').or_else(|| rest.strip_prefix('-'))?;
    if !body.is_empty() && !body.starts_with(char::is_whitespace) {
        return None;
    }
    Some((depth, body.trim_start()))
}

/// Last non-empty path segment of a URL (or of a relative link).
fn last_segment(link: &str) -> String {
    let from_url = Url::parse(link).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(String::from))
    });

    from_url.unwrap_or_else(|| {
        link.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(link)
            .to_string()
    })
}
