//! Source code → presentational HTML.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd, html};

/// Converts raw source text into its presentational form.
///
/// Implementations must be deterministic: the same source and language
/// always produce the same output.
pub trait CodeRenderer: Send + Sync {
    /// Render `source` written in the language tagged `language`.
    fn render(&self, source: &str, language: &str) -> String;
}

/// Renders code as an escaped `<pre><code class="language-…">` block.
///
/// Highlighting itself is left to the presentation layer, keyed off the
/// `language-*` class.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlCodeRenderer;

impl CodeRenderer for HtmlCodeRenderer {
    fn render(&self, source: &str, language: &str) -> String {
        code_block(source, Some(language))
    }
}

/// Emit a single HTML code block through the CommonMark HTML writer.
pub(crate) fn code_block(text: &str, language: Option<&str>) -> String {
    let kind = match language.map(str::trim) {
        Some(lang) if !lang.is_empty() => CodeBlockKind::Fenced(CowStr::from(lang)),
        _ => CodeBlockKind::Indented,
    };
    let events = [
        Event::Start(Tag::CodeBlock(kind)),
        Event::Text(CowStr::from(text)),
        Event::End(TagEnd::CodeBlock),
    ];

    let mut out = String::with_capacity(text.len() + 48);
    html::push_html(&mut out, events.into_iter());
    out
}
