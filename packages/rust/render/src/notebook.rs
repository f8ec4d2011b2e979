//! Jupyter notebook (nbformat 4) → HTML.
//!
//! Markdown cells go through [`render_markdown`], code cells through the
//! supplied [`CodeRenderer`], and outputs are rendered from their richest
//! supported MIME type.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use algocatalog_shared::{CatalogError, Result};

use crate::code::{CodeRenderer, code_block};
use crate::markdown::render_markdown;

/// ANSI color escapes found in error tracebacks.
static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("ansi regex"));

// ---------------------------------------------------------------------------
// nbformat schema (the subset we render)
// ---------------------------------------------------------------------------

/// Notebook text fields are either one string or a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineText {
    One(String),
    Lines(Vec<String>),
}

impl MultilineText {
    fn joined(&self) -> String {
        match self {
            Self::One(s) => s.clone(),
            Self::Lines(lines) => lines.concat(),
        }
    }
}

impl Default for MultilineText {
    fn default() -> Self {
        Self::One(String::new())
    }
}

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
    #[serde(default)]
    metadata: NotebookMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NotebookMetadata {
    #[serde(default)]
    kernelspec: Option<KernelSpec>,
    #[serde(default)]
    language_info: Option<LanguageInfo>,
}

#[derive(Debug, Deserialize)]
struct KernelSpec {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cell_type", rename_all = "snake_case")]
enum Cell {
    Markdown {
        #[serde(default)]
        source: MultilineText,
    },
    Code {
        #[serde(default)]
        source: MultilineText,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum Output {
    Stream {
        #[serde(default)]
        text: MultilineText,
    },
    ExecuteResult {
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
    DisplayData {
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
    Error {
        #[serde(default)]
        traceback: Vec<String>,
    },
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a notebook document to HTML.
///
/// `fallback_language` tags code cells when the notebook metadata names no
/// kernel language. Malformed JSON or an unsupported structure is an error.
pub fn render_notebook(
    json: &str,
    code: &dyn CodeRenderer,
    fallback_language: &str,
) -> Result<String> {
    let notebook: Notebook = serde_json::from_str(json)
        .map_err(|e| CatalogError::parse(format!("invalid notebook: {e}")))?;

    let language = notebook
        .metadata
        .kernelspec
        .and_then(|k| k.language)
        .or_else(|| notebook.metadata.language_info.and_then(|l| l.name))
        .unwrap_or_else(|| fallback_language.to_string());

    let mut html = String::from("<div class=\"notebook\">\n");
    for cell in &notebook.cells {
        match cell {
            Cell::Markdown { source } => {
                html.push_str("<div class=\"cell markdown\">\n");
                html.push_str(&render_markdown(&source.joined()));
                html.push_str("</div>\n");
            }
            Cell::Code { source, outputs } => {
                html.push_str("<div class=\"cell code\">\n<div class=\"input\">\n");
                html.push_str(&code.render(&source.joined(), &language));
                html.push_str("</div>\n");
                let rendered: String = outputs.iter().filter_map(render_output).collect();
                if !rendered.is_empty() {
                    html.push_str("<div class=\"output\">\n");
                    html.push_str(&rendered);
                    html.push_str("</div>\n");
                }
                html.push_str("</div>\n");
            }
            Cell::Other => {}
        }
    }
    html.push_str("</div>\n");

    debug!(cells = notebook.cells.len(), %language, bytes = html.len(), "notebook rendered");
    Ok(html)
}

fn render_output(output: &Output) -> Option<String> {
    match output {
        Output::Stream { text } => Some(code_block(&text.joined(), None)),
        Output::ExecuteResult { data } | Output::DisplayData { data } => render_mime_bundle(data),
        Output::Error { traceback } => {
            let text = ANSI_RE.replace_all(&traceback.join("\n"), "").into_owned();
            Some(code_block(&text, None))
        }
        Output::Other => None,
    }
}

/// Render the richest supported representation of a MIME bundle.
fn render_mime_bundle(data: &BTreeMap<String, Value>) -> Option<String> {
    if let Some(html) = data.get("text/html").and_then(value_text) {
        return Some(format!("<div class=\"output-html\">{html}</div>\n"));
    }
    for mime in ["image/png", "image/jpeg", "image/gif"] {
        if let Some(b64) = data.get(mime).and_then(value_text) {
            let b64: String = b64.chars().filter(|c| !c.is_whitespace()).collect();
            return Some(format!("<img src=\"data:{mime};base64,{b64}\" />\n"));
        }
    }
    if let Some(svg) = data.get("image/svg+xml").and_then(value_text) {
        return Some(format!("<div class=\"output-svg\">{svg}</div>\n"));
    }
    if let Some(md) = data.get("text/markdown").and_then(value_text) {
        return Some(render_markdown(&md));
    }
    data.get("text/plain")
        .and_then(value_text)
        .map(|text| code_block(&text, None))
}

/// Text of a MIME-bundle value stored as a string or a list of lines.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|lines| lines.concat()),
        _ => None,
    }
}
