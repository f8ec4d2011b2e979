//! HTML rendering for catalog bodies.
//!
//! Explanations are CommonMark, implementations are source code, and some
//! algorithms are Jupyter notebooks. Each has a renderer here; all output is
//! deterministic for a given input.

mod code;
mod markdown;
mod notebook;

pub use code::{CodeRenderer, HtmlCodeRenderer};
pub use markdown::render_markdown;
pub use notebook::render_notebook;
