//! Loading and converting the watched document.
//!
//! Markdown conversion, highlighting and diagrams belong to the display
//! side. The host only needs something that turns a path into markup.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Boxed error returned by renderers.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// A document ready to hand to the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Shown as the window title.
    pub title: String,
    pub markup: String,
}

/// The updated document could not be read or converted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentLoadError {
    #[error("Cannot read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Cannot convert {path}: {reason}")]
    Convert { path: PathBuf, reason: String },
}

/// Turns document source text into display markup.
pub trait MarkupRenderer {
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

/// Loads a document by path.
pub trait DocumentSource {
    fn load(&self, path: &Path) -> Result<RenderedDocument, ContentLoadError>;
}

/// Reads UTF-8 files from disk and converts them with `R`.
#[derive(Debug, Clone, Default)]
pub struct FileDocumentSource<R> {
    renderer: R,
}

impl<R: MarkupRenderer> FileDocumentSource<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }
}

impl<R: MarkupRenderer> DocumentSource for FileDocumentSource<R> {
    fn load(&self, path: &Path) -> Result<RenderedDocument, ContentLoadError> {
        let source = std::fs::read_to_string(path).map_err(|e| ContentLoadError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let markup = self
            .renderer
            .render(&source)
            .map_err(|e| ContentLoadError::Convert {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(RenderedDocument {
            title: document_title(path),
            markup,
        })
    }
}

/// Window title for `path`: its base name.
pub fn document_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Escapes the source into a `<pre>` block.
///
/// Used when the display process does its own markdown conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreformattedRenderer;

impl MarkupRenderer for PreformattedRenderer {
    fn render(&self, source: &str) -> Result<String, RenderError> {
        let mut out = String::with_capacity(source.len() + 48);
        out.push_str("<pre class=\"marklive-source\">");
        for ch in source.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(ch),
            }
        }
        out.push_str("</pre>");
        Ok(out)
    }
}
