//! The consumed rendering capability boundary.
//!
//! # Responsibilities
//! - Define the interface a template engine must satisfy
//! - Stay opaque: the toolkit assumes only that fragments arrive in order,
//!   the sequence is eventually finite, and production may fail
//!
//! A renderer turns a template source plus a data object into a lazy,
//! ordered sequence of text fragments. The dispatcher pulls that sequence
//! under flow control and writes each fragment as an HTTP chunk.

use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// A lazy, ordered, eventually finite sequence of rendered text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Bytes, RenderError>> + Send + 'static>>;

/// Failure raised by a rendering capability.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template source could not be understood. Raised before any
    /// fragment is produced, so the response can still carry an error status.
    #[error("template parse error: {0}")]
    Parse(String),

    /// Fragment production failed after rendering began.
    #[error("render failed: {0}")]
    Render(String),

    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// External component turning a template source and a data object into an
/// ordered fragment sequence.
///
/// Swappable by design: handlers pick the renderer per response through
/// [`Template`], and the toolkit never looks past this trait.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str, data: &serde_json::Value)
        -> Result<FragmentStream, RenderError>;
}

/// A template reference: the template source text plus the rendering
/// capability that understands it.
#[derive(Clone)]
pub struct Template {
    source: String,
    reader: Arc<dyn Renderer>,
}

impl Template {
    pub fn new(source: impl Into<String>, reader: Arc<dyn Renderer>) -> Self {
        Self {
            source: source.into(),
            reader,
        }
    }

    /// The template source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render this template with `data`, producing the fragment stream.
    pub fn render(&self, data: &serde_json::Value) -> Result<FragmentStream, RenderError> {
        self.reader.render(&self.source, data)
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
