//! Document engine capability interface.
//!
//! The pipeline never parses documents itself. It drives an engine through
//! the operations below and owns the resulting session handle for exactly
//! one file at a time.
//!
//! # Implementations
//!
//! - [`PdfEngine`]: splits PDF files page by page using `lopdf`, naming
//!   each page from its page label.

mod page_labels;
mod pdf;

pub use page_labels::{LabelStyle, PageLabelRange, PageLabels};
pub use pdf::{PdfEngine, PdfSession};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a document engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cannot open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("Engine query '{operation}' failed: {reason}")]
    Query {
        operation: &'static str,
        reason: String,
    },

    #[error("Cannot extract section {index} to {}: {reason}", .destination.display())]
    Extract {
        index: usize,
        destination: PathBuf,
        reason: String,
    },
}

/// Capability interface the pipeline consumes.
///
/// Exactly one session is open at a time; the pipeline closes a session
/// before opening the next one.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Handle to one opened document.
    type Session: Send + Sync;

    /// Engine name for logging.
    fn name(&self) -> &str;

    /// Start opening a document. May return before the document is usable;
    /// callers poll [`DocumentEngine::is_ready`].
    async fn open(&self, path: &Path) -> Result<Self::Session, EngineError>;

    /// Whether an opened session is valid for queries.
    async fn is_ready(&self, session: &Self::Session) -> bool;

    /// Logical document name with the extension stripped.
    fn document_name(&self, session: &Self::Session) -> Result<String, EngineError>;

    /// Number of sections in the document.
    fn section_count(&self, session: &Self::Session) -> Result<usize, EngineError>;

    /// Raw label of the section at `index` (0-based).
    fn section_label(&self, session: &Self::Session, index: usize) -> Result<String, EngineError>;

    /// Write section `index` as a standalone document at `destination`.
    async fn extract_section(
        &self,
        session: &Self::Session,
        index: usize,
        destination: &Path,
    ) -> Result<(), EngineError>;

    /// Release the session. `commit` is true when the document was fully
    /// processed, false when it was abandoned.
    async fn close(&self, session: Self::Session, commit: bool);
}
