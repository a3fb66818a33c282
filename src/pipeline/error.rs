//! Error types for per-file processing.
//!
//! Every variant is file-local: the dispatcher reports it and moves on to
//! the next file.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::engine::EngineError;

/// Errors that end processing of one file before export starts.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Any I/O failure other than a sharing violation. Never retried.
    #[error("Cannot access {}: {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} still locked after {waited:?}", .path.display())]
    ReadinessTimeout { path: PathBuf, waited: Duration },

    #[error("Engine cannot open document: {0}")]
    Open(#[source] EngineError),

    #[error("Engine did not finish opening {} within {waited:?}", .path.display())]
    OpenTimeout { path: PathBuf, waited: Duration },

    #[error("Shutdown requested before processing started")]
    Cancelled,
}

impl PipelineError {
    /// Whether the engine was the reason the file was given up.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Open(_) | PipelineError::OpenTimeout { .. }
        )
    }
}
