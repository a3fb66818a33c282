//! Error types for the inbox watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations. All of them stop the dispatcher.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {}: {reason}", .path.display())]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Watch event error: {reason}")]
    EventError { reason: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
