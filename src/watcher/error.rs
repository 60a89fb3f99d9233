//! Error types for the path watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
///
/// These never cross the event boundary as faults: the watcher reports
/// them as [`WatchEvent::Error`](super::WatchEvent::Error). They are
/// `Clone` so every subscriber gets its own copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
