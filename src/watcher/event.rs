//! Raw notifications coming in and logical events going out.

use std::path::PathBuf;

use crate::timer::SessionId;

use super::WatchError;

/// Consumer-visible events emitted by a [`PathWatcher`](super::PathWatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watch is established.
    Ready(PathBuf),
    /// Debounced: the path was written and then stayed quiet for the window.
    Changed(PathBuf),
    /// The path reappeared after removal. Emitted immediately.
    Created(PathBuf),
    /// The path disappeared. Emitted immediately; the watch stays active.
    Removed(PathBuf),
    /// Underlying watch failure. Never terminates the watcher.
    Error(WatchError),
}

impl WatchEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::Changed(_) => "changed",
            Self::Created(_) => "created",
            Self::Removed(_) => "removed",
            Self::Error(_) => "error",
        }
    }
}

/// Normalised kind of a raw filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKind {
    Write,
    Create,
    Remove,
    /// The backend reported an error instead of an event.
    Failed(String),
}

/// One raw notification from an [`FsBackend`](super::FsBackend).
///
/// Stamped with the session that produced it so notifications delivered
/// after an `unwatch`/`retarget` can be recognised and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub session: SessionId,
    pub path: PathBuf,
    pub kind: RawKind,
}

impl RawNotification {
    pub fn new(session: SessionId, path: impl Into<PathBuf>, kind: RawKind) -> Self {
        Self {
            session,
            path: path.into(),
            kind,
        }
    }
}
