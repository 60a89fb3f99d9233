//! Filesystem subscription backends.
//!
//! [`FsBackend`] is the seam between the watcher logic and the OS. The
//! production backend wraps `notify::RecommendedWatcher`; tests plug in a
//! scripted backend.

use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::timer::SessionId;

use super::WatchError;
use super::event::{RawKind, RawNotification};

/// Source of raw notifications for exactly one path per subscription.
pub trait FsBackend {
    /// Keeps the subscription alive; dropping or releasing it stops delivery.
    type Handle;

    /// Start delivering raw notifications for `path`, stamped with `session`.
    fn subscribe(&mut self, session: SessionId, path: &Path) -> Result<Self::Handle, WatchError>;

    /// Stop delivery for a subscription.
    fn release(&mut self, handle: Self::Handle);

    /// Whether `path` currently exists.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Backend built on `notify`, forwarding into a tokio channel.
#[derive(Debug)]
pub struct NotifyBackend {
    tx: mpsc::UnboundedSender<RawNotification>,
}

/// Live `notify` subscription.
pub struct NotifyHandle {
    _watcher: notify::RecommendedWatcher,
}

impl std::fmt::Debug for NotifyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NotifyHandle")
    }
}

impl NotifyBackend {
    /// Create the backend and the receiving end of its notification channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RawNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FsBackend for NotifyBackend {
    type Handle = NotifyHandle;

    fn subscribe(&mut self, session: SessionId, path: &Path) -> Result<NotifyHandle, WatchError> {
        let failed = |reason: String| WatchError::PathWatchFailed {
            path: path.to_path_buf(),
            reason,
        };

        let file_name = path
            .file_name()
            .ok_or_else(|| failed("path has no file name".to_string()))?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        // inotify drops a file watch when an editor saves via rename, so the
        // parent directory is watched and events are filtered by name.
        let parent = parent
            .canonicalize()
            .map_err(|e| failed(format!("cannot resolve parent directory: {e}")))?;
        let observed = parent.join(file_name);
        let reported = path.to_path_buf();

        let tx = self.tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            for raw in normalize(session, &observed, &reported, res) {
                let _ = tx.send(raw);
            }
        })?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| failed(e.to_string()))?;

        crate::debug_event!("watcher", "subscribed", "{} via {}", path.display(), parent.display());
        Ok(NotifyHandle { _watcher: watcher })
    }

    fn release(&mut self, handle: NotifyHandle) {
        drop(handle);
    }
}

/// Translate one `notify` callback into raw notifications for `observed`.
///
/// Events for other entries of the parent directory are dropped. Matching
/// notifications are reported under `reported`, the path the caller asked
/// to watch.
fn normalize(
    session: SessionId,
    observed: &Path,
    reported: &Path,
    res: notify::Result<Event>,
) -> Vec<RawNotification> {
    let raw = |kind| RawNotification::new(session, reported, kind);

    let event = match res {
        Ok(event) => event,
        Err(e) => return vec![raw(RawKind::Failed(e.to_string()))],
    };

    let hit = event.paths.iter().any(|p| p == observed);
    match event.kind {
        EventKind::Create(_) if hit => vec![raw(RawKind::Create)],
        EventKind::Remove(_) if hit => vec![raw(RawKind::Remove)],
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From if hit => vec![raw(RawKind::Remove)],
            RenameMode::To if hit => vec![raw(RawKind::Create)],
            RenameMode::Both => {
                let mut out = Vec::new();
                if event.paths.first().is_some_and(|p| p == observed) {
                    out.push(raw(RawKind::Remove));
                }
                if event.paths.get(1).is_some_and(|p| p == observed) {
                    out.push(raw(RawKind::Create));
                }
                out
            }
            // Platforms that cannot tell the direction of a rename.
            RenameMode::Any | RenameMode::Other if hit => {
                if observed.exists() {
                    vec![raw(RawKind::Create)]
                } else {
                    vec![raw(RawKind::Remove)]
                }
            }
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) | EventKind::Any if hit => vec![raw(RawKind::Write)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    const SESSION: SessionId = SessionId(7);

    fn observed() -> PathBuf {
        PathBuf::from("/docs/readme.md")
    }

    fn kinds(event: Event) -> Vec<RawKind> {
        normalize(SESSION, &observed(), Path::new("docs/readme.md"), Ok(event))
            .into_iter()
            .map(|raw| raw.kind)
            .collect()
    }

    #[test]
    fn test_data_write_is_write() {
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(observed());
        assert_eq!(kinds(event), vec![RawKind::Write]);
    }

    #[test]
    fn test_other_entries_are_ignored() {
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/docs/other.md"));
        assert!(kinds(event).is_empty());
    }

    #[test]
    fn test_create_and_remove() {
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(observed());
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(observed());
        assert_eq!(kinds(created), vec![RawKind::Create]);
        assert_eq!(kinds(removed), vec![RawKind::Remove]);
    }

    #[test]
    fn test_rename_over_target_is_create() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/docs/.readme.md.swp"))
            .add_path(observed());
        assert_eq!(kinds(event), vec![RawKind::Create]);
    }

    #[test]
    fn test_rename_away_is_remove() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(observed());
        assert_eq!(kinds(event), vec![RawKind::Remove]);
    }

    #[test]
    fn test_metadata_is_ignored() {
        let event = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)))
            .add_path(observed());
        assert!(kinds(event).is_empty());
    }

    #[test]
    fn test_reports_requested_path_and_session() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(observed());
        let raw = normalize(SESSION, &observed(), Path::new("docs/readme.md"), Ok(event));
        assert_eq!(
            raw,
            vec![RawNotification::new(SESSION, "docs/readme.md", RawKind::Write)]
        );
    }

    #[test]
    fn test_error_becomes_failed() {
        let raw = normalize(
            SESSION,
            &observed(),
            &observed(),
            Err(notify::Error::generic("queue overflow")),
        );
        assert_eq!(raw.len(), 1);
        assert!(matches!(raw[0].kind, RawKind::Failed(_)));
    }
}
