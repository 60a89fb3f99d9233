//! Single-path watcher with debounced change events.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::timer::{SessionId, TimerService, TimerToken};

use super::backend::FsBackend;
use super::debouncer::Debouncer;
use super::event::{RawKind, RawNotification, WatchEvent};
use super::WatchError;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Handle returned by [`PathWatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The active watch. Replaced wholesale on retarget, never mutated in place
/// to point somewhere else.
#[derive(Debug)]
struct WatchSession<H> {
    id: SessionId,
    target_path: PathBuf,
    debouncer: Debouncer,
    /// Whether the file existed at the last observation.
    present: bool,
    handle: H,
}

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(SubscriptionId, mpsc::UnboundedSender<WatchEvent>)>,
}

impl Subscribers {
    fn add(&mut self) -> (SubscriptionId, mpsc::UnboundedReceiver<WatchEvent>) {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push((id, tx));
        (id, rx)
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(sid, _)| *sid != id);
        self.senders.len() != before
    }

    fn emit(&mut self, event: WatchEvent) {
        self.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        crate::debug_event!(
            "watcher",
            "emit",
            "{} to {} subscribers",
            event.name(),
            self.senders.len()
        );
    }
}

/// Watches exactly one path and turns raw notifications into a clean,
/// rate-limited [`WatchEvent`] stream.
///
/// Invariant: at most one backend subscription and at most one pending
/// debounce timer exist at any time.
pub struct PathWatcher<B: FsBackend> {
    backend: B,
    debounce_window: Duration,
    session: Option<WatchSession<B::Handle>>,
    next_session: u64,
    subscribers: Subscribers,
}

impl<B: FsBackend> PathWatcher<B> {
    /// Create an idle watcher.
    pub fn new(backend: B, debounce_window: Duration) -> Self {
        Self {
            backend,
            debounce_window,
            session: None,
            next_session: 0,
            subscribers: Subscribers::default(),
        }
    }

    /// Subscribe to watch events.
    pub fn subscribe(&mut self) -> (SubscriptionId, mpsc::UnboundedReceiver<WatchEvent>) {
        self.subscribers.add()
    }

    /// Drop a subscription. Returns `false` if it was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Stop any existing watch and start observing `path`.
    ///
    /// Setup failures are reported as [`WatchEvent::Error`] and leave the
    /// watcher inert; nothing is retried.
    pub fn watch(&mut self, path: &Path, timers: &mut impl TimerService) {
        self.unwatch(timers);

        self.next_session += 1;
        let id = SessionId(self.next_session);
        match self.backend.subscribe(id, path) {
            Ok(handle) => {
                self.session = Some(WatchSession {
                    id,
                    target_path: path.to_path_buf(),
                    debouncer: Debouncer::new(id, self.debounce_window),
                    present: self.backend.exists(path),
                    handle,
                });
                crate::log_event!("watcher", "watching", "{} ({id})", path.display());
                self.subscribers.emit(WatchEvent::Ready(path.to_path_buf()));
            }
            Err(e) => {
                tracing::warn!("[watcher] cannot watch {}: {e}", path.display());
                self.subscribers.emit(WatchEvent::Error(e));
            }
        }
    }

    /// Switch to a new path. Same as `unwatch()` followed by `watch(path)`.
    pub fn retarget(&mut self, path: &Path, timers: &mut impl TimerService) {
        self.watch(path, timers);
    }

    /// Stop watching. Idempotent.
    pub fn unwatch(&mut self, timers: &mut impl TimerService) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.debouncer.cancel(timers);
        self.backend.release(session.handle);
        crate::log_event!("watcher", "stopped", "{}", session.target_path.display());
    }

    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.target_path.as_path())
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Feed one raw notification from the backend.
    pub fn handle_raw(&mut self, raw: RawNotification, timers: &mut impl TimerService) {
        let Some(session) = self.session.as_mut() else {
            crate::debug_event!("watcher", "dropped", "{:?} while not watching", raw.kind);
            return;
        };
        if raw.session != session.id || raw.path != session.target_path {
            crate::debug_event!(
                "watcher",
                "dropped",
                "{:?} {} from {}",
                raw.kind,
                raw.path.display(),
                raw.session
            );
            return;
        }

        match raw.kind {
            RawKind::Write => {
                session.present = true;
                session.debouncer.record(&raw.path, timers);
            }
            RawKind::Create => {
                if !session.present {
                    session.present = true;
                    self.subscribers.emit(WatchEvent::Created(raw.path.clone()));
                }
                // Deliver the new content as a `changed` event as well.
                session.debouncer.record(&raw.path, timers);
            }
            RawKind::Remove => {
                if session.present {
                    session.present = false;
                    session.debouncer.cancel(timers);
                    self.subscribers.emit(WatchEvent::Removed(raw.path));
                }
            }
            RawKind::Failed(details) => {
                tracing::warn!("[watcher] file watch error: {details}");
                self.subscribers
                    .emit(WatchEvent::Error(WatchError::EventError { details }));
            }
        }
    }

    /// Feed an expired timer. Returns `true` if it produced an event.
    pub fn handle_timer(&mut self, token: TimerToken) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.debouncer.fire(token) {
            Some(path) => {
                crate::debug_event!("watcher", "debounced", "{}", path.display());
                self.subscribers.emit(WatchEvent::Changed(path));
                true
            }
            None => false,
        }
    }
}
