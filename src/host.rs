//! Runtime wiring: one `select!` loop on a single-threaded runtime.
//!
//! Every wait is a resumption of this loop, never a blocking call:
//! raw notifications from `notify`, expired timers, messages from the
//! display process and shutdown.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::document::DocumentSource;
use crate::protocol::{HostMessage, InboundMessage};
use crate::reload::{ReloadCoordinator, Timing};
use crate::surface::RenderSurface;
use crate::timer::DelayQueueTimers;
use crate::watcher::{NotifyBackend, PathWatcher, RawNotification, WatchEvent};

/// Hosts a [`ReloadCoordinator`] on the tokio runtime.
pub struct Host<S, D>
where
    S: RenderSurface,
    D: DocumentSource,
{
    coordinator: ReloadCoordinator<NotifyBackend, S, D>,
    raw_rx: mpsc::UnboundedReceiver<RawNotification>,
    timers: DelayQueueTimers,
}

impl<S, D> Host<S, D>
where
    S: RenderSurface,
    D: DocumentSource,
{
    pub fn new(surface: S, source: D, timing: Timing) -> Self {
        let (backend, raw_rx) = NotifyBackend::new();
        Self {
            coordinator: ReloadCoordinator::new(backend, surface, source, timing),
            raw_rx,
            timers: DelayQueueTimers::new(),
        }
    }

    /// Open `path` and serve until the display disconnects or `shutdown`
    /// resolves.
    pub async fn run(
        mut self,
        path: &Path,
        mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        self.coordinator.open(path, &mut self.timers);

        loop {
            tokio::select! {
                Some(raw) = self.raw_rx.recv() => {
                    self.coordinator.handle_raw(raw, &mut self.timers);
                }
                Some(token) = self.timers.next_expired() => {
                    self.coordinator.handle_timer(token, &mut self.timers);
                }
                message = inbound.recv() => match message {
                    Some(message) => self.handle_inbound(message),
                    None => {
                        crate::log_event!("host", "display disconnected");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    crate::log_event!("host", "shutting down");
                    break;
                }
            }
        }

        self.coordinator.close(&mut self.timers);
    }

    fn handle_inbound(&mut self, message: InboundMessage) {
        if let Some(surface_message) = message.as_surface() {
            self.coordinator
                .handle_surface(surface_message, &mut self.timers);
            return;
        }
        if let InboundMessage::Open { path } = message {
            let path = std::path::absolute(&path).unwrap_or(path);
            self.coordinator.open(&path, &mut self.timers);
        }
    }
}

/// Watch `path` and hand every event to `on_event` until `shutdown`.
pub async fn watch_events(
    path: &Path,
    timing: Timing,
    shutdown: impl Future<Output = ()>,
    mut on_event: impl FnMut(&WatchEvent),
) {
    let (backend, mut raw_rx) = NotifyBackend::new();
    let mut watcher = PathWatcher::new(backend, timing.debounce_window);
    let (_, mut events) = watcher.subscribe();
    let mut timers = DelayQueueTimers::new();
    tokio::pin!(shutdown);

    watcher.watch(path, &mut timers);
    loop {
        while let Ok(event) = events.try_recv() {
            on_event(&event);
        }
        tokio::select! {
            Some(raw) = raw_rx.recv() => watcher.handle_raw(raw, &mut timers),
            Some(token) = timers.next_expired() => {
                watcher.handle_timer(token);
            }
            _ = &mut shutdown => break,
        }
    }
    watcher.unwatch(&mut timers);
}

/// Read inbound protocol lines from stdin. Malformed lines are skipped.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<InboundMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match InboundMessage::parse_line(&line) {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("[host] skipping malformed message: {e}"),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("[host] stdin read failed: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Write outbound protocol messages to stdout, one per line.
///
/// Finishes once every sender is dropped.
pub fn spawn_stdout_writer(mut rx: mpsc::UnboundedReceiver<HostMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = rx.recv().await {
            let mut line = match message.to_line() {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("[host] cannot encode message: {e}");
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                tracing::error!("[host] stdout write failed: {e}");
                break;
            }
            if let Err(e) = stdout.flush().await {
                tracing::error!("[host] stdout flush failed: {e}");
                break;
            }
        }
    })
}

/// Resolve a user-supplied path to an absolute one that exists.
pub fn resolve_document_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    if !absolute.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}
