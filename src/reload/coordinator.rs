//! Drives the save -> reload -> restore handshake.

use std::mem;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::document::{DocumentSource, document_title};
use crate::surface::{Notice, RenderSurface, SurfaceMessage};
use crate::timer::{CycleId, TimerService, TimerToken};
use crate::watcher::{
    DEFAULT_DEBOUNCE_MS, FsBackend, PathWatcher, RawNotification, SubscriptionId, WatchEvent,
};

use super::state::{AbortReason, CycleOutcome, Phase, ReloadState};

/// Default wait for the surface's content-ready signal.
pub const DEFAULT_CONTENT_READY_TIMEOUT_MS: u64 = 2000;

/// The two timing knobs of the subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce_window: Duration,
    pub content_ready_timeout: Duration,
}

impl Timing {
    pub fn from_millis(debounce_ms: u64, content_ready_timeout_ms: u64) -> Self {
        Self {
            debounce_window: Duration::from_millis(debounce_ms),
            content_ready_timeout: Duration::from_millis(content_ready_timeout_ms),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_millis(DEFAULT_DEBOUNCE_MS, DEFAULT_CONTENT_READY_TIMEOUT_MS)
    }
}

/// Owns the watch session and the reload state machine.
///
/// ```text
/// Idle --changed--> AwaitingScrollSave --offset--> Reloading
///   ^                                                 |
///   +--content ready / timeout-- AwaitingContentReady-+
/// ```
///
/// All entry points run to completion; a phase transition is either fully
/// applied or fully aborted before the next input is processed.
pub struct ReloadCoordinator<B: FsBackend, S, D> {
    watcher: PathWatcher<B>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    subscription: SubscriptionId,
    surface: S,
    source: D,
    content_ready_timeout: Duration,
    state: ReloadState,
    next_cycle: u64,
    last_outcome: Option<CycleOutcome>,
}

impl<B, S, D> ReloadCoordinator<B, S, D>
where
    B: FsBackend,
    S: RenderSurface,
    D: DocumentSource,
{
    pub fn new(backend: B, surface: S, source: D, timing: Timing) -> Self {
        let mut watcher = PathWatcher::new(backend, timing.debounce_window);
        let (subscription, events) = watcher.subscribe();
        Self {
            watcher,
            events,
            subscription,
            surface,
            source,
            content_ready_timeout: timing.content_ready_timeout,
            state: ReloadState::Idle,
            next_cycle: 0,
            last_outcome: None,
        }
    }

    /// Display `path` and watch it for external edits.
    ///
    /// Any cycle in flight for the previous file is aborted first and its
    /// saved offset discarded. A load failure leaves the previous content
    /// on screen.
    pub fn open(&mut self, path: &Path, timers: &mut impl TimerService) {
        self.abort(AbortReason::Retargeted, timers);
        self.watcher.retarget(path, timers);
        self.pump_events(timers);

        match self.source.load(path) {
            Ok(document) => {
                // Content-ready for an open arrives while idle and is dropped.
                let ticket = self.allocate_cycle();
                if let Err(e) = self.surface.replace_content(ticket, &document) {
                    tracing::warn!("[reload] cannot display {}: {e}", path.display());
                    return;
                }
                crate::log_event!("reload", "opened", "{}", path.display());
            }
            Err(e) => {
                tracing::warn!("[reload] open failed: {e}");
                self.notify(Notice::error(format!("Could not open {}: {e}", document_title(path))));
            }
        }
    }

    /// Destroy the session: abort any cycle and stop watching.
    pub fn close(&mut self, timers: &mut impl TimerService) {
        self.abort(AbortReason::Closed, timers);
        self.watcher.unwatch(timers);
    }

    /// Feed a raw filesystem notification.
    pub fn handle_raw(&mut self, raw: RawNotification, timers: &mut impl TimerService) {
        self.watcher.handle_raw(raw, timers);
        self.pump_events(timers);
    }

    /// Feed an expired timer.
    pub fn handle_timer(&mut self, token: TimerToken, timers: &mut impl TimerService) {
        match token {
            TimerToken::Debounce { .. } => {
                self.watcher.handle_timer(token);
                self.pump_events(timers);
            }
            TimerToken::ScrollSave { cycle } => self.on_scroll_save_timeout(cycle, timers),
            TimerToken::ContentReady { cycle } => self.on_content_ready_timeout(cycle),
        }
    }

    /// Feed a message from the render surface.
    pub fn handle_surface(&mut self, message: SurfaceMessage, timers: &mut impl TimerService) {
        match message {
            SurfaceMessage::ScrollSaved { cycle, offset } => self.on_scroll_saved(cycle, offset, timers),
            SurfaceMessage::ContentReady { cycle } => self.on_content_ready(cycle, timers),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn state(&self) -> &ReloadState {
        &self.state
    }

    pub fn last_outcome(&self) -> Option<CycleOutcome> {
        self.last_outcome
    }

    pub fn watcher(&self) -> &PathWatcher<B> {
        &self.watcher
    }

    /// Mutable access for extra subscriptions. Retargeting must go through
    /// [`open`](Self::open) so the cycle is aborted first.
    pub fn subscribe(&mut self) -> (SubscriptionId, mpsc::UnboundedReceiver<WatchEvent>) {
        self.watcher.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        // The coordinator's own subscription is not for callers to drop.
        id != self.subscription && self.watcher.unsubscribe(id)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn pump_events(&mut self, timers: &mut impl TimerService) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                WatchEvent::Changed(path) => self.begin_cycle(path, timers),
                WatchEvent::Ready(path) => {
                    crate::debug_event!("reload", "watch ready", "{}", path.display());
                }
                WatchEvent::Created(path) => {
                    crate::log_event!("reload", "file reappeared", "{}", path.display());
                }
                WatchEvent::Removed(path) => {
                    crate::log_event!("reload", "file removed", "{}", path.display());
                    self.notify(Notice::warning(format!(
                        "{} was removed; waiting for it to reappear",
                        document_title(&path)
                    )));
                }
                WatchEvent::Error(e) => {
                    self.notify(Notice::error(format!("File watching failed: {e}")));
                }
            }
        }
    }

    fn begin_cycle(&mut self, path: PathBuf, timers: &mut impl TimerService) {
        if !self.state.is_idle() {
            crate::debug_event!(
                "reload",
                "ignored change",
                "{} during {}",
                path.display(),
                self.state.phase()
            );
            return;
        }

        let cycle = self.allocate_cycle();
        crate::log_event!("reload", "saving scroll", "{cycle} {}", path.display());
        self.state = ReloadState::AwaitingScrollSave {
            cycle,
            watched_path: path,
        };
        timers.schedule(self.content_ready_timeout, TimerToken::ScrollSave { cycle });

        if let Err(e) = self.surface.request_scroll_save(cycle) {
            tracing::warn!("[reload] scroll save request failed: {e}");
            self.abort(AbortReason::SurfaceDisconnected, timers);
        }
    }

    fn on_scroll_saved(&mut self, cycle: CycleId, offset: u32, timers: &mut impl TimerService) {
        if !matches!(self.state, ReloadState::AwaitingScrollSave { cycle: c, .. } if c == cycle) {
            self.ignore_stale("scroll offset", cycle);
            return;
        }
        timers.cancel(TimerToken::ScrollSave { cycle });
        crate::debug_event!("reload", "scroll saved", "{cycle} offset {offset}");
        self.reload(Some(offset), timers);
    }

    fn on_scroll_save_timeout(&mut self, cycle: CycleId, timers: &mut impl TimerService) {
        if self.state.timeout_token() != Some(TimerToken::ScrollSave { cycle }) {
            self.ignore_stale("scroll save timeout", cycle);
            return;
        }
        crate::log_event!("reload", "no scroll offset reported", "{cycle}, reloading anyway");
        self.reload(None, timers);
    }

    fn reload(&mut self, saved_offset: Option<u32>, timers: &mut impl TimerService) {
        let ReloadState::AwaitingScrollSave {
            cycle,
            watched_path,
        } = mem::take(&mut self.state)
        else {
            return;
        };
        self.state = ReloadState::Reloading {
            cycle,
            watched_path: watched_path.clone(),
            saved_offset,
        };

        let document = match self.source.load(&watched_path) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("[reload] {cycle} failed: {e}");
                self.state = ReloadState::Idle;
                self.last_outcome = Some(CycleOutcome::LoadFailed);
                self.notify(Notice::error(format!(
                    "Could not reload {}: {e}",
                    document_title(&watched_path)
                )));
                return;
            }
        };

        if let Err(e) = self.surface.replace_content(cycle, &document) {
            tracing::warn!("[reload] content replacement failed: {e}");
            self.abort(AbortReason::SurfaceDisconnected, timers);
            return;
        }

        self.state = ReloadState::AwaitingContentReady {
            cycle,
            watched_path,
            saved_offset,
        };
        timers.schedule(self.content_ready_timeout, TimerToken::ContentReady { cycle });
        crate::debug_event!("reload", "awaiting content ready", "{cycle}");
    }

    fn on_content_ready(&mut self, cycle: CycleId, timers: &mut impl TimerService) {
        if !matches!(self.state, ReloadState::AwaitingContentReady { cycle: c, .. } if c == cycle) {
            self.ignore_stale("content ready", cycle);
            return;
        }
        timers.cancel(TimerToken::ContentReady { cycle });
        let saved_offset = self.state.saved_offset();
        self.state = ReloadState::Idle;

        let outcome = match saved_offset {
            Some(offset) if offset > 0 => match self.surface.restore_scroll(offset) {
                Ok(()) => CycleOutcome::Restored { offset },
                Err(e) => {
                    tracing::warn!("[reload] restore failed: {e}");
                    CycleOutcome::Aborted {
                        reason: AbortReason::SurfaceDisconnected,
                    }
                }
            },
            _ => CycleOutcome::NothingToRestore,
        };
        crate::log_event!("reload", "reloaded", "{cycle} {outcome:?}");
        self.last_outcome = Some(outcome);
    }

    fn on_content_ready_timeout(&mut self, cycle: CycleId) {
        if self.state.timeout_token() != Some(TimerToken::ContentReady { cycle }) {
            self.ignore_stale("content ready timeout", cycle);
            return;
        }
        self.state = ReloadState::Idle;
        self.last_outcome = Some(CycleOutcome::TimedOut);
        crate::log_event!("reload", "content ready timed out", "{cycle}, not restoring scroll");
    }

    /// Cancel the phase timeout, drop the saved offset and return to idle.
    fn abort(&mut self, reason: AbortReason, timers: &mut impl TimerService) {
        if let Some(token) = self.state.timeout_token() {
            timers.cancel(token);
        }
        if let Some(cycle) = mem::take(&mut self.state).cycle() {
            crate::log_event!("reload", "aborted", "{cycle}: {reason}");
            self.last_outcome = Some(CycleOutcome::Aborted { reason });
        }
    }

    fn ignore_stale(&self, what: &str, cycle: CycleId) {
        crate::debug_event!(
            "reload",
            "stale",
            "{what} for {cycle} during {}",
            self.state.phase()
        );
    }

    fn notify(&mut self, notice: Notice) {
        if let Err(e) = self.surface.show_notice(&notice) {
            tracing::warn!("[reload] cannot show notice: {e}");
        }
    }

    fn allocate_cycle(&mut self) -> CycleId {
        self.next_cycle += 1;
        CycleId(self.next_cycle)
    }
}
