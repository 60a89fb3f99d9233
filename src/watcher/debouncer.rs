//! Trailing-edge debouncing for a single watched path.
//!
//! Editors and formatters often write several times per logical save
//! (truncate + write + rename). Each write re-arms one timer; only the
//! timer that survives uncancelled produces a `changed` event.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::timer::{SessionId, TimerService, TimerToken};

/// Debounces change notifications for one watch session.
///
/// Holds at most one pending timer. The token of that timer carries a
/// generation number, so an expiration for a superseded generation is
/// recognised and dropped even if the timer service delivers it late.
#[derive(Debug)]
pub struct Debouncer {
    session: SessionId,
    /// How long the path must stay quiet before `changed` fires.
    window: Duration,
    generation: u64,
    /// Pending change: generation of the armed timer and latest path.
    pending: Option<(u64, PathBuf)>,
}

impl Debouncer {
    /// Create a debouncer for `session` with the given window.
    pub fn new(session: SessionId, window: Duration) -> Self {
        Self {
            session,
            window,
            generation: 0,
            pending: None,
        }
    }

    /// Record a change, cancelling any armed timer and arming a new one.
    pub fn record(&mut self, path: &Path, timers: &mut impl TimerService) {
        self.cancel(timers);
        self.generation += 1;
        timers.schedule(self.window, self.token(self.generation));
        self.pending = Some((self.generation, path.to_path_buf()));
    }

    /// Resolve an expired timer.
    ///
    /// Returns the path to report when `token` is the currently armed
    /// timer, `None` for anything else.
    pub fn fire(&mut self, token: TimerToken) -> Option<PathBuf> {
        let TimerToken::Debounce {
            session,
            generation,
        } = token
        else {
            return None;
        };
        if session != self.session {
            return None;
        }
        match self.pending.take() {
            Some((armed, path)) if armed == generation => Some(path),
            other => {
                self.pending = other;
                None
            }
        }
    }

    /// Cancel the armed timer, if any.
    pub fn cancel(&mut self, timers: &mut impl TimerService) {
        if let Some((generation, _)) = self.pending.take() {
            timers.cancel(self.token(generation));
        }
    }

    /// Check if a change is waiting for its window to elapse.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn token(&self, generation: u64) -> TimerToken {
        TimerToken::Debounce {
            session: self.session,
            generation,
        }
    }
}
