//! Cancellable timers for debounce windows and handshake timeouts.
//!
//! Components never sleep. They schedule a [`TimerToken`] on a
//! [`TimerService`] and get the token back through their `handle_timer` entry
//! point once the delay elapses. Two services exist:
//!
//! - [`VirtualClock`] - deterministic, advanced by hand (tests, replays)
//! - [`DelayQueueTimers`] - backed by `tokio_util::time::DelayQueue`

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::poll_fn;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::time::{DelayQueue, delay_queue};

/// Identifies one watch session of a `PathWatcher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Identifies one reload cycle (Idle -> ... -> Idle).
///
/// Travels over the wire with every surface request so responses can be
/// matched to the cycle that asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle#{}", self.0)
    }
}

/// What a scheduled timer is for.
///
/// Tokens are unique per scheduled timer, so the token doubles as the
/// cancellation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerToken {
    /// Trailing edge of a debounce window.
    Debounce { session: SessionId, generation: u64 },
    /// Guard for a scroll-save round trip.
    ScrollSave { cycle: CycleId },
    /// Guard for the content-ready round trip.
    ContentReady { cycle: CycleId },
}

/// Schedule/cancel interface shared by the watcher and the coordinator.
pub trait TimerService {
    /// Schedule `token` to fire after `delay`. An already scheduled timer
    /// with the same token is replaced.
    fn schedule(&mut self, delay: Duration, token: TimerToken);

    /// Cancel `token`. Returns `true` if it was still pending.
    fn cancel(&mut self, token: TimerToken) -> bool;

    /// Whether `token` is currently pending.
    fn is_scheduled(&self, token: TimerToken) -> bool;
}

/// Deterministic timer service driven by explicit time advancement.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    seq: u64,
    /// (deadline, scheduling order) -> token
    queue: BTreeMap<(Duration, u64), TimerToken>,
    index: HashMap<TimerToken, (Duration, u64)>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop the earliest timer due at or before `until`, moving `now` to its
    /// deadline. Timers with equal deadlines fire in scheduling order.
    pub fn next_due(&mut self, until: Duration) -> Option<TimerToken> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.0 > until {
            return None;
        }
        let token = self.queue.remove(&key)?;
        self.index.remove(&token);
        self.now = self.now.max(key.0);
        Some(token)
    }

    /// Move `now` forward to `until` without firing anything.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Shorthand for `advance_to(now + by)`.
    pub fn advance(&mut self, by: Duration) {
        self.advance_to(self.now + by);
    }
}

impl TimerService for VirtualClock {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        self.cancel(token);
        self.seq += 1;
        let key = (self.now + delay, self.seq);
        self.queue.insert(key, token);
        self.index.insert(token, key);
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        match self.index.remove(&token) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    fn is_scheduled(&self, token: TimerToken) -> bool {
        self.index.contains_key(&token)
    }
}

/// Upper bound on a single delay. `DelayQueue` rejects delays of roughly
/// two years and more; longer requests are capped to this.
pub const MAX_TIMER_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Wall-clock timer service for the tokio runtime.
#[derive(Default)]
pub struct DelayQueueTimers {
    queue: DelayQueue<TimerToken>,
    keys: HashMap<TimerToken, delay_queue::Key>,
}

impl DelayQueueTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next expired timer.
    ///
    /// Resolves to `None` immediately when nothing is scheduled, so callers
    /// inside `tokio::select!` should pattern-match on `Some(..)`.
    pub async fn next_expired(&mut self) -> Option<TimerToken> {
        let expired = poll_fn(|cx| self.queue.poll_expired(cx)).await?;
        let token = expired.into_inner();
        self.keys.remove(&token);
        Some(token)
    }
}

impl TimerService for DelayQueueTimers {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        self.cancel(token);
        let key = self.queue.insert(token, delay.min(MAX_TIMER_DELAY));
        self.keys.insert(token, key);
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        // Keys are dropped from the map when they expire, so any key still
        // present is valid for `remove`.
        match self.keys.remove(&token) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    fn is_scheduled(&self, token: TimerToken) -> bool {
        self.keys.contains_key(&token)
    }
}

impl fmt::Debug for DelayQueueTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayQueueTimers")
            .field("pending", &self.keys.len())
            .finish()
    }
}
