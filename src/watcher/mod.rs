//! Single-file watcher for hot reload.
//!
//! Observes one path and turns noisy filesystem notifications into a
//! debounced stream of logical events.
//!
//! # Architecture
//!
//! ```text
//! FsBackend (notify, parent dir)
//!   - RawNotification { session, path, Write | Create | Remove | Failed }
//!         |
//! PathWatcher
//!   - one WatchSession at a time
//!   - Debouncer (one timer on a TimerService)
//!         |
//!    subscribers: Ready | Changed | Created | Removed | Error
//! ```

mod backend;
mod debouncer;
mod error;
mod event;
mod path_watcher;

pub use backend::{FsBackend, NotifyBackend, NotifyHandle};
pub use debouncer::Debouncer;
pub use error::WatchError;
pub use event::{RawKind, RawNotification, WatchEvent};
pub use path_watcher::{DEFAULT_DEBOUNCE_MS, PathWatcher, SubscriptionId};
