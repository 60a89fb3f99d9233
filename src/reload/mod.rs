//! Hot-reload coordination.
//!
//! Each reload destroys and rebuilds the displayed content. The
//! coordinator captures the scroll offset before the rebuild and restores
//! it once the new content, including asynchronously rendered diagrams,
//! has settled. Every round trip is tagged with its [`CycleId`] and
//! guarded by a timeout, so a surface that never answers cannot wedge the
//! machine.
//!
//! [`CycleId`]: crate::timer::CycleId

mod coordinator;
mod state;

pub use coordinator::{DEFAULT_CONTENT_READY_TIMEOUT_MS, ReloadCoordinator, Timing};
pub use state::{AbortReason, CycleOutcome, Phase, ReloadState};
