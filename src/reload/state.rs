//! Hot-reload handshake state.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::timer::{CycleId, TimerToken};

/// Phase of the reload handshake, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    AwaitingScrollSave,
    Reloading,
    AwaitingContentReady,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingScrollSave => "awaiting-scroll-save",
            Self::Reloading => "reloading",
            Self::AwaitingContentReady => "awaiting-content-ready",
        };
        f.write_str(name)
    }
}

/// The handshake with its per-cycle data.
///
/// The saved offset lives inside the phases that own it, so leaving those
/// phases drops it. Every non-idle state is a hot reload in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReloadState {
    #[default]
    Idle,
    AwaitingScrollSave {
        cycle: CycleId,
        watched_path: PathBuf,
    },
    Reloading {
        cycle: CycleId,
        watched_path: PathBuf,
        saved_offset: Option<u32>,
    },
    AwaitingContentReady {
        cycle: CycleId,
        watched_path: PathBuf,
        saved_offset: Option<u32>,
    },
}

impl ReloadState {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::AwaitingScrollSave { .. } => Phase::AwaitingScrollSave,
            Self::Reloading { .. } => Phase::Reloading,
            Self::AwaitingContentReady { .. } => Phase::AwaitingContentReady,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Cycle in flight, if any.
    pub fn cycle(&self) -> Option<CycleId> {
        match self {
            Self::Idle => None,
            Self::AwaitingScrollSave { cycle, .. }
            | Self::Reloading { cycle, .. }
            | Self::AwaitingContentReady { cycle, .. } => Some(*cycle),
        }
    }

    /// Path whose change started the cycle in flight.
    pub fn watched_path(&self) -> Option<&Path> {
        match self {
            Self::Idle => None,
            Self::AwaitingScrollSave { watched_path, .. }
            | Self::Reloading { watched_path, .. }
            | Self::AwaitingContentReady { watched_path, .. } => Some(watched_path.as_path()),
        }
    }

    pub fn saved_offset(&self) -> Option<u32> {
        match self {
            Self::Reloading { saved_offset, .. } | Self::AwaitingContentReady { saved_offset, .. } => {
                *saved_offset
            }
            _ => None,
        }
    }

    /// The timeout guarding the current phase. At most one exists.
    pub fn timeout_token(&self) -> Option<TimerToken> {
        match self {
            Self::AwaitingScrollSave { cycle, .. } => Some(TimerToken::ScrollSave { cycle: *cycle }),
            Self::AwaitingContentReady { cycle, .. } => {
                Some(TimerToken::ContentReady { cycle: *cycle })
            }
            _ => None,
        }
    }
}

/// Why a cycle was abandoned before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The user opened another file.
    Retargeted,
    /// The session was destroyed.
    Closed,
    /// A command could not reach the surface.
    SurfaceDisconnected,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Retargeted => "watch retargeted",
            Self::Closed => "session closed",
            Self::SurfaceDisconnected => "surface disconnected",
        };
        f.write_str(reason)
    }
}

/// How the most recent cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Content ready arrived; a restore command was issued.
    Restored { offset: u32 },
    /// Content ready arrived; the saved offset was zero or missing.
    NothingToRestore,
    /// Content ready never arrived within the timeout.
    TimedOut,
    /// The document could not be read or converted; old content stays.
    LoadFailed,
    Aborted { reason: AbortReason },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_has_no_cycle_data() {
        let state = ReloadState::default();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.cycle(), None);
        assert_eq!(state.watched_path(), None);
        assert_eq!(state.saved_offset(), None);
        assert_eq!(state.timeout_token(), None);
    }

    #[test]
    fn test_timeout_token_follows_phase() {
        let saving = ReloadState::AwaitingScrollSave {
            cycle: CycleId(2),
            watched_path: PathBuf::from("/a.md"),
        };
        assert_eq!(
            saving.timeout_token(),
            Some(TimerToken::ScrollSave { cycle: CycleId(2) })
        );
        assert_eq!(saving.saved_offset(), None);

        let waiting = ReloadState::AwaitingContentReady {
            cycle: CycleId(2),
            watched_path: PathBuf::from("/a.md"),
            saved_offset: Some(640),
        };
        assert_eq!(
            waiting.timeout_token(),
            Some(TimerToken::ContentReady { cycle: CycleId(2) })
        );
        assert_eq!(waiting.saved_offset(), Some(640));
        assert_eq!(waiting.watched_path(), Some(Path::new("/a.md")));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::AwaitingContentReady.to_string(), "awaiting-content-ready");
    }
}
