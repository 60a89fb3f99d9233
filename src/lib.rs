pub mod cli;
pub mod config;
pub mod document;
pub mod host;
pub mod logging;
pub mod protocol;
pub mod reload;
pub mod surface;
pub mod timer;
pub mod watcher;

pub use config::Settings;
pub use document::{DocumentSource, FileDocumentSource, RenderedDocument};
pub use reload::{Phase, ReloadCoordinator, Timing};
pub use surface::{RenderSurface, SurfaceMessage};
pub use timer::{CycleId, TimerService, TimerToken, VirtualClock};
pub use watcher::{PathWatcher, WatchEvent};
