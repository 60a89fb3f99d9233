//! The display surface seen from the coordinator.
//!
//! The surface lives on the other side of a message boundary (a separate
//! process in the binary). It reports and restores scroll offsets and
//! signals when deferred rendering such as diagrams has settled.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::document::RenderedDocument;
use crate::protocol::HostMessage;
use crate::timer::CycleId;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message shown to the user by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Messages the surface sends back to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMessage {
    /// Response to `request_scroll_save`.
    ScrollSaved { cycle: CycleId, offset: u32 },
    /// Content replaced for `cycle` has finished all deferred rendering.
    ContentReady { cycle: CycleId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Render surface disconnected")]
    Disconnected,
}

/// Commands the coordinator issues to the display surface.
///
/// All calls are fire-and-forget; answers arrive later as
/// [`SurfaceMessage`]s tagged with the same cycle.
pub trait RenderSurface {
    /// Ask the surface to report its current scroll offset.
    fn request_scroll_save(&mut self, cycle: CycleId) -> Result<(), SurfaceError>;

    /// Replace the displayed content. The surface answers with
    /// `ContentReady { cycle }` once deferred rendering is done.
    fn replace_content(
        &mut self,
        cycle: CycleId,
        document: &RenderedDocument,
    ) -> Result<(), SurfaceError>;

    /// Scroll to `offset`. The surface clamps it to its own bounds.
    fn restore_scroll(&mut self, offset: u32) -> Result<(), SurfaceError>;

    /// Show a notice to the user.
    fn show_notice(&mut self, notice: &Notice) -> Result<(), SurfaceError>;
}

/// Clamp a requested offset to `[0, document_height - viewport_height]`.
pub fn clamp_scroll_offset(requested: u32, document_height: u32, viewport_height: u32) -> u32 {
    requested.min(document_height.saturating_sub(viewport_height))
}

/// Scroll state as a surface keeps it.
///
/// Only the surface knows the height of freshly rendered content, which is
/// why clamping happens here and not in the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub offset: u32,
    pub document_height: u32,
    pub viewport_height: u32,
}

impl Viewport {
    pub fn new(document_height: u32, viewport_height: u32) -> Self {
        Self {
            offset: 0,
            document_height,
            viewport_height,
        }
    }

    /// Largest offset the current content allows.
    pub fn max_offset(&self) -> u32 {
        clamp_scroll_offset(u32::MAX, self.document_height, self.viewport_height)
    }

    /// New content starts at its natural top position.
    pub fn replace_document(&mut self, document_height: u32) {
        self.document_height = document_height;
        self.offset = 0;
    }

    /// User scrolling; clamped like any other scroll.
    pub fn scroll_to(&mut self, offset: u32) -> u32 {
        self.offset = clamp_scroll_offset(offset, self.document_height, self.viewport_height);
        self.offset
    }

    /// Apply a restore command and return the effective offset.
    pub fn restore(&mut self, requested: u32) -> u32 {
        self.scroll_to(requested)
    }
}

/// Surface reached through a [`HostMessage`] channel.
///
/// The receiving end serialises messages to the display process.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl ChannelSurface {
    pub fn new(tx: mpsc::UnboundedSender<HostMessage>) -> Self {
        Self { tx }
    }

    fn send(&self, message: HostMessage) -> Result<(), SurfaceError> {
        self.tx.send(message).map_err(|_| SurfaceError::Disconnected)
    }
}

impl RenderSurface for ChannelSurface {
    fn request_scroll_save(&mut self, cycle: CycleId) -> Result<(), SurfaceError> {
        self.send(HostMessage::RequestScrollSave { cycle })
    }

    fn replace_content(
        &mut self,
        cycle: CycleId,
        document: &RenderedDocument,
    ) -> Result<(), SurfaceError> {
        self.send(HostMessage::ReplaceContent {
            cycle,
            title: document.title.clone(),
            markup: document.markup.clone(),
        })
    }

    fn restore_scroll(&mut self, offset: u32) -> Result<(), SurfaceError> {
        self.send(HostMessage::RestoreScroll { offset })
    }

    fn show_notice(&mut self, notice: &Notice) -> Result<(), SurfaceError> {
        self.send(HostMessage::Notice {
            level: notice.level,
            message: notice.message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_shorter_document() {
        // 5000 requested, document only allows 1200.
        assert_eq!(clamp_scroll_offset(5000, 2000, 800), 1200);
        assert_eq!(clamp_scroll_offset(300, 2000, 800), 300);
    }

    #[test]
    fn test_clamp_when_content_fits_viewport() {
        assert_eq!(clamp_scroll_offset(400, 600, 800), 0);
    }

    #[test]
    fn test_viewport_restore_after_replace() {
        let mut viewport = Viewport::new(10_000, 800);
        assert_eq!(viewport.scroll_to(5000), 5000);

        viewport.replace_document(2000);
        assert_eq!(viewport.offset, 0);
        assert_eq!(viewport.max_offset(), 1200);
        assert_eq!(viewport.restore(5000), 1200);
    }

    #[test]
    fn test_channel_surface_sends_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut surface = ChannelSurface::new(tx);

        surface.request_scroll_save(CycleId(4)).unwrap();
        surface.restore_scroll(120).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            HostMessage::RequestScrollSave { cycle: CycleId(4) }
        );
        assert_eq!(rx.try_recv().unwrap(), HostMessage::RestoreScroll { offset: 120 });
    }

    #[test]
    fn test_channel_surface_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut surface = ChannelSurface::new(tx);
        assert_eq!(
            surface.show_notice(&Notice::info("hello")),
            Err(SurfaceError::Disconnected)
        );
    }
}
