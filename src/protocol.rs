//! JSON-lines protocol between the host and the display process.
//!
//! One JSON object per line, discriminated by `type`:
//!
//! ```text
//! host -> display   {"type":"request_scroll_save","cycle":3}
//!                   {"type":"replace_content","cycle":3,"title":"README.md","markup":"..."}
//!                   {"type":"restore_scroll","offset":1200}
//!                   {"type":"notice","level":"warning","message":"..."}
//! display -> host   {"type":"scroll_saved","cycle":3,"offset":5000}
//!                   {"type":"content_ready","cycle":3}
//!                   {"type":"open","path":"/abs/other.md"}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::surface::{NoticeLevel, SurfaceMessage};
use crate::timer::CycleId;

/// Messages sent to the display process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    RequestScrollSave {
        cycle: CycleId,
    },
    ReplaceContent {
        cycle: CycleId,
        title: String,
        markup: String,
    },
    RestoreScroll {
        offset: u32,
    },
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

impl HostMessage {
    /// Serialize as a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages received from the display process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    ScrollSaved { cycle: CycleId, offset: u32 },
    ContentReady { cycle: CycleId },
    /// The user picked another file to display.
    Open { path: PathBuf },
}

impl InboundMessage {
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// The surface half of the message, if it is one.
    pub fn as_surface(&self) -> Option<SurfaceMessage> {
        match *self {
            Self::ScrollSaved { cycle, offset } => Some(SurfaceMessage::ScrollSaved { cycle, offset }),
            Self::ContentReady { cycle } => Some(SurfaceMessage::ContentReady { cycle }),
            Self::Open { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_message_wire_format() {
        let line = HostMessage::RequestScrollSave { cycle: CycleId(3) }
            .to_line()
            .unwrap();
        assert_eq!(line, r#"{"type":"request_scroll_save","cycle":3}"#);

        let line = HostMessage::Notice {
            level: NoticeLevel::Warning,
            message: "gone".to_string(),
        }
        .to_line()
        .unwrap();
        assert_eq!(line, r#"{"type":"notice","level":"warning","message":"gone"}"#);
    }

    #[test]
    fn test_parse_inbound() {
        let msg = InboundMessage::parse_line(r#"{"type":"scroll_saved","cycle":3,"offset":5000}"#)
            .unwrap();
        assert_eq!(
            msg.as_surface(),
            Some(SurfaceMessage::ScrollSaved {
                cycle: CycleId(3),
                offset: 5000
            })
        );

        let msg = InboundMessage::parse_line("  {\"type\":\"open\",\"path\":\"/tmp/b.md\"}\n").unwrap();
        assert_eq!(
            msg,
            InboundMessage::Open {
                path: PathBuf::from("/tmp/b.md")
            }
        );
        assert_eq!(msg.as_surface(), None);
    }

    #[test]
    fn test_parse_rejects_negative_offset() {
        assert!(InboundMessage::parse_line(r#"{"type":"scroll_saved","cycle":1,"offset":-4}"#).is_err());
        assert!(InboundMessage::parse_line(r#"{"type":"bogus"}"#).is_err());
    }
}
