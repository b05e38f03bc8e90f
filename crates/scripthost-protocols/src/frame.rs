//! WebSocket data frames.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Data frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Text,
    Binary,
}

impl FrameKind {
    /// Wire code exposed to scripts as `TypeTextMessage`.
    pub const TEXT_CODE: u8 = 1;
    /// Wire code exposed to scripts as `TypeBinaryMessage`.
    pub const BINARY_CODE: u8 = 2;

    pub fn code(&self) -> u8 {
        match self {
            FrameKind::Text => Self::TEXT_CODE,
            FrameKind::Binary => Self::BINARY_CODE,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, ChannelError> {
        match code {
            Self::TEXT_CODE => Ok(FrameKind::Text),
            Self::BINARY_CODE => Ok(FrameKind::Binary),
            other => Err(ChannelError::InvalidFrame(format!(
                "unknown message type: {}",
                other
            ))),
        }
    }
}

/// A complete text or binary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub data: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(FrameKind::Text, Bytes::from(text.into()))
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(FrameKind::Binary, data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode the payload as UTF-8 regardless of the frame kind.
    pub fn into_text(self) -> Result<String, ChannelError> {
        String::from_utf8(self.data.to_vec())
            .map_err(|e| ChannelError::InvalidFrame(format!("frame is not valid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_kind_codes() {
        assert_eq!(FrameKind::Text.code(), 1);
        assert_eq!(FrameKind::Binary.code(), 2);
        assert_eq!(FrameKind::from_code(1).unwrap(), FrameKind::Text);
        assert_eq!(FrameKind::from_code(2).unwrap(), FrameKind::Binary);
        assert!(matches!(
            FrameKind::from_code(9),
            Err(ChannelError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_text_frame() {
        let frame = Frame::text("hello");
        assert_eq!(frame.kind, FrameKind::Text);
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.into_text().unwrap(), "hello");
    }

    #[test]
    fn test_invalid_utf8() {
        let frame = Frame::binary(vec![0xff, 0xfe]);
        assert!(frame.into_text().is_err());
    }
}
