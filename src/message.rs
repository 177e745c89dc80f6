//! Message kinds, chunk tags and close codes.

/// Close status code carried by a close notification.
///
/// The named variants cover the RFC 6455 codes a client is likely to meet;
/// anything else is kept verbatim in [`CloseCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Endpoint going away (1001).
    GoingAway,
    /// Protocol error (1002).
    ProtocolError,
    /// Unsupported data (1003).
    UnsupportedData,
    /// No status present in the close notification (1005).
    NoStatus,
    /// Invalid payload data (1007).
    InvalidPayload,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009).
    MessageTooBig,
    /// Internal server error (1011).
    InternalError,
    /// Any other code, including application codes 4000-4999.
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1005 => CloseCode::NoStatus,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::NoStatus => 1005,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode::from_u16(code)
    }
}

/// Close notification: status code plus the peer's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable description, possibly empty.
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Type flag of an outbound or inbound data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Arbitrary bytes.
    Binary,
    /// UTF-8 text.
    Text,
}

impl MessageKind {
    /// Pick the kind from an `is_text` flag.
    #[inline]
    #[must_use]
    pub const fn from_is_text(is_text: bool) -> Self {
        if is_text {
            MessageKind::Text
        } else {
            MessageKind::Binary
        }
    }

    /// Returns `true` for [`MessageKind::Text`].
    #[inline]
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, MessageKind::Text)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Binary => write!(f, "binary"),
            MessageKind::Text => write!(f, "text"),
        }
    }
}

/// What a single received chunk carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkKind {
    /// A piece of a data message.
    Data(MessageKind),
    /// The peer's close notification.
    Close(CloseFrame),
}

/// Result of one transport receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedChunk {
    /// Number of bytes written into the caller's buffer.
    pub len: usize,
    /// Data kind or close notification.
    pub kind: ChunkKind,
    /// `true` when this chunk completes the current message.
    pub end_of_message: bool,
}

impl ReceivedChunk {
    /// A data chunk of `len` bytes.
    #[must_use]
    pub const fn data(len: usize, kind: MessageKind, end_of_message: bool) -> Self {
        Self {
            len,
            kind: ChunkKind::Data(kind),
            end_of_message,
        }
    }

    /// A close notification.
    #[must_use]
    pub fn close(frame: CloseFrame) -> Self {
        Self {
            len: 0,
            kind: ChunkKind::Close(frame),
            end_of_message: true,
        }
    }
}
