//! Error types for the framing client.
//!
//! [`Error`] is what callers of [`Client`](crate::Client) see.
//! [`TransportError`] is what a [`Transport`](crate::transport::Transport)
//! implementation reports; the client decides per call site whether a
//! transport error is fatal, silent, or fail-open.

use std::sync::Arc;

use thiserror::Error;

use crate::message::CloseCode;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a message observer.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by a raw transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The transport gave up waiting on the peer.
    #[error("Transport timed out")]
    Timeout,

    /// The operation observed the cancellation signal.
    #[error("Transport operation cancelled")]
    Cancelled,

    /// The transport is not open.
    #[error("Transport is closed")]
    Closed,

    /// The transport handle has been released.
    #[error("Transport has been disposed")]
    Disposed,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(err.to_string()),
        }
    }
}

/// Errors that can occur while driving a framed connection.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Opening the transport failed.
    #[error("Connect failed: {0}")]
    Connect(TransportError),

    /// The transport timed out while receiving.
    #[error("Connection timed out")]
    TransportTimeout,

    /// The peer sent a close notification.
    #[error("Remote closed connection: {} {reason:?}", .code.as_u16())]
    RemoteClose {
        /// Close status sent by the peer.
        code: CloseCode,
        /// Close description sent by the peer.
        reason: String,
    },

    /// The cancellation scope fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// A message observer returned an error.
    #[error("Observer failed: {0}")]
    Observer(Arc<dyn std::error::Error + Send + Sync>),

    /// The receive loop panicked, usually inside an observer.
    #[error("Receive loop panicked: {0}")]
    ReceivePanicked(String),

    /// A text message was not valid UTF-8.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Accumulated message exceeds the configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Accumulated size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Transport failure outside the cases above.
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// The receive loop already terminated with an error.
    #[error("Connection lost: {0}")]
    ConnectionLost(Arc<Error>),

    /// No connection is established.
    #[error("Not connected")]
    NotConnected,

    /// The operation is not allowed in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// `offset`/`length` do not describe a range inside the buffer.
    #[error("Range {offset}..{offset}+{length} out of bounds for buffer of {len} bytes")]
    InvalidRange {
        /// Start of the requested range.
        offset: usize,
        /// Length of the requested range.
        length: usize,
        /// Length of the buffer.
        len: usize,
    },

    /// The host URI could not be parsed.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// The client has been disposed.
    #[error("Client has been disposed")]
    Disposed,
}

impl Error {
    /// Returns `true` if this error is the silent cancellation outcome.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUri(err.to_string())
    }
}

impl From<ObserverError> for Error {
    fn from(err: ObserverError) -> Self {
        Error::Observer(Arc::from(err))
    }
}
