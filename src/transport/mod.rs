//! The raw duplex transport the client is layered on.
//!
//! A [`Transport`] moves opaque chunks tagged with a message kind and an
//! end-of-message marker, and reports the peer's close notification. The
//! wire protocol, TLS and name resolution all live behind this trait.
//!
//! ## Implementing a transport
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use wsframe::transport::Transport;
//!
//! struct MySocket { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MySocket {
//!     async fn connect(&self, uri: &Url, headers: &[(String, String)], cancel: &ScopeSignal)
//!         -> Result<(), TransportError> { todo!() }
//!     // send, receive, close_output, is_open ...
//! }
//! ```

mod memory;

pub use memory::{MemoryPeer, MemoryTransport, SentChunk, TransportEvent};

use async_trait::async_trait;
use url::Url;

use crate::connection::ScopeSignal;
use crate::error::TransportError;
use crate::message::{CloseFrame, MessageKind, ReceivedChunk};

/// A raw duplex socket transport.
///
/// The client shares one transport between its send path and its receive
/// task. Implementations must allow one `send` and one `receive` to run at
/// the same time; the client never issues two concurrent calls of the same
/// direction.
///
/// Every blocking call receives the effective cancellation signal. A
/// transport that honors it should return [`TransportError::Cancelled`]
/// promptly once it fires.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the connection to `uri` with the given request headers.
    async fn connect(
        &self,
        uri: &Url,
        headers: &[(String, String)],
        cancel: &ScopeSignal,
    ) -> Result<(), TransportError>;

    /// Transmit one chunk of a message.
    async fn send(
        &self,
        data: &[u8],
        kind: MessageKind,
        end_of_message: bool,
        cancel: &ScopeSignal,
    ) -> Result<(), TransportError>;

    /// Receive the next chunk into `buffer`.
    ///
    /// A data chunk larger than `buffer` is delivered across several calls,
    /// with `end_of_message` set only on the last one.
    async fn receive(
        &self,
        buffer: &mut [u8],
        cancel: &ScopeSignal,
    ) -> Result<ReceivedChunk, TransportError>;

    /// Send the close notification for the outbound direction.
    async fn close_output(
        &self,
        frame: &CloseFrame,
        cancel: &ScopeSignal,
    ) -> Result<(), TransportError>;

    /// Whether the connection is open in both directions.
    fn is_open(&self) -> bool;

    /// Release the underlying handle. Called at most once by the client.
    fn dispose(&self) {}
}
