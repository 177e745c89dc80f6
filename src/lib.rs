//! # wsframe - message framing over a raw duplex transport
//!
//! `wsframe` sits between an application and a raw WebSocket-style
//! transport. It owns the connection lifecycle, splits outbound messages
//! into chunks, reassembles inbound chunks into whole messages for
//! registered observers, and carries cooperative cancellation from a
//! caller-supplied parent token down to every pending transport call.
//!
//! ## Features
//!
//! - **Pluggable transport** through the async [`Transport`] trait
//! - **Serialized sends** behind a single-permit guard
//! - **One receive task per connection** with back-pressured dispatch
//! - **Composable cancellation**: replace the parent token at any time
//! - **In-memory transport** for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wsframe::{Client, Config};
//!
//! let client = Arc::new(Client::new(transport, Config::new()));
//! client.subscribe_text(Arc::new(Printer));
//! client.connect("wss://gateway.example").await?;
//! client.send_text("hello").await?;
//! client.disconnect().await;
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod transport;

pub use config::{Config, ObserverFailurePolicy};
pub use connection::{CancellationScope, Client, ConnectionState, ReceiveStatus, ScopeSignal};
pub use dispatch::{BinaryObserver, SubscriptionId, TextObserver};
pub use error::{Error, ObserverError, Result, TransportError};
pub use message::{ChunkKind, CloseCode, CloseFrame, MessageKind, ReceivedChunk};
pub use transport::Transport;
