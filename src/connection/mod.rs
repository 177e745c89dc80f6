//! Connection lifecycle, send and receive pipelines.
//!
//! The [`Client`] owns one transport handle and moves through
//! [`ConnectionState`]:
//!
//! 1. **Disconnected** - initial state, and the state after every shutdown
//! 2. **Connecting** - transport open in progress
//! 3. **Connected** - receive loop running, sends allowed
//! 4. **Disconnecting** - cancellation fired, close handshake and loop
//!    shutdown in progress
//!
//! Each connect installs a fresh internal cancellation signal, joined with
//! the caller's parent signal into a [`ScopeSignal`]. The receive loop and
//! every send observe that signal.

pub mod accumulator;
mod client;
pub mod fragmenter;
mod receiver;
mod scope;
mod state;

pub use accumulator::MessageAccumulator;
pub use client::Client;
pub use fragmenter::{Chunk, ChunkSplitter};
pub use receiver::ReceiveStatus;
pub use scope::{CancellationScope, ScopeSignal};
pub use state::ConnectionState;
