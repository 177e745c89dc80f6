//! Shared helpers for the client integration tests.
//!
//! Observers that record what they receive, plus small waiting helpers for
//! driving a `Client` over `MemoryTransport`.

#![allow(dead_code)]

mod observers;

pub use observers::{FailingObserver, PanickingObserver, Recorder, SlowObserver};

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wsframe::transport::{MemoryPeer, MemoryTransport};
use wsframe::{Client, Config};

pub const URI: &str = "ws://gateway.test/socket";

/// Route client logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// A disconnected client plus the peer end of its transport.
pub fn client_with(config: Config) -> (Client<MemoryTransport>, MemoryPeer) {
    init_tracing();
    let (transport, peer) = MemoryTransport::pair();
    (Client::new(transport, config), peer)
}

/// A connected client with echo enabled and a recorder on both channels.
pub async fn echo_client(config: Config) -> (Client<MemoryTransport>, MemoryPeer, std::sync::Arc<Recorder>) {
    let (client, peer) = client_with(config);
    peer.set_echo(true);
    let recorder = Recorder::new();
    client.subscribe_binary(recorder.clone());
    client.subscribe_text(recorder.clone());
    client.connect(URI).await.unwrap();
    (client, peer, recorder)
}
