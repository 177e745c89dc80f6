use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::connection::ConnectionState;
use crate::connection::fragmenter::ChunkSplitter;
use crate::connection::receiver::{self, ReceiveLoop, ReceiveStatus};
use crate::connection::scope::{CancellationScope, ScopeSignal};
use crate::dispatch::{BinaryObserver, Observers, SubscriptionId, TextObserver};
use crate::error::{Error, Result, TransportError};
use crate::message::{CloseCode, CloseFrame, MessageKind};
use crate::transport::Transport;

/// A message-framing client over a raw duplex transport.
///
/// `Client` owns the transport handle and drives one background receive
/// task per connection. Completed inbound messages go to the subscribed
/// observers; outbound messages are chunked and sent one caller at a time.
///
/// All methods take `&self`, so a client is usually shared as
/// `Arc<Client<T>>` between the tasks that send and the one that manages
/// the lifecycle.
///
/// ## Example
///
/// ```rust,ignore
/// use wsframe::{Client, Config};
///
/// let client = Client::new(my_transport, Config::new());
/// client.set_header("Authorization", "Bot token")?;
/// client.subscribe_text(Arc::new(MyHandler));
///
/// client.connect("wss://gateway.example/?v=6").await?;
/// client.send_text("{\"op\":1}").await?;
/// client.disconnect().await;
/// ```
///
/// ## Deadlock hazard
///
/// `disconnect`, `connect` and the awaited shutdown they perform wait for
/// the receive task to finish. Calling them from inside an observer
/// callback therefore never returns.
pub struct Client<T: Transport> {
    transport: Arc<T>,
    config: Mutex<Config>,
    scope: CancellationScope,
    observers: Arc<Observers>,
    send_guard: Semaphore,
    lifecycle: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
    disposed: AtomicBool,
}

struct Inner {
    state: ConnectionState,
    signal: Option<ScopeSignal>,
    receive_task: Option<JoinHandle<()>>,
    status: watch::Receiver<ReceiveStatus>,
}

impl<T: Transport> Client<T> {
    /// Create a disconnected client over `transport`.
    pub fn new(transport: T, config: Config) -> Self {
        let (_, status) = watch::channel(ReceiveStatus::Idle);
        Self {
            transport: Arc::new(transport),
            config: Mutex::new(config),
            scope: CancellationScope::new(),
            observers: Arc::new(Observers::new()),
            send_guard: Semaphore::new(1),
            lifecycle: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                signal: None,
                receive_task: None,
                status,
            }),
            disposed: AtomicBool::new(false),
        }
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Status of the receive loop of the current or last connection.
    pub fn receive_status(&self) -> ReceiveStatus {
        self.inner.lock().status.borrow().clone()
    }

    /// Wait until the current receive loop stops.
    ///
    /// Returns the error that terminated it, or `None` if it was cancelled
    /// or never started.
    pub async fn closed(&self) -> Option<Error> {
        let mut status = self.inner.lock().status.clone();
        let finished = status
            .wait_for(|s| !s.is_running())
            .await
            .map(|s| s.error().cloned());
        match finished {
            Ok(err) => err,
            Err(_) => status.borrow().error().cloned(),
        }
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }

    /// Check if [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Set a request header for the next connect.
    ///
    /// ## Errors
    ///
    /// - `Error::InvalidState` unless the client is disconnected
    /// - `Error::Disposed` after dispose
    pub fn set_header(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        let state = self.state();
        if state.is_active() {
            return Err(Error::InvalidState(format!(
                "headers can only be set while disconnected (state: {state})"
            )));
        }
        self.config.lock().set_header(key, value);
        Ok(())
    }

    /// Replace the parent cancellation signal.
    ///
    /// Takes effect immediately, including for sends and receives already
    /// waiting on the current connection.
    pub fn set_cancellation_parent(&self, token: CancellationToken) {
        self.scope.set_parent(token);
    }

    /// Register an observer for binary messages.
    pub fn subscribe_binary(&self, observer: Arc<dyn BinaryObserver>) -> SubscriptionId {
        self.observers.binary.subscribe(observer)
    }

    /// Remove a binary observer. Returns `false` if it was not registered.
    pub fn unsubscribe_binary(&self, id: SubscriptionId) -> bool {
        self.observers.binary.unsubscribe(id)
    }

    /// Register an observer for text messages.
    pub fn subscribe_text(&self, observer: Arc<dyn TextObserver>) -> SubscriptionId {
        self.observers.text.subscribe(observer)
    }

    /// Remove a text observer. Returns `false` if it was not registered.
    pub fn unsubscribe_text(&self, id: SubscriptionId) -> bool {
        self.observers.text.unsubscribe(id)
    }

    /// Connect to `host_uri`, replacing any existing connection.
    ///
    /// The previous connection is fully shut down first, including waiting
    /// for its receive loop to exit. On failure the client is left
    /// disconnected.
    ///
    /// ## Errors
    ///
    /// - `Error::InvalidUri` if `host_uri` does not parse
    /// - `Error::Connect` if the transport fails to open
    /// - `Error::Disposed` after dispose
    pub async fn connect(&self, host_uri: &str) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        let uri = Url::parse(host_uri)?;

        self.shutdown().await;

        let signal = self.scope.renew();
        self.inner.lock().state = ConnectionState::Connecting;
        let config = self.config();
        debug!(uri = %uri, "connecting");

        if let Err(err) = self
            .transport
            .connect(&uri, &config.headers, &signal)
            .await
        {
            self.inner.lock().state = ConnectionState::Disconnected;
            debug!(uri = %uri, error = %err, "connect failed");
            return Err(Error::Connect(err));
        }

        // dispose() sets the flag before it takes `inner`.
        let mut inner = self.inner.lock();
        if self.is_disposed() {
            inner.state = ConnectionState::Disconnected;
            return Err(Error::Disposed);
        }

        let (status_tx, status_rx) = watch::channel(ReceiveStatus::Running);
        let receive_loop = ReceiveLoop::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.observers),
            signal.clone(),
            &config,
        );
        inner.receive_task = Some(receiver::spawn(receive_loop, status_tx));
        inner.state = ConnectionState::Connected;
        inner.signal = Some(signal);
        inner.status = status_rx;
        debug!(uri = %uri, "connected");
        Ok(())
    }

    /// Shut down the current connection, if any.
    ///
    /// Never fails: the close handshake is best-effort and its errors are
    /// only logged. Returns once the receive loop has exited.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.shutdown().await;
    }

    async fn shutdown(&self) {
        self.scope.cancel();

        let task = {
            let mut inner = self.inner.lock();
            if inner.state.is_active() {
                inner.state = ConnectionState::Disconnecting;
            }
            inner.signal = None;
            inner.receive_task.take()
        };

        if self.transport.is_open() {
            let reason = self.config.lock().close_reason.clone();
            let frame = CloseFrame::new(CloseCode::Normal, reason);
            if let Err(err) = self
                .transport
                .close_output(&frame, &ScopeSignal::none())
                .await
            {
                debug!(error = %err, "close handshake failed, ignoring");
            }
        }

        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "receive loop did not exit cleanly");
            }
        }

        self.inner.lock().state = ConnectionState::Disconnected;
    }

    /// Send `buffer[offset..offset + length]` as one message.
    ///
    /// Waits for the send guard, so concurrent callers are serialized in
    /// arrival order. The payload goes out in chunks of at most
    /// `send_chunk_size` bytes with the last one marked final.
    ///
    /// A transport timeout part-way through abandons the remaining chunks
    /// and still returns `Ok(())`; the peer sees an unfinished message.
    ///
    /// ## Errors
    ///
    /// - `Error::InvalidRange` if the range lies outside `buffer`
    /// - `Error::NotConnected` if no connection is established
    /// - `Error::ConnectionLost` if the receive loop already failed
    /// - `Error::Cancelled` if the cancellation scope fires first
    /// - `Error::Transport` for other transport failures
    /// - `Error::Disposed` after dispose
    pub async fn send(
        &self,
        buffer: &[u8],
        offset: usize,
        length: usize,
        kind: MessageKind,
    ) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        let payload = offset
            .checked_add(length)
            .and_then(|end| buffer.get(offset..end))
            .ok_or(Error::InvalidRange {
                offset,
                length,
                len: buffer.len(),
            })?;
        let signal = self.active_signal()?;

        let _permit = tokio::select! {
            biased;
            () = signal.cancelled() => return Err(Error::Cancelled),
            permit = self.send_guard.acquire() => permit.map_err(|_| Error::Disposed)?,
        };

        let chunk_size = self.config.lock().send_chunk_size;
        let splitter = ChunkSplitter::new(payload, chunk_size);
        let total = splitter.chunk_count();

        for (index, chunk) in splitter.enumerate() {
            match self
                .transport
                .send(chunk.data, kind, chunk.end_of_message, &signal)
                .await
            {
                Ok(()) => {}
                Err(TransportError::Timeout) => {
                    warn!(
                        %kind,
                        sent = index,
                        total,
                        "send timed out, dropping remaining chunks"
                    );
                    return Ok(());
                }
                Err(TransportError::Cancelled) => return Err(Error::Cancelled),
                Err(err) => return Err(Error::Transport(err)),
            }
        }
        Ok(())
    }

    /// Send a whole binary message.
    pub async fn send_binary(&self, data: &[u8]) -> Result<()> {
        self.send(data, 0, data.len(), MessageKind::Binary).await
    }

    /// Send a whole text message.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.send(text.as_bytes(), 0, text.len(), MessageKind::Text)
            .await
    }

    /// Release the transport permanently. Idempotent.
    ///
    /// Cancels the current connection, fails pending and future sends with
    /// `Error::Disposed`, and aborts the receive task without waiting.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scope.cancel();
        self.send_guard.close();

        let task = {
            let mut inner = self.inner.lock();
            inner.state = ConnectionState::Disconnected;
            inner.signal = None;
            inner.receive_task.take()
        };
        if let Some(task) = task {
            task.abort();
        }

        self.transport.dispose();
        debug!("client disposed");
    }

    fn active_signal(&self) -> Result<ScopeSignal> {
        let inner = self.inner.lock();
        if !inner.state.can_send() {
            return Err(Error::NotConnected);
        }
        if let ReceiveStatus::Failed(err) = &*inner.status.borrow() {
            return Err(Error::ConnectionLost(Arc::new(err.clone())));
        }
        inner.signal.clone().ok_or(Error::NotConnected)
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
