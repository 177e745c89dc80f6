//! In-memory transport with a scriptable peer.
//!
//! [`MemoryTransport`] is handed to a [`Client`](crate::Client);
//! [`MemoryPeer`] stays with the test and plays the remote end: it injects
//! inbound frames, close notifications and errors, inspects what was sent,
//! and shapes outbound behavior (echo, delays, timeouts).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use super::Transport;
use crate::connection::ScopeSignal;
use crate::error::TransportError;
use crate::message::{CloseCode, CloseFrame, MessageKind, ReceivedChunk};

/// One chunk the client transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentChunk {
    pub data: Vec<u8>,
    pub kind: MessageKind,
    pub end_of_message: bool,
}

/// Observable transport calls, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// `connect` succeeded.
    Connected {
        uri: String,
        headers: Vec<(String, String)>,
    },
    /// A `receive` returned because the signal fired.
    ReceiveCancelled,
    /// `close_output` was called while open.
    CloseSent {
        frame: CloseFrame,
        /// Whether the signal handed to the last `connect` had already fired.
        signal_fired: bool,
    },
    /// `dispose` was called.
    Disposed,
}

enum Inbound {
    Frame {
        kind: MessageKind,
        data: Vec<u8>,
        end_of_message: bool,
    },
    Close(CloseFrame),
    Error(TransportError),
}

struct Pending {
    kind: MessageKind,
    data: Vec<u8>,
    offset: usize,
    end_of_message: bool,
}

struct Reader {
    rx: mpsc::UnboundedReceiver<Inbound>,
    pending: Option<Pending>,
}

impl Reader {
    /// Copy as much of the pending frame as fits.
    fn drain_pending(&mut self, buffer: &mut [u8]) -> Option<ReceivedChunk> {
        let pending = self.pending.as_mut()?;
        let remaining = pending.data.len() - pending.offset;
        let len = remaining.min(buffer.len());
        buffer[..len].copy_from_slice(&pending.data[pending.offset..pending.offset + len]);
        pending.offset += len;

        let done = pending.offset >= pending.data.len();
        let chunk = ReceivedChunk::data(len, pending.kind, done && pending.end_of_message);
        if done {
            self.pending = None;
        }
        Some(chunk)
    }
}

struct Shared {
    inbound: mpsc::UnboundedSender<Inbound>,
    reader: tokio::sync::Mutex<Reader>,
    open: AtomicBool,
    disposed: AtomicBool,
    echo: AtomicBool,
    refuse_connect: Mutex<Option<TransportError>>,
    fail_close: Mutex<Option<TransportError>>,
    send_delay: Mutex<Duration>,
    connect_delay: Mutex<Duration>,
    connect_signal: Mutex<Option<ScopeSignal>>,
    send_timeout_after: Mutex<Option<usize>>,
    in_flight_sends: AtomicUsize,
    max_in_flight_sends: AtomicUsize,
    sent: Mutex<Vec<SentChunk>>,
    events: Mutex<Vec<TransportEvent>>,
}

impl Shared {
    fn record(&self, event: TransportEvent) {
        self.events.lock().push(event);
    }

    fn push(&self, item: Inbound) {
        // The reader half lives as long as `Shared`.
        let _ = self.inbound.send(item);
    }

    fn check_usable(&self) -> Result<(), TransportError> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(TransportError::Disposed)
        } else if !self.open.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    async fn transmit(
        &self,
        data: &[u8],
        kind: MessageKind,
        end_of_message: bool,
        cancel: &ScopeSignal,
    ) -> Result<(), TransportError> {
        let delay = *self.send_delay.lock();
        if !delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Err(TransportError::Cancelled),
            }
        }

        let mut sent = self.sent.lock();
        if let Some(limit) = *self.send_timeout_after.lock() {
            if sent.len() >= limit {
                return Err(TransportError::Timeout);
            }
        }
        sent.push(SentChunk {
            data: data.to_vec(),
            kind,
            end_of_message,
        });
        drop(sent);

        if self.echo.load(Ordering::SeqCst) {
            self.push(Inbound::Frame {
                kind,
                data: data.to_vec(),
                end_of_message,
            });
        }
        Ok(())
    }
}

/// Transport half handed to the client.
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

/// Test-side handle playing the remote peer.
#[derive(Clone)]
pub struct MemoryPeer {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Create a connected transport/peer pair.
    #[must_use]
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inbound: tx,
            reader: tokio::sync::Mutex::new(Reader { rx, pending: None }),
            open: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            echo: AtomicBool::new(false),
            refuse_connect: Mutex::new(None),
            fail_close: Mutex::new(None),
            send_delay: Mutex::new(Duration::ZERO),
            connect_delay: Mutex::new(Duration::ZERO),
            connect_signal: Mutex::new(None),
            send_timeout_after: Mutex::new(None),
            in_flight_sends: AtomicUsize::new(0),
            max_in_flight_sends: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        });
        (
            MemoryTransport {
                shared: shared.clone(),
            },
            MemoryPeer { shared },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(
        &self,
        uri: &Url,
        headers: &[(String, String)],
        cancel: &ScopeSignal,
    ) -> Result<(), TransportError> {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return Err(TransportError::Disposed);
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if let Some(err) = self.shared.refuse_connect.lock().clone() {
            return Err(err);
        }
        let delay = *self.shared.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Nothing queued for an earlier connection carries over.
        {
            let mut reader = self.shared.reader.lock().await;
            reader.pending = None;
            while reader.rx.try_recv().is_ok() {}
        }

        *self.shared.connect_signal.lock() = Some(cancel.clone());
        self.shared.open.store(true, Ordering::SeqCst);
        self.shared.record(TransportEvent::Connected {
            uri: uri.as_str().to_owned(),
            headers: headers.to_vec(),
        });
        Ok(())
    }

    async fn send(
        &self,
        data: &[u8],
        kind: MessageKind,
        end_of_message: bool,
        cancel: &ScopeSignal,
    ) -> Result<(), TransportError> {
        self.shared.check_usable()?;

        let shared = &self.shared;
        let in_flight = shared.in_flight_sends.fetch_add(1, Ordering::SeqCst) + 1;
        shared
            .max_in_flight_sends
            .fetch_max(in_flight, Ordering::SeqCst);

        let result = shared.transmit(data, kind, end_of_message, cancel).await;

        shared.in_flight_sends.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn receive(
        &self,
        buffer: &mut [u8],
        cancel: &ScopeSignal,
    ) -> Result<ReceivedChunk, TransportError> {
        self.shared.check_usable()?;

        let mut reader = self.shared.reader.lock().await;
        if let Some(chunk) = reader.drain_pending(buffer) {
            return Ok(chunk);
        }

        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.shared.record(TransportEvent::ReceiveCancelled);
                return Err(TransportError::Cancelled);
            }
            next = reader.rx.recv() => next,
        };

        match next {
            Some(Inbound::Frame {
                kind,
                data,
                end_of_message,
            }) => {
                reader.pending = Some(Pending {
                    kind,
                    data,
                    offset: 0,
                    end_of_message,
                });
                reader
                    .drain_pending(buffer)
                    .ok_or(TransportError::Closed)
            }
            Some(Inbound::Close(frame)) => {
                self.shared.open.store(false, Ordering::SeqCst);
                Ok(ReceivedChunk::close(frame))
            }
            Some(Inbound::Error(err)) => Err(err),
            None => Err(TransportError::Closed),
        }
    }

    async fn close_output(
        &self,
        frame: &CloseFrame,
        _cancel: &ScopeSignal,
    ) -> Result<(), TransportError> {
        self.shared.check_usable()?;
        if let Some(err) = self.shared.fail_close.lock().clone() {
            return Err(err);
        }
        let signal_fired = self
            .shared
            .connect_signal
            .lock()
            .as_ref()
            .is_some_and(ScopeSignal::is_cancelled);
        self.shared.open.store(false, Ordering::SeqCst);
        self.shared.record(TransportEvent::CloseSent {
            frame: frame.clone(),
            signal_fired,
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst) && !self.shared.disposed.load(Ordering::SeqCst)
    }

    fn dispose(&self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        self.shared.open.store(false, Ordering::SeqCst);
        self.shared.record(TransportEvent::Disposed);
    }
}

impl MemoryPeer {
    /// Deliver one frame to the client.
    pub fn send_frame(&self, kind: MessageKind, data: impl Into<Vec<u8>>, end_of_message: bool) {
        self.shared.push(Inbound::Frame {
            kind,
            data: data.into(),
            end_of_message,
        });
    }

    /// Deliver a complete binary message in one frame.
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) {
        self.send_frame(MessageKind::Binary, data, true);
    }

    /// Deliver a complete text message in one frame.
    pub fn send_text(&self, text: &str) {
        self.send_frame(MessageKind::Text, text.as_bytes(), true);
    }

    /// Deliver a close notification.
    pub fn send_close(&self, code: u16, reason: impl Into<String>) {
        self.shared
            .push(Inbound::Close(CloseFrame::new(CloseCode::from_u16(code), reason)));
    }

    /// Make the client's next receive fail with `err`.
    pub fn send_error(&self, err: TransportError) {
        self.shared.push(Inbound::Error(err));
    }

    /// Reflect every sent chunk back as an inbound frame.
    pub fn set_echo(&self, echo: bool) {
        self.shared.echo.store(echo, Ordering::SeqCst);
    }

    /// Delay every sent chunk by `delay`.
    pub fn set_send_delay(&self, delay: Duration) {
        *self.shared.send_delay.lock() = delay;
    }

    /// Delay every successful `connect` by `delay`. Cancellation does not
    /// cut the delay short.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.shared.connect_delay.lock() = delay;
    }

    /// Accept `chunks` sent chunks in total, then time out every further send.
    pub fn time_out_sends_after(&self, chunks: usize) {
        *self.shared.send_timeout_after.lock() = Some(chunks);
    }

    /// Make `connect` fail with `err`, or succeed again with `None`.
    pub fn refuse_connections(&self, err: Option<TransportError>) {
        *self.shared.refuse_connect.lock() = err;
    }

    /// Make `close_output` fail with `err`, or succeed again with `None`.
    pub fn fail_close(&self, err: Option<TransportError>) {
        *self.shared.fail_close.lock() = err;
    }

    /// Chunks sent by the client so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentChunk> {
        self.shared.sent.lock().clone()
    }

    /// Transport calls observed so far.
    #[must_use]
    pub fn events(&self) -> Vec<TransportEvent> {
        self.shared.events.lock().clone()
    }

    /// Highest number of `send` calls that were in flight at once.
    #[must_use]
    pub fn max_concurrent_sends(&self) -> usize {
        self.shared.max_in_flight_sends.load(Ordering::SeqCst)
    }

    /// Whether the transport side is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Whether the client released the transport.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }
}
