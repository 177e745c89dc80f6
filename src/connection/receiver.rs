//! The per-connection receive loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{Config, ObserverFailurePolicy};
use crate::connection::accumulator::MessageAccumulator;
use crate::connection::scope::ScopeSignal;
use crate::dispatch::Observers;
use crate::error::{Error, ObserverError, Result, TransportError};
use crate::message::{ChunkKind, MessageKind};
use crate::transport::Transport;

/// Status of the receive loop of the current (or last) connection.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub enum ReceiveStatus {
    /// No receive loop has been started.
    #[default]
    Idle,
    /// The loop is running.
    Running,
    /// The loop exited because the cancellation scope fired.
    Stopped,
    /// The loop terminated with an error.
    Failed(Error),
}

impl ReceiveStatus {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, ReceiveStatus::Running)
    }

    /// The terminal error, if the loop failed.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            ReceiveStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub(crate) struct ReceiveLoop<T> {
    transport: Arc<T>,
    observers: Arc<Observers>,
    signal: ScopeSignal,
    buffer: Vec<u8>,
    accumulator: MessageAccumulator,
    policy: ObserverFailurePolicy,
}

impl<T: Transport> ReceiveLoop<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        observers: Arc<Observers>,
        signal: ScopeSignal,
        config: &Config,
    ) -> Self {
        Self {
            transport,
            observers,
            signal,
            buffer: vec![0; config.receive_chunk_size.max(1)],
            accumulator: MessageAccumulator::new(config.max_message_size),
            policy: config.observer_failure_policy,
        }
    }

    /// Receive and dispatch messages until cancelled or failed.
    ///
    /// Cancellation yields `Ok(())`; every other exit is an error.
    pub(crate) async fn run(mut self) -> Result<()> {
        loop {
            let Some(kind) = self.next_message().await? else {
                return Ok(());
            };
            self.dispatch(kind).await?;
            self.accumulator.reset();
        }
    }

    /// Read chunks until one ends a message. `None` means cancelled.
    async fn next_message(&mut self) -> Result<Option<MessageKind>> {
        loop {
            if self.signal.is_cancelled() {
                return Ok(None);
            }

            let chunk = match self.transport.receive(&mut self.buffer, &self.signal).await {
                Ok(chunk) => chunk,
                Err(TransportError::Cancelled) => return Ok(None),
                Err(TransportError::Timeout) => return Err(Error::TransportTimeout),
                Err(_) if self.signal.is_cancelled() => return Ok(None),
                Err(err) => return Err(Error::Transport(err)),
            };

            let kind = match chunk.kind {
                ChunkKind::Data(kind) => kind,
                ChunkKind::Close(frame) => {
                    return Err(Error::RemoteClose {
                        code: frame.code,
                        reason: frame.reason,
                    });
                }
            };

            let len = chunk.len.min(self.buffer.len());
            if let Some(kind) =
                self.accumulator
                    .push(&self.buffer[..len], kind, chunk.end_of_message)?
            {
                return Ok(Some(kind));
            }
        }
    }

    async fn dispatch(&self, kind: MessageKind) -> Result<()> {
        let message = self.accumulator.message();
        let failures = match kind {
            MessageKind::Binary => self.observers.dispatch_binary(message).await,
            MessageKind::Text => {
                let text = std::str::from_utf8(message)?;
                self.observers.dispatch_text(text).await
            }
        };
        self.settle(kind, failures)
    }

    fn settle(&self, kind: MessageKind, failures: Vec<ObserverError>) -> Result<()> {
        match self.policy {
            ObserverFailurePolicy::Propagate => match failures.into_iter().next() {
                Some(err) => Err(Error::from(err)),
                None => Ok(()),
            },
            ObserverFailurePolicy::Isolate => {
                for err in failures {
                    warn!(%kind, error = %err, "observer failed, continuing");
                }
                Ok(())
            }
        }
    }
}

/// Spawn the loop and publish its outcome on `status`.
///
/// A panic inside the loop is published as a failure, so a dead loop never
/// stays visible as `Running`.
pub(crate) fn spawn<T: Transport>(
    receive_loop: ReceiveLoop<T>,
    status: watch::Sender<ReceiveStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(receive_loop.run())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::ReceivePanicked(panic_message(&*panic))));
        match outcome {
            Ok(()) => {
                debug!("receive loop stopped");
                status.send_replace(ReceiveStatus::Stopped);
            }
            Err(err) => {
                warn!(error = %err, "receive loop terminated");
                status.send_replace(ReceiveStatus::Failed(err));
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}
