//! Multicast of completed messages to registered observers.
//!
//! Binary and text messages have independent registries. Subscribing and
//! unsubscribing only take a short lock on the observer list; dispatch works
//! on a snapshot taken when it starts, so registry changes made during a
//! dispatch apply from the next message on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ObserverError;

/// Receives completed binary messages.
#[async_trait]
pub trait BinaryObserver: Send + Sync {
    /// Called once per binary message with the bytes at
    /// `buffer[offset..offset + length]`.
    ///
    /// The buffer is reused by the receive loop after every observer returns.
    async fn on_binary_message(
        &self,
        buffer: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<(), ObserverError>;
}

/// Receives completed text messages.
#[async_trait]
pub trait TextObserver: Send + Sync {
    /// Called once per text message.
    async fn on_text_message(&self, text: &str) -> Result<(), ObserverError>;
}

/// Handle returned by a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer list with snapshot reads.
pub struct ObserverRegistry<O: ?Sized> {
    next_id: AtomicU64,
    observers: RwLock<Vec<(SubscriptionId, Arc<O>)>>,
}

impl<O: ?Sized> ObserverRegistry<O> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<O>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    /// Current observers, detached from the lock.
    pub fn snapshot(&self) -> Vec<Arc<O>> {
        self.observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

impl<O: ?Sized> Default for ObserverRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// The binary and text registries of one client.
#[derive(Default)]
pub struct Observers {
    pub binary: ObserverRegistry<dyn BinaryObserver>,
    pub text: ObserverRegistry<dyn TextObserver>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a binary message to every current observer.
    ///
    /// All observers run to completion; their errors are returned in
    /// subscription order.
    pub async fn dispatch_binary(&self, data: &[u8]) -> Vec<ObserverError> {
        let snapshot = self.binary.snapshot();
        if snapshot.is_empty() {
            return Vec::new();
        }
        let calls = snapshot
            .iter()
            .map(|observer| observer.on_binary_message(data, 0, data.len()));
        collect_failures(futures::future::join_all(calls).await)
    }

    /// Deliver a text message to every current observer.
    pub async fn dispatch_text(&self, text: &str) -> Vec<ObserverError> {
        let snapshot = self.text.snapshot();
        if snapshot.is_empty() {
            return Vec::new();
        }
        let calls = snapshot
            .iter()
            .map(|observer| observer.on_text_message(text));
        collect_failures(futures::future::join_all(calls).await)
    }
}

fn collect_failures(results: Vec<Result<(), ObserverError>>) -> Vec<ObserverError> {
    results.into_iter().filter_map(Result::err).collect()
}
