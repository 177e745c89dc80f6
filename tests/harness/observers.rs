//! Recording and misbehaving observers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wsframe::{BinaryObserver, ObserverError, TextObserver};

/// Records every message it is handed.
#[derive(Default)]
pub struct Recorder {
    binary: Mutex<Vec<Vec<u8>>>,
    text: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn binary(&self) -> Vec<Vec<u8>> {
        self.binary.lock().clone()
    }

    pub fn text(&self) -> Vec<String> {
        self.text.lock().clone()
    }

    pub fn total(&self) -> usize {
        self.binary.lock().len() + self.text.lock().len()
    }

    /// Wait until at least `count` messages arrived, or panic after 2s.
    pub async fn wait_for(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while self.total() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "expected {count} messages, got {}",
            self.total()
        );
    }
}

#[async_trait]
impl BinaryObserver for Recorder {
    async fn on_binary_message(
        &self,
        buffer: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<(), ObserverError> {
        self.binary
            .lock()
            .push(buffer[offset..offset + length].to_vec());
        Ok(())
    }
}

#[async_trait]
impl TextObserver for Recorder {
    async fn on_text_message(&self, text: &str) -> Result<(), ObserverError> {
        self.text.lock().push(text.to_owned());
        Ok(())
    }
}

/// Fails on every message.
pub struct FailingObserver;

#[async_trait]
impl TextObserver for FailingObserver {
    async fn on_text_message(&self, text: &str) -> Result<(), ObserverError> {
        Err(format!("cannot handle {text:?}").into())
    }
}

/// Panics on every message.
pub struct PanickingObserver;

#[async_trait]
impl TextObserver for PanickingObserver {
    async fn on_text_message(&self, text: &str) -> Result<(), ObserverError> {
        panic!("observer cannot handle {text:?}")
    }
}

/// Sleeps on every message and tracks how many calls overlap.
#[derive(Default)]
pub struct SlowObserver {
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BinaryObserver for SlowObserver {
    async fn on_binary_message(
        &self,
        _buffer: &[u8],
        _offset: usize,
        _length: usize,
    ) -> Result<(), ObserverError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
