//! Composed cancellation: an external parent signal joined with an
//! internally owned per-connection signal.
//!
//! The parent lives in a `watch` slot so it can be replaced at any time.
//! Every [`ScopeSignal`] reads the slot when it waits, so a replacement is
//! seen by waits that are already in flight without restarting anything.

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Owner of the parent slot and the current internal signal.
#[derive(Debug)]
pub struct CancellationScope {
    parent: watch::Sender<CancellationToken>,
    internal: Mutex<CancellationToken>,
}

impl CancellationScope {
    /// Create a scope with a parent that never fires.
    pub fn new() -> Self {
        let (parent, _) = watch::channel(CancellationToken::new());
        Self {
            parent,
            internal: Mutex::new(CancellationToken::new()),
        }
    }

    /// Replace the parent signal.
    pub fn set_parent(&self, token: CancellationToken) {
        self.parent.send_replace(token);
    }

    /// Install a fresh internal signal and return the effective signal over it.
    ///
    /// Signals handed out earlier stay bound to their own internal token.
    pub fn renew(&self) -> ScopeSignal {
        let internal = CancellationToken::new();
        *self.internal.lock() = internal.clone();
        ScopeSignal {
            parent: self.parent.subscribe(),
            internal,
        }
    }

    /// Effective signal over the current internal token.
    pub fn signal(&self) -> ScopeSignal {
        ScopeSignal {
            parent: self.parent.subscribe(),
            internal: self.internal.lock().clone(),
        }
    }

    /// Trigger the current internal signal.
    pub fn cancel(&self) {
        self.internal.lock().cancel();
    }
}

impl Default for CancellationScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Effective signal: fires when the internal token or the current parent fires.
#[derive(Debug, Clone)]
pub struct ScopeSignal {
    parent: watch::Receiver<CancellationToken>,
    internal: CancellationToken,
}

impl ScopeSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn none() -> Self {
        let (_, parent) = watch::channel(CancellationToken::new());
        Self {
            parent,
            internal: CancellationToken::new(),
        }
    }

    /// Check whether either input has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.internal.is_cancelled() || self.parent.borrow().is_cancelled()
    }

    /// Wait until either input fires.
    ///
    /// Parent replacements made while waiting are picked up.
    pub async fn cancelled(&self) {
        let mut parent = self.parent.clone();
        loop {
            let current = parent.borrow_and_update().clone();
            tokio::select! {
                () = self.internal.cancelled() => return,
                () = current.cancelled() => return,
                changed = parent.changed() => {
                    if changed.is_err() {
                        // Parent slot is gone; only the internal token is left.
                        self.internal.cancelled().await;
                        return;
                    }
                }
            }
        }
    }
}
