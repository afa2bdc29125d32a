// ABOUTME: Single-assignment completion signal — the first call to set() wins, later calls are no-ops
// ABOUTME: Distinct from a broadcast channel: observers always see the same cause regardless of when they subscribe

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::TransportError;

/// Why a closed latch fired.
#[derive(Debug, Clone)]
pub enum LatchCause {
    /// Closed deliberately, no error.
    Success,
    /// Closed because of an error.
    Error(Arc<TransportError>),
}

/// A single-assignment completion signal shared by clones.
///
/// The first `set()` call records the cause; every later call observes that
/// a cause is already recorded and does nothing. `await_closed` resolves as
/// soon as a cause is recorded, for every clone, regardless of subscription
/// order.
#[derive(Clone)]
pub struct ClosedLatch {
    tx: Arc<watch::Sender<Option<LatchCause>>>,
}

impl ClosedLatch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Attempts to fire the latch. Returns `true` if this call was the one
    /// that set the cause, `false` if the latch was already set.
    pub fn set(&self, cause: LatchCause) -> bool {
        let mut won = false;
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(cause);
                won = true;
                true
            } else {
                false
            }
        });
        won
    }

    pub fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn cause(&self) -> Option<LatchCause> {
        self.tx.borrow().clone()
    }

    /// Resolves with the latch's cause once one has been recorded.
    pub async fn await_closed(&self) -> LatchCause {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(cause) = rx.borrow().clone() {
                return cause;
            }
            if rx.changed().await.is_err() {
                return LatchCause::Success;
            }
        }
    }
}

impl Default for ClosedLatch {
    fn default() -> Self {
        Self::new()
    }
}
