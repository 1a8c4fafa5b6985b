// SPDX-License-Identifier: MIT OR Apache-2.0
//! Idempotent kill request shared between a run and its reader task.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;

/// A one-shot termination request for a CLI process.
///
/// Cloneable and backed by an `Arc`. Only the first [`trigger`](Self::trigger)
/// wakes the reader task; later calls are counted but otherwise no-ops, so it
/// is safe to trigger after the process has already exited.
#[derive(Clone, Default)]
pub struct KillSwitch {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    requests: AtomicUsize,
    notify: Notify,
}

impl KillSwitch {
    /// Create an untriggered switch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination. Returns `true` only for the first request.
    pub fn trigger(&self) -> bool {
        let first = self.inner.requests.fetch_add(1, Ordering::SeqCst) == 0;
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Whether termination has been requested.
    pub fn is_triggered(&self) -> bool {
        self.requests() > 0
    }

    /// How many times [`trigger`](Self::trigger) has been called.
    pub fn requests(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Wait until termination is requested (returns immediately if it was).
    pub async fn triggered(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger is not missed.
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillSwitch")
            .field("requests", &self.requests())
            .finish()
    }
}
