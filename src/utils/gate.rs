//! # Service Stop Gate
//!
//! Cancellation gate awaited by the service-lifecycle task.
//!
//! `start_service` arms the gate; `stop_service` releases it exactly once
//! per start cycle. Waiters park on a `tokio::sync::Notify` rather than
//! busy looping, and releasing an already released gate is a no-op, so
//! calling stop twice never panics or deadlocks.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::debug;

/// One-shot-per-cycle stop signal.
#[derive(Debug)]
pub struct StopGate {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopGate {
    pub fn new() -> Self {
        Self {
            // a gate that was never armed behaves as already released
            stopped: AtomicBool::new(true),
            notify: Notify::new(),
        }
    }

    /// Arm the gate for a new start cycle.
    pub fn arm(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    /// Release all current and future waiters. Idempotent.
    pub fn release(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!("stop gate released");
        }
        self.notify.notify_waiters();
    }

    /// Whether the gate has been released (or never armed).
    pub fn is_released(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Park until the gate is released.
    pub async fn wait(&self) {
        loop {
            // register interest before checking the flag to avoid a lost wakeup
            let notified = self.notify.notified();
            if self.stopped.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for StopGate {
    fn default() -> Self {
        Self::new()
    }
}
