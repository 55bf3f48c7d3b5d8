//! Observability and Metrics
//!
//! Thread-safe counters for monitoring channel health: connection churn,
//! handshake outcomes, and frame traffic. Uses atomic counters so transport
//! callbacks can record events without additional locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for the secure channel.
#[derive(Debug)]
pub struct Metrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Total handshake attempts (phase-1 frames seen)
    pub handshakes_total: AtomicU64,
    /// Successful handshakes
    pub handshakes_success: AtomicU64,
    /// Failed handshakes (bad proof, bad length, out of sequence)
    pub handshakes_failed: AtomicU64,
    /// Data frames delivered to observers
    pub frames_delivered: AtomicU64,
    /// Data frames sent to the peer
    pub frames_sent: AtomicU64,
    /// Frames rejected before authentication
    pub unauthenticated_rejects: AtomicU64,
    /// Frames that failed envelope validation
    pub malformed_frames: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            handshakes_total: AtomicU64::new(0),
            handshakes_success: AtomicU64::new(0),
            handshakes_failed: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            unauthenticated_rejects: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter by one.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Seconds since the collector was created.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Emit a snapshot of all counters at info level.
    pub fn log_summary(&self) {
        info!(
            uptime_secs = self.uptime_secs(),
            connections = self.connections_total.load(Ordering::Relaxed),
            handshakes = self.handshakes_total.load(Ordering::Relaxed),
            handshakes_ok = self.handshakes_success.load(Ordering::Relaxed),
            handshakes_failed = self.handshakes_failed.load(Ordering::Relaxed),
            frames_in = self.frames_delivered.load(Ordering::Relaxed),
            frames_out = self.frames_sent.load(Ordering::Relaxed),
            rejected = self.unauthenticated_rejects.load(Ordering::Relaxed),
            malformed = self.malformed_frames.load(Ordering::Relaxed),
            "channel metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
