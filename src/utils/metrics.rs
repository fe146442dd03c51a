//! Observability and Metrics
//!
//! Counters for frames flowing through the interception pipeline, replies
//! awaited by the correlator and sessions attached to the interceptor.
//!
//! Uses atomic counters so handlers and transport tasks can record without locks.

use crate::protocol::identifier::Direction;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for one interceptor
#[derive(Debug)]
pub struct Metrics {
    /// Frames received from the server
    pub frames_incoming: AtomicU64,
    /// Frames received from the client
    pub frames_outgoing: AtomicU64,
    /// Bytes received in either direction
    pub bytes_received: AtomicU64,
    /// Frames relayed after dispatch
    pub frames_relayed: AtomicU64,
    /// Frames blocked by a handler
    pub frames_blocked: AtomicU64,
    /// Frames whose opcode is not in the active dialect
    pub frames_unclassified: AtomicU64,
    /// Frames composed by the core and injected into the stream
    pub frames_injected: AtomicU64,
    /// Typed decodes that failed
    pub decode_failures: AtomicU64,
    /// Handler invocations
    pub handler_invocations: AtomicU64,
    /// Correlator waits that received their reply
    pub replies_fulfilled: AtomicU64,
    /// Correlator waits that timed out or were cancelled
    pub replies_timed_out: AtomicU64,
    /// Sessions attached
    pub sessions_total: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_incoming: AtomicU64::new(0),
            frames_outgoing: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_relayed: AtomicU64::new(0),
            frames_blocked: AtomicU64::new(0),
            frames_unclassified: AtomicU64::new(0),
            frames_injected: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            handler_invocations: AtomicU64::new(0),
            replies_fulfilled: AtomicU64::new(0),
            replies_timed_out: AtomicU64::new(0),
            sessions_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a frame entering the pipeline
    pub fn frame_received(&self, direction: Direction, byte_count: u64) {
        match direction {
            Direction::Incoming => self.frames_incoming.fetch_add(1, Ordering::Relaxed),
            Direction::Outgoing => self.frames_outgoing.fetch_add(1, Ordering::Relaxed),
        };
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn frame_relayed(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_blocked(&self) {
        self.frames_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_unclassified(&self) {
        self.frames_unclassified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_injected(&self) {
        self.frames_injected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handler_invoked(&self) {
        self.handler_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reply_fulfilled(&self) {
        self.replies_fulfilled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reply_timed_out(&self) {
        self.replies_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_attached(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_incoming: self.frames_incoming.load(Ordering::Relaxed),
            frames_outgoing: self.frames_outgoing.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            frames_blocked: self.frames_blocked.load(Ordering::Relaxed),
            frames_unclassified: self.frames_unclassified.load(Ordering::Relaxed),
            frames_injected: self.frames_injected.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            replies_fulfilled: self.replies_fulfilled.load(Ordering::Relaxed),
            replies_timed_out: self.replies_timed_out.load(Ordering::Relaxed),
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            frames_incoming = snapshot.frames_incoming,
            frames_outgoing = snapshot.frames_outgoing,
            bytes_received = snapshot.bytes_received,
            frames_relayed = snapshot.frames_relayed,
            frames_blocked = snapshot.frames_blocked,
            frames_unclassified = snapshot.frames_unclassified,
            frames_injected = snapshot.frames_injected,
            decode_failures = snapshot.decode_failures,
            handler_invocations = snapshot.handler_invocations,
            replies_fulfilled = snapshot.replies_fulfilled,
            replies_timed_out = snapshot.replies_timed_out,
            sessions_total = snapshot.sessions_total,
            uptime_seconds = snapshot.uptime_seconds,
            "Interceptor metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_incoming: u64,
    pub frames_outgoing: u64,
    pub bytes_received: u64,
    pub frames_relayed: u64,
    pub frames_blocked: u64,
    pub frames_unclassified: u64,
    pub frames_injected: u64,
    pub decode_failures: u64,
    pub handler_invocations: u64,
    pub replies_fulfilled: u64,
    pub replies_timed_out: u64,
    pub sessions_total: u64,
    pub uptime_seconds: u64,
}
