//! Streamer metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use crate::SendOutcome;

/// Lock-free counters for one streamer
#[derive(Debug, Default)]
pub struct StreamerMetrics {
    /// `send` results
    submitted: AtomicU64,
    no_connection: AtomicU64,
    streaming_disabled: AtomicU64,
    timestamp_unavailable: AtomicU64,
    pose_unavailable: AtomicU64,
    capability_mismatch: AtomicU64,
    sample_unavailable: AtomicU64,
    write_in_progress: AtomicU64,
    encode_failed: AtomicU64,

    /// Writer results
    messages_written: AtomicU64,
    bytes_written: AtomicU64,
    write_failures: AtomicU64,
    peer_resets: AtomicU64,

    /// Accepted client connections
    connections_accepted: AtomicU64,
}

impl StreamerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one `send` result
    pub fn record_outcome(&self, outcome: SendOutcome) {
        let counter = match outcome {
            SendOutcome::Submitted => &self.submitted,
            SendOutcome::NoConnection => &self.no_connection,
            SendOutcome::StreamingDisabled => &self.streaming_disabled,
            SendOutcome::TimestampUnavailable => &self.timestamp_unavailable,
            SendOutcome::PoseUnavailable => &self.pose_unavailable,
            SendOutcome::CapabilityMismatch => &self.capability_mismatch,
            SendOutcome::SampleUnavailable => &self.sample_unavailable,
            SendOutcome::WriteInProgress => &self.write_in_progress,
            SendOutcome::EncodeFailed => &self.encode_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a message fully written to the socket
    pub fn inc_message_written(&self, bytes: usize) {
        self.messages_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn inc_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_peer_reset(&self) {
        self.peer_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn messages_written(&self) -> u64 {
        self.messages_written.load(Ordering::Relaxed)
    }

    pub fn peer_resets(&self) -> u64 {
        self.peer_resets.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> StreamerMetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StreamerMetricsSnapshot {
            submitted: load(&self.submitted),
            no_connection: load(&self.no_connection),
            streaming_disabled: load(&self.streaming_disabled),
            timestamp_unavailable: load(&self.timestamp_unavailable),
            pose_unavailable: load(&self.pose_unavailable),
            capability_mismatch: load(&self.capability_mismatch),
            sample_unavailable: load(&self.sample_unavailable),
            write_in_progress: load(&self.write_in_progress),
            encode_failed: load(&self.encode_failed),
            messages_written: load(&self.messages_written),
            bytes_written: load(&self.bytes_written),
            write_failures: load(&self.write_failures),
            peer_resets: load(&self.peer_resets),
            connections_accepted: load(&self.connections_accepted),
        }
    }
}

/// Snapshot of streamer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamerMetricsSnapshot {
    pub submitted: u64,
    pub no_connection: u64,
    pub streaming_disabled: u64,
    pub timestamp_unavailable: u64,
    pub pose_unavailable: u64,
    pub capability_mismatch: u64,
    pub sample_unavailable: u64,
    pub write_in_progress: u64,
    pub encode_failed: u64,
    pub messages_written: u64,
    pub bytes_written: u64,
    pub write_failures: u64,
    pub peer_resets: u64,
    pub connections_accepted: u64,
}

impl StreamerMetricsSnapshot {
    /// Total `send` calls
    pub fn frames_offered(&self) -> u64 {
        self.submitted + self.frames_skipped()
    }

    /// `send` calls that did not produce a message
    pub fn frames_skipped(&self) -> u64 {
        self.no_connection
            + self.streaming_disabled
            + self.timestamp_unavailable
            + self.pose_unavailable
            + self.capability_mismatch
            + self.sample_unavailable
            + self.write_in_progress
            + self.encode_failed
    }
}
