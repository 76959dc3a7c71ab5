//! Stream session statistics.

use std::net::SocketAddr;
use std::time::Duration;

use observability::RunningStats;
use streamer::StreamerMetricsSnapshot;

/// Statistics from one `run`
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Address the streamer listened on
    pub local_addr: Option<SocketAddr>,

    /// Frames captured by the simulated device
    pub frames_captured: u64,

    /// Streamer counters at shutdown
    pub streamer: StreamerMetricsSnapshot,

    /// Messages written per second, sampled once a second
    pub write_rate: RunningStats,

    /// Streaming toggles requested via SIGUSR1
    pub toggles: u64,

    /// Total duration of the session
    pub duration: Duration,
}

impl SessionStats {
    /// Messages written per second over the whole session
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.streamer.messages_written as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of offered frames that never reached the socket, as percentage
    pub fn skip_rate(&self) -> f64 {
        let offered = self.streamer.frames_offered();
        if offered > 0 {
            (self.streamer.frames_skipped() as f64 / offered as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let s = &self.streamer;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Streamer Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        match self.local_addr {
            Some(addr) => println!("   ├─ Listening on: {}", addr),
            None => println!("   ├─ Listening on: (not bound)"),
        }
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames captured: {}", self.frames_captured);
        println!("   ├─ Connections accepted: {}", s.connections_accepted);
        println!("   └─ Streaming toggles: {}", self.toggles);

        println!("\n📤 Messages");
        println!("   ├─ Submitted: {}", s.submitted);
        println!("   ├─ Written: {} ({} bytes)", s.messages_written, s.bytes_written);
        println!("   ├─ Throughput: {:.2} msg/s", self.throughput());
        println!("   ├─ Per-second rate: {}", self.write_rate.summary());
        println!("   ├─ Write failures: {}", s.write_failures);
        println!("   └─ Peer resets: {}", s.peer_resets);

        println!("\n⏭️  Skipped frames ({:.2}%)", self.skip_rate());
        println!("   ├─ No connection: {}", s.no_connection);
        println!("   ├─ Streaming disabled: {}", s.streaming_disabled);
        println!("   ├─ Timestamp unavailable: {}", s.timestamp_unavailable);
        println!("   ├─ Pose unavailable: {}", s.pose_unavailable);
        println!("   ├─ Capability mismatch: {}", s.capability_mismatch);
        println!("   ├─ Sample unavailable: {}", s.sample_unavailable);
        println!("   ├─ Write in progress: {}", s.write_in_progress);
        println!("   └─ Encode failed: {}", s.encode_failed);

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = SessionStats {
            streamer: StreamerMetricsSnapshot {
                submitted: 30,
                messages_written: 30,
                no_connection: 10,
                pose_unavailable: 10,
                ..Default::default()
            },
            duration: Duration::from_secs(10),
            ..Default::default()
        };

        assert!((stats.throughput() - 3.0).abs() < 1e-9);
        assert!((stats.skip_rate() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_session_rates_are_zero() {
        let stats = SessionStats::default();
        assert_eq!(stats.throughput(), 0.0);
        assert_eq!(stats.skip_rate(), 0.0);
    }
}
