//! Stream session orchestrator - wires the simulated device to the streamer.
//!
//! The device captures on its own thread and calls `FrameStreamer::send`
//! directly from there; the session task only watches signals, the clock
//! and the capture thread.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{LocatorFactory, StreamerConfig};
use device_sim::{HostClock, MockImuConfig, MockImuSource, SimulatedImuFrame, SimulatedPoseService};
use pose_resolver::{to_hundreds_of_nanos, TimestampConverter};
use streamer::FrameStreamer;
use tracing::{debug, info, warn};

use super::{SessionStats, ToggleSignal};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated streamer configuration
    pub streamer: StreamerConfig,

    /// Stop after the device captured this many frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Session timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One streamer plus its simulated device
pub struct StreamSession {
    config: SessionConfig,
    clock: HostClock,
    factory: Arc<dyn LocatorFactory>,
}

impl StreamSession {
    /// Session whose poses come from the orbiting rig simulator
    pub fn new(config: SessionConfig) -> Self {
        let factory = Arc::new(SimulatedPoseService::new(config.streamer.simulator.clone()));
        Self::with_factory(config, factory)
    }

    /// Session with a caller-supplied pose service
    pub fn with_factory(config: SessionConfig, factory: Arc<dyn LocatorFactory>) -> Self {
        Self {
            config,
            clock: HostClock::default(),
            factory,
        }
    }

    /// Run until `shutdown` resolves, the timeout expires or the device
    /// reaches `max_frames`
    pub async fn run<F>(self, shutdown: F, mut toggle: ToggleSignal) -> Result<SessionStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = &self.config.streamer;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let converter = match config.clock.epoch_offset_ticks {
            Some(offset) => TimestampConverter::new(offset),
            None => TimestampConverter::anchored(to_hundreds_of_nanos(
                self.clock.now_ticks(),
                self.clock.ticks_per_second(),
            )),
        };
        debug!(offset_ticks = converter.offset_ticks(), "Timestamp converter ready");

        let streamer = Arc::new(
            FrameStreamer::new(config, Arc::clone(&self.factory), converter)
                .context("Failed to create streamer")?,
        );
        let local_addr = streamer
            .start()
            .await
            .with_context(|| format!("Failed to listen on '{}'", config.server.service))?;

        info!(
            addr = %local_addr,
            node_id = %config.pose.node_id,
            frame = %config.pose.reference_frame,
            sensor_type = %config.streaming.sensor_type,
            "Streamer listening"
        );

        let sensor_type = config.streaming.sensor_type;
        let mut source = MockImuSource::new(
            MockImuConfig {
                sensor_type,
                frequency_hz: config.simulator.frequency_hz,
                max_frames: self.config.max_frames,
                ..Default::default()
            },
            self.clock,
        );
        let sink = Arc::clone(&streamer);
        source.listen(Arc::new(move |frame: &SimulatedImuFrame| {
            sink.send(frame, sensor_type);
        }));

        info!(
            frequency_hz = config.simulator.frequency_hz,
            max_frames = ?self.config.max_frames,
            "Simulated device capturing"
        );

        let mut stats = SessionStats {
            local_addr: Some(local_addr),
            ..Default::default()
        };

        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.tick().await;
        let mut last_written = 0u64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping session...");
                    break;
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = self.config.timeout.map(|t| t.as_secs()), "Session timed out");
                    break;
                }
                _ = toggle.recv() => {
                    streamer.toggle_streaming();
                    stats.toggles += 1;
                }
                _ = ticker.tick() => {
                    let written = streamer.metrics().messages_written();
                    stats.write_rate.push(written.saturating_sub(last_written) as f64);
                    last_written = written;

                    debug!(
                        written,
                        state = ?streamer.connection_state(),
                        streaming = streamer.is_streaming_enabled(),
                        "Session progress"
                    );

                    if !source.is_listening() {
                        info!(frames = source.frames_emitted(), "Reached max frames limit");
                        break;
                    }
                }
            }
        }

        info!("Shutting down session...");
        stats.frames_captured = tokio::task::spawn_blocking(move || {
            source.stop();
            source.frames_emitted()
        })
        .await
        .context("Capture thread shutdown failed")?;

        streamer.shutdown().await;

        stats.streamer = streamer.metrics().snapshot();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            written = stats.streamer.messages_written,
            "Session shutdown complete"
        );

        Ok(stats)
    }
}
