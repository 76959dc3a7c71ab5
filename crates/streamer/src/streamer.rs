//! FrameStreamer - per-frame pipeline from capture to socket
//!
//! `send` applies its gates in a fixed order and reports the first one that
//! stops the frame:
//!
//! 1. connection usable
//! 2. streaming enabled
//! 3. capture timestamp readable
//! 4. pose resolvable, absolute time convertible
//! 5. sensor capability present, sample readable
//! 6. no write in flight
//! 7. encode and hand over to the writer

use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{
    LocatorFactory, NodeId, SensorFrame, SensorType, StreamerConfig, TICKS_PER_SECOND,
};
use pose_resolver::{to_hundreds_of_nanos, PoseResolver, TimestampConverter};
use tracing::{debug, error, instrument, trace};

use crate::connection::{ConnectionManager, ConnectionState, WriteRefused};
use crate::control::StreamingControl;
use crate::diagnostic::{format_diagnostic, SampleInterval};
use crate::metrics::StreamerMetrics;
use crate::wire::encode_frame;
use crate::StreamerError;

/// Result of one `send` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendOutcome {
    /// Message handed to the writer
    Submitted,
    NoConnection,
    StreamingDisabled,
    /// Capture timestamp unreadable or not convertible to absolute time
    TimestampUnavailable,
    /// No pose at the capture time
    PoseUnavailable,
    /// Frame does not expose the requested sensor capability
    CapabilityMismatch,
    /// Capability present but the sample could not be read
    SampleUnavailable,
    /// Previous write still in flight; frame dropped
    WriteInProgress,
    EncodeFailed,
}

impl SendOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::NoConnection => "no_connection",
            Self::StreamingDisabled => "streaming_disabled",
            Self::TimestampUnavailable => "timestamp_unavailable",
            Self::PoseUnavailable => "pose_unavailable",
            Self::CapabilityMismatch => "capability_mismatch",
            Self::SampleUnavailable => "sample_unavailable",
            Self::WriteInProgress => "write_in_progress",
            Self::EncodeFailed => "encode_failed",
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

impl std::fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streams pose-correlated sensor frames to one TCP client
pub struct FrameStreamer {
    connections: ConnectionManager,
    resolver: PoseResolver,
    converter: TimestampConverter,
    control: StreamingControl,
    metrics: Arc<StreamerMetrics>,
    interval: SampleInterval,
}

impl FrameStreamer {
    /// Build a streamer; the listener is not bound until [`FrameStreamer::start`]
    ///
    /// # Errors
    /// Fails when no locator can be created for the configured node.
    pub fn new(
        config: &StreamerConfig,
        factory: Arc<dyn LocatorFactory>,
        converter: TimestampConverter,
    ) -> Result<Self, StreamerError> {
        let resolver = PoseResolver::new(
            factory,
            config.pose.node_id,
            config.pose.reference_frame.clone(),
        )?;
        let control = StreamingControl::default();
        let metrics = Arc::new(StreamerMetrics::new());
        let connections = ConnectionManager::new(
            config.server.service.clone(),
            config.streaming.release_policy,
            control.clone(),
            Arc::clone(&metrics),
        );

        Ok(Self {
            connections,
            resolver,
            converter,
            control,
            metrics,
            interval: SampleInterval::new(),
        })
    }

    /// Bind the listener and accept clients in the background
    #[instrument(name = "frame_streamer_start", skip(self))]
    pub async fn start(&self) -> Result<SocketAddr, StreamerError> {
        self.connections.start().await
    }

    /// Offer one frame for streaming
    ///
    /// Never blocks and never awaits, so it can be called from the capture
    /// thread directly. The frame is only borrowed for the duration of the
    /// call.
    pub fn send(&self, frame: &dyn SensorFrame, sensor_type: SensorType) -> SendOutcome {
        let outcome = self.process(frame, sensor_type);
        self.metrics.record_outcome(outcome);
        observability::record_send_outcome(sensor_type, outcome.as_str());
        outcome
    }

    fn process(&self, frame: &dyn SensorFrame, sensor_type: SensorType) -> SendOutcome {
        if !self.connections.has_usable_connection() {
            trace!("no connection");
            return SendOutcome::NoConnection;
        }
        if !self.control.is_enabled() {
            trace!("streaming disabled");
            return SendOutcome::StreamingDisabled;
        }

        let timestamp = match frame.timestamp() {
            Ok(ts) => ts,
            Err(e) => {
                debug!(error = %e, "frame timestamp unavailable");
                return SendOutcome::TimestampUnavailable;
            }
        };

        // Pose lookup and absolute time share one 100 ns instant
        let ticks = to_hundreds_of_nanos(timestamp.host_ticks, timestamp.host_ticks_per_second);

        let Some(transform) = self.resolver.resolve(ticks) else {
            trace!(ticks, "can't locate frame");
            return SendOutcome::PoseUnavailable;
        };

        let absolute = match self.converter.relative_to_absolute(ticks) {
            Ok(ticks) => ticks,
            Err(e) => {
                debug!(error = %e, "absolute time conversion failed");
                return SendOutcome::TimestampUnavailable;
            }
        };

        let sample = match frame.sample(sensor_type) {
            None => {
                trace!(sensor_type = %sensor_type, "frame lacks sensor capability");
                return SendOutcome::CapabilityMismatch;
            }
            Some(Err(e)) => {
                debug!(sensor_type = %sensor_type, error = %e, "sample unavailable");
                return SendOutcome::SampleUnavailable;
            }
            Some(Ok(sample)) => sample,
        };
        let delta_ms = self.interval.record_ms(ticks, TICKS_PER_SECOND);

        let permit = match self.connections.try_begin_write() {
            Ok(permit) => permit,
            Err(WriteRefused::InProgress) => {
                trace!("write already in progress");
                return SendOutcome::WriteInProgress;
            }
            Err(WriteRefused::NoConnection) => return SendOutcome::NoConnection,
        };

        let text = format_diagnostic(sensor_type, sample, delta_ms);
        let message = match encode_frame(absolute, &text, &transform) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "failed to encode frame");
                return SendOutcome::EncodeFailed;
            }
        };

        match permit.submit(message) {
            Ok(()) => SendOutcome::Submitted,
            Err(WriteRefused::InProgress) => SendOutcome::WriteInProgress,
            Err(WriteRefused::NoConnection) => SendOutcome::NoConnection,
        }
    }

    /// Flip streaming on or off
    pub fn toggle_streaming(&self) {
        self.control.toggle();
    }

    pub fn is_streaming_enabled(&self) -> bool {
        self.control.is_enabled()
    }

    /// Handle sharing the streaming flag (e.g. for a signal handler)
    pub fn control(&self) -> StreamingControl {
        self.control.clone()
    }

    /// Rebind the pose locator to another reference point
    pub fn set_reference(&self, node_id: NodeId) -> Result<(), StreamerError> {
        self.resolver.set_reference(node_id)?;
        self.interval.reset();
        Ok(())
    }

    pub fn node_id(&self) -> NodeId {
        self.resolver.node_id()
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connections.state()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connections.local_addr()
    }

    pub fn metrics(&self) -> &Arc<StreamerMetrics> {
        &self.metrics
    }

    /// Stop accepting and close the client
    pub async fn shutdown(&self) {
        self.connections.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireDecoder;
    use contracts::{
        AccelFrame, ContractError, CoordinateFrame, FrameTimestamp, GyroFrame, Matrix4x4,
        PerceptionTimestamp, Pose, Quaternion, SpatialLocator, Vector3f,
    };
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio::net::TcpStream;
    use tokio::time::sleep;

    const NODE: &str = "7a3d1a3c-0e8f-4c3a-9d4e-2f1b6c5d4e3f";
    const T1: u64 = 1_000_000;
    const OFFSET: i64 = 132_000_000_000_000_000;

    /// Accelerometer frame with a fixed sample
    struct TestFrame {
        host_ticks: u64,
        ticks_per_second: u64,
        accel: Result<Vector3f, ()>,
        broken_timestamp: bool,
    }

    impl TestFrame {
        fn at(host_ticks: u64) -> Self {
            Self {
                host_ticks,
                ticks_per_second: 10_000_000,
                accel: Ok(Vector3f::new(0.0, 3.0, 4.0)),
                broken_timestamp: false,
            }
        }
    }

    impl AccelFrame for TestFrame {
        fn calibrated_acceleration(&self) -> Result<Vector3f, ContractError> {
            self.accel
                .map_err(|_| ContractError::sensor_sample("accelerometer", "read failed"))
        }
    }

    impl SensorFrame for TestFrame {
        fn timestamp(&self) -> Result<FrameTimestamp, ContractError> {
            if self.broken_timestamp {
                return Err(ContractError::timestamp("clock unavailable"));
            }
            Ok(FrameTimestamp {
                host_ticks: self.host_ticks,
                host_ticks_per_second: self.ticks_per_second,
            })
        }

        fn as_accel(&self) -> Option<&dyn AccelFrame> {
            Some(self)
        }
    }

    /// Gyro-only frame
    struct GyroOnly;

    impl GyroFrame for GyroOnly {
        fn calibrated_gyro(&self) -> Result<Vector3f, ContractError> {
            Ok(Vector3f::new(0.1, 0.2, 0.3))
        }
    }

    impl SensorFrame for GyroOnly {
        fn timestamp(&self) -> Result<FrameTimestamp, ContractError> {
            Ok(FrameTimestamp {
                host_ticks: T1,
                host_ticks_per_second: 10_000_000,
            })
        }

        fn as_gyro(&self) -> Option<&dyn GyroFrame> {
            Some(self)
        }
    }

    /// Identity pose for ticks below `tracked_until`
    struct TestLocator {
        tracked_until: u64,
    }

    impl SpatialLocator for TestLocator {
        fn try_locate_at_timestamp(
            &self,
            timestamp: PerceptionTimestamp,
            frame: &CoordinateFrame,
        ) -> Option<Pose> {
            assert_eq!(frame, &"R");
            (timestamp.host_ticks() < self.tracked_until).then_some(Pose {
                orientation: Quaternion::IDENTITY,
                position: Vector3f::default(),
            })
        }
    }

    struct TestFactory;

    impl LocatorFactory for TestFactory {
        fn create_locator_for_node(
            &self,
            _node_id: NodeId,
        ) -> Result<Arc<dyn SpatialLocator>, ContractError> {
            Ok(Arc::new(TestLocator {
                tracked_until: 5_000_000,
            }))
        }
    }

    fn config(service: &str) -> StreamerConfig {
        StreamerConfig {
            version: Default::default(),
            server: contracts::ServerConfig {
                service: service.to_string(),
            },
            pose: contracts::PoseConfig {
                node_id: NODE.parse().unwrap(),
                reference_frame: "R".into(),
            },
            streaming: Default::default(),
            clock: Default::default(),
            simulator: Default::default(),
        }
    }

    fn streamer(service: &str) -> FrameStreamer {
        FrameStreamer::new(
            &config(service),
            Arc::new(TestFactory),
            TimestampConverter::new(OFFSET),
        )
        .unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_no_connection_is_skipped() {
        let streamer = streamer("0");
        assert_eq!(
            streamer.send(&TestFrame::at(T1), SensorType::Accelerometer),
            SendOutcome::NoConnection
        );
        assert_eq!(streamer.metrics().snapshot().no_connection, 1);
    }

    #[tokio::test]
    async fn test_end_to_end_over_tcp() {
        let streamer = streamer("127.0.0.1:0");
        let addr = streamer.start().await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        wait_until(|| streamer.connections().has_usable_connection()).await;

        // No await between the two sends: the writer cannot have finished
        let first = streamer.send(&TestFrame::at(T1), SensorType::Accelerometer);
        let second = streamer.send(&TestFrame::at(T1 + 200_000), SensorType::Accelerometer);
        assert_eq!(first, SendOutcome::Submitted);
        assert_eq!(second, SendOutcome::WriteInProgress);

        let mut decoder = WireDecoder::new();
        let message = decoder.read_message(&mut client).await.unwrap().unwrap();
        assert_eq!(message.timestamp, OFFSET as u64 + T1);
        assert_eq!(message.transform, Matrix4x4::IDENTITY);
        assert_eq!(message.text, "####Accel:  0.0000  3.0000  4.0000 5.000000 0\n");

        streamer.shutdown().await;
        // Exactly one message was written
        assert!(decoder.read_message(&mut client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let streamer = streamer("0");
        let (mut client, server) = duplex(64 * 1024);
        streamer.connections().attach_writer(peer(), server);

        let ticks: Vec<u64> = (0..5).map(|i| T1 + i * 200_000).collect();
        for &t in &ticks {
            wait_until(|| streamer.connection_state() == ConnectionState::ConnectedIdle).await;
            assert_eq!(
                streamer.send(&TestFrame::at(t), SensorType::Accelerometer),
                SendOutcome::Submitted
            );
        }

        let mut decoder = WireDecoder::new();
        for (i, &t) in ticks.iter().enumerate() {
            let message = decoder.read_message(&mut client).await.unwrap().unwrap();
            assert_eq!(message.timestamp, OFFSET as u64 + t);
            let expected_delta = if i == 0 { " 0\n" } else { " 20\n" };
            assert!(message.text.ends_with(expected_delta), "{}", message.text);
        }
    }

    #[tokio::test]
    async fn test_pose_miss_drops_frame() {
        let streamer = streamer("0");
        let (_client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);

        let outcome = streamer.send(&TestFrame::at(6_000_000), SensorType::Accelerometer);
        assert_eq!(outcome, SendOutcome::PoseUnavailable);
        assert_eq!(streamer.connection_state(), ConnectionState::ConnectedIdle);
        assert_eq!(streamer.metrics().snapshot().submitted, 0);
    }

    #[tokio::test]
    async fn test_frame_tick_rate_drives_pose_and_timestamp() {
        let streamer = streamer("0");
        let (mut client, server) = duplex(64 * 1024);
        streamer.connections().attach_writer(peer(), server);

        // 20 MHz counter: 8_000_000 ticks is 0.4 s, inside the tracked window
        for host_ticks in [8_000_000, 8_400_000] {
            wait_until(|| streamer.connection_state() == ConnectionState::ConnectedIdle).await;
            let mut frame = TestFrame::at(host_ticks);
            frame.ticks_per_second = 20_000_000;
            assert_eq!(
                streamer.send(&frame, SensorType::Accelerometer),
                SendOutcome::Submitted
            );
        }

        let mut decoder = WireDecoder::new();
        let first = decoder.read_message(&mut client).await.unwrap().unwrap();
        let second = decoder.read_message(&mut client).await.unwrap().unwrap();
        assert_eq!(first.timestamp, OFFSET as u64 + 4_000_000);
        assert_eq!(second.timestamp, OFFSET as u64 + 4_200_000);
        assert!(second.text.ends_with(" 20\n"), "{}", second.text);

        // 1 kHz counter: 6_000 ticks is 6 s, past the tracked window
        wait_until(|| streamer.connection_state() == ConnectionState::ConnectedIdle).await;
        let mut frame = TestFrame::at(6_000);
        frame.ticks_per_second = 1_000;
        assert_eq!(
            streamer.send(&frame, SensorType::Accelerometer),
            SendOutcome::PoseUnavailable
        );
    }

    #[tokio::test]
    async fn test_capability_and_sample_failures() {
        let streamer = streamer("0");
        let (_client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);

        assert_eq!(
            streamer.send(&GyroOnly, SensorType::Accelerometer),
            SendOutcome::CapabilityMismatch
        );

        let mut frame = TestFrame::at(T1);
        frame.accel = Err(());
        assert_eq!(
            streamer.send(&frame, SensorType::Accelerometer),
            SendOutcome::SampleUnavailable
        );

        let mut frame = TestFrame::at(T1);
        frame.broken_timestamp = true;
        assert_eq!(
            streamer.send(&frame, SensorType::Accelerometer),
            SendOutcome::TimestampUnavailable
        );
        assert_eq!(streamer.connection_state(), ConnectionState::ConnectedIdle);
    }

    #[tokio::test]
    async fn test_gyro_frames_use_gyro_label() {
        let streamer = streamer("0");
        let (mut client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);

        assert_eq!(
            streamer.send(&GyroOnly, SensorType::Gyroscope),
            SendOutcome::Submitted
        );
        let mut decoder = WireDecoder::new();
        let message = decoder.read_message(&mut client).await.unwrap().unwrap();
        assert!(message.text.starts_with("####Gyro: "));
    }

    #[tokio::test]
    async fn test_toggle_gates_streaming() {
        let streamer = streamer("0");
        let (_client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);

        streamer.toggle_streaming();
        assert!(!streamer.is_streaming_enabled());
        assert_eq!(
            streamer.send(&TestFrame::at(T1), SensorType::Accelerometer),
            SendOutcome::StreamingDisabled
        );
        // Toggling leaves the connection alone
        assert!(streamer.connections().has_usable_connection());

        streamer.toggle_streaming();
        assert_eq!(
            streamer.send(&TestFrame::at(T1), SensorType::Accelerometer),
            SendOutcome::Submitted
        );
    }

    #[tokio::test]
    async fn test_new_connection_re_enables_streaming() {
        let streamer = streamer("0");
        streamer.toggle_streaming();

        let (_client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);
        assert!(streamer.is_streaming_enabled());
    }

    #[tokio::test]
    async fn test_absolute_time_overflow_is_skipped() {
        let streamer = FrameStreamer::new(
            &config("0"),
            Arc::new(TestFactory),
            TimestampConverter::new(-(T1 as i64) - 1),
        )
        .unwrap();
        let (_client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);

        assert_eq!(
            streamer.send(&TestFrame::at(T1), SensorType::Accelerometer),
            SendOutcome::TimestampUnavailable
        );
    }

    #[tokio::test]
    async fn test_send_from_plain_thread() {
        let streamer = Arc::new(streamer("0"));
        let (mut client, server) = duplex(4096);
        streamer.connections().attach_writer(peer(), server);

        let producer = Arc::clone(&streamer);
        let outcome = std::thread::spawn(move || {
            producer.send(&TestFrame::at(T1), SensorType::Accelerometer)
        })
        .join()
        .unwrap();
        assert_eq!(outcome, SendOutcome::Submitted);

        let mut decoder = WireDecoder::new();
        assert!(decoder.read_message(&mut client).await.unwrap().is_some());
    }
}
