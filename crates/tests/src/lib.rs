//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件加载 (TOML / JSON)
//! - 模拟设备 -> FrameStreamer -> TCP 客户端 的端到端测试
//! - 断线重连、流开关、位姿丢失

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use config_loader::ConfigLoader;
    use contracts::{ReleasePolicy, SensorType};

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_file() {
        let file = write_file(
            ".toml",
            r#"
[server]
service = "127.0.0.1:6001"

[pose]
node_id = "7a3d1a3c-0e8f-4c3a-9d4e-2f1b6c5d4e3f"
reference_frame = "lab"

[streaming]
sensor_type = "magnetometer"
release_policy = "on_peer_reset"
"#,
        );

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.socket_addr().unwrap().port(), 6001);
        assert_eq!(config.pose.reference_frame.name(), "lab");
        assert_eq!(config.streaming.sensor_type, SensorType::Magnetometer);
        assert_eq!(config.streaming.release_policy, ReleasePolicy::OnPeerReset);
    }

    #[test]
    fn test_json_round_trips_through_file() {
        let file = write_file(
            ".toml",
            r#"
[pose]
node_id = "7a3d1a3c-0e8f-4c3a-9d4e-2f1b6c5d4e3f"
"#,
        );
        let config = ConfigLoader::load_from_path(file.path()).unwrap();

        let json = write_file(".json", &ConfigLoader::to_json(&config).unwrap());
        let reloaded = ConfigLoader::load_from_path(json.path()).unwrap();
        assert_eq!(reloaded.pose.node_id, config.pose.node_id);
        assert_eq!(reloaded.server.service, "5000");
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = write_file(".yaml", "pose: {}");
        assert!(ConfigLoader::load_from_path(file.path()).is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, CoordinateFrame, FrameTimestamp, LocatorFactory, Matrix4x4, NodeId,
        PerceptionTimestamp, Pose, SensorType, SpatialLocator, StreamerConfig, Vector3f,
        TICKS_PER_SECOND,
    };
    use device_sim::{
        FixedPoseFactory, HostClock, MockImuConfig, MockImuSource, SimulatedImuFrame,
    };
    use pose_resolver::TimestampConverter;
    use streamer::{FrameStreamer, SendOutcome, WireDecoder, WireMessage};
    use tokio::net::TcpStream;
    use tokio::time::{sleep, timeout};

    const OFFSET: i64 = 132_000_000_000_000_000;

    fn config() -> StreamerConfig {
        ConfigLoader::load_from_str(
            r#"
[server]
service = "127.0.0.1:0"

[pose]
node_id = "7a3d1a3c-0e8f-4c3a-9d4e-2f1b6c5d4e3f"
reference_frame = "R"
"#,
            ConfigFormat::Toml,
        )
        .unwrap()
    }

    async fn start(factory: Arc<dyn LocatorFactory>) -> (Arc<FrameStreamer>, SocketAddr) {
        let streamer = FrameStreamer::new(
            &config(),
            factory,
            TimestampConverter::new(OFFSET),
        )
        .unwrap();
        let addr = streamer.start().await.unwrap();
        (Arc::new(streamer), addr)
    }

    /// Connect and wait until the streamer has taken the client
    async fn connect(streamer: &FrameStreamer, addr: SocketAddr) -> TcpStream {
        let client = TcpStream::connect(addr).await.unwrap();
        assert!(
            wait_for(|| streamer.connections().has_usable_connection()).await,
            "client never became the active connection"
        );
        client
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..300 {
            if cond() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn read(decoder: &mut WireDecoder, client: &mut TcpStream) -> WireMessage {
        timeout(Duration::from_secs(5), decoder.read_message(client))
            .await
            .expect("timed out waiting for a message")
            .unwrap()
            .expect("stream closed")
    }

    fn accel_frame(host_ticks: u64) -> SimulatedImuFrame {
        SimulatedImuFrame::new(
            SensorType::Accelerometer,
            FrameTimestamp {
                host_ticks,
                host_ticks_per_second: TICKS_PER_SECOND,
            },
            Vector3f::new(0.0, -9.81, 0.0),
        )
    }

    /// Send and wait until the writer finished with the message
    async fn send_and_flush(streamer: &FrameStreamer, frame: &SimulatedImuFrame) -> SendOutcome {
        let before = streamer.metrics().messages_written();
        let outcome = streamer.send(frame, SensorType::Accelerometer);
        if outcome.is_submitted() {
            assert!(wait_for(|| streamer.metrics().messages_written() > before).await);
        }
        outcome
    }

    /// No pose while `from <= host_ticks < to`
    struct GapLocator {
        from: u64,
        to: u64,
    }

    impl SpatialLocator for GapLocator {
        fn try_locate_at_timestamp(
            &self,
            timestamp: PerceptionTimestamp,
            _frame: &CoordinateFrame,
        ) -> Option<Pose> {
            let ticks = timestamp.host_ticks();
            (ticks < self.from || ticks >= self.to).then_some(Pose::IDENTITY)
        }
    }

    struct GapFactory {
        from: u64,
        to: u64,
    }

    impl LocatorFactory for GapFactory {
        fn create_locator_for_node(
            &self,
            _node_id: NodeId,
        ) -> Result<Arc<dyn SpatialLocator>, ContractError> {
            Ok(Arc::new(GapLocator {
                from: self.from,
                to: self.to,
            }))
        }
    }

    /// End-to-end test: MockImuSource (capture thread) -> FrameStreamer -> TCP client
    #[tokio::test]
    async fn test_e2e_mock_device_stream() {
        let (streamer, addr) = start(Arc::new(FixedPoseFactory::identity())).await;
        let mut client = connect(&streamer, addr).await;

        let mut source = MockImuSource::new(
            MockImuConfig {
                frequency_hz: 200.0,
                max_frames: Some(400),
                ..Default::default()
            },
            HostClock::default(),
        );
        let sink = Arc::clone(&streamer);
        source.listen(Arc::new(move |frame: &SimulatedImuFrame| {
            sink.send(frame, SensorType::Accelerometer);
        }));

        let mut decoder = WireDecoder::new();
        let mut messages = Vec::new();
        for _ in 0..5 {
            messages.push(read(&mut decoder, &mut client).await);
        }
        source.stop();

        for message in &messages {
            assert!(message.text.starts_with("####Accel: "), "got {:?}", message.text);
            assert!(message.text.ends_with('\n'));
            assert_eq!(message.transform, Matrix4x4::IDENTITY);
            assert!(message.timestamp > OFFSET as u64);
        }
        assert!(messages.windows(2).all(|w| w[1].timestamp > w[0].timestamp));

        let snapshot = streamer.metrics().snapshot();
        assert_eq!(snapshot.frames_offered(), source.frames_emitted());
        assert!(snapshot.submitted >= 5);

        streamer.shutdown().await;
    }

    /// Frames captured while the pose is unknown never reach the client
    #[tokio::test]
    async fn test_pose_gap_drops_frames() {
        let (streamer, addr) = start(Arc::new(GapFactory {
            from: 2_000_000,
            to: 3_000_000,
        }))
        .await;
        let mut client = connect(&streamer, addr).await;
        let mut decoder = WireDecoder::new();

        let ticks = [1_000_000u64, 2_000_000, 2_500_000, 3_000_000];
        let mut outcomes = Vec::new();
        for t in ticks {
            outcomes.push(send_and_flush(&streamer, &accel_frame(t)).await);
        }
        assert_eq!(
            outcomes,
            vec![
                SendOutcome::Submitted,
                SendOutcome::PoseUnavailable,
                SendOutcome::PoseUnavailable,
                SendOutcome::Submitted,
            ]
        );

        let first = read(&mut decoder, &mut client).await;
        let second = read(&mut decoder, &mut client).await;
        assert_eq!(first.timestamp, OFFSET as u64 + 1_000_000);
        assert_eq!(second.timestamp, OFFSET as u64 + 3_000_000);
        // Rate is measured between streamed samples only
        assert!(second.text.ends_with(" 200\n"), "got {:?}", second.text);

        streamer.shutdown().await;
    }

    /// A client that goes away is replaced by the next one
    #[tokio::test]
    async fn test_reconnect_after_client_closes() {
        let (streamer, addr) = start(Arc::new(FixedPoseFactory::identity())).await;

        let mut first = connect(&streamer, addr).await;
        let mut decoder = WireDecoder::new();
        assert!(send_and_flush(&streamer, &accel_frame(1_000_000)).await.is_submitted());
        read(&mut decoder, &mut first).await;

        drop(first);
        assert!(
            wait_for(|| !streamer.connections().has_usable_connection()).await,
            "closed client still active"
        );
        assert_eq!(
            streamer.send(&accel_frame(1_100_000), SensorType::Accelerometer),
            SendOutcome::NoConnection
        );

        let mut second = connect(&streamer, addr).await;
        let mut decoder = WireDecoder::new();
        assert!(send_and_flush(&streamer, &accel_frame(1_200_000)).await.is_submitted());
        let message = read(&mut decoder, &mut second).await;
        assert_eq!(message.timestamp, OFFSET as u64 + 1_200_000);

        assert_eq!(streamer.metrics().snapshot().connections_accepted, 2);
        streamer.shutdown().await;
    }

    /// Toggling off skips frames without dropping the client
    #[tokio::test]
    async fn test_toggle_pauses_stream() {
        let (streamer, addr) = start(Arc::new(FixedPoseFactory::identity())).await;
        let mut client = connect(&streamer, addr).await;
        let mut decoder = WireDecoder::new();

        streamer.toggle_streaming();
        assert_eq!(
            streamer.send(&accel_frame(1_000_000), SensorType::Accelerometer),
            SendOutcome::StreamingDisabled
        );
        assert!(streamer.connections().has_usable_connection());

        streamer.toggle_streaming();
        assert!(send_and_flush(&streamer, &accel_frame(2_000_000)).await.is_submitted());

        let message = read(&mut decoder, &mut client).await;
        assert_eq!(message.timestamp, OFFSET as u64 + 2_000_000);

        streamer.shutdown().await;
    }

    /// Capability requested from a frame that does not carry it
    #[tokio::test]
    async fn test_wrong_sensor_type_is_skipped() {
        let (streamer, addr) = start(Arc::new(FixedPoseFactory::identity())).await;
        let _client = connect(&streamer, addr).await;

        let outcome = streamer.send(&accel_frame(1_000_000), SensorType::Gyroscope);
        assert_eq!(outcome, SendOutcome::CapabilityMismatch);
        assert_eq!(streamer.metrics().snapshot().capability_mismatch, 1);

        streamer.shutdown().await;
    }
}
