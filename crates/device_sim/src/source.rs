//! Mock IMU capture loop
//!
//! Runs on a dedicated thread like a device capture callback, so consumers
//! see frames arrive off the async runtime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{FrameTimestamp, SensorType, Vector3f};
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::clock::HostClock;
use crate::frame::SimulatedImuFrame;

/// Receives each captured frame; the frame is only lent for the call
pub type FrameCallback = Arc<dyn Fn(&SimulatedImuFrame) + Send + Sync>;

/// Mock IMU configuration
#[derive(Debug, Clone)]
pub struct MockImuConfig {
    pub sensor_type: SensorType,
    /// Capture rate (Hz)
    pub frequency_hz: f64,
    /// Uniform noise amplitude added to every component
    pub noise: f32,
    /// Stop after this many frames (None = until `stop`)
    pub max_frames: Option<u64>,
}

impl Default for MockImuConfig {
    fn default() -> Self {
        Self {
            sensor_type: SensorType::Accelerometer,
            frequency_hz: 50.0,
            noise: 0.02,
            max_frames: None,
        }
    }
}

/// Simulated IMU producing frames at a fixed rate
pub struct MockImuSource {
    config: MockImuConfig,
    clock: HostClock,
    listening: Arc<AtomicBool>,
    emitted: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl MockImuSource {
    pub fn new(config: MockImuConfig, clock: HostClock) -> Self {
        Self {
            config,
            clock,
            listening: Arc::new(AtomicBool::new(false)),
            emitted: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Noise-free reading for `sensor_type` at `t` seconds
    ///
    /// Gravity on -y for the accelerometer, a slow yaw rate for the
    /// gyroscope and a fixed field for the magnetometer, each with a small
    /// oscillation.
    pub fn base_sample(sensor_type: SensorType, t: f64) -> Vector3f {
        let wobble = (t * 2.0).sin() as f32;
        match sensor_type {
            SensorType::Accelerometer => Vector3f::new(0.05 * wobble, -9.81, 0.05 * wobble),
            SensorType::Gyroscope => Vector3f::new(0.01 * wobble, 0.785, -0.01 * wobble),
            SensorType::Magnetometer => Vector3f::new(22.0 + wobble, -41.0, 5.0 - wobble),
        }
    }

    /// Start capturing; calling again while running does nothing
    pub fn listen(&mut self, callback: FrameCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let clock = self.clock;
        let listening = Arc::clone(&self.listening);
        let emitted = Arc::clone(&self.emitted);
        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz);

        let spawned = thread::Builder::new()
            .name("mock-imu".to_string())
            .spawn(move || {
                let mut rng = rand::rng();
                let start_ticks = clock.now_ticks();

                debug!(
                    sensor_type = %config.sensor_type,
                    frequency_hz = config.frequency_hz,
                    "mock IMU started"
                );

                while listening.load(Ordering::Relaxed) {
                    let host_ticks = clock.now_ticks();
                    let t = (host_ticks - start_ticks) as f64 / clock.ticks_per_second() as f64;

                    let base = Self::base_sample(config.sensor_type, t);
                    let mut jitter = || {
                        if config.noise > 0.0 {
                            rng.random_range(-config.noise..=config.noise)
                        } else {
                            0.0
                        }
                    };
                    let sample = Vector3f::new(base.x + jitter(), base.y + jitter(), base.z + jitter());

                    let frame = SimulatedImuFrame::new(
                        config.sensor_type,
                        FrameTimestamp {
                            host_ticks,
                            host_ticks_per_second: clock.ticks_per_second(),
                        },
                        sample,
                    );
                    callback(&frame);

                    let count = emitted.fetch_add(1, Ordering::Relaxed) + 1;
                    trace!(frame = count, host_ticks, "mock IMU frame emitted");

                    if config.max_frames.is_some_and(|max| count >= max) {
                        listening.store(false, Ordering::SeqCst);
                        break;
                    }
                    thread::sleep(interval);
                }

                debug!(frames = emitted.load(Ordering::Relaxed), "mock IMU stopped");
            });

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                warn!(error = %e, "failed to spawn mock IMU thread");
                self.listening.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Stop capturing and wait for the capture thread
    pub fn stop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("mock IMU thread panicked");
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    /// Frames handed to the callback so far
    pub fn frames_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Drop for MockImuSource {
    fn drop(&mut self) {
        self.stop();
    }
}
