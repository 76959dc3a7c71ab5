//! Sensor frame interface consumed from the capture subsystem
//!
//! The capture subsystem owns every frame. The streamer only borrows a frame
//! for the duration of a single `send` call and queries it through the
//! capability traits below.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Sensor type tag passed alongside every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    #[default]
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

impl SensorType {
    /// Short label used in diagnostic text and metric labels
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accelerometer => "Accel",
            Self::Gyroscope => "Gyro",
            Self::Magnetometer => "Mag",
        }
    }

    /// Stable snake_case name (matches the config representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accelerometer => "accelerometer",
            Self::Gyroscope => "gyroscope",
            Self::Magnetometer => "magnetometer",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture timestamp of a frame on the device clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTimestamp {
    /// Host ticks (100 ns units, monotonic)
    pub host_ticks: u64,

    /// Tick frequency of `host_ticks`
    pub host_ticks_per_second: u64,
}

/// 3D sample in sensor units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3f {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Accelerometer capability (m/s²)
pub trait AccelFrame {
    fn calibrated_acceleration(&self) -> Result<Vector3f, ContractError>;
}

/// Gyroscope capability (rad/s)
pub trait GyroFrame {
    fn calibrated_gyro(&self) -> Result<Vector3f, ContractError>;
}

/// Magnetometer capability (µT)
pub trait MagFrame {
    fn magnetometer(&self) -> Result<Vector3f, ContractError>;
}

/// A single sensor capture, borrowed for one streaming call
///
/// Capability queries return `None` when the frame cannot be viewed as that
/// sensor kind. That is a mismatch to skip, not an error.
pub trait SensorFrame {
    /// Read the capture timestamp
    fn timestamp(&self) -> Result<FrameTimestamp, ContractError>;

    fn as_accel(&self) -> Option<&dyn AccelFrame> {
        None
    }

    fn as_gyro(&self) -> Option<&dyn GyroFrame> {
        None
    }

    fn as_mag(&self) -> Option<&dyn MagFrame> {
        None
    }

    /// Query the capability matching `sensor_type` and read its sample
    ///
    /// Returns `None` on a capability mismatch, `Some(Err(_))` when the
    /// capability exists but the sample could not be read.
    fn sample(&self, sensor_type: SensorType) -> Option<Result<Vector3f, ContractError>> {
        match sensor_type {
            SensorType::Accelerometer => self.as_accel().map(|f| f.calibrated_acceleration()),
            SensorType::Gyroscope => self.as_gyro().map(|f| f.calibrated_gyro()),
            SensorType::Magnetometer => self.as_mag().map(|f| f.magnetometer()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AccelOnly;

    impl AccelFrame for AccelOnly {
        fn calibrated_acceleration(&self) -> Result<Vector3f, ContractError> {
            Ok(Vector3f::new(0.0, 3.0, 4.0))
        }
    }

    impl SensorFrame for AccelOnly {
        fn timestamp(&self) -> Result<FrameTimestamp, ContractError> {
            Ok(FrameTimestamp {
                host_ticks: 1,
                host_ticks_per_second: 10_000_000,
            })
        }

        fn as_accel(&self) -> Option<&dyn AccelFrame> {
            Some(self)
        }
    }

    #[test]
    fn test_sample_dispatch() {
        let frame = AccelOnly;
        let sample = frame.sample(SensorType::Accelerometer).unwrap().unwrap();
        assert_eq!(sample.magnitude(), 5.0);
        assert!(frame.sample(SensorType::Gyroscope).is_none());
        assert!(frame.sample(SensorType::Magnetometer).is_none());
    }

    #[test]
    fn test_sensor_type_serde() {
        let json = serde_json::to_string(&SensorType::Gyroscope).unwrap();
        assert_eq!(json, "\"gyroscope\"");
        assert_eq!(SensorType::Gyroscope.label(), "Gyro");
    }
}
