//! Simulated IMU frame

use contracts::{
    AccelFrame, ContractError, FrameTimestamp, GyroFrame, MagFrame, SensorFrame, SensorType,
    Vector3f,
};

/// One IMU capture of a single sensor type
///
/// Only the capability matching `sensor_type` is exposed, like a real
/// per-sensor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedImuFrame {
    pub sensor_type: SensorType,
    pub timestamp: FrameTimestamp,
    pub sample: Vector3f,
}

impl SimulatedImuFrame {
    pub fn new(sensor_type: SensorType, timestamp: FrameTimestamp, sample: Vector3f) -> Self {
        Self {
            sensor_type,
            timestamp,
            sample,
        }
    }
}

impl AccelFrame for SimulatedImuFrame {
    fn calibrated_acceleration(&self) -> Result<Vector3f, ContractError> {
        Ok(self.sample)
    }
}

impl GyroFrame for SimulatedImuFrame {
    fn calibrated_gyro(&self) -> Result<Vector3f, ContractError> {
        Ok(self.sample)
    }
}

impl MagFrame for SimulatedImuFrame {
    fn magnetometer(&self) -> Result<Vector3f, ContractError> {
        Ok(self.sample)
    }
}

impl SensorFrame for SimulatedImuFrame {
    fn timestamp(&self) -> Result<FrameTimestamp, ContractError> {
        Ok(self.timestamp)
    }

    fn as_accel(&self) -> Option<&dyn AccelFrame> {
        (self.sensor_type == SensorType::Accelerometer).then_some(self as &dyn AccelFrame)
    }

    fn as_gyro(&self) -> Option<&dyn GyroFrame> {
        (self.sensor_type == SensorType::Gyroscope).then_some(self as &dyn GyroFrame)
    }

    fn as_mag(&self) -> Option<&dyn MagFrame> {
        (self.sensor_type == SensorType::Magnetometer).then_some(self as &dyn MagFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sensor_type: SensorType) -> SimulatedImuFrame {
        SimulatedImuFrame::new(
            sensor_type,
            FrameTimestamp {
                host_ticks: 10,
                host_ticks_per_second: 10_000_000,
            },
            Vector3f::new(1.0, 2.0, 3.0),
        )
    }

    #[test]
    fn test_only_matching_capability_is_exposed() {
        let gyro = frame(SensorType::Gyroscope);
        assert!(gyro.as_gyro().is_some());
        assert!(gyro.as_accel().is_none());
        assert!(gyro.as_mag().is_none());

        assert!(gyro.sample(SensorType::Accelerometer).is_none());
        let sample = gyro.sample(SensorType::Gyroscope).unwrap().unwrap();
        assert_eq!(sample, Vector3f::new(1.0, 2.0, 3.0));
    }
}
