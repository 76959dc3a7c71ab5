//! Per-frame diagnostic text
//!
//! ```text
//! ####Accel:  0.1200 -9.8100  0.0300 9.811495 20
//! ```
//!
//! Sample components with a space in place of a `+` sign, the magnitude,
//! then the milliseconds since the previous sample.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{SensorType, Vector3f};

const NO_PREVIOUS: u64 = u64::MAX;

/// Format the diagnostic line for one sample
pub fn format_diagnostic(sensor_type: SensorType, sample: Vector3f, delta_ms: u64) -> String {
    format!(
        "####{}: {} {} {} {:.6} {}\n",
        sensor_type.label(),
        SpaceSigned(sample.x),
        SpaceSigned(sample.y),
        SpaceSigned(sample.z),
        sample.magnitude(),
        delta_ms
    )
}

/// Four decimals, leading space for non-negative values
struct SpaceSigned(f32);

impl fmt::Display for SpaceSigned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_sign_negative() {
            write!(f, "{:.4}", self.0)
        } else {
            write!(f, " {:.4}", self.0)
        }
    }
}

/// Tracks the host tick of the previous sample for the rate estimate
///
/// Shared by every `send` call; the previous tick is swapped atomically.
#[derive(Debug)]
pub struct SampleInterval {
    previous_ticks: AtomicU64,
}

impl Default for SampleInterval {
    fn default() -> Self {
        Self {
            previous_ticks: AtomicU64::new(NO_PREVIOUS),
        }
    }
}

impl SampleInterval {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample and return the ticks elapsed since the previous one
    ///
    /// The first sample, and a sample older than its predecessor, yield 0.
    pub fn record(&self, host_ticks: u64) -> u64 {
        let previous = self.previous_ticks.swap(host_ticks, Ordering::AcqRel);
        if previous == NO_PREVIOUS {
            return 0;
        }
        host_ticks.saturating_sub(previous)
    }

    /// Record a sample and return the elapsed milliseconds
    pub fn record_ms(&self, host_ticks: u64, ticks_per_second: u64) -> u64 {
        let delta = u128::from(self.record(host_ticks));
        let ms = delta * 1000 / u128::from(ticks_per_second.max(1));
        u64::try_from(ms).unwrap_or(u64::MAX)
    }

    pub fn reset(&self) {
        self.previous_ticks.store(NO_PREVIOUS, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_accel_line() {
        let text = format_diagnostic(
            SensorType::Accelerometer,
            Vector3f::new(0.0, -3.0, 4.0),
            20,
        );
        assert_eq!(text, "####Accel:  0.0000 -3.0000  4.0000 5.000000 20\n");
    }

    #[test]
    fn test_labels_follow_sensor_type() {
        let v = Vector3f::new(1.0, 0.0, 0.0);
        assert!(format_diagnostic(SensorType::Gyroscope, v, 0).starts_with("####Gyro: "));
        assert!(format_diagnostic(SensorType::Magnetometer, v, 0).starts_with("####Mag: "));
    }

    #[test]
    fn test_interval_first_sample_is_zero() {
        let interval = SampleInterval::new();
        assert_eq!(interval.record_ms(1_000_000, 10_000_000), 0);
        // 200_000 ticks at 10 MHz = 20 ms
        assert_eq!(interval.record_ms(1_200_000, 10_000_000), 20);
        assert_eq!(interval.record_ms(1_210_000, 10_000_000), 1);
    }

    #[test]
    fn test_interval_going_backwards_is_zero() {
        let interval = SampleInterval::new();
        interval.record(500);
        assert_eq!(interval.record(400), 0);
        assert_eq!(interval.record(450), 50);
    }

    #[test]
    fn test_interval_reset() {
        let interval = SampleInterval::new();
        interval.record(500);
        interval.reset();
        assert_eq!(interval.record(900), 0);
    }
}
