//! Simulated host tick counter

use std::time::Instant;

use contracts::TICKS_PER_SECOND;

/// Monotonic host clock in 100 ns ticks
///
/// Starts at `boot_ticks`, as if the device had already been up that long.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    origin: Instant,
    boot_ticks: u64,
}

impl Default for HostClock {
    fn default() -> Self {
        // One minute of uptime
        Self::new(60 * TICKS_PER_SECOND)
    }
}

impl HostClock {
    pub fn new(boot_ticks: u64) -> Self {
        Self {
            origin: Instant::now(),
            boot_ticks,
        }
    }

    /// Current host tick count
    pub fn now_ticks(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_nanos() / 100;
        self.boot_ticks
            .saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    pub fn ticks_per_second(&self) -> u64 {
        TICKS_PER_SECOND
    }
}
