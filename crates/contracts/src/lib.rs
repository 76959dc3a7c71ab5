//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the streamer workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Device frames carry *host ticks*: 100 ns units on the device's monotonic clock
//! - The pose service consumes a [`PerceptionTimestamp`] (system-relative target time)
//! - The wire carries *absolute ticks*: 100 ns units since 1601-01-01 UTC

mod coordinate_frame;
mod error;
mod sensor;
mod spatial;
mod streamer_config;

pub use coordinate_frame::CoordinateFrame;
pub use error::*;
pub use sensor::*;
pub use spatial::*;
pub use streamer_config::*;
