//! # Device Simulator
//!
//! Stand-ins for the device side of the streamer:
//!
//! - [`MockImuSource`]: IMU capture loop producing frames at a fixed rate
//! - [`SimulatedPoseService`]: pose service whose rig orbits the origin and
//!   periodically loses tracking
//! - [`FixedPoseFactory`]: pose service that always reports one pose
//!
//! Frames are owned by the source and only lent to the callback.

mod clock;
mod frame;
mod locator;
mod source;

pub use clock::HostClock;
pub use frame::SimulatedImuFrame;
pub use locator::{FixedPoseFactory, FixedPoseLocator, OrbitLocator, SimulatedPoseService};
pub use source::{FrameCallback, MockImuConfig, MockImuSource};
