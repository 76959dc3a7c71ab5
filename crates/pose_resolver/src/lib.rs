//! # Pose Resolver
//!
//! Correlates device timestamps with the pose of a tracked reference point.
//!
//! Responsibilities:
//! - Convert host ticks into the pose service's timestamp representation
//! - Query the bound locator against the world coordinate frame
//! - Compose orientation + position into a rigid `Matrix4x4`
//! - Rescale device ticks to 100 ns and convert them into absolute (wall-clock epoch) ticks
//!
//! ```ignore
//! use pose_resolver::PoseResolver;
//!
//! let resolver = PoseResolver::new(factory, node_id, "world".into())?;
//! if let Some(transform) = resolver.resolve(host_ticks) {
//!     // rotation first, then translation
//! }
//! ```

mod clock;
mod resolver;
mod transform;

pub use clock::{
    absolute_ticks_to_datetime, datetime_to_absolute_ticks, to_hundreds_of_nanos, TimestampConverter,
    FILETIME_UNIX_EPOCH_TICKS,
};
pub use resolver::PoseResolver;
pub use transform::compose_transform;
