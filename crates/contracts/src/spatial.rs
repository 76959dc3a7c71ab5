//! Spatial types and the pose service interface
//!
//! `Matrix4x4` follows the row-vector convention used by the receiving side:
//! a point is transformed as `p' = p * M`, so translation lives in the fourth
//! row and `M = R * T` rotates first, then translates.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ContractError, CoordinateFrame, Vector3f};

/// Host tick frequency (100 ns units)
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Stable identifier of a physical reference point (a GUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for NodeId {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim_matches(|c| c == '{' || c == '}'))
            .map(Self)
            .map_err(|e| ContractError::locator(s, format!("invalid node id: {e}")))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Timestamp in the pose service's native representation
///
/// System-relative target time, i.e. the host tick count as a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PerceptionTimestamp {
    target_time: Duration,
}

impl PerceptionTimestamp {
    /// Convert a host tick count (100 ns units)
    ///
    /// # Errors
    /// Tick counts that do not fit a signed 64-bit value are rejected.
    pub fn from_host_ticks(ticks: u64) -> Result<Self, ContractError> {
        if ticks > i64::MAX as u64 {
            return Err(ContractError::timestamp(format!(
                "host ticks {ticks} exceed the signed 64-bit range"
            )));
        }
        let secs = ticks / TICKS_PER_SECOND;
        let nanos = ((ticks % TICKS_PER_SECOND) * 100) as u32;
        Ok(Self {
            target_time: Duration::new(secs, nanos),
        })
    }

    pub fn target_time(&self) -> Duration {
        self.target_time
    }

    /// Back to host ticks
    pub fn host_ticks(&self) -> u64 {
        self.target_time.as_secs() * TICKS_PER_SECOND
            + u64::from(self.target_time.subsec_nanos()) / 100
    }
}

/// Orientation quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Orientation and position at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub orientation: Quaternion,
    pub position: Vector3f,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        orientation: Quaternion::IDENTITY,
        position: Vector3f::new(0.0, 0.0, 0.0),
    };
}

/// 4x4 single-precision matrix, row-major, row-vector convention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4x4 {
    /// `rows[0]` holds m11..m14, `rows[3]` holds m41..m44
    pub rows: [[f32; 4]; 4],
}

impl Matrix4x4 {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Build from m11..m44 in row-major order
    pub fn from_row_major(values: [f32; 16]) -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (i, value) in values.into_iter().enumerate() {
            rows[i / 4][i % 4] = value;
        }
        Self { rows }
    }

    /// m11..m44 in row-major order
    pub fn to_row_major(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.rows[i / 4][i % 4];
        }
        out
    }

    /// Translation component (m41, m42, m43)
    pub fn translation(&self) -> Vector3f {
        Vector3f::new(self.rows[3][0], self.rows[3][1], self.rows[3][2])
    }

    /// Transform a point as a row vector `[x y z 1] * M`
    pub fn transform_point(&self, p: Vector3f) -> Vector3f {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0f32; 4];
        for (col, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|row| v[row] * self.rows[row][col]).sum();
        }
        Vector3f::new(out[0], out[1], out[2])
    }
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Handle bound to one reference point, queried for pose over time
pub trait SpatialLocator: Send + Sync {
    /// Pose of the reference point at `timestamp`, relative to `frame`
    ///
    /// `None` is the expected outcome when tracking is lost or the timestamp
    /// is outside the pose history window.
    fn try_locate_at_timestamp(
        &self,
        timestamp: PerceptionTimestamp,
        frame: &CoordinateFrame,
    ) -> Option<Pose>;
}

/// Pose service entry point that creates locators for reference points
pub trait LocatorFactory: Send + Sync {
    fn create_locator_for_node(
        &self,
        node_id: NodeId,
    ) -> Result<Arc<dyn SpatialLocator>, ContractError>;
}
