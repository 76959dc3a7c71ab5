//! Simulated pose service

use std::f64::consts::TAU;
use std::sync::Arc;

use contracts::{
    ContractError, CoordinateFrame, LocatorFactory, NodeId, PerceptionTimestamp, Pose, Quaternion,
    SimulatorConfig, SpatialLocator, Vector3f, TICKS_PER_SECOND,
};
use tracing::debug;

/// Rig circling the origin in the horizontal plane, facing along its path
///
/// Tracking is lost for `loss_ticks` at the end of every `loss_period_ticks`.
#[derive(Debug, Clone)]
pub struct OrbitLocator {
    radius_m: f32,
    period_secs: f64,
    /// Starting angle (radians)
    phase: f64,
    loss_period_ticks: u64,
    loss_ticks: u64,
}

impl OrbitLocator {
    pub fn new(config: &SimulatorConfig, phase: f64) -> Self {
        Self {
            radius_m: config.orbit_radius_m,
            period_secs: config.orbit_period_secs,
            phase,
            loss_period_ticks: config
                .tracking_loss_period_secs
                .saturating_mul(TICKS_PER_SECOND),
            loss_ticks: config.tracking_loss_secs.saturating_mul(TICKS_PER_SECOND),
        }
    }

    /// Tracking is unavailable at `host_ticks`
    pub fn is_tracking_lost(&self, host_ticks: u64) -> bool {
        if self.loss_period_ticks == 0 || self.loss_ticks == 0 {
            return false;
        }
        host_ticks % self.loss_period_ticks >= self.loss_period_ticks.saturating_sub(self.loss_ticks)
    }

    /// Pose at `host_ticks`, ignoring tracking loss
    pub fn pose_at(&self, host_ticks: u64) -> Pose {
        let t = host_ticks as f64 / TICKS_PER_SECOND as f64;
        let angle = self.phase + TAU * t / self.period_secs;

        let position = Vector3f::new(
            self.radius_m * angle.cos() as f32,
            0.0,
            self.radius_m * angle.sin() as f32,
        );

        // Yaw about +y so the rig faces along the tangent
        let half = (angle + std::f64::consts::FRAC_PI_2) / 2.0;
        let orientation = Quaternion::new(0.0, half.sin() as f32, 0.0, half.cos() as f32);

        Pose {
            orientation,
            position,
        }
    }
}

impl SpatialLocator for OrbitLocator {
    fn try_locate_at_timestamp(
        &self,
        timestamp: PerceptionTimestamp,
        _frame: &CoordinateFrame,
    ) -> Option<Pose> {
        let ticks = timestamp.host_ticks();
        if self.is_tracking_lost(ticks) {
            return None;
        }
        Some(self.pose_at(ticks))
    }
}

/// Pose service handing out [`OrbitLocator`]s
///
/// Each node orbits with its own phase. The nil GUID is not a known node.
#[derive(Debug, Clone)]
pub struct SimulatedPoseService {
    config: SimulatorConfig,
}

impl SimulatedPoseService {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }
}

impl LocatorFactory for SimulatedPoseService {
    fn create_locator_for_node(
        &self,
        node_id: NodeId,
    ) -> Result<Arc<dyn SpatialLocator>, ContractError> {
        if node_id.as_uuid().is_nil() {
            return Err(ContractError::locator(node_id.to_string(), "unknown node"));
        }

        let first = node_id.as_uuid().as_bytes()[0];
        let phase = TAU * f64::from(first) / 256.0;
        debug!(node_id = %node_id, phase, "simulated locator created");
        Ok(Arc::new(OrbitLocator::new(&self.config, phase)))
    }
}

/// Locator that always reports the same pose
#[derive(Debug, Clone, Copy)]
pub struct FixedPoseLocator(pub Pose);

impl SpatialLocator for FixedPoseLocator {
    fn try_locate_at_timestamp(
        &self,
        _timestamp: PerceptionTimestamp,
        _frame: &CoordinateFrame,
    ) -> Option<Pose> {
        Some(self.0)
    }
}

/// Pose service whose locators all report one fixed pose
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPoseFactory {
    pub pose: Pose,
}

impl FixedPoseFactory {
    pub fn identity() -> Self {
        Self {
            pose: Pose::IDENTITY,
        }
    }
}

impl LocatorFactory for FixedPoseFactory {
    fn create_locator_for_node(
        &self,
        _node_id: NodeId,
    ) -> Result<Arc<dyn SpatialLocator>, ContractError> {
        Ok(Arc::new(FixedPoseLocator(self.pose)))
    }
}
