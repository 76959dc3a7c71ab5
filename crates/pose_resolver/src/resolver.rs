//! PoseResolver - timestamp to rigid transform

use std::sync::{Arc, PoisonError, RwLock};

use contracts::{
    ContractError, CoordinateFrame, LocatorFactory, Matrix4x4, NodeId, PerceptionTimestamp, Pose,
    SpatialLocator,
};
use tracing::{debug, info, instrument, trace};

use crate::transform::compose_transform;

/// Locator currently bound to a reference point
struct LocatorBinding {
    node_id: NodeId,
    locator: Arc<dyn SpatialLocator>,
}

/// Resolves capture timestamps to the pose of one reference point
///
/// The locator is owned and can be rebound with [`PoseResolver::set_reference`].
/// The coordinate frame is fixed for the resolver's lifetime.
pub struct PoseResolver {
    factory: Arc<dyn LocatorFactory>,
    reference_frame: CoordinateFrame,
    binding: RwLock<LocatorBinding>,
}

impl PoseResolver {
    /// Create a resolver bound to `node_id`
    ///
    /// # Errors
    /// Fails when the pose service cannot create a locator for the node.
    #[instrument(
        name = "pose_resolver_new",
        skip_all,
        fields(node_id = %node_id, frame = %reference_frame)
    )]
    pub fn new(
        factory: Arc<dyn LocatorFactory>,
        node_id: NodeId,
        reference_frame: CoordinateFrame,
    ) -> Result<Self, ContractError> {
        let locator = factory.create_locator_for_node(node_id)?;
        debug!(node_id = %node_id, "locator created");

        Ok(Self {
            factory,
            reference_frame,
            binding: RwLock::new(LocatorBinding { node_id, locator }),
        })
    }

    /// Node the locator is currently bound to
    pub fn node_id(&self) -> NodeId {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .node_id
    }

    pub fn reference_frame(&self) -> &CoordinateFrame {
        &self.reference_frame
    }

    /// Rebind to another reference point
    ///
    /// The new locator is created before the swap; on failure the previous
    /// binding stays in place.
    pub fn set_reference(&self, node_id: NodeId) -> Result<(), ContractError> {
        let locator = self.factory.create_locator_for_node(node_id)?;
        let mut binding = self.binding.write().unwrap_or_else(PoisonError::into_inner);
        let previous = binding.node_id;
        *binding = LocatorBinding { node_id, locator };
        info!(from = %previous, to = %node_id, "locator rebound");
        Ok(())
    }

    /// Raw pose at `host_ticks` (100 ns units)
    pub fn locate(&self, host_ticks: u64) -> Option<Pose> {
        let timestamp = match PerceptionTimestamp::from_host_ticks(host_ticks) {
            Ok(ts) => ts,
            Err(e) => {
                debug!(host_ticks, error = %e, "timestamp not convertible");
                return None;
            }
        };

        let locator = Arc::clone(
            &self
                .binding
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .locator,
        );
        locator.try_locate_at_timestamp(timestamp, &self.reference_frame)
    }

    /// Rigid transform at `host_ticks`, or `None` if no pose is available
    pub fn resolve(&self, host_ticks: u64) -> Option<Matrix4x4> {
        let Some(pose) = self.locate(host_ticks) else {
            trace!(host_ticks, "no pose at timestamp");
            return None;
        };

        if !is_finite_pose(&pose) {
            debug!(host_ticks, ?pose, "discarding non-finite pose");
            return None;
        }

        Some(compose_transform(pose.orientation, pose.position))
    }
}

fn is_finite_pose(pose: &Pose) -> bool {
    let o = &pose.orientation;
    let p = &pose.position;
    [o.x, o.y, o.z, o.w, p.x, p.y, p.z]
        .iter()
        .all(|v| v.is_finite())
}
