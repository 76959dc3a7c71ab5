//! StreamerConfig - Config Loader output
//!
//! Describes the full streamer setup: listening service, pose reference,
//! streaming policy, clock conversion and the device simulator.

use std::net::{Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ContractError, CoordinateFrame, NodeId, SensorType};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete streamer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamerConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Listening endpoint
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Pose reference point and coordinate frame
    pub pose: PoseConfig,

    /// Streaming policy
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Host tick conversion
    #[serde(default)]
    pub clock: ClockConfig,

    /// Simulated device (used by the CLI `run` command)
    #[serde(default)]
    #[validate(nested)]
    pub simulator: SimulatorConfig,
}

/// Listening endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Port number ("5000") or socket address ("127.0.0.1:5000")
    #[validate(length(min = 1, message = "service cannot be empty"))]
    pub service: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
        }
    }
}

impl ServerConfig {
    /// Resolve the service string to a bind address
    ///
    /// A bare port binds on all IPv4 interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, ContractError> {
        parse_service(&self.service)
    }
}

/// Parse a service name: a port number or an `ip:port` socket address
pub fn parse_service(service: &str) -> Result<SocketAddr, ContractError> {
    let service = service.trim();
    if let Ok(port) = service.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    service.parse::<SocketAddr>().map_err(|e| {
        ContractError::config_validation(
            "server.service",
            format!("'{service}' is neither a port nor a socket address: {e}"),
        )
    })
}

fn default_service() -> String {
    "5000".to_string()
}

/// Pose reference point and coordinate frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseConfig {
    /// GUID of the rig node whose pose is streamed
    pub node_id: NodeId,

    /// World coordinate frame poses are resolved against
    #[serde(default = "default_reference_frame")]
    pub reference_frame: CoordinateFrame,
}

fn default_reference_frame() -> CoordinateFrame {
    CoordinateFrame::new("world")
}

/// When the single-flight write flag is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Release when the write completes, successfully or not
    #[default]
    OnCompletion,
    /// Release only when the peer resets the connection.
    /// A successful write keeps the flag set until the next connection.
    OnPeerReset,
}

/// Streaming policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Sensor capability queried on every frame
    #[serde(default)]
    pub sensor_type: SensorType,

    /// In-flight flag release policy
    #[serde(default)]
    pub release_policy: ReleasePolicy,
}

/// Absolute time anchoring
///
/// The device tick rate is not configured; every frame declares its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed offset from host ticks to absolute ticks.
    /// `None` anchors the offset to the wall clock at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_offset_ticks: Option<i64>,
}

/// Simulated device
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulatorConfig {
    /// Frame rate (Hz)
    #[serde(default = "default_frequency_hz")]
    #[validate(range(min = 0.1, max = 10000.0))]
    pub frequency_hz: f64,

    /// Tracking is lost once per period (0 = never)
    #[serde(default = "default_tracking_loss_period_secs")]
    pub tracking_loss_period_secs: u64,

    /// Length of each tracking loss
    #[serde(default = "default_tracking_loss_secs")]
    pub tracking_loss_secs: u64,

    /// Radius of the simulated rig orbit (meters)
    #[serde(default = "default_orbit_radius_m")]
    #[validate(range(min = 0.0))]
    pub orbit_radius_m: f32,

    /// Time for one orbit (seconds)
    #[serde(default = "default_orbit_period_secs")]
    #[validate(range(min = 0.1))]
    pub orbit_period_secs: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            tracking_loss_period_secs: default_tracking_loss_period_secs(),
            tracking_loss_secs: default_tracking_loss_secs(),
            orbit_radius_m: default_orbit_radius_m(),
            orbit_period_secs: default_orbit_period_secs(),
        }
    }
}

fn default_frequency_hz() -> f64 {
    50.0
}

fn default_tracking_loss_period_secs() -> u64 {
    10
}

fn default_tracking_loss_secs() -> u64 {
    1
}

fn default_orbit_radius_m() -> f32 {
    1.0
}

fn default_orbit_period_secs() -> f64 {
    8.0
}
