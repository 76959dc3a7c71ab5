//! Config validation
//!
//! Rules:
//! - numeric ranges declared on the config types (`validator` derive)
//! - server.service is a port or a socket address
//! - tracking loss is shorter than its period
//! - reference frame name is not empty

use contracts::{ContractError, StreamerConfig};
use ::validator::Validate;

/// Validate a StreamerConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &StreamerConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_service(config)?;
    validate_pose(config)?;
    validate_simulator(config)?;
    Ok(())
}

/// Declarative range checks
fn validate_ranges(config: &StreamerConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

/// The service string must resolve to a bind address
fn validate_service(config: &StreamerConfig) -> Result<(), ContractError> {
    config.server.socket_addr().map(|_| ())
}

fn validate_pose(config: &StreamerConfig) -> Result<(), ContractError> {
    if config.pose.reference_frame.name().trim().is_empty() {
        return Err(ContractError::config_validation(
            "pose.reference_frame",
            "reference frame name cannot be empty",
        ));
    }
    Ok(())
}

/// Tracking loss window must fit inside its period
fn validate_simulator(config: &StreamerConfig) -> Result<(), ContractError> {
    let sim = &config.simulator;
    if sim.tracking_loss_period_secs > 0 && sim.tracking_loss_secs >= sim.tracking_loss_period_secs
    {
        return Err(ContractError::config_validation(
            "simulator.tracking_loss_secs",
            format!(
                "tracking_loss_secs ({}) must be < tracking_loss_period_secs ({})",
                sim.tracking_loss_secs, sim.tracking_loss_period_secs
            ),
        ));
    }
    Ok(())
}
