//! Layered error definitions
//!
//! Categorized by source: config / sensor / spatial

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sensor Errors =====
    /// Frame timestamp could not be read or converted
    #[error("timestamp error: {message}")]
    Timestamp { message: String },

    /// Sensor sample could not be read from a frame
    #[error("sensor '{sensor_type}' sample error: {message}")]
    SensorSample {
        sensor_type: String,
        message: String,
    },

    // ===== Spatial Errors =====
    /// Locator could not be created for a reference point
    #[error("locator error for node '{node_id}': {message}")]
    Locator { node_id: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create timestamp error
    pub fn timestamp(message: impl Into<String>) -> Self {
        Self::Timestamp {
            message: message.into(),
        }
    }

    /// Create sensor sample error
    pub fn sensor_sample(sensor_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorSample {
            sensor_type: sensor_type.into(),
            message: message.into(),
        }
    }

    /// Create locator error
    pub fn locator(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Locator {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}
