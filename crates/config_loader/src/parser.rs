//! Config parsing
//!
//! TOML (primary) and JSON.

use contracts::{ContractError, StreamerConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML config
pub fn parse_toml(content: &str) -> Result<StreamerConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON config
pub fn parse_json(content: &str) -> Result<StreamerConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse config in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<StreamerConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReleasePolicy, SensorType};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[server]
service = "127.0.0.1:5000"

[pose]
node_id = "7a3d1a3c-0e8f-4c3a-9d4e-2f1b6c5d4e3f"
reference_frame = "stage"

[streaming]
sensor_type = "gyroscope"
release_policy = "on_peer_reset"

[clock]
epoch_offset_ticks = 132000000000000000

[simulator]
frequency_hz = 100.0
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.server.service, "127.0.0.1:5000");
        assert_eq!(config.pose.reference_frame, "stage");
        assert_eq!(config.streaming.sensor_type, SensorType::Gyroscope);
        assert_eq!(config.streaming.release_policy, ReleasePolicy::OnPeerReset);
        assert_eq!(config.clock.epoch_offset_ticks, Some(132_000_000_000_000_000));
        assert_eq!(config.simulator.frequency_hz, 100.0);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "pose": { "node_id": "7a3d1a3c-0e8f-4c3a-9d4e-2f1b6c5d4e3f" }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_node_id() {
        let content = r#"
[pose]
node_id = "rig-left-front"
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
