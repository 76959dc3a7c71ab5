//! Streamer error types

use thiserror::Error;

use crate::wire::WireError;

/// Streamer-specific errors
#[derive(Debug, Error)]
pub enum StreamerError {
    /// Service string is neither a port nor a socket address
    #[error("invalid service '{service}': {message}")]
    InvalidService { service: String, message: String },

    /// Listener could not be bound
    #[error("failed to bind service '{service}': {source}")]
    Bind {
        service: String,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called on a running listener
    #[error("listener already running on {0}")]
    AlreadyStarted(std::net::SocketAddr),

    /// Wire encoding or decoding error
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Contract error (locator, timestamp, config)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamerError {
    /// Create an invalid service error
    pub fn invalid_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidService {
            service: service.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_service() {
        let err = StreamerError::invalid_service("streamer-port", "not a port");
        assert_eq!(
            err.to_string(),
            "invalid service 'streamer-port': not a port"
        );

        let err: StreamerError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, StreamerError::Io(_)));
    }
}
