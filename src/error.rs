use thiserror::Error;

use crate::audio_system::backend::NodeId;
use crate::audio_system::source::SoundId;

/// Library errors using thiserror for structured error handling.
///
/// Missing sounds and failed decodes are recoverable and are reported by the
/// callers that hit them; topology errors are programming mistakes and are
/// returned immediately.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Sound not found in bank: {0}")]
    SoundNotFound(SoundId),

    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("Invalid audio graph connection: {0}")]
    Topology(String),

    #[error("Unknown audio node: {0}")]
    UnknownNode(NodeId),

    #[error("Audio backend rejected operation on {node}: {reason}")]
    Backend { node: NodeId, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for library Results
pub type Result<T> = std::result::Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AudioError::SoundNotFound(SoundId::new("meow"));
        assert_eq!(err.to_string(), "Sound not found in bank: meow");

        let err = AudioError::UnknownNode(NodeId(7));
        assert_eq!(err.to_string(), "Unknown audio node: node#7");

        let err = ConfigError::Invalid("decay_duration must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: decay_duration must be positive"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_err = ConfigError::LoadFailed {
            path: "/test/engine.json".to_string(),
            source: Box::new(io_err),
        };

        assert!(config_err.source().is_some());
        assert_eq!(
            config_err.to_string(),
            "Failed to load configuration from /test/engine.json"
        );

        let audio_err: AudioError = config_err.into();
        assert!(audio_err.source().is_some());
    }
}
