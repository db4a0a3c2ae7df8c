//! Error types for spectrum analysis

use lumen_playback::ResourceId;
use thiserror::Error;

/// Analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The platform offers no audio analysis API
    #[error("Audio analysis unavailable: {0}")]
    UnsupportedEnvironment(String),

    /// The resource already feeds an analyser; platforms allow one tap per element
    #[error("Resource {} is already tapped", .0.value())]
    TapAlreadyExists(ResourceId),

    /// The platform analysis API failed
    #[error("Audio graph error: {0}")]
    Platform(String),

    /// Configuration could not be parsed
    #[error("Invalid analyser configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_error_names_the_resource() {
        let id = ResourceId::allocate();
        let message = AnalysisError::TapAlreadyExists(id).to_string();
        assert!(message.contains(&id.value().to_string()));
    }

    #[test]
    fn config_error_converts() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: AnalysisError = parse.into();
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
