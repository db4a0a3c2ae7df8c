//! Error types for playback management

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The media resource could not be fetched or decoded
    #[error("Failed to load audio: {0}")]
    LoadError(String),

    /// The platform refused to start playback (autoplay policy, etc.)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// Explicit track selection outside the queue
    #[error("Index out of range: {index} (queue length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Asynchronous media failure recorded in the playback state
///
/// Unlike [`PlaybackError`] this is cloneable and serializable so it can
/// travel inside state snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "reason", rename_all = "camelCase")]
pub enum MediaError {
    /// Fetch or decode failure reported by the media element
    #[error("Failed to load audio: {0}")]
    Load(String),

    /// `play()` was rejected by the platform
    #[error("Playback rejected: {0}")]
    Rejected(String),
}

impl From<MediaError> for PlaybackError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Load(reason) => PlaybackError::LoadError(reason),
            MediaError::Rejected(reason) => PlaybackError::PlaybackRejected(reason),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
