//! Error types for the composed player

use lumen_analysis::AnalysisError;
use lumen_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// A browser API call failed
    #[error("Browser API error: {0}")]
    Platform(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
