//! Core types for playback management

use crate::error::{MediaError, Result};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Lowest supported playback rate
pub const MIN_PLAYBACK_RATE: f32 = 0.25;

/// Highest supported playback rate
pub const MAX_PLAYBACK_RATE: f32 = 2.0;

/// Track information supplied by the catalog
///
/// Immutable from the core's point of view: the controller only ever
/// references tracks by identity or queue position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Unique, stable track identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Duration advertised by the catalog, in seconds
    pub duration_seconds: f64,

    /// URI handed to the media element
    pub source_uri: String,

    /// Cover art URI (optional)
    #[serde(default)]
    pub artwork_uri: Option<String>,

    /// Genre (optional)
    #[serde(default)]
    pub genre: Option<String>,
}

/// Transport status of the current track slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportStatus {
    /// Nothing loaded
    #[default]
    Idle,

    /// Source assigned, waiting for metadata or the play outcome
    Loading,

    /// Audio is playing
    Playing,

    /// Paused mid-track (or loaded without autoplay)
    Paused,

    /// Reached the end of the current track
    Ended,

    /// Load or play failed, see `last_error`
    Error,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the UI cycle: off → all → one → off
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Initial volume (0.0-1.0, default: 0.7)
    pub volume: f32,

    /// Start muted (default: false)
    pub muted: bool,

    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Start with shuffle enabled (default: false)
    pub shuffled: bool,

    /// Initial playback rate (0.25-2.0, default: 1.0)
    pub playback_rate: f32,

    /// Seed for the shuffle RNG; `None` seeds from entropy
    pub shuffle_seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 0.7,
            muted: false,
            repeat: RepeatMode::Off,
            shuffled: false,
            playback_rate: 1.0,
            shuffle_seed: None,
        }
    }
}

impl PlayerConfig {
    /// Parse a (possibly partial) JSON document, clamping out-of-range values
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Clamp every numeric field into its valid range
    pub fn normalized(mut self) -> Self {
        self.volume = clamp_unit(self.volume, 0.7);
        self.playback_rate = clamp_rate(self.playback_rate, 1.0);
        self
    }
}

/// User preferences an external layer persists between sessions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerSettings {
    pub volume: f32,
    pub muted: bool,
    pub repeat_mode: RepeatMode,
    pub shuffled: bool,
    pub playback_rate: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        let config = PlayerConfig::default();
        Self {
            volume: config.volume,
            muted: config.muted,
            repeat_mode: config.repeat,
            shuffled: config.shuffled,
            playback_rate: config.playback_rate,
        }
    }
}

/// Read-only snapshot of the controller's state
///
/// Cheap to clone: the queue is shared, not copied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Tracks in playback order (shuffled order when shuffle is on)
    pub queue: Rc<[Track]>,

    /// Position of the current track in `queue`
    pub current_index: Option<usize>,

    pub status: TransportStatus,

    pub position_seconds: f64,

    /// 0.0 until the media element reports metadata
    pub duration_seconds: f64,

    /// Stored volume, independent of `muted`
    pub volume: f32,

    pub muted: bool,

    pub shuffled: bool,

    pub repeat_mode: RepeatMode,

    pub playback_rate: f32,

    /// Last asynchronous failure, cleared on the next successful load
    pub last_error: Option<MediaError>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        let config = PlayerConfig::default();
        Self {
            queue: Rc::from(Vec::new()),
            current_index: None,
            status: TransportStatus::Idle,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            volume: config.volume,
            muted: config.muted,
            shuffled: config.shuffled,
            repeat_mode: config.repeat,
            playback_rate: config.playback_rate,
            last_error: None,
        }
    }
}

impl PlaybackState {
    /// Currently selected track
    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.queue.get(i))
    }

    /// Current index with `-1` standing for "no selection"
    pub fn current_index_signed(&self) -> i64 {
        self.current_index.map_or(-1, |i| i as i64)
    }

    /// Output level after muting is applied
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Playback progress in percent (0 when the duration is unknown)
    pub fn progress_percent(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.position_seconds / self.duration_seconds * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == TransportStatus::Playing
    }
}

/// Format seconds as `m:ss` for display
///
/// Non-finite and negative values render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Clamp into [0, 1], substituting `fallback` for NaN
pub(crate) fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamp into the supported playback rate range, substituting `fallback` for NaN
pub(crate) fn clamp_rate(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
    }
}
