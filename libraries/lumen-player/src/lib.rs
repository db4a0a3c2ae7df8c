//! Lumen Player
//!
//! Ties the playback controller (`lumen-playback`) and the spectrum
//! pipeline (`lumen-analysis`) together behind one [`Player`] and, when
//! built for `wasm32`, runs them on an `<audio>` element with a Web Audio
//! analyser.
//!
//! # Data flow
//!
//! ```text
//! UI command -> Player -> PlaybackController -> MediaBinding -> element
//!                  |                                              |
//!                  +-- reconcile: ensure_tap + sync_transport      |
//!                  |                                              v
//!                  +<------------- pump() <------------- media events
//!
//! requestAnimationFrame -> on_animation_frame -> AnalysisFrame -> on_frame
//! ```
//!
//! # Example
//!
//! ```rust
//! use lumen_player::{LumenConfig, SoftwarePlayer};
//! use lumen_playback::{LoadToken, MediaElement, TaggedEvent, Track};
//!
//! struct NullElement;
//!
//! impl MediaElement for NullElement {
//!     fn release(&mut self) {}
//!     fn load(&mut self, _token: LoadToken, _uri: &str) {}
//!     fn request_play(&mut self, _token: LoadToken, _request: u64) {}
//!     fn pause(&mut self) {}
//!     fn set_current_time(&mut self, _seconds: f64) {}
//!     fn set_volume(&mut self, _level: f32) {}
//!     fn set_muted(&mut self, _muted: bool) {}
//!     fn set_playback_rate(&mut self, _rate: f32) {}
//!     fn drain_events(&mut self) -> Vec<TaggedEvent> {
//!         Vec::new()
//!     }
//! }
//!
//! let mut player = SoftwarePlayer::software(NullElement, LumenConfig::default());
//! let track = Track {
//!     id: "intro".to_string(),
//!     title: "Intro".to_string(),
//!     artist: "Artist".to_string(),
//!     album: "Album".to_string(),
//!     duration_seconds: 42.0,
//!     source_uri: "/music/intro.ogg".to_string(),
//!     artwork_uri: None,
//!     genre: None,
//! };
//!
//! player.load_queue(vec![track], None).unwrap();
//! player.play_track_at(0).unwrap();
//!
//! // Nothing plays yet, so the visualizer shows the idle placeholder
//! assert!(player.current_frame().is_idle());
//! assert_eq!(player.bars(16).len(), 16);
//! ```

mod config;
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod deferred;
mod error;
mod player;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::LumenConfig;
pub use error::{PlayerError, Result};
pub use player::{Player, SoftwarePlayer};

#[cfg(target_arch = "wasm32")]
pub use web::WasmPlayer;
