//! Lumen Player - Playback Core
//!
//! Platform-agnostic playback state machine for Lumen Player.
//!
//! This crate provides:
//! - Queue with canonical order and shuffle permutation
//! - Next/previous selection under repeat (off, all, one) and shuffle
//! - Volume, mute and playback rate control
//! - Media binding with load tokens (last-command-wins track switches)
//! - Typed event emitter with drop-to-unsubscribe handles
//! - Shared context slot (create on first use, tear down on last release)
//!
//! # Architecture
//!
//! `lumen-playback` has no platform dependencies. The actual media element
//! (an `<audio>` element in the browser, a scripted fake in tests) is
//! provided through the [`MediaElement`] trait; its asynchronous
//! notifications are applied by calling [`PlaybackController::pump`].
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use lumen_playback::{
//!     LoadToken, MediaElement, PlaybackController, PlayerConfig, TaggedEvent, Track,
//!     TransportStatus,
//! };
//!
//! // Element that accepts every command and never reports anything
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
//! let mut controller = PlaybackController::new(NullElement, PlayerConfig::default());
//!
//! let track = Track {
//!     id: "track1".to_string(),
//!     title: "My Song".to_string(),
//!     artist: "Artist Name".to_string(),
//!     album: "Album Name".to_string(),
//!     duration_seconds: 180.0,
//!     source_uri: "/music/song.mp3".to_string(),
//!     artwork_uri: None,
//!     genre: None,
//! };
//!
//! controller.load_queue(vec![track], None).unwrap();
//! controller.play_track_at(0).unwrap();
//! assert_eq!(controller.status(), TransportStatus::Loading);
//!
//! controller.set_volume(1.7);
//! assert_eq!(controller.volume(), 1.0);
//! ```
//!
//! # Example: Shuffle and Repeat
//!
//! ```rust
//! use lumen_playback::RepeatMode;
//! # use lumen_playback::{LoadToken, MediaElement, PlaybackController, PlayerConfig, TaggedEvent};
//! # struct NullElement;
//! # impl MediaElement for NullElement {
//! #     fn release(&mut self) {}
//! #     fn load(&mut self, _token: LoadToken, _uri: &str) {}
//! #     fn request_play(&mut self, _token: LoadToken, _request: u64) {}
//! #     fn pause(&mut self) {}
//! #     fn set_current_time(&mut self, _seconds: f64) {}
//! #     fn set_volume(&mut self, _level: f32) {}
//! #     fn set_muted(&mut self, _muted: bool) {}
//! #     fn set_playback_rate(&mut self, _rate: f32) {}
//! #     fn drain_events(&mut self) -> Vec<TaggedEvent> { Vec::new() }
//! # }
//! let mut controller = PlaybackController::new(NullElement, PlayerConfig::default());
//!
//! controller.toggle_shuffle();
//! assert_eq!(controller.cycle_repeat_mode(), RepeatMode::All);
//! ```

mod binding;
mod context;
mod controller;
mod error;
pub mod events;
pub mod queue;
pub mod shuffle;
pub mod types;
mod volume;

// Public exports
pub use binding::{
    LoadToken, MediaBinding, MediaElement, MediaEvent, PendingPlay, PlayOutcome, ResourceId,
    TaggedEvent,
};
pub use context::SharedContext;
pub use controller::PlaybackController;
pub use error::{MediaError, PlaybackError, Result};
pub use events::{Emitter, PlayerEvent, Subscription};
pub use queue::Queue;
pub use types::{
    format_time, PlaybackState, PlayerConfig, PlayerSettings, RepeatMode, Track, TransportStatus,
    MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE,
};
pub use volume::Volume;
