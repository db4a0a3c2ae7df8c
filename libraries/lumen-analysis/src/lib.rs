//! Lumen Player - Spectrum Analysis
//!
//! Platform-agnostic analysis pipeline for Lumen Player.
//!
//! This crate provides:
//! - One analyser tap per media resource, reused across track switches
//! - Browser-compatible software analyser (Blackman window, smoothing, dB bytes)
//! - Downsampling into bars, circles, lines and frequency bands
//! - Render loop that only reschedules while audio is playing
//! - Stable idle placeholder frames when nothing plays or analysis is unavailable
//!
//! # Example
//!
//! ```rust
//! use lumen_analysis::{
//!     AnalyserConfig, AnalysisPipeline, ManualScheduler, SoftwareGraph, TapStatus,
//! };
//! use lumen_playback::{ResourceId, TransportStatus};
//!
//! let mut pipeline: AnalysisPipeline<(), _, _> = AnalysisPipeline::new(
//!     SoftwareGraph::default(),
//!     ManualScheduler::new(),
//!     AnalyserConfig::default(),
//! );
//!
//! let resource = ResourceId::allocate();
//! assert_eq!(pipeline.ensure_tap(resource, &()), TapStatus::Created);
//! assert_eq!(pipeline.ensure_tap(resource, &()), TapStatus::Reused);
//!
//! // Push some PCM into the tap and render one tick
//! let feed = pipeline.graph().feed(resource).unwrap();
//! feed.push(&[0.5; 256]);
//! pipeline.sync_transport(TransportStatus::Playing);
//! pipeline.on_animation_frame();
//!
//! let bars = pipeline.bars(32);
//! assert_eq!(bars.len(), 32);
//! ```

mod analyser;
mod config;
mod downsample;
mod error;
mod frame;
mod graph;
mod pipeline;
mod scheduler;

// Public exports
pub use analyser::{blackman_window, Analyser, SampleFeed, SoftwareAnalyser};
pub use config::{AnalyserConfig, MAX_FFT_SIZE, MIN_FFT_SIZE};
pub use downsample::{
    band_levels, downsample_to_bars, downsample_to_circular, downsample_to_circular_with,
    downsample_to_wave, BandLevels, CircularLayout, CircularPoint, WavePoint, BASS_BINS,
    MID_BINS, MIN_BAR_LEVEL, TREBLE_BINS,
};
pub use error::{AnalysisError, Result};
pub use frame::{AnalysisFrame, FrameKind, BIN_COUNT};
pub use graph::{AudioGraph, SoftwareContext, SoftwareGraph, UnsupportedGraph};
pub use pipeline::{AnalysisPipeline, TapStatus};
pub use scheduler::{FrameScheduler, ManualScheduler, RenderLoop};
