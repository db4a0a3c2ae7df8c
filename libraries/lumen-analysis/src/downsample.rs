//! Downsampling frames into drawable shapes
//!
//! All functions are pure: the same frame and count always give the same
//! output. Magnitudes are normalized from bytes to 0.0-1.0.

use crate::frame::{average, AnalysisFrame};
use serde::Serialize;
use std::f32::consts::TAU;
use std::ops::Range;

/// Smallest bar height, keeps silent bars visible
pub const MIN_BAR_LEVEL: f32 = 0.01;

/// Bass bins (0-8)
pub const BASS_BINS: Range<usize> = 0..8;

/// Mid bins (8-32)
pub const MID_BINS: Range<usize> = 8..32;

/// Treble bins (32-64)
pub const TREBLE_BINS: Range<usize> = 32..64;

/// Point of a circular visualization
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircularPoint {
    pub x: f32,
    pub y: f32,

    /// Normalized magnitude
    pub value: f32,

    /// Radians, `i / count * 2π`
    pub angle: f32,

    pub radius: f32,
}

/// Radius mapping for circular visualizations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularLayout {
    /// Radius of a silent point (default: 50)
    pub base_radius: f32,

    /// Radius added at full magnitude (default: 100)
    pub scale: f32,
}

impl Default for CircularLayout {
    fn default() -> Self {
        Self {
            base_radius: 50.0,
            scale: 100.0,
        }
    }
}

/// Point of a line visualization; `x` runs over 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WavePoint {
    pub x: f32,
    pub y: f32,
}

/// Average level per frequency band, normalized
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BandLevels {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
}

/// Bin range averaged into output slot `index` of `count`
///
/// Ranges are contiguous and cover every bin when `count <= bins`. With more
/// slots than bins each range is one bin wide and bins repeat.
fn slot_range(index: usize, count: usize, bins: usize) -> Range<usize> {
    let start = (index * bins / count).min(bins - 1);
    let end = ((index + 1) * bins / count).clamp(start + 1, bins);
    start..end
}

/// Normalized averages for `count` slots
fn slot_levels(frame: &AnalysisFrame, count: usize) -> Vec<f32> {
    let bins = frame.bins();
    if count == 0 {
        return Vec::new();
    }
    if bins.is_empty() {
        return vec![0.0; count];
    }
    (0..count)
        .map(|i| average(&bins[slot_range(i, count, bins.len())]) / 255.0)
        .collect()
}

/// Average contiguous bin ranges into `bar_count` bars in 0.01-1.0
pub fn downsample_to_bars(frame: &AnalysisFrame, bar_count: usize) -> Vec<f32> {
    slot_levels(frame, bar_count)
        .into_iter()
        .map(|level| level.max(MIN_BAR_LEVEL))
        .collect()
}

/// Map averaged magnitudes onto a circle with the default layout
pub fn downsample_to_circular(frame: &AnalysisFrame, point_count: usize) -> Vec<CircularPoint> {
    downsample_to_circular_with(frame, point_count, CircularLayout::default())
}

/// Map averaged magnitudes onto a circle
pub fn downsample_to_circular_with(
    frame: &AnalysisFrame,
    point_count: usize,
    layout: CircularLayout,
) -> Vec<CircularPoint> {
    slot_levels(frame, point_count)
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let angle = i as f32 / point_count as f32 * TAU;
            let radius = layout.base_radius + value * layout.scale;
            CircularPoint {
                x: angle.cos() * radius,
                y: angle.sin() * radius,
                value,
                angle,
                radius,
            }
        })
        .collect()
}

/// Lay averaged magnitudes out left to right for a line visualization
pub fn downsample_to_wave(frame: &AnalysisFrame, point_count: usize) -> Vec<WavePoint> {
    let last = point_count.saturating_sub(1).max(1) as f32;
    slot_levels(frame, point_count)
        .into_iter()
        .enumerate()
        .map(|(i, y)| WavePoint {
            x: i as f32 / last,
            y,
        })
        .collect()
}

/// Bass, mid, treble and overall levels of a frame
pub fn band_levels(frame: &AnalysisFrame) -> BandLevels {
    let bins = frame.bins();
    let band = |range: Range<usize>| {
        let end = range.end.min(bins.len());
        let start = range.start.min(end);
        average(&bins[start..end]) / 255.0
    };

    BandLevels {
        bass: band(BASS_BINS),
        mid: band(MID_BINS),
        treble: band(TREBLE_BINS),
        overall: frame.average() / 255.0,
    }
}
