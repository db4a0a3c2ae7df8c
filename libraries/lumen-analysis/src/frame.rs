//! Analysis frames
//!
//! One frame is a snapshot of the analyser's frequency bins taken during a
//! single render tick. Frames are owned by the pipeline; subscribers only
//! ever see `&AnalysisFrame` for the duration of the callback.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Number of frequency bins per frame (FFT size 256)
pub const BIN_COUNT: usize = 128;

/// Seed for the idle placeholder so every idle frame is identical
const IDLE_SEED: u64 = 0x6c75_6d65_6e00;

/// Placeholder magnitudes stay in this band
const IDLE_MIN: u8 = 10;
const IDLE_MAX: u8 = 60;

/// Where a frame's data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Sampled from a live analyser
    Live,

    /// Synthetic placeholder (nothing playing, or analysis unavailable)
    Idle,
}

/// Frequency-bin magnitudes for one render tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisFrame {
    bins: Vec<u8>,
    kind: FrameKind,
}

impl AnalysisFrame {
    /// Frame sampled from an analyser
    pub fn live(bins: Vec<u8>) -> Self {
        Self {
            bins,
            kind: FrameKind::Live,
        }
    }

    /// Low-amplitude synthetic frame
    ///
    /// Deterministic: every call returns the same values.
    pub fn idle(bin_count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(IDLE_SEED);
        let bins = (0..bin_count)
            .map(|_| rng.gen_range(IDLE_MIN..IDLE_MAX))
            .collect();
        Self {
            bins,
            kind: FrameKind::Idle,
        }
    }

    /// All-zero live frame
    pub fn silent(bin_count: usize) -> Self {
        Self::live(vec![0; bin_count])
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub(crate) fn bins_mut(&mut self) -> &mut [u8] {
        &mut self.bins
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn is_idle(&self) -> bool {
        self.kind == FrameKind::Idle
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Mean magnitude over all bins, in raw byte units
    pub fn average(&self) -> f32 {
        average(&self.bins)
    }
}

/// Mean of a byte slice, 0.0 when empty
pub(crate) fn average(values: &[u8]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: u32 = values.iter().map(|&v| u32::from(v)).sum();
    sum as f32 / values.len() as f32
}
