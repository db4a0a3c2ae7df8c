//! Analyser configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Smallest FFT size accepted by browser analysers
pub const MIN_FFT_SIZE: usize = 32;

/// Largest FFT size accepted by browser analysers
pub const MAX_FFT_SIZE: usize = 32768;

/// Analyser node parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyserConfig {
    /// Window size in samples, a power of two (default: 256)
    pub fft_size: usize,

    /// Weight of the previous frame when averaging (0.0-1.0, default: 0.8)
    pub smoothing_time_constant: f32,

    /// Level mapped to byte 0 (default: -90 dB)
    pub min_decibels: f32,

    /// Level mapped to byte 255 (default: -10 dB)
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing_time_constant: 0.8,
            min_decibels: -90.0,
            max_decibels: -10.0,
        }
    }
}

impl AnalyserConfig {
    /// Parse a (possibly partial) JSON document, repairing invalid values
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AnalyserConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Round the FFT size to a supported power of two and clamp the rest
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        self.fft_size = self
            .fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two()
            .min(MAX_FFT_SIZE);

        self.smoothing_time_constant = if self.smoothing_time_constant.is_nan() {
            defaults.smoothing_time_constant
        } else {
            self.smoothing_time_constant.clamp(0.0, 1.0)
        };

        let decibels_valid = self.min_decibels.is_finite()
            && self.max_decibels.is_finite()
            && self.min_decibels < self.max_decibels;
        if !decibels_valid {
            self.min_decibels = defaults.min_decibels;
            self.max_decibels = defaults.max_decibels;
        }
        self
    }

    /// Number of frequency bins (half the FFT size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}
