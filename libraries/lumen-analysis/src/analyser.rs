//! Frequency analysers
//!
//! [`Analyser`] is the read side of an analysis tap: a fixed number of
//! frequency bins (half the FFT size) and the raw time-domain window, both
//! as bytes.
//!
//! [`SoftwareAnalyser`] reproduces a browser `AnalyserNode` on top of
//! `rustfft` so native builds and tests see the same byte values:
//!
//! 1. take the most recent `fft_size` samples from the [`SampleFeed`]
//! 2. apply a Blackman window
//! 3. FFT, magnitude scaled by `1 / fft_size`
//! 4. smooth against the previous frame with `smoothing_time_constant`
//! 5. convert to dB and map `[min_decibels, max_decibels]` onto `0..=255`

use crate::config::AnalyserConfig;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Read side of an analysis tap
pub trait Analyser {
    /// Number of frequency bins
    fn frequency_bin_count(&self) -> usize;

    /// Size of the time-domain window
    fn fft_size(&self) -> usize;

    /// Fill `out` with smoothed bin magnitudes (0-255)
    ///
    /// Writes `min(out.len(), frequency_bin_count())` values.
    fn byte_frequency_data(&mut self, out: &mut [u8]);

    /// Fill `out` with the current waveform, 128 being silence
    fn byte_time_domain_data(&mut self, out: &mut [u8]);

    /// Detach from the audio graph
    fn disconnect(&mut self) {}
}

/// Bounded PCM buffer shared between an audio producer and an analyser
///
/// The producer may live on another thread (a decoder or output
/// callback). Only the most recent `capacity` mono samples are kept.
#[derive(Clone)]
pub struct SampleFeed {
    buffer: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append mono samples, discarding the oldest beyond capacity
    pub fn push(&self, samples: &[f32]) {
        let mut buffer = self.lock();
        let keep = samples.len().min(self.capacity);
        buffer.extend(&samples[samples.len() - keep..]);
        let excess = buffer.len().saturating_sub(self.capacity);
        buffer.drain(..excess);
    }

    /// Append interleaved samples, averaging channels down to mono
    pub fn push_interleaved(&self, samples: &[f32], channels: usize) {
        if channels <= 1 {
            self.push(samples);
            return;
        }
        let mono: Vec<f32> = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        self.push(&mono);
    }

    /// Copy the newest samples into `out`, zero-padding at the front
    pub fn copy_latest(&self, out: &mut [f32]) {
        let buffer = self.lock();
        let available = buffer.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        for (slot, sample) in out[pad..]
            .iter_mut()
            .zip(buffer.iter().skip(buffer.len() - available))
        {
            *slot = *sample;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SampleFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleFeed")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Blackman window as used by browser analysers (alpha = 0.16)
pub fn blackman_window(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;

    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32 / n;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

/// Browser-compatible analyser over a [`SampleFeed`]
pub struct SoftwareAnalyser {
    config: AnalyserConfig,
    feed: SampleFeed,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    samples: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
}

impl SoftwareAnalyser {
    pub fn new(config: AnalyserConfig, feed: SampleFeed) -> Self {
        let config = config.normalized();
        let size = config.fft_size;

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);

        Self {
            config,
            feed,
            fft,
            window: blackman_window(size),
            smoothed: vec![0.0; config.bin_count()],
            samples: vec![0.0; size],
            spectrum: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn feed(&self) -> &SampleFeed {
        &self.feed
    }

    /// Run one analysis pass, updating the smoothed magnitudes
    fn analyse(&mut self) {
        self.feed.copy_latest(&mut self.samples);

        for ((slot, sample), weight) in self
            .spectrum
            .iter_mut()
            .zip(&self.samples)
            .zip(&self.window)
        {
            *slot = Complex::new(sample * weight, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let scale = 1.0 / self.config.fft_size as f32;
        let tau = self.config.smoothing_time_constant;
        for (previous, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() * scale;
            let value = tau * *previous + (1.0 - tau) * magnitude;
            *previous = if value.is_finite() { value } else { 0.0 };
        }
    }

    fn to_byte(&self, magnitude: f32) -> u8 {
        let min = self.config.min_decibels;
        let range = self.config.max_decibels - min;
        let decibels = if magnitude > 0.0 {
            20.0 * magnitude.log10()
        } else {
            f32::NEG_INFINITY
        };
        let scaled = 255.0 * (decibels - min) / range;
        if scaled.is_nan() {
            0
        } else {
            scaled.clamp(0.0, 255.0) as u8
        }
    }
}

impl Analyser for SoftwareAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.config.bin_count()
    }

    fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyse();
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = self.to_byte(magnitude);
        }
    }

    fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        self.feed.copy_latest(&mut self.samples);
        for (byte, &sample) in out.iter_mut().zip(&self.samples) {
            *byte = (128.0 * (sample + 1.0)).clamp(0.0, 255.0) as u8;
        }
    }

    fn disconnect(&mut self) {
        self.feed.clear();
    }
}

impl fmt::Debug for SoftwareAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareAnalyser")
            .field("config", &self.config)
            .field("feed", &self.feed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn feed_keeps_only_newest_samples() {
        let feed = SampleFeed::new(4);
        feed.push(&[1.0, 2.0, 3.0]);
        feed.push(&[4.0, 5.0, 6.0]);

        let mut out = [0.0; 4];
        feed.copy_latest(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn feed_pads_front_with_silence() {
        let feed = SampleFeed::new(8);
        feed.push(&[0.5, 0.25]);

        let mut out = [9.0; 4];
        feed.copy_latest(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn feed_downmixes_interleaved_audio() {
        let feed = SampleFeed::new(4);
        feed.push_interleaved(&[1.0, 0.0, 0.5, 0.5], 2);

        let mut out = [0.0; 2];
        feed.copy_latest(&mut out);
        assert_eq!(out, [0.5, 0.5]);
    }

    #[test]
    fn feed_survives_poisoned_lock() {
        let feed = SampleFeed::new(4);
        let poisoner = feed.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.buffer.lock().unwrap();
            panic!("poison the feed");
        })
        .join();

        feed.push(&[1.0]);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn blackman_window_shape() {
        let window = blackman_window(256);
        assert!(window[0].abs() < 1e-6);
        assert!((window[128] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn silence_maps_to_zero_bytes() {
        let feed = SampleFeed::new(256);
        let mut analyser = SoftwareAnalyser::new(AnalyserConfig::default(), feed);

        let mut bins = [255u8; 128];
        analyser.byte_frequency_data(&mut bins);
        assert!(bins.iter().all(|&b| b == 0));

        let mut wave = [0u8; 256];
        analyser.byte_time_domain_data(&mut wave);
        assert!(wave.iter().all(|&b| b == 128));
    }

    #[test]
    fn sine_peaks_at_expected_bin() {
        let sample_rate = 44_100.0;
        // Bin width is sample_rate / 256; pick the centre of bin 10
        let frequency = 10.0 * sample_rate / 256.0;
        let feed = SampleFeed::new(256);
        feed.push(&sine(frequency, sample_rate, 256));

        let config = AnalyserConfig {
            smoothing_time_constant: 0.0,
            ..AnalyserConfig::default()
        };
        let mut analyser = SoftwareAnalyser::new(config, feed);
        let mut bins = [0u8; 128];
        analyser.byte_frequency_data(&mut bins);

        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 10);
        assert!(bins[10] > 200, "peak too quiet: {}", bins[10]);
        assert!(bins[60] < bins[10] / 2);
    }

    #[test]
    fn smoothing_decays_towards_silence() {
        let feed = SampleFeed::new(256);
        feed.push(&sine(2_000.0, 44_100.0, 256));
        let mut analyser = SoftwareAnalyser::new(AnalyserConfig::default(), feed.clone());

        let mut loud = [0u8; 128];
        analyser.byte_frequency_data(&mut loud);
        let mut louder = [0u8; 128];
        analyser.byte_frequency_data(&mut louder);

        feed.clear();
        let mut fading = [0u8; 128];
        analyser.byte_frequency_data(&mut fading);

        let peak = louder.iter().copied().max().unwrap();
        let faded = fading.iter().copied().max().unwrap();
        assert!(louder.iter().copied().max() >= loud.iter().copied().max());
        assert!(faded < peak && faded > 0);
    }

    #[test]
    fn full_scale_waveform_maps_to_byte_range() {
        let feed = SampleFeed::new(32);
        feed.push(&[1.0, -1.0, 0.5]);
        let config = AnalyserConfig {
            fft_size: 32,
            ..AnalyserConfig::default()
        };
        let mut analyser = SoftwareAnalyser::new(config, feed);

        let mut wave = [0u8; 32];
        analyser.byte_time_domain_data(&mut wave);
        assert_eq!(&wave[29..], &[255, 0, 192]);
    }
}
