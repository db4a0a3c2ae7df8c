//! Analysis pipeline
//!
//! Keeps exactly one analyser tap per media resource for the resource's
//! whole lifetime and turns it into one [`AnalysisFrame`] per render tick.
//! Track switches rebind the resource's source but never touch the tap.
//!
//! When the platform has no analysis API the pipeline degrades to the idle
//! placeholder frame and says so once in the log; playback is unaffected.

use crate::analyser::Analyser;
use crate::config::AnalyserConfig;
use crate::downsample::{
    band_levels, downsample_to_bars, downsample_to_circular, downsample_to_wave, BandLevels,
    CircularPoint, WavePoint,
};
use crate::error::AnalysisError;
use crate::frame::AnalysisFrame;
use crate::graph::AudioGraph;
use crate::scheduler::{FrameScheduler, RenderLoop};
use lumen_playback::{Emitter, ResourceId, Subscription, TransportStatus};
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Outcome of [`AnalysisPipeline::ensure_tap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapStatus {
    /// A new tap was attached
    Created,

    /// The resource was already tapped
    Reused,

    /// No tap available; frames are placeholders
    Degraded,
}

struct Tap {
    resource: ResourceId,
    analyser: Box<dyn Analyser>,
}

/// Frequency analysis of the playing resource, one frame per tick
///
/// `R` is the platform resource type the graph taps (the `<audio>` element
/// in the browser).
pub struct AnalysisPipeline<R: ?Sized, G, S> {
    graph: G,
    config: AnalyserConfig,
    tap: Option<Tap>,

    /// Platform has no analysis API
    unsupported: bool,
    warned: bool,
    disposed: bool,
    playing: bool,

    frame: AnalysisFrame,
    frame_live: bool,
    idle_frame: AnalysisFrame,

    render_loop: RenderLoop<S>,
    listeners: Emitter<AnalysisFrame>,
    resource: PhantomData<fn(&R)>,
}

impl<R, G, S> AnalysisPipeline<R, G, S>
where
    R: ?Sized,
    G: AudioGraph<R>,
    S: FrameScheduler,
{
    pub fn new(graph: G, scheduler: S, config: AnalyserConfig) -> Self {
        let config = config.normalized();
        Self {
            graph,
            config,
            tap: None,
            unsupported: false,
            warned: false,
            disposed: false,
            playing: false,
            frame: AnalysisFrame::silent(config.bin_count()),
            frame_live: false,
            idle_frame: AnalysisFrame::idle(config.bin_count()),
            render_loop: RenderLoop::new(scheduler),
            listeners: Emitter::new(),
            resource: PhantomData,
        }
    }

    /// Make sure `resource` feeds an analyser
    ///
    /// Idempotent per resource: the tap is created on the first call and
    /// reused afterwards. Passing a different resource tears the old tap
    /// down first. Never fails; without analysis support the pipeline
    /// degrades to placeholder frames.
    pub fn ensure_tap(&mut self, id: ResourceId, resource: &R) -> TapStatus {
        if self.disposed {
            return TapStatus::Degraded;
        }

        match self.tapped_resource() {
            Some(tapped) if tapped == id => return TapStatus::Reused,
            Some(_) => self.release_tap(),
            None => {}
        }

        if self.unsupported {
            return TapStatus::Degraded;
        }

        match self.graph.create_tap(id, resource, &self.config) {
            Ok(analyser) => {
                let bins = analyser.frequency_bin_count();
                if self.frame.len() != bins {
                    self.frame = AnalysisFrame::silent(bins);
                }
                self.tap = Some(Tap {
                    resource: id,
                    analyser,
                });
                info!("Analysis tap attached to resource {}", id.value());
                TapStatus::Created
            }
            Err(err) => {
                self.degrade(&err);
                TapStatus::Degraded
            }
        }
    }

    fn degrade(&mut self, err: &AnalysisError) {
        if matches!(err, AnalysisError::UnsupportedEnvironment(_)) {
            self.unsupported = true;
        }
        if self.warned {
            debug!("Analysis tap unavailable: {}", err);
        } else {
            warn!("Audio analysis unavailable, showing placeholder frames: {}", err);
            self.warned = true;
        }
    }

    fn release_tap(&mut self) {
        if let Some(mut tap) = self.tap.take() {
            tap.analyser.disconnect();
            self.graph.release_tap(tap.resource);
            debug!("Analysis tap for resource {} torn down", tap.resource.value());
        }
        self.frame_live = false;
    }

    /// Pull the current bin magnitudes
    ///
    /// Live data while a tap exists and audio is playing, the idle
    /// placeholder otherwise. Call at most once per render tick.
    pub fn sample_frame(&mut self) -> &AnalysisFrame {
        self.refresh_frame();
        self.current_frame()
    }

    fn refresh_frame(&mut self) {
        self.frame_live = false;
        if !self.playing {
            return;
        }
        if let Some(tap) = self.tap.as_mut() {
            tap.analyser.byte_frequency_data(self.frame.bins_mut());
            self.frame_live = true;
        }
    }

    /// Most recently sampled frame
    pub fn current_frame(&self) -> &AnalysisFrame {
        if self.frame_live {
            &self.frame
        } else {
            &self.idle_frame
        }
    }

    /// Current waveform in -1.0..1.0; empty without a tap
    pub fn sample_waveform(&mut self) -> Vec<f32> {
        let Some(tap) = self.tap.as_mut() else {
            return Vec::new();
        };
        let mut bytes = vec![128u8; tap.analyser.fft_size()];
        tap.analyser.byte_time_domain_data(&mut bytes);
        bytes
            .into_iter()
            .map(|v| (f32::from(v) - 128.0) / 128.0)
            .collect()
    }

    /// Register a frame consumer, called once per rendered tick
    pub fn on_frame<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&AnalysisFrame) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Follow the transport: run the loop while playing, stop otherwise
    ///
    /// Consumers receive one idle frame when playback stops.
    pub fn sync_transport(&mut self, status: TransportStatus) {
        let playing = status == TransportStatus::Playing;
        if playing == self.playing {
            return;
        }

        self.playing = playing;
        if playing && !self.disposed {
            debug!("Render loop started");
            self.render_loop.start();
        } else {
            debug!("Render loop stopped ({:?})", status);
            self.render_loop.stop();
            self.frame_live = false;
            self.listeners.emit(&self.idle_frame);
        }
    }

    /// Start the render loop
    pub fn start(&mut self) {
        if !self.disposed {
            self.render_loop.start();
        }
    }

    /// Halt the render loop; the tap stays attached
    ///
    /// Transport is treated as not playing until the next
    /// [`sync_transport`](Self::sync_transport) says otherwise.
    pub fn stop(&mut self) {
        self.render_loop.stop();
        self.playing = false;
        self.frame_live = false;
    }

    /// Run one render tick from the scheduler callback
    ///
    /// Returns whether the loop rescheduled itself.
    pub fn on_animation_frame(&mut self) -> bool {
        if !self.render_loop.begin_tick() {
            return false;
        }
        self.refresh_frame();
        let frame = if self.frame_live {
            &self.frame
        } else {
            &self.idle_frame
        };
        self.listeners.emit(frame);
        self.render_loop.finish_tick(self.playing)
    }

    /// Tear the tap down and close the analysis context
    ///
    /// Only for permanently discarding the resource; the pipeline produces
    /// placeholder frames afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.render_loop.stop();
        self.release_tap();
        self.graph.close();
        self.disposed = true;
        self.playing = false;
        info!("Analysis pipeline disposed");
    }

    // ===== Convenience views of the current frame =====

    pub fn bars(&self, bar_count: usize) -> Vec<f32> {
        downsample_to_bars(self.current_frame(), bar_count)
    }

    pub fn circular(&self, point_count: usize) -> Vec<CircularPoint> {
        downsample_to_circular(self.current_frame(), point_count)
    }

    pub fn wave(&self, point_count: usize) -> Vec<WavePoint> {
        downsample_to_wave(self.current_frame(), point_count)
    }

    pub fn bands(&self) -> BandLevels {
        band_levels(self.current_frame())
    }

    // ===== State Queries =====

    pub fn has_tap(&self) -> bool {
        self.tap.is_some()
    }

    pub fn tapped_resource(&self) -> Option<ResourceId> {
        self.tap.as_ref().map(|tap| tap.resource)
    }

    /// Whether analysis is unavailable on this platform
    pub fn is_degraded(&self) -> bool {
        self.unsupported || self.disposed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn render_loop(&self) -> &RenderLoop<S> {
        &self.render_loop
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        self.render_loop.scheduler_mut()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }
}
