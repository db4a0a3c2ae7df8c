//! Player facade
//!
//! Owns the playback controller and the analysis pipeline and keeps the
//! second in step with the first: after every command and every batch of
//! media notifications the tap is ensured for the bound resource and the
//! render loop follows the transport status.

use crate::config::LumenConfig;
use crate::error::Result;
use lumen_analysis::{
    AnalysisFrame, AnalysisPipeline, AudioGraph, BandLevels, CircularPoint, FrameScheduler,
    ManualScheduler, SoftwareGraph, TapStatus, WavePoint,
};
use lumen_playback::{
    MediaElement, PlaybackController, PlaybackState, PlayerEvent, PlayerSettings, RepeatMode,
    Subscription, Track, TransportStatus,
};
use tracing::{debug, info};

/// Player running the software analyser, driven by hand
pub type SoftwarePlayer<E> = Player<E, SoftwareGraph, ManualScheduler>;

/// Playback controller plus spectrum pipeline over one media element
pub struct Player<E: MediaElement, G, S> {
    controller: PlaybackController<E>,
    pipeline: AnalysisPipeline<E, G, S>,
    last_tap: Option<TapStatus>,
}

impl<E: MediaElement> Player<E, SoftwareGraph, ManualScheduler> {
    pub fn software(element: E, config: LumenConfig) -> Self {
        Self::new(
            element,
            SoftwareGraph::default(),
            ManualScheduler::new(),
            config,
        )
    }
}

impl<E, G, S> Player<E, G, S>
where
    E: MediaElement,
    G: AudioGraph<E>,
    S: FrameScheduler,
{
    pub fn new(element: E, graph: G, scheduler: S, config: LumenConfig) -> Self {
        let config = config.normalized();
        info!("Creating player");
        Self {
            controller: PlaybackController::new(element, config.playback),
            pipeline: AnalysisPipeline::new(graph, scheduler, config.analyser),
            last_tap: None,
        }
    }

    /// Bring the pipeline in line with the controller
    fn reconcile(&mut self) {
        if self.controller.binding().source().is_some() {
            let id = self.controller.resource_id();
            let status = self
                .pipeline
                .ensure_tap(id, self.controller.binding().element());
            self.last_tap = Some(status);
        }
        self.pipeline.sync_transport(self.controller.status());
    }

    // ===== Queue =====

    /// Replace the queue; `initial` is a catalog index to select (paused)
    pub fn load_queue(&mut self, tracks: Vec<Track>, initial: Option<usize>) -> Result<()> {
        self.controller.load_queue(tracks, initial)?;
        self.reconcile();
        Ok(())
    }

    pub fn play_track_at(&mut self, index: usize) -> Result<()> {
        self.controller.play_track_at(index)?;
        self.reconcile();
        Ok(())
    }

    pub fn next(&mut self) -> Option<usize> {
        let index = self.controller.next();
        self.reconcile();
        index
    }

    pub fn previous(&mut self) -> Option<usize> {
        let index = self.controller.previous();
        self.reconcile();
        index
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.controller.toggle_shuffle()
    }

    pub fn set_shuffled(&mut self, shuffled: bool) {
        self.controller.set_shuffled(shuffled);
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.controller.cycle_repeat_mode()
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.controller.set_repeat_mode(mode);
    }

    // ===== Transport =====

    pub fn toggle_play_pause(&mut self) {
        self.controller.toggle_play_pause();
        self.reconcile();
    }

    pub fn play(&mut self) {
        self.controller.play();
        self.reconcile();
    }

    pub fn pause(&mut self) {
        self.controller.pause();
        self.reconcile();
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        self.reconcile();
    }

    pub fn seek_to(&mut self, seconds: f64) {
        self.controller.seek_to(seconds);
    }

    pub fn seek_to_percent(&mut self, fraction: f64) {
        self.controller.seek_to_percent(fraction);
    }

    // ===== Output =====

    pub fn set_volume(&mut self, level: f32) {
        self.controller.set_volume(level);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.controller.set_muted(muted);
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.controller.toggle_mute()
    }

    pub fn set_playback_rate(&mut self, rate: f32) -> f32 {
        self.controller.set_playback_rate(rate)
    }

    pub fn settings(&self) -> PlayerSettings {
        self.controller.settings()
    }

    pub fn apply_settings(&mut self, settings: PlayerSettings) {
        self.controller.apply_settings(settings);
    }

    // ===== Driving =====

    /// Apply pending media notifications, then reconcile the pipeline
    ///
    /// Call whenever the element may have reported something (after an
    /// event listener fired, or once per tick).
    pub fn pump(&mut self) -> usize {
        let applied = self.controller.pump();
        if applied > 0 {
            self.reconcile();
        }
        applied
    }

    /// Render one tick; returns whether another frame was requested
    pub fn on_animation_frame(&mut self) -> bool {
        self.pump();
        self.pipeline.on_animation_frame()
    }

    /// Stop playback and release the analysis context for good
    pub fn dispose(&mut self) {
        debug!("Disposing player");
        self.controller.stop();
        self.pipeline.dispose();
        self.last_tap = None;
    }

    // ===== Subscriptions =====

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&PlayerEvent) + 'static,
    {
        self.controller.subscribe(callback)
    }

    pub fn on_frame<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&AnalysisFrame) + 'static,
    {
        self.pipeline.on_frame(callback)
    }

    // ===== Visualization =====

    pub fn current_frame(&self) -> &AnalysisFrame {
        self.pipeline.current_frame()
    }

    pub fn bars(&self, bar_count: usize) -> Vec<f32> {
        self.pipeline.bars(bar_count)
    }

    pub fn circular(&self, point_count: usize) -> Vec<CircularPoint> {
        self.pipeline.circular(point_count)
    }

    pub fn wave(&self, point_count: usize) -> Vec<WavePoint> {
        self.pipeline.wave(point_count)
    }

    pub fn bands(&self) -> BandLevels {
        self.pipeline.bands()
    }

    pub fn waveform(&mut self) -> Vec<f32> {
        self.pipeline.sample_waveform()
    }

    // ===== State Queries =====

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn status(&self) -> TransportStatus {
        self.controller.status()
    }

    /// Outcome of the most recent tap check, `None` before the first bind
    pub fn tap_status(&self) -> Option<TapStatus> {
        self.last_tap
    }

    pub fn is_visualizing(&self) -> bool {
        self.pipeline.is_running()
    }

    pub fn controller(&self) -> &PlaybackController<E> {
        &self.controller
    }

    pub fn pipeline(&self) -> &AnalysisPipeline<E, G, S> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut AnalysisPipeline<E, G, S> {
        &mut self.pipeline
    }

    pub fn element_mut(&mut self) -> &mut E {
        self.controller.binding_mut().element_mut()
    }
}
