//! Playback controller - the queue/transport state machine
//!
//! Owns the queue, the current-track pointer and the transport status, and
//! drives a single [`MediaBinding`]. Commands mutate state synchronously;
//! asynchronous outcomes (metadata, end of track, failures, play
//! resolutions) reach the controller through [`PlaybackController::pump`].
//!
//! Transport transitions:
//!
//! ```text
//! idle -> loading -> playing | paused | error
//! playing <-> paused
//! playing -> ended -> (repeat one: restart) | (otherwise: next track or idle)
//! ```

use crate::{
    binding::{
        MediaBinding, MediaElement, MediaEvent, PendingPlay, PlayOutcome, ResourceId, TaggedEvent,
    },
    error::{MediaError, PlaybackError, Result},
    events::{Emitter, PlayerEvent, Subscription},
    queue::{select_next, select_previous, Queue},
    types::{PlaybackState, PlayerConfig, PlayerSettings, RepeatMode, Track, TransportStatus},
    volume::Volume,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Single source of truth for what should be playing
pub struct PlaybackController<E: MediaElement> {
    binding: MediaBinding<E>,
    queue: Queue,
    volume: Volume,
    repeat: RepeatMode,
    playback_rate: f32,

    status: TransportStatus,
    position: f64,
    duration: f64,
    last_error: Option<MediaError>,

    /// Start playing once the current load is ready
    autoplay: bool,

    /// Play request whose outcome is still outstanding
    pending_play: Option<PendingPlay>,

    rng: StdRng,
    events: Emitter<PlayerEvent>,
}

impl<E: MediaElement> PlaybackController<E> {
    /// Create a controller driving `element`
    pub fn new(element: E, config: PlayerConfig) -> Self {
        let config = config.normalized();

        let mut binding = MediaBinding::new(element);
        binding.set_volume(config.volume);
        binding.set_muted(config.muted);
        let playback_rate = binding.set_playback_rate(config.playback_rate);

        let mut volume = Volume::new(config.volume);
        volume.set_muted(config.muted);

        let mut rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut queue = Queue::new();
        if config.shuffled {
            queue.shuffle(&mut rng);
        }

        Self {
            binding,
            queue,
            volume,
            repeat: config.repeat,
            playback_rate,
            status: TransportStatus::Idle,
            position: 0.0,
            duration: 0.0,
            last_error: None,
            autoplay: false,
            pending_play: None,
            rng,
            events: Emitter::new(),
        }
    }

    /// Register a listener for controller notifications
    ///
    /// Listeners run synchronously inside the command that caused the
    /// event and must not call back into the controller.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&PlayerEvent) + 'static,
    {
        self.events.subscribe(callback)
    }

    // ===== Queue =====

    /// Replace the queue
    ///
    /// The current selection is dropped. With `initial` set, the track at
    /// that index of `tracks` is selected and loaded without starting
    /// playback. When shuffle is on the new queue is shuffled immediately.
    pub fn load_queue(&mut self, tracks: Vec<Track>, initial: Option<usize>) -> Result<()> {
        if let Some(index) = initial {
            if index >= tracks.len() {
                return Err(PlaybackError::IndexOutOfRange {
                    index,
                    len: tracks.len(),
                });
            }
        }

        let previous = self.current_track_id();
        let shuffled = self.queue.is_shuffled();
        self.abandon_current();
        self.queue.replace(tracks, shuffled, &mut self.rng);
        debug!("Loaded queue of {} tracks (shuffled: {})", self.queue.len(), shuffled);

        self.emit(PlayerEvent::QueueChanged {
            length: self.queue.len(),
            shuffled,
        });
        self.set_status(TransportStatus::Idle);

        match initial.and_then(|index| self.queue.position_of(index)) {
            Some(position) => self.select_and_bind(position, false, previous),
            None if previous.is_some() => self.emit(PlayerEvent::TrackChanged {
                index: None,
                track_id: None,
                previous_track_id: previous,
            }),
            None => {}
        }
        Ok(())
    }

    /// Select the track at a queue position and start playing it
    ///
    /// Out-of-range indices are rejected and leave the state untouched.
    pub fn play_track_at(&mut self, index: usize) -> Result<()> {
        let len = self.queue.len();
        if index >= len {
            debug!("Rejecting play_track_at({}) on queue of {}", index, len);
            return Err(PlaybackError::IndexOutOfRange { index, len });
        }

        let previous = self.current_track_id();
        self.select_and_bind(index, true, previous);
        Ok(())
    }

    /// Advance to the next track
    ///
    /// Returns the new queue position; `None` means the queue ran out and
    /// the controller is idle with nothing selected.
    pub fn next(&mut self) -> Option<usize> {
        let target = select_next(
            self.queue.current(),
            self.queue.len(),
            self.repeat,
            self.queue.is_shuffled(),
            &mut self.rng,
        );
        debug!("Next track: {:?} -> {:?}", self.queue.current(), target);
        self.go_to(target)
    }

    /// Step back to the previous track
    ///
    /// Clamps to the first track unless repeat-all wraps to the last.
    pub fn previous(&mut self) -> Option<usize> {
        let target = select_previous(
            self.queue.current(),
            self.queue.len(),
            self.repeat,
            self.queue.is_shuffled(),
            &mut self.rng,
        );
        debug!("Previous track: {:?} -> {:?}", self.queue.current(), target);
        self.go_to(target)
    }

    /// Whether `next()` would select a track
    pub fn has_next(&self) -> bool {
        if self.queue.is_empty() {
            return false;
        }
        if self.repeat != RepeatMode::Off || self.queue.is_shuffled() {
            return true;
        }
        match self.queue.current() {
            Some(i) => i + 1 < self.queue.len(),
            None => true,
        }
    }

    /// Toggle shuffle; returns the new flag
    pub fn toggle_shuffle(&mut self) -> bool {
        let shuffled = !self.queue.is_shuffled();
        self.set_shuffled(shuffled);
        shuffled
    }

    /// Enable or disable shuffle
    ///
    /// The current track stays selected and keeps playing; only its queue
    /// position changes.
    pub fn set_shuffled(&mut self, shuffled: bool) {
        if shuffled == self.queue.is_shuffled() {
            return;
        }
        if shuffled {
            self.queue.shuffle(&mut self.rng);
        } else {
            self.queue.unshuffle();
        }
        debug!("Shuffle {}", if shuffled { "enabled" } else { "disabled" });
        self.emit(PlayerEvent::QueueChanged {
            length: self.queue.len(),
            shuffled,
        });
    }

    /// Cycle off -> all -> one -> off; returns the new mode
    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = self.repeat.cycle();
        self.set_repeat_mode(mode);
        mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.repeat != mode {
            self.repeat = mode;
            debug!("Repeat mode: {:?}", mode);
            self.emit(PlayerEvent::RepeatModeChanged { mode });
        }
    }

    // ===== Transport =====

    /// Toggle between playing and paused
    ///
    /// No-op without a selected track. From `ended` the track restarts; from
    /// `idle` or `error` the current track is loaded again (the retry path).
    pub fn toggle_play_pause(&mut self) {
        if self.is_active() && self.status != TransportStatus::Ended {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Start or resume playback of the selected track
    pub fn play(&mut self) {
        let Some(position) = self.queue.current() else {
            debug!("Play ignored: no track selected");
            return;
        };

        match self.status {
            TransportStatus::Playing => {}
            TransportStatus::Loading => {
                if !self.autoplay {
                    self.request_play();
                }
            }
            TransportStatus::Paused => self.request_play(),
            TransportStatus::Ended => self.restart_current(),
            TransportStatus::Idle | TransportStatus::Error => {
                let previous = self.current_track_id();
                self.select_and_bind(position, true, previous);
            }
        }
    }

    /// Pause playback, or cancel autoplay of a track still loading
    pub fn pause(&mut self) {
        self.autoplay = false;
        let cancelled = self.pending_play.take().is_some();

        match self.status {
            TransportStatus::Playing => {
                self.binding.pause();
                self.set_status(TransportStatus::Paused);
            }
            TransportStatus::Loading => self.binding.pause(),
            _ if cancelled => self.binding.pause(),
            _ => {}
        }
    }

    /// Stop playback and drop the source, keeping the selection
    pub fn stop(&mut self) {
        debug!("Stopping playback");
        self.abandon_current();
        self.emit(PlayerEvent::PositionChanged {
            position_seconds: 0.0,
        });
        self.set_status(TransportStatus::Idle);
    }

    /// Seek within the current track
    ///
    /// Out-of-range targets are clamped; ignored while the duration is
    /// unknown.
    pub fn seek_to(&mut self, seconds: f64) {
        match self.binding.seek(seconds) {
            Some(target) => {
                self.position = target;
                self.emit(PlayerEvent::PositionChanged {
                    position_seconds: target,
                });
            }
            None => debug!("Seek to {} ignored (duration unknown)", seconds),
        }
    }

    /// Seek to a fraction (0.0-1.0) of the current track
    pub fn seek_to_percent(&mut self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        self.seek_to(fraction.clamp(0.0, 1.0) * self.duration);
    }

    // ===== Output =====

    /// Set volume (clamped to 0.0-1.0); mute is left as is
    pub fn set_volume(&mut self, level: f32) {
        self.volume.set_level(level);
        self.binding.set_volume(self.volume.level());
        self.emit_volume();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.volume.set_muted(muted);
        self.binding.set_muted(muted);
        self.emit_volume();
    }

    /// Toggle mute; returns the new flag
    pub fn toggle_mute(&mut self) -> bool {
        self.volume.toggle_mute();
        let muted = self.volume.is_muted();
        self.binding.set_muted(muted);
        self.emit_volume();
        muted
    }

    /// Set playback rate (clamped to 0.25-2.0); returns the applied rate
    pub fn set_playback_rate(&mut self, rate: f32) -> f32 {
        self.playback_rate = self.binding.set_playback_rate(rate);
        self.emit(PlayerEvent::PlaybackRateChanged {
            rate: self.playback_rate,
        });
        self.playback_rate
    }

    // ===== Settings =====

    /// Preferences worth persisting between sessions
    pub fn settings(&self) -> PlayerSettings {
        PlayerSettings {
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            repeat_mode: self.repeat,
            shuffled: self.queue.is_shuffled(),
            playback_rate: self.playback_rate,
        }
    }

    /// Restore persisted preferences
    pub fn apply_settings(&mut self, settings: PlayerSettings) {
        self.set_volume(settings.volume);
        self.set_muted(settings.muted);
        self.set_repeat_mode(settings.repeat_mode);
        self.set_shuffled(settings.shuffled);
        self.set_playback_rate(settings.playback_rate);
    }

    // ===== Media Events =====

    /// Apply the media element's pending notifications in arrival order
    ///
    /// Returns the number of notifications applied (stale ones excluded).
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        for tagged in self.binding.drain() {
            // An Ended earlier in the batch may already have rebound
            if !self.binding.accept(&tagged) {
                continue;
            }
            self.apply_media_event(tagged);
            applied += 1;
        }
        applied
    }

    fn apply_media_event(&mut self, tagged: TaggedEvent) {
        let TaggedEvent { token, event } = tagged;
        match event {
            MediaEvent::LoadingStarted => {
                debug!("Loading {:?}", self.binding.source());
            }
            MediaEvent::MetadataReady { .. } => {
                self.duration = self.binding.duration();
                self.last_error = None;
                self.emit(PlayerEvent::DurationChanged {
                    duration_seconds: self.duration,
                });
                if self.status == TransportStatus::Loading && !self.autoplay {
                    self.set_status(TransportStatus::Paused);
                }
            }
            MediaEvent::TimeUpdated { .. } => {
                self.position = self.binding.position();
                self.emit(PlayerEvent::PositionChanged {
                    position_seconds: self.position,
                });
            }
            MediaEvent::Ended => {
                info!("Track finished: {:?}", self.current_track_id());
                self.pending_play = None;
                self.position = self.duration;
                self.set_status(TransportStatus::Ended);
                self.handle_track_end();
            }
            MediaEvent::Error { reason } => self.fail(MediaError::Load(reason)),
            MediaEvent::PlayResolved { request, outcome } => {
                match self.pending_play {
                    Some(pending) if pending.is_resolved_by(token, request) => {
                        self.pending_play = None;
                    }
                    _ => {
                        debug!("Ignoring superseded play resolution #{}", request);
                        return;
                    }
                }
                match outcome {
                    PlayOutcome::Started if !self.binding.is_errored() => {
                        self.set_status(TransportStatus::Playing);
                    }
                    PlayOutcome::Started => {}
                    PlayOutcome::Rejected(reason) => self.fail(MediaError::Rejected(reason)),
                }
            }
        }
    }

    fn handle_track_end(&mut self) {
        if self.repeat == RepeatMode::One {
            self.restart_current();
        } else {
            self.next();
        }
    }

    fn fail(&mut self, error: MediaError) {
        warn!("Playback of {:?} failed: {}", self.current_track_id(), error);
        self.autoplay = false;
        self.pending_play = None;
        self.binding.pause();
        self.last_error = Some(error.clone());
        self.set_status(TransportStatus::Error);
        self.emit(PlayerEvent::Error { error });
    }

    // ===== Internals =====

    fn select_and_bind(&mut self, position: usize, autoplay: bool, previous: Option<String>) {
        if !self.queue.select(Some(position)) {
            return;
        }
        let Some(track) = self.queue.current_track() else {
            return;
        };
        let track_id = track.id.clone();
        let uri = track.source_uri.clone();

        self.pending_play = None;
        self.position = 0.0;
        self.duration = 0.0;
        self.binding.bind(&uri);
        self.autoplay = autoplay;
        if autoplay {
            self.pending_play = self.binding.play();
        }
        info!("Selected track {} at position {}", track_id, position);

        self.emit(PlayerEvent::TrackChanged {
            index: Some(position),
            track_id: Some(track_id),
            previous_track_id: previous,
        });
        self.emit(PlayerEvent::PositionChanged {
            position_seconds: 0.0,
        });
        self.emit(PlayerEvent::DurationChanged {
            duration_seconds: 0.0,
        });
        self.set_status(TransportStatus::Loading);
    }

    fn go_to(&mut self, target: Option<usize>) -> Option<usize> {
        let Some(position) = target else {
            self.finish_queue();
            return None;
        };

        let autoplay = self.is_active();
        let loaded = self.binding.source().is_some()
            && self.duration > 0.0
            && !matches!(self.status, TransportStatus::Idle | TransportStatus::Error);

        if loaded && self.queue.current() == Some(position) {
            if autoplay {
                self.restart_current();
            } else {
                self.seek_to(0.0);
            }
        } else {
            let previous = self.current_track_id();
            self.select_and_bind(position, autoplay, previous);
        }
        Some(position)
    }

    /// Seek to the start and play again without rebinding
    fn restart_current(&mut self) {
        self.seek_to(0.0);
        self.request_play();
    }

    fn request_play(&mut self) {
        self.autoplay = true;
        self.pending_play = self.binding.play();
    }

    fn finish_queue(&mut self) {
        info!("Reached end of queue");
        let previous = self.current_track_id();
        self.abandon_current();
        self.queue.select(None);
        self.emit(PlayerEvent::TrackChanged {
            index: None,
            track_id: None,
            previous_track_id: previous,
        });
        self.set_status(TransportStatus::Idle);
    }

    fn abandon_current(&mut self) {
        self.binding.release();
        self.autoplay = false;
        self.pending_play = None;
        self.position = 0.0;
        self.duration = 0.0;
    }

    /// Playing, about to play, or between tracks while playing
    fn is_active(&self) -> bool {
        match self.status {
            TransportStatus::Playing | TransportStatus::Ended => true,
            TransportStatus::Loading | TransportStatus::Paused => self.autoplay,
            TransportStatus::Idle | TransportStatus::Error => false,
        }
    }

    fn set_status(&mut self, status: TransportStatus) {
        if self.status != status {
            debug!("Transport {:?} -> {:?}", self.status, status);
            self.status = status;
            self.emit(PlayerEvent::StateChanged { status });
        }
    }

    fn emit_volume(&self) {
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
        });
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.emit(&event);
    }

    fn current_track_id(&self) -> Option<String> {
        self.queue.current_track().map(|t| t.id.clone())
    }

    // ===== State Queries =====

    /// Snapshot of the full playback state
    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            queue: self.queue.tracks(),
            current_index: self.queue.current(),
            status: self.status,
            position_seconds: self.position,
            duration_seconds: self.duration,
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            shuffled: self.queue.is_shuffled(),
            repeat_mode: self.repeat,
            playback_rate: self.playback_rate,
            last_error: self.last_error.clone(),
        }
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn current_index(&self) -> Option<usize> {
        self.queue.current()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current_track()
    }

    /// Tracks in playback order
    pub fn queue(&self) -> Rc<[Track]> {
        self.queue.tracks()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Playback progress in percent, 0 while the duration is unknown
    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn is_shuffled(&self) -> bool {
        self.queue.is_shuffled()
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    pub fn last_error(&self) -> Option<&MediaError> {
        self.last_error.as_ref()
    }

    /// Identity of the underlying media element
    pub fn resource_id(&self) -> ResourceId {
        self.binding.resource_id()
    }

    pub fn binding(&self) -> &MediaBinding<E> {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut MediaBinding<E> {
        &mut self.binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{LoadToken, TaggedEvent};

    #[derive(Default)]
    struct SilentElement {
        outbox: Vec<TaggedEvent>,
    }

    impl MediaElement for SilentElement {
        fn release(&mut self) {}
        fn load(&mut self, _token: LoadToken, _uri: &str) {}
        fn request_play(&mut self, _token: LoadToken, _request: u64) {}
        fn pause(&mut self) {}
        fn set_current_time(&mut self, _seconds: f64) {}
        fn set_volume(&mut self, _level: f32) {}
        fn set_muted(&mut self, _muted: bool) {}
        fn set_playback_rate(&mut self, _rate: f32) {}
        fn drain_events(&mut self) -> Vec<TaggedEvent> {
            std::mem::take(&mut self.outbox)
        }
    }

    fn create_test_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {}", id),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration_seconds: 180.0,
            source_uri: format!("/music/{}.mp3", id),
            artwork_uri: None,
            genre: None,
        }
    }

    fn controller() -> PlaybackController<SilentElement> {
        let config = PlayerConfig {
            shuffle_seed: Some(7),
            ..PlayerConfig::default()
        };
        PlaybackController::new(SilentElement::default(), config)
    }

    #[test]
    fn new_controller_is_idle() {
        let controller = controller();
        let state = controller.state();
        assert_eq!(state.status, TransportStatus::Idle);
        assert_eq!(state.current_index_signed(), -1);
        assert_eq!(state.volume, 0.7);
    }

    #[test]
    fn play_track_at_enters_loading() {
        let mut controller = controller();
        controller
            .load_queue(vec![create_test_track("a"), create_test_track("b")], None)
            .unwrap();
        controller.play_track_at(1).unwrap();

        assert_eq!(controller.status(), TransportStatus::Loading);
        assert_eq!(controller.current_track().unwrap().id, "b");
        assert_eq!(controller.binding().source(), Some("/music/b.mp3"));
    }

    #[test]
    fn toggle_without_selection_is_noop() {
        let mut controller = controller();
        controller
            .load_queue(vec![create_test_track("a")], None)
            .unwrap();
        controller.toggle_play_pause();
        assert_eq!(controller.status(), TransportStatus::Idle);
        assert!(controller.binding().source().is_none());
    }

    #[test]
    fn load_queue_rejects_bad_initial_index() {
        let mut controller = controller();
        let err = controller
            .load_queue(vec![create_test_track("a")], Some(3))
            .unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::IndexOutOfRange { index: 3, len: 1 }
        ));
        assert!(controller.queue().is_empty());
    }

    #[test]
    fn has_next_follows_repeat_mode() {
        let mut controller = controller();
        controller
            .load_queue(vec![create_test_track("a"), create_test_track("b")], Some(1))
            .unwrap();
        assert!(!controller.has_next());

        controller.set_repeat_mode(RepeatMode::All);
        assert!(controller.has_next());
    }

    #[test]
    fn settings_round_trip_through_apply() {
        let mut controller = controller();
        let settings = PlayerSettings {
            volume: 0.25,
            muted: true,
            repeat_mode: RepeatMode::One,
            shuffled: true,
            playback_rate: 1.5,
        };
        controller.apply_settings(settings);
        assert_eq!(controller.settings(), settings);
    }
}
