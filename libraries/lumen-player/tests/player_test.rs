//! Integration tests for the composed player
//!
//! Runs the software analyser behind a scripted media element and checks
//! that the tap and render loop follow what the controller does.

use lumen_analysis::{
    AnalysisFrame, FrameKind, ManualScheduler, SoftwareContext, TapStatus, UnsupportedGraph,
};
use lumen_playback::{
    LoadToken, MediaElement, MediaEvent, PlayOutcome, PlaybackError, PlayerEvent, RepeatMode,
    TaggedEvent, Track, TransportStatus,
};
use lumen_player::{LumenConfig, Player, PlayerError, SoftwarePlayer};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ===== Test Helpers =====

/// Media element that remembers play requests and holds injected events
#[derive(Default)]
struct ScriptedElement {
    loads: Vec<String>,
    plays: Vec<(LoadToken, u64)>,
    outbox: Vec<TaggedEvent>,
}

impl MediaElement for ScriptedElement {
    fn release(&mut self) {}
    fn load(&mut self, _token: LoadToken, uri: &str) {
        self.loads.push(uri.to_string());
    }
    fn request_play(&mut self, token: LoadToken, request: u64) {
        self.plays.push((token, request));
    }
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
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        duration_seconds: 120.0,
        source_uri: format!("/music/{}.flac", id),
        artwork_uri: None,
        genre: None,
    }
}

fn player_with(n: usize) -> SoftwarePlayer<ScriptedElement> {
    init_tracing();
    let mut player = SoftwarePlayer::software(ScriptedElement::default(), LumenConfig::default());
    let tracks = (0..n).map(|i| create_test_track(&format!("t{}", i))).collect();
    player.load_queue(tracks, None).unwrap();
    player
}

fn deliver<G, S>(player: &mut Player<ScriptedElement, G, S>, event: MediaEvent)
where
    G: lumen_analysis::AudioGraph<ScriptedElement>,
    S: lumen_analysis::FrameScheduler,
{
    let token = player.controller().binding().token();
    player
        .element_mut()
        .outbox
        .push(TaggedEvent::new(token, event));
    player.pump();
}

fn resolve_last_play<G, S>(player: &mut Player<ScriptedElement, G, S>, outcome: PlayOutcome)
where
    G: lumen_analysis::AudioGraph<ScriptedElement>,
    S: lumen_analysis::FrameScheduler,
{
    let (token, request) = *player
        .controller()
        .binding()
        .element()
        .plays
        .last()
        .expect("no play request issued");
    player.element_mut().outbox.push(TaggedEvent::new(
        token,
        MediaEvent::PlayResolved { request, outcome },
    ));
    player.pump();
}

fn start_playing(player: &mut SoftwarePlayer<ScriptedElement>, index: usize) {
    player.play_track_at(index).unwrap();
    deliver(player, MediaEvent::MetadataReady { duration: 120.0 });
    resolve_last_play(player, PlayOutcome::Started);
    assert_eq!(player.status(), TransportStatus::Playing);
}

fn sine(frequency: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (std::f32::consts::TAU * frequency * i as f32 / 44_100.0).sin())
        .collect()
}

// ===== Tap Lifecycle =====

#[test]
fn tap_created_on_first_bind_and_reused_after() {
    let mut player = player_with(3);
    assert_eq!(player.tap_status(), None);

    player.play_track_at(0).unwrap();
    assert_eq!(player.tap_status(), Some(TapStatus::Created));

    player.play_track_at(1).unwrap();
    player.next();
    assert_eq!(player.tap_status(), Some(TapStatus::Reused));

    assert_eq!(player.controller().binding().element().loads.len(), 3);
    assert_eq!(player.pipeline().graph().taps_created(), 1);
}

#[test]
fn stale_resolution_never_reverts_track_or_tap() {
    let mut player = player_with(2);
    player.play_track_at(0).unwrap();
    let (stale_token, stale_request) = player.controller().binding().element().plays[0];
    player.play_track_at(1).unwrap();

    player.element_mut().outbox.push(TaggedEvent::new(
        stale_token,
        MediaEvent::PlayResolved {
            request: stale_request,
            outcome: PlayOutcome::Started,
        },
    ));
    assert_eq!(player.pump(), 0);

    assert_eq!(player.state().current_index, Some(1));
    assert_eq!(player.status(), TransportStatus::Loading);
    assert!(!player.is_visualizing());
    assert_eq!(player.pipeline().graph().taps_created(), 1);
}

// ===== Render Loop =====

#[test]
fn render_loop_follows_transport() {
    let mut player = player_with(2);

    player.play_track_at(0).unwrap();
    assert!(!player.is_visualizing());

    deliver(&mut player, MediaEvent::MetadataReady { duration: 120.0 });
    resolve_last_play(&mut player, PlayOutcome::Started);
    assert!(player.is_visualizing());

    player.pause();
    assert!(!player.is_visualizing());

    player.play();
    assert!(!player.is_visualizing(), "waits for the play resolution");
    resolve_last_play(&mut player, PlayOutcome::Started);
    assert!(player.is_visualizing());
}

#[test]
fn live_frames_while_playing() {
    let mut player = player_with(1);
    start_playing(&mut player, 0);

    let id = player.controller().resource_id();
    let feed = player.pipeline().graph().feed(id).unwrap();
    feed.push(&sine(2_000.0, 256));

    let frames = Rc::new(RefCell::new(Vec::<AnalysisFrame>::new()));
    let sink = Rc::clone(&frames);
    let _subscription = player.on_frame(move |frame| sink.borrow_mut().push(frame.clone()));

    assert!(player.pipeline_mut().scheduler_mut().take_pending());
    assert!(player.on_animation_frame());

    let frames = frames.borrow();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind(), FrameKind::Live);
    assert!(frames[0].bins().iter().any(|&b| b > 100));
    assert!(player.bars(32).iter().all(|&b| (0.0..=1.0).contains(&b)));
}

#[test]
fn pause_pushes_one_idle_frame() {
    let mut player = player_with(1);
    start_playing(&mut player, 0);

    let kinds = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&kinds);
    let _subscription = player.on_frame(move |frame| sink.borrow_mut().push(frame.kind()));

    player.pause();
    player.pause();

    assert_eq!(*kinds.borrow(), vec![FrameKind::Idle]);
    assert!(player.current_frame().is_idle());
    assert!(!player.pipeline_mut().scheduler_mut().take_pending());
}

#[test]
fn queue_end_stops_visualizer_but_keeps_tap() {
    let mut player = player_with(2);
    start_playing(&mut player, 1);

    deliver(&mut player, MediaEvent::Ended);

    let state = player.state();
    assert_eq!(state.status, TransportStatus::Idle);
    assert_eq!(state.current_index, None);
    assert!(!player.is_visualizing());
    assert!(player.pipeline().has_tap());
}

#[test]
fn repeat_all_keeps_rendering_across_wrap() {
    let mut player = player_with(2);
    player.set_repeat_mode(RepeatMode::All);
    start_playing(&mut player, 1);

    deliver(&mut player, MediaEvent::Ended);
    assert_eq!(player.state().current_index, Some(0));
    assert_eq!(player.status(), TransportStatus::Loading);

    deliver(&mut player, MediaEvent::MetadataReady { duration: 120.0 });
    resolve_last_play(&mut player, PlayOutcome::Started);
    assert!(player.is_visualizing());
    assert_eq!(player.tap_status(), Some(TapStatus::Reused));
}

// ===== Errors & Degradation =====

#[test]
fn out_of_range_selection_surfaces_playback_error() {
    let mut player = player_with(2);
    let err = player.play_track_at(5).unwrap_err();
    assert!(matches!(
        err,
        PlayerError::Playback(PlaybackError::IndexOutOfRange { index: 5, len: 2 })
    ));
    assert_eq!(player.tap_status(), None);
}

#[test]
fn load_error_stops_visualizer() {
    let mut player = player_with(2);
    start_playing(&mut player, 0);

    deliver(
        &mut player,
        MediaEvent::Error {
            reason: "decode failed".to_string(),
        },
    );

    assert_eq!(player.status(), TransportStatus::Error);
    assert!(player.state().last_error.is_some());
    assert!(!player.is_visualizing());
}

#[test]
fn playback_works_without_analysis_support() {
    init_tracing();
    let mut player = Player::new(
        ScriptedElement::default(),
        UnsupportedGraph,
        ManualScheduler::new(),
        LumenConfig::default(),
    );
    player
        .load_queue(vec![create_test_track("solo")], None)
        .unwrap();

    player.play_track_at(0).unwrap();
    deliver(&mut player, MediaEvent::MetadataReady { duration: 120.0 });
    resolve_last_play(&mut player, PlayOutcome::Started);

    assert_eq!(player.status(), TransportStatus::Playing);
    assert_eq!(player.tap_status(), Some(TapStatus::Degraded));
    assert!(player.is_visualizing());
    assert!(player.on_animation_frame());
    assert!(player.current_frame().is_idle());
    assert!(player.waveform().is_empty());
}

// ===== Teardown =====

#[test]
fn dispose_releases_context_and_stays_degraded() {
    let mut player = player_with(2);
    start_playing(&mut player, 0);
    assert!(SoftwareContext::is_live());

    player.dispose();
    assert!(!SoftwareContext::is_live());
    assert_eq!(player.status(), TransportStatus::Idle);
    assert!(!player.is_visualizing());

    // Playback still works; the visualizer only shows placeholders
    player.play_track_at(1).unwrap();
    assert_eq!(player.tap_status(), Some(TapStatus::Degraded));
    assert!(player.current_frame().is_idle());
}

// ===== Events & Settings =====

#[test]
fn controller_events_reach_subscribers() {
    let mut player = player_with(2);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let subscription = player.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    start_playing(&mut player, 1);
    assert!(events.borrow().iter().any(|e| matches!(
        e,
        PlayerEvent::TrackChanged { index: Some(1), .. }
    )));
    assert!(events.borrow().contains(&PlayerEvent::StateChanged {
        status: TransportStatus::Playing
    }));

    drop(subscription);
    let seen = events.borrow().len();
    player.pause();
    assert_eq!(events.borrow().len(), seen);
}

#[test]
fn settings_round_trip_through_config() {
    init_tracing();
    let config = LumenConfig::from_json(
        r#"{"playback": {"volume": 0.25, "repeat": "one", "shuffleSeed": 9}}"#,
    )
    .unwrap();
    let mut player = SoftwarePlayer::software(ScriptedElement::default(), config);

    let settings = player.settings();
    assert_eq!(settings.volume, 0.25);
    assert_eq!(settings.repeat_mode, RepeatMode::One);

    player.set_volume(0.0);
    assert!(!player.settings().muted);
    assert!(player.toggle_mute());
    assert_eq!(player.set_playback_rate(4.0), 2.0);

    let saved = player.settings();
    let mut restored = SoftwarePlayer::software(ScriptedElement::default(), LumenConfig::default());
    restored.apply_settings(saved);
    assert_eq!(restored.settings(), saved);
}
