//! JavaScript bindings
//!
//! `WasmPlayer` owns the player behind an `Rc<RefCell<..>>`. JS callbacks
//! are never invoked while the player is borrowed: controller events only
//! mark the state dirty and frames are parked, and both are delivered once
//! the command or tick has returned.

use super::element::WebMediaElement;
use super::graph::WebAudioGraph;
use super::scheduler::AnimationFrameScheduler;
use crate::config::LumenConfig;
use crate::deferred::with_or_retry;
use crate::error::PlayerError;
use crate::player::Player;
use js_sys::{Function, Uint8Array};
use lumen_analysis::AnalysisFrame;
use lumen_playback::{PlayerSettings, Subscription, Track};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

type WebPlayer = Player<WebMediaElement, WebAudioGraph, AnimationFrameScheduler>;

fn to_js(err: impl Into<PlayerError>) -> JsValue {
    JsValue::from_str(&err.into().to_string())
}

struct Shared {
    player: RefCell<WebPlayer>,
    dirty: Rc<Cell<bool>>,
    latest_frame: Rc<RefCell<Option<AnalysisFrame>>>,
    on_state_change: RefCell<Option<Function>>,
    on_frame: RefCell<Option<Function>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl Shared {
    /// Apply queued media notifications
    fn pump(self: &Rc<Self>) {
        let retry = Rc::downgrade(self);
        let ran = with_or_retry(
            &self.player,
            |player| {
                player.pump();
            },
            || schedule_pump(retry),
        );
        if ran {
            self.flush();
        }
    }

    /// One animation frame
    ///
    /// A frame that lands mid-command is replayed once the command returns,
    /// so the render loop's in-flight frame always completes.
    fn tick(self: &Rc<Self>) {
        let retry = Rc::downgrade(self);
        let ran = with_or_retry(
            &self.player,
            |player| {
                player.on_animation_frame();
            },
            || {
                debug!("Player busy, replaying animation frame");
                schedule_tick(retry);
            },
        );
        if ran {
            self.flush();
        }
    }

    /// Deliver what accumulated while the player was borrowed
    fn flush(&self) {
        if self.dirty.replace(false) {
            let callback = self.on_state_change.borrow().clone();
            if let Some(callback) = callback {
                let state = self.player.borrow().state();
                match serde_wasm_bindgen::to_value(&state) {
                    Ok(value) => {
                        if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                            warn!("onStateChange callback threw: {:?}", err);
                        }
                    }
                    Err(err) => warn!("Failed to serialize state: {}", err),
                }
            }
        }

        let frame = self.latest_frame.borrow_mut().take();
        let callback = self.on_frame.borrow().clone();
        if let (Some(frame), Some(callback)) = (frame, callback) {
            let bins = Uint8Array::from(frame.bins());
            if let Err(err) = callback.call2(&JsValue::NULL, &bins, &JsValue::from(frame.is_idle())) {
                warn!("onFrame callback threw: {:?}", err);
            }
        }
    }
}

fn schedule_pump(shared: Weak<Shared>) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Some(shared) = shared.upgrade() {
            shared.pump();
        }
    });
}

fn schedule_tick(shared: Weak<Shared>) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Some(shared) = shared.upgrade() {
            shared.tick();
        }
    });
}

/// Browser player: an `<audio>` element with a spectrum analyser attached
#[wasm_bindgen]
pub struct WasmPlayer {
    shared: Rc<Shared>,
}

impl WasmPlayer {
    fn with<T>(&self, command: impl FnOnce(&mut WebPlayer) -> T) -> T {
        let out = command(&mut self.shared.player.borrow_mut());
        self.shared.flush();
        out
    }

    /// Commands that may start audio also resume the audio context
    fn with_gesture<T>(&self, command: impl FnOnce(&mut WebPlayer) -> T) -> T {
        self.with(|player| {
            let out = command(player);
            player.pipeline().graph().resume();
            out
        })
    }
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Create a player; `config` is an optional `LumenConfig` object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmPlayer, JsValue> {
        console_error_panic_hook::set_once();

        let config: LumenConfig = if config.is_undefined() || config.is_null() {
            LumenConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        let element = WebMediaElement::new().map_err(to_js)?;

        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let ticker = weak.clone();
            let scheduler = AnimationFrameScheduler::new(move |_timestamp| {
                if let Some(shared) = ticker.upgrade() {
                    shared.tick();
                }
            });

            let waker = weak.clone();
            element.set_waker(move || schedule_pump(waker.clone()));

            Shared {
                player: RefCell::new(Player::new(
                    element,
                    WebAudioGraph::new(),
                    scheduler,
                    config,
                )),
                dirty: Rc::new(Cell::new(false)),
                latest_frame: Rc::new(RefCell::new(None)),
                on_state_change: RefCell::new(None),
                on_frame: RefCell::new(None),
                subscriptions: RefCell::new(Vec::new()),
            }
        });

        {
            let player = shared.player.borrow();
            let dirty = Rc::clone(&shared.dirty);
            let events = player.subscribe(move |_| dirty.set(true));
            let latest = Rc::clone(&shared.latest_frame);
            let frames = player.on_frame(move |frame| *latest.borrow_mut() = Some(frame.clone()));
            shared.subscriptions.borrow_mut().extend([events, frames]);
        }

        Ok(Self { shared })
    }

    // ===== Queue =====

    /// Replace the queue with an array of tracks
    #[wasm_bindgen(js_name = loadQueue)]
    pub fn load_queue(&self, tracks: JsValue, initial: Option<u32>) -> Result<(), JsValue> {
        let tracks: Vec<Track> = serde_wasm_bindgen::from_value(tracks)?;
        self.with(|player| player.load_queue(tracks, initial.map(|i| i as usize)))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = playTrackAt)]
    pub fn play_track_at(&self, index: u32) -> Result<(), JsValue> {
        self.with_gesture(|player| player.play_track_at(index as usize))
            .map_err(to_js)
    }

    pub fn next(&self) -> Option<u32> {
        self.with_gesture(|player| player.next())
            .map(|i| i as u32)
    }

    pub fn previous(&self) -> Option<u32> {
        self.with_gesture(|player| player.previous())
            .map(|i| i as u32)
    }

    #[wasm_bindgen(js_name = toggleShuffle)]
    pub fn toggle_shuffle(&self) -> bool {
        self.with(|player| player.toggle_shuffle())
    }

    /// Advance off → all → one and return the new mode
    #[wasm_bindgen(js_name = cycleRepeatMode)]
    pub fn cycle_repeat_mode(&self) -> Result<JsValue, JsValue> {
        let mode = self.with(|player| player.cycle_repeat_mode());
        Ok(serde_wasm_bindgen::to_value(&mode)?)
    }

    // ===== Transport =====

    #[wasm_bindgen(js_name = togglePlayPause)]
    pub fn toggle_play_pause(&self) {
        self.with_gesture(|player| player.toggle_play_pause());
    }

    pub fn play(&self) {
        self.with_gesture(|player| player.play());
    }

    pub fn pause(&self) {
        self.with(|player| player.pause());
    }

    pub fn stop(&self) {
        self.with(|player| player.stop());
    }

    #[wasm_bindgen(js_name = seekTo)]
    pub fn seek_to(&self, seconds: f64) {
        self.with(|player| player.seek_to(seconds));
    }

    /// Seek to a fraction (0.0 - 1.0) of the track
    #[wasm_bindgen(js_name = seekToPercent)]
    pub fn seek_to_percent(&self, fraction: f64) {
        self.with(|player| player.seek_to_percent(fraction));
    }

    // ===== Output =====

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, level: f32) {
        self.with(|player| player.set_volume(level));
    }

    #[wasm_bindgen(js_name = setMuted)]
    pub fn set_muted(&self, muted: bool) {
        self.with(|player| player.set_muted(muted));
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) -> bool {
        self.with(|player| player.toggle_mute())
    }

    #[wasm_bindgen(js_name = setPlaybackRate)]
    pub fn set_playback_rate(&self, rate: f32) -> f32 {
        self.with(|player| player.set_playback_rate(rate))
    }

    pub fn settings(&self) -> Result<JsValue, JsValue> {
        let settings = self.shared.player.borrow().settings();
        Ok(serde_wasm_bindgen::to_value(&settings)?)
    }

    #[wasm_bindgen(js_name = applySettings)]
    pub fn apply_settings(&self, settings: JsValue) -> Result<(), JsValue> {
        let settings: PlayerSettings = serde_wasm_bindgen::from_value(settings)?;
        self.with(|player| player.apply_settings(settings));
        Ok(())
    }

    // ===== State & Visualization =====

    /// Snapshot of the playback state
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let state = self.shared.player.borrow().state();
        Ok(serde_wasm_bindgen::to_value(&state)?)
    }

    /// Bar heights (0.0 - 1.0) of the latest frame
    pub fn bars(&self, count: usize) -> Vec<f32> {
        self.shared.player.borrow().bars(count)
    }

    /// Points around a circle for the latest frame
    pub fn circular(&self, count: usize) -> Result<JsValue, JsValue> {
        let points = self.shared.player.borrow().circular(count);
        Ok(serde_wasm_bindgen::to_value(&points)?)
    }

    /// Bass/mid/treble levels of the latest frame
    pub fn bands(&self) -> Result<JsValue, JsValue> {
        let bands = self.shared.player.borrow().bands();
        Ok(serde_wasm_bindgen::to_value(&bands)?)
    }

    /// `callback(state)` after every batch of state changes
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn on_state_change(&self, callback: Function) {
        *self.shared.on_state_change.borrow_mut() = Some(callback);
    }

    /// `callback(bins: Uint8Array, idle: boolean)` once per rendered frame
    #[wasm_bindgen(js_name = onFrame)]
    pub fn on_frame(&self, callback: Function) {
        *self.shared.on_frame.borrow_mut() = Some(callback);
    }

    /// Stop playback, close the audio context and drop all callbacks
    pub fn dispose(&self) {
        self.with(|player| player.dispose());
        self.shared.subscriptions.borrow_mut().clear();
        *self.shared.on_state_change.borrow_mut() = None;
        *self.shared.on_frame.borrow_mut() = None;
    }
}
