//! `<audio>` element backend
//!
//! Event listeners stamp each DOM notification with the load token current
//! at the time and queue it in a mailbox; `drain_events` hands the mailbox
//! to the binding. A waker, when set, is called after every push so the
//! owner can schedule a pump.

use crate::error::{PlayerError, Result};
use lumen_playback::{LoadToken, MediaElement, MediaEvent, PlayOutcome, TaggedEvent};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, HtmlAudioElement};

type Waker = Rc<RefCell<Option<Box<dyn Fn()>>>>;

#[derive(Clone, Default)]
struct Mailbox {
    events: Rc<RefCell<VecDeque<TaggedEvent>>>,
    waker: Waker,
}

impl Mailbox {
    fn post(&self, token: LoadToken, event: MediaEvent) {
        self.events
            .borrow_mut()
            .push_back(TaggedEvent::new(token, event));
        if let Some(wake) = self.waker.borrow().as_ref() {
            wake();
        }
    }

    fn drain(&self) -> Vec<TaggedEvent> {
        self.events.borrow_mut().drain(..).collect()
    }
}

struct Listener {
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// [`MediaElement`] over an `HtmlAudioElement`
pub struct WebMediaElement {
    audio: HtmlAudioElement,
    token: Rc<Cell<LoadToken>>,
    mailbox: Mailbox,
    listeners: Vec<Listener>,
}

impl WebMediaElement {
    /// Create a detached `<audio>` element
    pub fn new() -> Result<Self> {
        let audio = HtmlAudioElement::new().map_err(|e| PlayerError::Platform(describe(&e)))?;
        audio.set_preload("metadata");
        // Needed for the analyser to read cross-origin sources
        audio.set_cross_origin(Some("anonymous"));
        Ok(Self::attach(audio))
    }

    /// Wrap an existing element
    pub fn attach(audio: HtmlAudioElement) -> Self {
        let mut element = Self {
            audio,
            token: Rc::new(Cell::new(LoadToken::INITIAL)),
            mailbox: Mailbox::default(),
            listeners: Vec::new(),
        };

        element.listen("loadstart", |_| MediaEvent::LoadingStarted);
        element.listen("loadedmetadata", |audio| MediaEvent::MetadataReady {
            duration: finite_or_zero(audio.duration()),
        });
        element.listen("timeupdate", |audio| MediaEvent::TimeUpdated {
            position: finite_or_zero(audio.current_time()),
        });
        element.listen("ended", |_| MediaEvent::Ended);
        element.listen("error", |audio| MediaEvent::Error {
            reason: error_reason(audio),
        });
        element
    }

    fn listen<F>(&mut self, kind: &'static str, translate: F)
    where
        F: Fn(&HtmlAudioElement) -> MediaEvent + 'static,
    {
        let audio = self.audio.clone();
        let token = Rc::clone(&self.token);
        let mailbox = self.mailbox.clone();
        let callback = Closure::wrap(Box::new(move |_event: Event| {
            mailbox.post(token.get(), translate(&audio));
        }) as Box<dyn FnMut(Event)>);

        match self
            .audio
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
        {
            Ok(()) => self.listeners.push(Listener { kind, callback }),
            Err(err) => warn!("Failed to listen for '{}': {}", kind, describe(&err)),
        }
    }

    /// Called after every queued notification
    pub fn set_waker(&self, wake: impl Fn() + 'static) {
        *self.mailbox.waker.borrow_mut() = Some(Box::new(wake));
    }

    pub fn audio(&self) -> &HtmlAudioElement {
        &self.audio
    }
}

impl MediaElement for WebMediaElement {
    fn release(&mut self) {
        if let Err(err) = self.audio.pause() {
            debug!("pause() during release failed: {}", describe(&err));
        }
        // Removing the attribute (instead of an empty src) avoids an error event
        if let Err(err) = self.audio.remove_attribute("src") {
            debug!("Failed to clear src: {}", describe(&err));
        }
        self.audio.load();
    }

    fn load(&mut self, token: LoadToken, uri: &str) {
        self.token.set(token);
        self.audio.set_src(uri);
        self.audio.load();
    }

    fn request_play(&mut self, token: LoadToken, request: u64) {
        let mailbox = self.mailbox.clone();
        let resolve = move |outcome| mailbox.post(token, MediaEvent::PlayResolved { request, outcome });

        match self.audio.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                let outcome = match JsFuture::from(promise).await {
                    Ok(_) => PlayOutcome::Started,
                    Err(err) => PlayOutcome::Rejected(describe(&err)),
                };
                resolve(outcome);
            }),
            Err(err) => resolve(PlayOutcome::Rejected(describe(&err))),
        }
    }

    fn pause(&mut self) {
        if let Err(err) = self.audio.pause() {
            warn!("pause() failed: {}", describe(&err));
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.audio.set_current_time(seconds);
    }

    fn set_volume(&mut self, level: f32) {
        self.audio.set_volume(f64::from(level));
    }

    fn set_muted(&mut self, muted: bool) {
        self.audio.set_muted(muted);
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.audio.set_playback_rate(f64::from(rate));
    }

    fn drain_events(&mut self) -> Vec<TaggedEvent> {
        self.mailbox.drain()
    }
}

impl Drop for WebMediaElement {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = self.audio.remove_event_listener_with_callback(
                listener.kind,
                listener.callback.as_ref().unchecked_ref(),
            );
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn error_reason(audio: &HtmlAudioElement) -> String {
    let Some(error) = audio.error() else {
        return "Unknown media error".to_string();
    };
    let kind = match error.code() {
        1 => "Playback aborted before the source loaded",
        2 => "Network error while loading the source",
        3 => "The source could not be decoded",
        4 => "Source format not supported",
        _ => "Unable to load the source",
    };
    let message = error.message();
    if message.is_empty() {
        kind.to_string()
    } else {
        format!("{}: {}", kind, message)
    }
}

/// Best-effort text for a thrown JS value
pub(crate) fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
