//! Media resource binding
//!
//! Wraps exactly one platform media element (an `<audio>` element in the
//! browser) and turns its asynchronous lifecycle into an ordered stream of
//! [`MediaEvent`]s the controller can apply.
//!
//! Every [`MediaBinding::bind`] stamps the load with a fresh [`LoadToken`].
//! Elements tag every notification with the token that was current when the
//! notification was produced, and [`MediaBinding::accept`] discards anything
//! carrying an older token. Tokens are compared one event at a time, so an
//! event that rebinds mid-batch invalidates the rest of that batch. This is
//! what makes track switches
//! last-command-wins: a late `play()` resolution or decode error from a
//! previous source can never leak into the state of the current one.

use crate::types::{clamp_rate, clamp_unit};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one media element for its whole lifetime
///
/// Stable across any number of `bind()` calls; analysis taps are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocate a process-unique id
    pub fn allocate() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Generation of a source assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LoadToken(u64);

impl LoadToken {
    /// Token before anything was bound
    pub const INITIAL: LoadToken = LoadToken(0);

    fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Outcome of a `play()` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback started
    Started,

    /// The platform refused (autoplay policy, aborted by pause, ...)
    Rejected(String),
}

/// Lifecycle notification from the media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadingStarted,

    /// Metadata decoded; `duration` in seconds
    MetadataReady { duration: f64 },

    TimeUpdated { position: f64 },

    Ended,

    /// Fetch or decode failure
    Error { reason: String },

    /// Resolution of the play request with the given serial
    PlayResolved { request: u64, outcome: PlayOutcome },
}

/// Notification stamped with the load it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub token: LoadToken,
    pub event: MediaEvent,
}

impl TaggedEvent {
    pub fn new(token: LoadToken, event: MediaEvent) -> Self {
        Self { token, event }
    }
}

/// Platform media element
///
/// Implementors forward commands to the real element and buffer its
/// notifications until [`MediaElement::drain_events`] is called. They never
/// decide anything themselves; all policy lives in [`MediaBinding`] and the
/// controller.
pub trait MediaElement {
    /// Stop playback and drop the current source's decode state
    fn release(&mut self);

    /// Assign a new source and start loading its metadata
    ///
    /// Every notification produced for this source must carry `token`.
    fn load(&mut self, token: LoadToken, uri: &str);

    /// Ask the element to start playing
    ///
    /// The result must be reported as [`MediaEvent::PlayResolved`] carrying
    /// `request`, tagged with `token`.
    fn request_play(&mut self, token: LoadToken, request: u64);

    fn pause(&mut self);

    fn set_current_time(&mut self, seconds: f64);

    fn set_volume(&mut self, level: f32);

    fn set_muted(&mut self, muted: bool);

    fn set_playback_rate(&mut self, rate: f32);

    /// Notifications produced since the last call, oldest first
    fn drain_events(&mut self) -> Vec<TaggedEvent>;
}

/// Handle for a play request whose outcome has not arrived yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPlay {
    pub token: LoadToken,
    pub request: u64,
}

impl PendingPlay {
    /// Whether a resolution for `request` under load `token` settles this one
    pub fn is_resolved_by(&self, token: LoadToken, request: u64) -> bool {
        self.token == token && self.request == request
    }
}

/// Binding between the controller and one media element
#[derive(Debug)]
pub struct MediaBinding<E> {
    element: E,
    resource_id: ResourceId,
    token: LoadToken,
    next_request: u64,
    source: Option<String>,

    /// Seconds; 0.0 while unknown
    duration: f64,
    position: f64,
    errored: bool,

    volume: f32,
    muted: bool,
    playback_rate: f32,
}

impl<E: MediaElement> MediaBinding<E> {
    pub fn new(element: E) -> Self {
        Self {
            element,
            resource_id: ResourceId::allocate(),
            token: LoadToken::INITIAL,
            next_request: 1,
            source: None,
            duration: 0.0,
            position: 0.0,
            errored: false,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
        }
    }

    /// Assign a new source
    ///
    /// Releases the previous source's decode state, re-applies volume, mute
    /// and rate, and requests a metadata load. Failures arrive later as
    /// [`MediaEvent::Error`].
    pub fn bind(&mut self, uri: &str) -> LoadToken {
        self.element.release();
        self.token = self.token.next();
        self.source = Some(uri.to_string());
        self.duration = 0.0;
        self.position = 0.0;
        self.errored = false;

        self.element.set_volume(self.volume);
        self.element.set_muted(self.muted);
        self.element.set_playback_rate(self.playback_rate);
        self.element.load(self.token, uri);

        info!(
            "Bound resource {} to {} (load {})",
            self.resource_id.value(),
            uri,
            self.token.value()
        );
        self.token
    }

    /// Drop the current source entirely
    ///
    /// Outstanding notifications for it become stale.
    pub fn release(&mut self) {
        self.element.release();
        self.token = self.token.next();
        self.source = None;
        self.duration = 0.0;
        self.position = 0.0;
        self.errored = false;
        debug!("Released resource {}", self.resource_id.value());
    }

    /// Request playback of the bound source
    ///
    /// Returns `None` when nothing is bound.
    pub fn play(&mut self) -> Option<PendingPlay> {
        self.source.as_ref()?;

        let request = self.next_request;
        self.next_request += 1;
        self.element.request_play(self.token, request);
        Some(PendingPlay {
            token: self.token,
            request,
        })
    }

    pub fn pause(&mut self) {
        if self.source.is_some() {
            self.element.pause();
        }
    }

    /// Seek within the bound source
    ///
    /// The target is clamped to `[0, duration]`. Returns the applied
    /// position, or `None` (no-op) while the duration is unknown or the
    /// target is not a number.
    pub fn seek(&mut self, seconds: f64) -> Option<f64> {
        if self.duration <= 0.0 || seconds.is_nan() {
            return None;
        }
        let target = seconds.clamp(0.0, self.duration);
        self.element.set_current_time(target);
        self.position = target;
        Some(target)
    }

    /// Set element volume, clamped to 0.0-1.0
    pub fn set_volume(&mut self, level: f32) {
        self.volume = clamp_unit(level, self.volume);
        self.element.set_volume(self.volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.element.set_muted(muted);
    }

    /// Set playback rate, clamped to 0.25-2.0; returns the applied rate
    pub fn set_playback_rate(&mut self, rate: f32) -> f32 {
        self.playback_rate = clamp_rate(rate, self.playback_rate);
        self.element.set_playback_rate(self.playback_rate);
        self.playback_rate
    }

    /// Everything the element reported since the last drain, still tagged
    pub fn drain(&mut self) -> Vec<TaggedEvent> {
        self.element.drain_events()
    }

    /// Accept one drained notification if it belongs to the current load
    ///
    /// Must be called right before the event is applied, never ahead for a
    /// whole batch. Duration, position and error flag are updated for
    /// accepted events.
    pub fn accept(&mut self, tagged: &TaggedEvent) -> bool {
        if tagged.token != self.token || self.source.is_none() {
            debug!(
                "Dropping stale media event {:?} (load {}, current {})",
                tagged.event,
                tagged.token.value(),
                self.token.value()
            );
            return false;
        }

        match &tagged.event {
            MediaEvent::MetadataReady { duration } => {
                self.duration = if duration.is_finite() && *duration > 0.0 {
                    *duration
                } else {
                    0.0
                };
            }
            MediaEvent::TimeUpdated { position } => {
                if position.is_finite() {
                    self.position = position.max(0.0);
                }
            }
            MediaEvent::Error { .. } => self.errored = true,
            _ => {}
        }
        true
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn token(&self) -> LoadToken {
        self.token
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Duration of the bound source in seconds, 0.0 while unknown
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }
}
