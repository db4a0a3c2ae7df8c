//! Playback Events
//!
//! Typed event emitter used by every component that publishes notifications.
//! Listeners register through [`Emitter::subscribe`] and stay registered for
//! as long as the returned [`Subscription`] is alive; dropping the handle
//! unregisters the listener.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`), matching the
//! cooperative scheduling model of the player.

use crate::error::MediaError;
use crate::types::{RepeatMode, TransportStatus};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Transport status changed (loading, playing, paused, ...)
    StateChanged { status: TransportStatus },

    /// The current track changed
    #[serde(rename_all = "camelCase")]
    TrackChanged {
        /// Queue position of the new track, `None` when the selection was cleared
        index: Option<usize>,
        track_id: Option<String>,
        previous_track_id: Option<String>,
    },

    /// Playback position reported by the media element
    #[serde(rename_all = "camelCase")]
    PositionChanged { position_seconds: f64 },

    /// Duration became known (or was reset to 0 on a track switch)
    #[serde(rename_all = "camelCase")]
    DurationChanged { duration_seconds: f64 },

    /// Volume or mute changed
    VolumeChanged { volume: f32, muted: bool },

    /// Playback rate changed
    PlaybackRateChanged { rate: f32 },

    /// Queue replaced or reordered
    QueueChanged { length: usize, shuffled: bool },

    /// Repeat mode changed
    RepeatModeChanged { mode: RepeatMode },

    /// Load or play failed
    Error { error: MediaError },
}

type Listener<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

/// Single typed event emitter
pub struct Emitter<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: 'static> Emitter<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener
    ///
    /// The listener is removed when the returned handle is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&E) + 'static,
    {
        let listener: Listener<E> = Rc::new(RefCell::new(callback));
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, listener));
            id
        };

        let registry: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry
                        .borrow_mut()
                        .listeners
                        .retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    /// Deliver an event to every registered listener, in registration order
    ///
    /// Listeners may subscribe or unsubscribe while the event is being
    /// delivered. A listener that re-enters `emit` does not receive the
    /// nested event.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            if let Ok(mut callback) = listener.try_borrow_mut() {
                (&mut *callback)(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

/// Handle keeping a listener registered
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Unregister now
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Keep the listener registered for the emitter's whole lifetime
    pub fn detach(mut self) {
        self.release = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
