//! Browser backend
//!
//! Implements the platform seams of the core crates on top of the DOM and
//! the Web Audio API, and exports [`WasmPlayer`] to JavaScript.

mod bindings;
mod element;
mod graph;
mod scheduler;

pub use bindings::WasmPlayer;
pub use element::WebMediaElement;
pub use graph::WebAudioGraph;
pub use scheduler::AnimationFrameScheduler;
