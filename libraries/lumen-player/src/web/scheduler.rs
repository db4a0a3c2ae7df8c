//! `requestAnimationFrame` scheduling

use super::element::describe;
use lumen_analysis::FrameScheduler;
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// [`FrameScheduler`] backed by `window.requestAnimationFrame`
pub struct AnimationFrameScheduler {
    callback: Closure<dyn FnMut(f64)>,
    handle: Option<i32>,
}

impl AnimationFrameScheduler {
    /// `on_frame` receives the frame timestamp in milliseconds
    pub fn new(on_frame: impl FnMut(f64) + 'static) -> Self {
        Self {
            callback: Closure::wrap(Box::new(on_frame) as Box<dyn FnMut(f64)>),
            handle: None,
        }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&mut self) {
        let Some(window) = web_sys::window() else {
            warn!("No window; animation frame not scheduled");
            return;
        };
        match window.request_animation_frame(self.callback.as_ref().unchecked_ref()) {
            Ok(handle) => self.handle = Some(handle),
            Err(err) => warn!("requestAnimationFrame failed: {}", describe(&err)),
        }
    }

    fn cancel_frame(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle);
        }
    }
}
