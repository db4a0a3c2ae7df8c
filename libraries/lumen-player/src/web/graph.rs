//! Web Audio graph
//!
//! One `AudioContext` per page, shared by every player through a
//! thread-local [`SharedContext`] slot: created by the first tap and
//! closed when the last graph holding a lease closes.

use super::element::{describe, WebMediaElement};
use lumen_analysis::{Analyser, AnalyserConfig, AnalysisError, AudioGraph, Result};
use lumen_playback::{ResourceId, SharedContext};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, info, warn};
use wasm_bindgen::JsValue;
use web_sys::{AnalyserNode, AudioContext, MediaElementAudioSourceNode};

struct WebAudioContext {
    context: AudioContext,
}

impl WebAudioContext {
    fn open() -> Result<Self> {
        let context = AudioContext::new()
            .map_err(|e| AnalysisError::UnsupportedEnvironment(describe(&e)))?;
        info!("Audio context opened ({} Hz)", context.sample_rate());
        Ok(Self { context })
    }
}

impl Drop for WebAudioContext {
    fn drop(&mut self) {
        if let Err(err) = self.context.close() {
            warn!("Failed to close audio context: {}", describe(&err));
        }
        info!("Audio context closed");
    }
}

thread_local! {
    static WEB_AUDIO_CONTEXT: SharedContext<WebAudioContext> = SharedContext::new();
}

fn platform(err: JsValue) -> AnalysisError {
    AnalysisError::Platform(describe(&err))
}

/// [`AudioGraph`] routing `<audio>` elements through an `AnalyserNode`
///
/// The chain is `element -> MediaElementAudioSourceNode -> AnalyserNode ->
/// destination`. An element can feed at most one source node in its
/// lifetime, so tapped ids are remembered even after release.
#[derive(Default)]
pub struct WebAudioGraph {
    context: Option<Rc<WebAudioContext>>,
    tapped: HashSet<ResourceId>,
}

impl WebAudioGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a context suspended by the autoplay policy
    ///
    /// Call from a user gesture (a play click).
    pub fn resume(&self) {
        let Some(lease) = self.context.as_ref() else {
            return;
        };
        if let Err(err) = lease.context.resume() {
            debug!("Audio context resume failed: {}", describe(&err));
        }
    }
}

impl AudioGraph<WebMediaElement> for WebAudioGraph {
    fn create_tap(
        &mut self,
        id: ResourceId,
        resource: &WebMediaElement,
        config: &AnalyserConfig,
    ) -> Result<Box<dyn Analyser>> {
        if self.tapped.contains(&id) {
            return Err(AnalysisError::TapAlreadyExists(id));
        }

        let lease = WEB_AUDIO_CONTEXT.with(|slot| slot.acquire(WebAudioContext::open))?;
        let context = &lease.context;

        let source = context
            .create_media_element_source(resource.audio())
            .map_err(platform)?;
        let node = context.create_analyser().map_err(platform)?;
        configure(&node, config);

        source.connect_with_audio_node(&node).map_err(platform)?;
        node.connect_with_audio_node(&context.destination())
            .map_err(platform)?;

        self.tapped.insert(id);
        self.context = Some(lease);
        debug!(
            "Analyser node connected (fft {}, {} bins)",
            node.fft_size(),
            node.frequency_bin_count()
        );

        Ok(Box::new(WebAnalyser { source, node }))
    }

    fn release_tap(&mut self, id: ResourceId) {
        debug!("Released tap for resource {}", id.value());
    }

    fn close(&mut self) {
        // The context itself closes once the last lease is gone
        self.context = None;
    }
}

fn configure(node: &AnalyserNode, config: &AnalyserConfig) {
    node.set_fft_size(config.fft_size as u32);
    node.set_smoothing_time_constant(f64::from(config.smoothing_time_constant));

    // The node rejects min >= max at every step, so order the writes
    let min = f64::from(config.min_decibels);
    let max = f64::from(config.max_decibels);
    if min >= node.max_decibels() {
        node.set_max_decibels(max);
        node.set_min_decibels(min);
    } else {
        node.set_min_decibels(min);
        node.set_max_decibels(max);
    }
}

struct WebAnalyser {
    source: MediaElementAudioSourceNode,
    node: AnalyserNode,
}

impl Analyser for WebAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.node.frequency_bin_count() as usize
    }

    fn fft_size(&self) -> usize {
        self.node.fft_size() as usize
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.node.get_byte_frequency_data(out);
    }

    fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        self.node.get_byte_time_domain_data(out);
    }

    fn disconnect(&mut self) {
        if let Err(err) = self.source.disconnect() {
            debug!("Source node disconnect failed: {}", describe(&err));
        }
        if let Err(err) = self.node.disconnect() {
            debug!("Analyser node disconnect failed: {}", describe(&err));
        }
    }
}
