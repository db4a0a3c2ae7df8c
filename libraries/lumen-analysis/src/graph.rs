//! Audio graphs - where analysis taps come from
//!
//! A platform audio graph can attach an analyser to a given media resource
//! exactly once for the resource's whole lifetime. Implementations report a
//! second attempt as [`AnalysisError::TapAlreadyExists`]; the pipeline is
//! responsible for never making one.

use crate::analyser::{Analyser, SampleFeed, SoftwareAnalyser};
use crate::config::AnalyserConfig;
use crate::error::{AnalysisError, Result};
use lumen_playback::{ResourceId, SharedContext};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info};

/// Platform analysis API
pub trait AudioGraph<R: ?Sized> {
    /// Attach an analyser to `resource`
    ///
    /// Fails with `UnsupportedEnvironment` when the platform has no
    /// analysis API, and with `TapAlreadyExists` when `id` was tapped
    /// before.
    fn create_tap(
        &mut self,
        id: ResourceId,
        resource: &R,
        config: &AnalyserConfig,
    ) -> Result<Box<dyn Analyser>>;

    /// Forget the tap of a permanently discarded resource
    fn release_tap(&mut self, id: ResourceId);

    /// Close the underlying audio context
    fn close(&mut self);
}

/// Graph for environments without any analysis support
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedGraph;

impl<R: ?Sized> AudioGraph<R> for UnsupportedGraph {
    fn create_tap(
        &mut self,
        _id: ResourceId,
        _resource: &R,
        _config: &AnalyserConfig,
    ) -> Result<Box<dyn Analyser>> {
        Err(AnalysisError::UnsupportedEnvironment(
            "no audio analysis backend".to_string(),
        ))
    }

    fn release_tap(&mut self, _id: ResourceId) {}

    fn close(&mut self) {}
}

/// Shared state behind every [`SoftwareGraph`] on a thread
#[derive(Debug)]
pub struct SoftwareContext {
    sample_rate: u32,
}

impl SoftwareContext {
    fn new(sample_rate: u32) -> Self {
        info!("Software analysis context opened at {} Hz", sample_rate);
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether any graph on this thread still holds the context
    pub fn is_live() -> bool {
        SOFTWARE_CONTEXT.with(|slot| slot.is_live())
    }
}

impl Drop for SoftwareContext {
    fn drop(&mut self) {
        debug!("Software analysis context closed");
    }
}

thread_local! {
    static SOFTWARE_CONTEXT: SharedContext<SoftwareContext> = SharedContext::new();
}

/// In-process audio graph backed by [`SoftwareAnalyser`]
///
/// Each tap gets its own [`SampleFeed`]; whoever produces the resource's
/// PCM pushes into the feed returned by [`SoftwareGraph::feed`]. Like a
/// browser graph, a resource can be tapped once in its lifetime: released
/// ids are remembered and refused.
#[derive(Debug)]
pub struct SoftwareGraph {
    sample_rate: u32,
    context: Option<Rc<SoftwareContext>>,
    taps: HashMap<ResourceId, SampleFeed>,
    tapped: HashSet<ResourceId>,
    taps_created: usize,
}

impl SoftwareGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            context: None,
            taps: HashMap::new(),
            tapped: HashSet::new(),
            taps_created: 0,
        }
    }

    /// Sample feed of a tapped resource
    pub fn feed(&self, id: ResourceId) -> Option<SampleFeed> {
        self.taps.get(&id).cloned()
    }

    /// Total taps ever created by this graph
    pub fn taps_created(&self) -> usize {
        self.taps_created
    }

    /// Taps currently attached
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether this graph holds a context lease
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }
}

impl Default for SoftwareGraph {
    fn default() -> Self {
        Self::new(44_100)
    }
}

impl<R: ?Sized> AudioGraph<R> for SoftwareGraph {
    fn create_tap(
        &mut self,
        id: ResourceId,
        _resource: &R,
        config: &AnalyserConfig,
    ) -> Result<Box<dyn Analyser>> {
        if self.tapped.contains(&id) {
            return Err(AnalysisError::TapAlreadyExists(id));
        }

        if self.context.is_none() {
            let sample_rate = self.sample_rate;
            let context = SOFTWARE_CONTEXT.with(|slot| {
                slot.acquire(|| Ok::<_, AnalysisError>(SoftwareContext::new(sample_rate)))
            })?;
            self.context = Some(context);
        }

        let config = config.normalized();
        let feed = SampleFeed::new(config.fft_size);
        let analyser = SoftwareAnalyser::new(config, feed.clone());
        self.taps.insert(id, feed);
        self.tapped.insert(id);
        self.taps_created += 1;

        info!(
            "Created analysis tap for resource {} ({} bins)",
            id.value(),
            config.bin_count()
        );
        Ok(Box::new(analyser))
    }

    fn release_tap(&mut self, id: ResourceId) {
        if self.taps.remove(&id).is_some() {
            debug!("Released analysis tap for resource {}", id.value());
        }
    }

    fn close(&mut self) {
        self.taps.clear();
        self.context = None;
    }
}
