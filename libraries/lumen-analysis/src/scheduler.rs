//! Render loop scheduling
//!
//! The loop is driven by a platform [`FrameScheduler`] (`requestAnimationFrame`
//! in the browser). At most one frame request is outstanding at any time,
//! and a new one is only made after the previous tick finished, while the
//! loop is running and audio is playing.

/// Source of display-refresh callbacks
pub trait FrameScheduler {
    /// Ask for one callback at the next refresh
    fn request_frame(&mut self);

    /// Withdraw the outstanding request, if any
    fn cancel_frame(&mut self);
}

/// Self-rescheduling frame loop with explicit cancellation
#[derive(Debug)]
pub struct RenderLoop<S> {
    scheduler: S,
    running: bool,
    in_flight: bool,
    frames: u64,
}

impl<S: FrameScheduler> RenderLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            running: false,
            in_flight: false,
            frames: 0,
        }
    }

    /// Start the loop; no-op while already running
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        if !self.in_flight {
            self.in_flight = true;
            self.scheduler.request_frame();
        }
    }

    /// Stop the loop and withdraw the outstanding request
    pub fn stop(&mut self) {
        self.running = false;
        if self.in_flight {
            self.in_flight = false;
            self.scheduler.cancel_frame();
        }
    }

    /// Enter a tick from the scheduler callback
    ///
    /// Returns `false` when the loop was stopped in the meantime and the
    /// tick must not draw.
    pub fn begin_tick(&mut self) -> bool {
        self.in_flight = false;
        self.running
    }

    /// Leave a tick, rescheduling only while running and `playing`
    ///
    /// Returns whether another frame was requested. A loop that does not
    /// reschedule is stopped.
    pub fn finish_tick(&mut self, playing: bool) -> bool {
        self.frames += 1;
        if self.running && playing {
            self.in_flight = true;
            self.scheduler.request_frame();
            true
        } else {
            self.running = false;
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a frame request is outstanding
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Ticks completed since creation
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

/// Scheduler driven by hand
///
/// Records requests; the owner checks [`ManualScheduler::take_pending`] and
/// runs the tick itself. Used by native hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    pending: bool,
    requests: usize,
    cancels: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the outstanding request
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn cancels(&self) -> usize {
        self.cancels
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
        self.cancels += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_requests_exactly_one_frame() {
        let mut render_loop = RenderLoop::new(ManualScheduler::new());
        render_loop.start();
        render_loop.start();
        assert_eq!(render_loop.scheduler().requests(), 1);
        assert!(render_loop.is_in_flight());
    }

    #[test]
    fn reschedules_only_after_tick_while_playing() {
        let mut render_loop = RenderLoop::new(ManualScheduler::new());
        render_loop.start();

        assert!(render_loop.scheduler_mut().take_pending());
        assert!(render_loop.begin_tick());
        assert!(render_loop.finish_tick(true));
        assert_eq!(render_loop.scheduler().requests(), 2);

        assert!(render_loop.scheduler_mut().take_pending());
        assert!(render_loop.begin_tick());
        assert!(!render_loop.finish_tick(false));
        assert!(!render_loop.is_running());
        assert!(!render_loop.scheduler().is_pending());
        assert_eq!(render_loop.frames_rendered(), 2);
    }

    #[test]
    fn stop_cancels_and_blocks_next_tick() {
        let mut render_loop = RenderLoop::new(ManualScheduler::new());
        render_loop.start();
        render_loop.stop();

        assert_eq!(render_loop.scheduler().cancels(), 1);
        assert!(!render_loop.scheduler().is_pending());

        // A callback that was already dispatched must not draw
        assert!(!render_loop.begin_tick());
    }

    #[test]
    fn stop_when_idle_does_not_cancel() {
        let mut render_loop = RenderLoop::new(ManualScheduler::new());
        render_loop.stop();
        assert_eq!(render_loop.scheduler().cancels(), 0);
    }
}
