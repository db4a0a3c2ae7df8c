//! Process-wide audio context lifecycle
//!
//! Browsers allow only a handful of live audio contexts per page and every
//! analysis tap must live on the same context as the element it taps. The
//! context is therefore shared: the first consumer creates it, later
//! consumers receive the same instance, and it is torn down (via `Drop` on
//! the context type) when the last lease is released.
//!
//! ```rust
//! use lumen_playback::SharedContext;
//!
//! struct Clock { rate: u32 }
//!
//! let shared: SharedContext<Clock> = SharedContext::new();
//! let a = shared.acquire(|| Ok::<_, ()>(Clock { rate: 48_000 })).unwrap();
//! let b = shared.acquire(|| Ok::<_, ()>(Clock { rate: 44_100 })).unwrap();
//! assert_eq!(b.rate, 48_000);
//! drop((a, b));
//! assert!(!shared.is_live());
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Lazily created, reference-counted shared context
///
/// Typically stored in a `thread_local!` slot by the platform backend.
pub struct SharedContext<T> {
    slot: RefCell<Weak<T>>,
}

impl<T> SharedContext<T> {
    pub fn new() -> Self {
        Self {
            slot: RefCell::new(Weak::new()),
        }
    }

    /// Lease the context, creating it with `init` if no lease is alive
    ///
    /// `init` is only called when there is no live context. Its error is
    /// returned unchanged and nothing is cached.
    pub fn acquire<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Rc<T>, E> {
        if let Some(existing) = self.slot.borrow().upgrade() {
            return Ok(existing);
        }

        let context = Rc::new(init()?);
        *self.slot.borrow_mut() = Rc::downgrade(&context);
        tracing::debug!("Shared audio context created");
        Ok(context)
    }

    /// Whether some lease is still holding the context
    pub fn is_live(&self) -> bool {
        self.slot.borrow().strong_count() > 0
    }

    /// Number of outstanding leases
    pub fn lease_count(&self) -> usize {
        self.slot.borrow().strong_count()
    }
}

impl<T> Default for SharedContext<T> {
    fn default() -> Self {
        Self::new()
    }
}
