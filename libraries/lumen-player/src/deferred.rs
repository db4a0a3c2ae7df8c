//! Callbacks into a shared player
//!
//! Browser callbacks (animation frames, media listeners) can fire while a
//! command still holds the player. Such a callback must run again later,
//! never be dropped: a lost animation frame leaves the render loop waiting
//! on a frame that will never come.

use std::cell::RefCell;

/// Run `work` on the cell's value, or hand over to `retry` if it is borrowed
///
/// Returns whether `work` ran.
pub(crate) fn with_or_retry<T>(
    cell: &RefCell<T>,
    work: impl FnOnce(&mut T),
    retry: impl FnOnce(),
) -> bool {
    match cell.try_borrow_mut() {
        Ok(mut value) => {
            work(&mut value);
            true
        }
        Err(_) => {
            retry();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn runs_work_when_free() {
        let cell = RefCell::new(0);
        let retried = Cell::new(false);

        assert!(with_or_retry(&cell, |n| *n += 1, || retried.set(true)));
        assert_eq!(*cell.borrow(), 1);
        assert!(!retried.get());
    }

    #[test]
    fn busy_cell_schedules_a_retry() {
        let cell = RefCell::new(0);
        let retried = Cell::new(0);

        {
            let _command = cell.borrow_mut();
            assert!(!with_or_retry(&cell, |n| *n += 1, || retried.set(retried.get() + 1)));
        }
        assert_eq!(retried.get(), 1);
        assert_eq!(*cell.borrow(), 0);

        // The retried callback finds the cell free again
        assert!(with_or_retry(&cell, |n| *n += 1, || retried.set(retried.get() + 1)));
        assert_eq!(*cell.borrow(), 1);
        assert_eq!(retried.get(), 1);
    }
}
