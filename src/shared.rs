//! Sharing a driver between the main loop and interrupt handlers.
//!
//! The driver itself keeps no state between operations, but two contexts interleaving
//! operations would interleave their chip-select frames. [`SharedFram`] parks the driver behind
//! a critical section so only one operation runs at a time.
//!
//! ```no_run
//! # use msp430_extfram::shared::SharedFram;
//! # struct Driver;
//! static FRAM: SharedFram<Driver> = SharedFram::new();
//! ```

use core::cell::RefCell;
use critical_section::Mutex;

/// Driver slot usable from a `static`.
pub struct SharedFram<F> {
    inner: Mutex<RefCell<Option<F>>>,
}

impl<F> SharedFram<F> {
    /// Empty slot.
    pub const fn new() -> Self {
        SharedFram {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store a driver, returning the one previously stored.
    pub fn put(&self, driver: F) -> Option<F> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(driver))
    }

    /// Remove the driver.
    pub fn take(&self) -> Option<F> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Run `f` on the driver inside a critical section. Returns `None` if the slot is empty.
    ///
    /// Interrupts are masked for as long as `f` runs, which for an erase is the whole array.
    pub fn with<R>(&self, f: impl FnOnce(&mut F) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<F> Default for SharedFram<F> {
    fn default() -> Self {
        Self::new()
    }
}
