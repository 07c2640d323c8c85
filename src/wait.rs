//! Completion waiting
//!
//! Every blocking point in this crate (a byte leaving the shifter, a DMA channel running out of
//! transfers) goes through a [`Wait`] implementation. [`Spin`] polls forever, which is what the
//! hardware needs when nothing can go wrong. [`BoundedSpin`] and [`DelayWait`] give up instead of
//! hanging the caller when the peripheral stalls, and the transport turns that into
//! [`Error::Timeout`](crate::error::Error::Timeout).
//!
//! Budgets are per byte. A DMA chunk waits once for up to [`MAX_CHUNK`](crate::dma::MAX_CHUNK)
//! bytes through [`Wait::wait_for_bytes`], and the bounded waiters scale their budget by that
//! count, so the number passed to [`BoundedSpin::new`] or [`DelayWait::new`] only has to cover
//! one byte on the wire.

use embedded_hal::delay::DelayNs;

/// A waiter gave up before the condition became true.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout;

/// Blocks until a hardware condition holds.
pub trait Wait {
    /// Poll `done` until it returns `true`.
    fn wait_for<F: FnMut() -> bool>(&mut self, done: F) -> Result<(), Timeout>;

    /// Poll `done` for a condition that takes `bytes` byte times to come true.
    #[inline]
    fn wait_for_bytes<F: FnMut() -> bool>(&mut self, bytes: u32, done: F) -> Result<(), Timeout> {
        let _ = bytes;
        self.wait_for(done)
    }
}

/// Busy-wait with no upper bound. A stalled peripheral hangs the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spin;

impl Wait for Spin {
    #[inline(always)]
    fn wait_for<F: FnMut() -> bool>(&mut self, mut done: F) -> Result<(), Timeout> {
        while !done() {}
        Ok(())
    }
}

/// Busy-wait that fails after a fixed number of unsuccessful polls.
#[derive(Clone, Copy, Debug)]
pub struct BoundedSpin {
    max_polls: u32,
}

impl BoundedSpin {
    /// Allow up to `max_polls` polls per wait. Zero is treated as one.
    #[inline]
    pub const fn new(max_polls: u32) -> Self {
        BoundedSpin {
            max_polls: if max_polls == 0 { 1 } else { max_polls },
        }
    }
}

fn spin(polls: u32, mut done: impl FnMut() -> bool) -> Result<(), Timeout> {
    for _ in 0..polls {
        if done() {
            return Ok(());
        }
    }
    Err(Timeout)
}

impl Wait for BoundedSpin {
    fn wait_for<F: FnMut() -> bool>(&mut self, done: F) -> Result<(), Timeout> {
        spin(self.max_polls, done)
    }

    fn wait_for_bytes<F: FnMut() -> bool>(&mut self, bytes: u32, done: F) -> Result<(), Timeout> {
        spin(self.max_polls.saturating_mul(bytes.max(1)), done)
    }
}

/// Polls at a fixed interval using a delay provider and fails once `timeout_us` has elapsed.
pub struct DelayWait<D> {
    delay: D,
    interval_us: u32,
    timeout_us: u32,
}

impl<D: DelayNs> DelayWait<D> {
    /// Poll every `interval_us` microseconds for at most `timeout_us` microseconds.
    /// An interval of zero polls back to back.
    pub fn new(delay: D, interval_us: u32, timeout_us: u32) -> Self {
        DelayWait {
            delay,
            interval_us,
            timeout_us,
        }
    }

    /// Return the delay provider.
    pub fn free(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> DelayWait<D> {
    fn poll(&mut self, timeout_us: u32, mut done: impl FnMut() -> bool) -> Result<(), Timeout> {
        let mut elapsed: u32 = 0;
        loop {
            if done() {
                return Ok(());
            }
            if elapsed >= timeout_us {
                return Err(Timeout);
            }
            self.delay.delay_us(self.interval_us);
            elapsed = elapsed.saturating_add(self.interval_us.max(1));
        }
    }
}

impl<D: DelayNs> Wait for DelayWait<D> {
    fn wait_for<F: FnMut() -> bool>(&mut self, done: F) -> Result<(), Timeout> {
        self.poll(self.timeout_us, done)
    }

    fn wait_for_bytes<F: FnMut() -> bool>(&mut self, bytes: u32, done: F) -> Result<(), Timeout> {
        self.poll(self.timeout_us.saturating_mul(bytes.max(1)), done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_returns_once_done() {
        let mut polls = 0;
        Spin.wait_for(|| {
            polls += 1;
            polls == 5
        })
        .unwrap();
        assert_eq!(polls, 5);
    }

    #[test]
    fn bounded_spin_gives_up() {
        let mut polls = 0;
        let res = BoundedSpin::new(3).wait_for(|| {
            polls += 1;
            false
        });
        assert_eq!(res, Err(Timeout));
        assert_eq!(polls, 3);
        assert_eq!(BoundedSpin::new(3).wait_for(|| true), Ok(()));
    }

    #[test]
    fn bounded_spin_scales_with_byte_count() {
        let mut polls = 0;
        let res = BoundedSpin::new(3).wait_for_bytes(1000, || {
            polls += 1;
            polls == 2500
        });
        assert_eq!(res, Ok(()));
        let res = BoundedSpin::new(3).wait_for_bytes(1000, || false);
        assert_eq!(res, Err(Timeout));
        // Zero bytes still gets one byte's worth
        assert_eq!(BoundedSpin::new(3).wait_for_bytes(0, || true), Ok(()));
    }

    #[test]
    fn zero_polls_still_checks_once() {
        assert_eq!(BoundedSpin::new(0).wait_for(|| true), Ok(()));
    }

    struct CountingDelay(u32);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns / 1000;
        }
    }

    #[test]
    fn delay_wait_times_out_after_budget() {
        let mut waiter = DelayWait::new(CountingDelay(0), 10, 100);
        assert_eq!(waiter.wait_for(|| false), Err(Timeout));
        assert_eq!(waiter.free().0, 100);
    }

    #[test]
    fn delay_wait_succeeds_midway() {
        let mut waiter = DelayWait::new(CountingDelay(0), 10, 100);
        let mut polls = 0;
        waiter
            .wait_for(|| {
                polls += 1;
                polls == 3
            })
            .unwrap();
        assert_eq!(waiter.free().0, 20);
    }

    #[test]
    fn delay_wait_scales_with_byte_count() {
        let mut waiter = DelayWait::new(CountingDelay(0), 10, 100);
        assert_eq!(waiter.wait_for_bytes(50, || false), Err(Timeout));
        assert_eq!(waiter.free().0, 5000);
    }
}
