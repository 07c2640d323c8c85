//! Driver error type

use core::fmt::{self, Debug, Display};

/// Errors surfaced by the bus driver and the FRAM transport.
///
/// The FRAM protocol has no acknowledgement, so nothing here reports what the device did with
/// a command. Only local failures are visible: the chip-select pin, or a waiter that gave up.
/// The stream view in [`io`](crate::io) adds one more, running out of array.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Driving the chip-select line failed.
    Pin(E),
    /// The peripheral or a DMA channel never reported completion within the waiter's budget.
    /// Chip select has been released.
    Timeout,
    /// A stream write found no room left before the end of the array.
    EndOfArray,
}

impl<E: Debug> Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pin(e) => write!(f, "Error::Pin({:?})", e),
            Error::Timeout => f.write_str("Error::Timeout"),
            Error::EndOfArray => f.write_str("Error::EndOfArray"),
        }
    }
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pin(e) => write!(f, "chip select error: {:?}", e),
            Error::Timeout => f.write_str("bus did not complete in time"),
            Error::EndOfArray => f.write_str("write past the end of the array"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: Debug> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Pin(e) => defmt::write!(f, "Pin({})", defmt::Debug2Format(e)),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::EndOfArray => defmt::write!(f, "EndOfArray"),
        }
    }
}

impl<E> From<crate::wait::Timeout> for Error<E> {
    #[inline(always)]
    fn from(_: crate::wait::Timeout) -> Self {
        Error::Timeout
    }
}

impl<E: Debug> embedded_hal::spi::Error for Error<E> {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

impl<E: Debug> embedded_io::Error for Error<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::Pin(_) => embedded_io::ErrorKind::Other,
            Error::Timeout => embedded_io::ErrorKind::TimedOut,
            Error::EndOfArray => embedded_io::ErrorKind::WriteZero,
        }
    }
}
