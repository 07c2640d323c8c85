//! Bulk transfer strategies
//!
//! The data phase of a READ, WRITE or erase is handed to a [`BulkTransfer`] implementation after
//! the opcode and address have gone out with chip select asserted. [`ByteStep`] moves every byte
//! through the CPU; [`Dma`](crate::dma::Dma) programs two DMA channels and only waits for them to
//! finish. Both put the same bytes on the bus in the same order.

use crate::command::DUMMY;
use crate::error::Error;
use crate::hw_traits::eusci::EUsciSpi;
use crate::spi::SpiBus;
use crate::wait::Wait;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Moves the data phase of a command between memory and the bus.
///
/// Chip select is already asserted when these are called and stays asserted afterwards. What is
/// left in RXBUF on return is unspecified; the transport discards it.
pub trait BulkTransfer {
    /// Clock out [`DUMMY`] once per byte of `dst`, storing the bytes shifted in.
    fn read_into<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        dst: &mut [u8],
    ) -> Result<(), Error<<CS as ErrorType>::Error>>;

    /// Clock out every byte of `src`. Inbound bytes are dropped.
    fn write_from<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        src: &[u8],
    ) -> Result<(), Error<<CS as ErrorType>::Error>>;

    /// Clock out `byte` `count` times.
    fn fill<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        byte: u8,
        count: u32,
    ) -> Result<(), Error<<CS as ErrorType>::Error>>;
}

/// CPU-driven transfers, one byte at a time through [`SpiBus::exchange_byte`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteStep;

impl BulkTransfer for ByteStep {
    fn read_into<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        dst: &mut [u8],
    ) -> Result<(), Error<<CS as ErrorType>::Error>> {
        for byte in dst.iter_mut() {
            *byte = bus.exchange_byte(DUMMY)?;
        }
        Ok(())
    }

    fn write_from<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        src: &[u8],
    ) -> Result<(), Error<<CS as ErrorType>::Error>> {
        for byte in src {
            bus.send_byte(*byte)?;
        }
        Ok(())
    }

    fn fill<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        byte: u8,
        count: u32,
    ) -> Result<(), Error<<CS as ErrorType>::Error>> {
        for _ in 0..count {
            bus.send_byte(byte)?;
        }
        Ok(())
    }
}
