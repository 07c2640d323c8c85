//! Byte-stream view of the FRAM array through `embedded-io`.

use crate::error::Error;
use crate::fram::Fram;
use crate::hw_traits::eusci::EUsciSpi;
use crate::transfer::BulkTransfer;
use crate::wait::Wait;
use embedded_hal::digital::OutputPin;
use embedded_io::{ErrorType, Read, Seek, SeekFrom, Write};

/// Cursor over the whole array. Reads and writes advance the position and stop at the end of
/// the array instead of wrapping. Reading at the end returns `Ok(0)`, writing at the end fails
/// with [`Error::EndOfArray`].
pub struct FramCursor<'a, USCI, CS, B, W> {
    fram: &'a mut Fram<USCI, CS, B, W>,
    pos: u32,
}

impl<'a, USCI: EUsciSpi, CS: OutputPin, B: BulkTransfer, W: Wait> FramCursor<'a, USCI, CS, B, W> {
    /// Cursor starting at address 0.
    pub fn new(fram: &'a mut Fram<USCI, CS, B, W>) -> Self {
        FramCursor { fram, pos: 0 }
    }

    /// Current address.
    #[inline(always)]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Give the transport back.
    pub fn into_inner(self) -> &'a mut Fram<USCI, CS, B, W> {
        self.fram
    }

    fn remaining(&self, want: usize) -> usize {
        let left = self.fram.capacity().saturating_sub(self.pos) as usize;
        want.min(left)
    }
}

impl<USCI: EUsciSpi, CS: OutputPin, B: BulkTransfer, W: Wait> ErrorType
    for FramCursor<'_, USCI, CS, B, W>
{
    type Error = Error<CS::Error>;
}

impl<USCI: EUsciSpi, CS: OutputPin, B: BulkTransfer, W: Wait> Read
    for FramCursor<'_, USCI, CS, B, W>
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.remaining(buf.len());
        if len == 0 {
            return Ok(0);
        }
        self.fram.read(self.pos, &mut buf[..len])?;
        self.pos += len as u32;
        Ok(len)
    }
}

impl<USCI: EUsciSpi, CS: OutputPin, B: BulkTransfer, W: Wait> Write
    for FramCursor<'_, USCI, CS, B, W>
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = self.remaining(buf.len());
        if len == 0 {
            return Err(Error::EndOfArray);
        }
        self.fram.write(self.pos, &buf[..len])?;
        self.pos += len as u32;
        Ok(len)
    }

    // Writes are complete once CS is released
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<USCI: EUsciSpi, CS: OutputPin, B: BulkTransfer, W: Wait> Seek
    for FramCursor<'_, USCI, CS, B, W>
{
    /// Positions saturate at 0 and at the array capacity.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let cap = self.fram.capacity() as i64;
        let target = match pos {
            SeekFrom::Start(off) => off.min(cap as u64) as i64,
            SeekFrom::End(off) => cap.saturating_add(off),
            SeekFrom::Current(off) => (self.pos as i64).saturating_add(off),
        };
        self.pos = target.clamp(0, cap) as u32;
        Ok(self.pos as u64)
    }
}
