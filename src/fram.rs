//! External FRAM transport
//!
//! [`Fram`] speaks the serial FRAM command set over a configured [`SpiBus`]. Every operation is
//! one or two complete chip-select frames: CS goes low, the opcode and any address bytes are
//! shifted out, the data phase runs, and CS goes high again before the call returns, including
//! when something fails along the way. Nothing is carried from one operation to the next.
//!
//! The data phase of memory reads, writes and erases goes through the [`BulkTransfer`] strategy
//! chosen at construction, either [`ByteStep`] or [`Dma`](crate::dma::Dma). Short commands
//! (status, IDs, special sector) always use byte-stepped exchanges.
//!
//! The device never acknowledges anything. Out-of-range addresses wrap on the device and a
//! missing device reads back as whatever floats on MISO.

use crate::command::{
    Address, Density, DeviceId, Opcode, Status, UniqueId, DEFAULT_STATUS, DEVICE_ID_LEN, DUMMY,
    ERASE_FILL, UNIQUE_ID_LEN,
};
use crate::error::Error;
use crate::hw_traits::eusci::EUsciSpi;
use crate::spi::SpiBus;
use crate::transfer::{BulkTransfer, ByteStep};
use crate::wait::{Spin, Wait};
use embedded_hal::digital::{ErrorType, OutputPin};

type FramError<CS> = Error<<CS as ErrorType>::Error>;

/// Settings applied when the transport is created.
#[derive(Clone, Copy, Debug)]
pub struct FramConfig {
    density: Density,
    status: Option<u8>,
}

impl FramConfig {
    /// Configuration for a part of the given size. Initialization writes [`DEFAULT_STATUS`],
    /// which clears block protection.
    #[inline]
    pub const fn new(density: Density) -> Self {
        FramConfig {
            density,
            status: Some(DEFAULT_STATUS),
        }
    }

    /// Write `status` to the status register during initialization instead of the default.
    #[inline]
    pub const fn status(mut self, status: u8) -> Self {
        self.status = Some(status);
        self
    }

    /// Leave the status register alone during initialization.
    #[inline]
    pub const fn skip_status_init(mut self) -> Self {
        self.status = None;
        self
    }
}

/// Serial FRAM on an eUSCI SPI bus.
pub struct Fram<USCI, CS, B = ByteStep, W = Spin> {
    bus: SpiBus<USCI, CS, W>,
    bulk: B,
    density: Density,
}

impl<USCI: EUsciSpi, CS: OutputPin, B: BulkTransfer, W: Wait> Fram<USCI, CS, B, W> {
    /// Take over a configured bus and prepare the device: WREN, then WRSR with the configured
    /// status value, unless [`FramConfig::skip_status_init()`] was used.
    pub fn new(
        bus: SpiBus<USCI, CS, W>,
        bulk: B,
        config: FramConfig,
    ) -> Result<Self, FramError<CS>> {
        let mut fram = Fram {
            bus,
            bulk,
            density: config.density,
        };
        if let Some(status) = config.status {
            fram.write_status(Status::from_bits_retain(status))?;
        }
        debug!(
            "fram: ready, capacity {} bytes, status {:?}",
            fram.capacity(),
            config.status
        );
        Ok(fram)
    }

    /// Runs `f` with chip select asserted. CS is released even if `f` fails, and the error from
    /// `f` takes precedence over one from releasing CS.
    fn frame<R>(
        &mut self,
        f: impl FnOnce(&mut SpiBus<USCI, CS, W>, &mut B) -> Result<R, FramError<CS>>,
    ) -> Result<R, FramError<CS>> {
        self.bus.assert_cs()?;
        let res = f(&mut self.bus, &mut self.bulk);
        let release = self.bus.deassert_cs();
        if res.is_err() {
            warn!("fram: command failed, chip select released");
        }
        let out = res?;
        release?;
        Ok(out)
    }

    fn opcode_only(&mut self, op: Opcode) -> Result<(), FramError<CS>> {
        self.frame(|bus, _| bus.send_byte(op as u8))?;
        self.bus.discard_rx();
        Ok(())
    }

    /// Set the write enable latch.
    pub fn write_enable(&mut self) -> Result<(), FramError<CS>> {
        self.opcode_only(Opcode::WriteEnable)
    }

    /// Clear the write enable latch.
    pub fn write_disable(&mut self) -> Result<(), FramError<CS>> {
        self.opcode_only(Opcode::WriteDisable)
    }

    /// Read the status register.
    pub fn read_status(&mut self) -> Result<Status, FramError<CS>> {
        let raw = self.frame(|bus, _| {
            bus.send_byte(Opcode::ReadStatus as u8)?;
            bus.exchange_byte(DUMMY)
        })?;
        Ok(Status::from_bits_retain(raw))
    }

    /// Write the status register. WREN is sent first; the device clears the latch again
    /// afterwards.
    pub fn write_status(&mut self, status: Status) -> Result<(), FramError<CS>> {
        self.write_enable()?;
        self.frame(|bus, _| {
            bus.send_byte(Opcode::WriteStatus as u8)?;
            bus.send_byte(status.bits())
        })?;
        self.bus.discard_rx();
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `address`. Reads past the end of the array wrap to
    /// address 0 on the device.
    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FramError<CS>> {
        let address = Address(address);
        trace!("fram: read {} bytes at {:#x}", buf.len(), address.0);
        self.read_with(Opcode::Read, address, buf)
    }

    /// Same as [`read()`](Self::read) but uses FSTRD, which puts one dummy byte between the
    /// address and the data.
    pub fn fast_read(
        &mut self,
        address: u32,
        buf: &mut [u8],
    ) -> Result<(), FramError<CS>> {
        let address = Address(address);
        trace!("fram: fast read {} bytes at {:#x}", buf.len(), address.0);
        self.read_with(Opcode::FastRead, address, buf)
    }

    fn read_with(
        &mut self,
        op: Opcode,
        address: Address,
        buf: &mut [u8],
    ) -> Result<(), FramError<CS>> {
        let res = self.frame(|bus, bulk| {
            send_command(bus, op, address)?;
            if op == Opcode::FastRead {
                bus.send_byte(DUMMY)?;
            }
            if buf.is_empty() {
                return Ok(());
            }
            bulk.read_into(bus, buf)
        });
        self.bus.discard_rx();
        res
    }

    /// Write `data` starting at `address`. WREN is always sent first. Writes past the end of the
    /// array wrap to address 0 on the device.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FramError<CS>> {
        let address = Address(address);
        trace!("fram: write {} bytes at {:#x}", data.len(), address.0);
        self.write_enable()?;
        let res = self.frame(|bus, bulk| {
            send_command(bus, Opcode::Write, address)?;
            if data.is_empty() {
                return Ok(());
            }
            bulk.write_from(bus, data)
        });
        self.bus.discard_rx();
        res
    }

    /// Set every byte of the array to 0xFF.
    ///
    /// This is one WRITE frame covering the whole capacity and blocks until it is done. If it
    /// fails partway the array is left partially erased.
    #[inline]
    pub fn erase_all(&mut self) -> Result<(), FramError<CS>> {
        self.fill_all(ERASE_FILL)
    }

    /// Set every byte of the array to `byte`. See [`erase_all()`](Self::erase_all).
    pub fn fill_all(&mut self, byte: u8) -> Result<(), FramError<CS>> {
        let count = self.capacity();
        debug!("fram: filling {} bytes with {:#x}", count, byte);
        self.write_enable()?;
        let res = self.frame(|bus, bulk| {
            send_command(bus, Opcode::Write, Address(0))?;
            bulk.fill(bus, byte, count)
        });
        self.bus.discard_rx();
        if res.is_ok() {
            debug!("fram: fill done");
        }
        res
    }

    /// Read the manufacturer and product ID.
    pub fn read_device_id(&mut self) -> Result<DeviceId, FramError<CS>> {
        let mut raw = [0u8; DEVICE_ID_LEN];
        self.read_register(Opcode::ReadId, &mut raw)?;
        let id = DeviceId::from_bytes(&raw);
        if id.density().is_some_and(|d| d != self.density) {
            warn!("fram: device reports a different density than configured");
        }
        Ok(id)
    }

    /// Read the factory-programmed unique ID.
    pub fn read_unique_id(&mut self) -> Result<UniqueId, FramError<CS>> {
        let mut raw = [0u8; UNIQUE_ID_LEN];
        self.read_register(Opcode::ReadUniqueId, &mut raw)?;
        Ok(UniqueId(raw))
    }

    fn read_register(&mut self, op: Opcode, buf: &mut [u8]) -> Result<(), FramError<CS>> {
        self.frame(|bus, _| {
            bus.send_byte(op as u8)?;
            for byte in buf.iter_mut() {
                *byte = bus.exchange_byte(DUMMY)?;
            }
            Ok(())
        })
    }

    /// Read from the 256-byte special sector. Reads past its end wrap to its start.
    pub fn special_sector_read(&mut self, offset: u8, buf: &mut [u8]) -> Result<(), FramError<CS>> {
        self.frame(|bus, _| {
            send_command(bus, Opcode::SpecialSectorRead, Address(offset as u32))?;
            for byte in buf.iter_mut() {
                *byte = bus.exchange_byte(DUMMY)?;
            }
            Ok(())
        })
    }

    /// Write to the 256-byte special sector. WREN is sent first.
    pub fn special_sector_write(&mut self, offset: u8, data: &[u8]) -> Result<(), FramError<CS>> {
        self.write_enable()?;
        let res = self.frame(|bus, _| {
            send_command(bus, Opcode::SpecialSectorWrite, Address(offset as u32))?;
            for byte in data {
                bus.send_byte(*byte)?;
            }
            Ok(())
        });
        self.bus.discard_rx();
        res
    }

    /// Enter sleep. The device ignores everything until it is woken by a CS pulse and the
    /// datasheet's recovery time has passed.
    #[inline]
    pub fn sleep(&mut self) -> Result<(), FramError<CS>> {
        self.opcode_only(Opcode::SLEEP)
    }

    /// Enter hibernate. Same opcode as [`sleep()`](Self::sleep).
    #[inline]
    pub fn hibernate(&mut self) -> Result<(), FramError<CS>> {
        self.opcode_only(Opcode::Hibernate)
    }

    /// Enter deep power-down.
    #[inline]
    pub fn deep_power_down(&mut self) -> Result<(), FramError<CS>> {
        self.opcode_only(Opcode::DeepPowerDown)
    }

    /// Configured array size.
    #[inline(always)]
    pub fn density(&self) -> Density {
        self.density
    }

    /// Number of addressable bytes.
    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.density.capacity()
    }

    /// Release the bus and the transfer strategy.
    #[inline]
    pub fn free(self) -> (SpiBus<USCI, CS, W>, B) {
        (self.bus, self.bulk)
    }
}

// Opcode followed by the 20-bit address, MSB first.
fn send_command<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
    bus: &mut SpiBus<USCI, CS, W>,
    op: Opcode,
    address: Address,
) -> Result<(), FramError<CS>> {
    bus.send_byte(op as u8)?;
    for byte in address.to_bytes() {
        bus.send_byte(byte)?;
    }
    Ok(())
}
