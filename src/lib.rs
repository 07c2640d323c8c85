//! Driver for SPI-attached ferroelectric RAM (Cypress/Infineon CY15B104QN, CY15B108QN and
//! compatible 4 Mbit / 8 Mbit parts) on MSP430 eUSCI peripherals.
//!
//! The crate is split in layers:
//!
//! * [`spi`] configures an eUSCI as SPI master and moves single bytes. It also implements the
//!   [`embedded_hal`] SPI bus traits.
//! * [`fram`] frames the FRAM command set (opcode, 20-bit address, data) over that bus and
//!   always releases chip select before returning.
//! * [`transfer`] and [`dma`] are the two ways the data phase can run: byte by byte on the CPU,
//!   or with two DMA channels. Both put the same bytes on the wire.
//! * [`wait`] decides what happens while the driver waits for hardware: spin forever, or give up
//!   and report [`Error::Timeout`].
//! * [`fr5994`] has register handles for the MSP430FR5994. Other parts can be supported by
//!   implementing the traits in [`hw_traits`].
//!
//! # Usage
//!
//! ```no_run
//! use msp430_extfram::fr5994::Peripherals;
//! use msp430_extfram::{transfer::ByteStep, wait::Spin, Density, Fram, FramConfig, SpiBusConfig};
//!
//! let p = Peripherals::take().unwrap();
//! p.PORTS.select_uca3_spi();
//! let cs = p.PORTS.output_pin::<5, 3>();
//! p.PORTS.unlock();
//!
//! let bus = SpiBusConfig::fram_default(p.E_USCI_A3)
//!     .use_smclk(0)
//!     .configure(cs, Spin)
//!     .unwrap();
//! let mut fram = Fram::new(bus, ByteStep, FramConfig::new(Density::Mb8)).unwrap();
//!
//! fram.write(0x000000, &[4, 3]).unwrap();
//! let mut buf = [0u8; 2];
//! fram.read(0x000000, &mut buf).unwrap();
//! ```
//!
//! # Features
//!
//! * `defmt` / `log`: route the driver's diagnostics to one of these loggers.
//! * `embedded-hal-02`: implement the 0.2 `FullDuplex` and blocking SPI traits on [`SpiBus`].

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod command;
pub mod dma;
pub mod error;
pub mod fr5994;
pub mod fram;
pub mod hw_traits;
pub mod io;
pub mod prelude;
pub mod shared;
pub mod spi;
pub mod transfer;
pub mod wait;

#[cfg(test)]
mod sim;

pub use command::{Address, Density, DeviceId, Opcode, Status, UniqueId};
pub use error::Error;
pub use fram::{Fram, FramConfig};
pub use spi::{SpiBus, SpiBusConfig};
