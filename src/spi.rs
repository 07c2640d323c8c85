//! SPI bus driver
//!
//! Begin configuration by calling [`SpiBusConfig::new()`] (or [`SpiBusConfig::fram_default()`]
//! for the FRAM's electrical contract). Calling [`SpiBusConfig::configure()`] with the chip select
//! pin and a [waiter](crate::wait) performs the register setup and returns an owned [`SpiBus`].
//!
//! [`SpiBus`] offers the byte-level primitives the FRAM transport is built on, and also
//! implements [`embedded-hal`](embedded_hal::spi::SpiBus)'s blocking bus trait and the
//! single-byte non-blocking [`embedded-hal-nb`](embedded_hal_nb::spi::FullDuplex) version.
//! Neither trait touches chip select; use [`SpiBus::assert_cs()`] and
//! [`SpiBus::deassert_cs()`] around them.

use crate::command::DUMMY;
use crate::error::Error;
use crate::hw_traits::eusci::{EUsciSpi, Ifg, Statw, Ucmode, Ucssel, UcxSpiCtw0};
use crate::wait::{Spin, Timeout, Wait};
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{Mode, Phase, Polarity, MODE_3};

type PinError<CS> = <CS as PinErrorType>::Error;

/// Struct used to configure an eUSCI peripheral as an SPI master
pub struct SpiBusConfig<USCI: EUsciSpi> {
    usci: USCI,
    prescaler: u16,

    // Register configs
    ctlw0: UcxSpiCtw0,
}

impl<USCI: EUsciSpi> SpiBusConfig<USCI> {
    /// Create a new configuration for setting up an eUSCI peripheral in 3-pin SPI master mode.
    /// Defaults to SMCLK with no clock division.
    pub fn new(usci: USCI, mode: Mode, msb_first: bool) -> Self {
        let ctlw0 = UcxSpiCtw0 {
            ucckph: match mode.phase {
                Phase::CaptureOnFirstTransition => true,
                Phase::CaptureOnSecondTransition => false,
            },
            ucckpl: match mode.polarity {
                Polarity::IdleLow => false,
                Polarity::IdleHigh => true,
            },
            ucmsb: msb_first,
            uc7bit: false,
            ucmst: true,
            ucsync: true,
            ucstem: false,
            ucswrst: true,
            ucmode: Ucmode::ThreePinSPI,
            ucssel: Ucssel::Smclk,
        };

        SpiBusConfig {
            usci,
            prescaler: 0,
            ctlw0,
        }
    }

    /// Settings the FRAM expects: clock idles high, MSB first, undivided SMCLK.
    #[inline]
    pub fn fram_default(usci: USCI) -> Self {
        Self::new(usci, MODE_3, true)
    }

    /// Configures this peripheral to use SMCLK divided by `clk_divisor`. A divisor of 0 or 1
    /// runs the bit clock at SMCLK.
    #[inline]
    pub fn use_smclk(mut self, clk_divisor: u16) -> Self {
        self.ctlw0.ucssel = Ucssel::Smclk;
        self.prescaler = clk_divisor;
        self
    }

    /// Configures this peripheral to use ACLK divided by `clk_divisor`.
    #[inline]
    pub fn use_aclk(mut self, clk_divisor: u16) -> Self {
        self.ctlw0.ucssel = Ucssel::Aclk;
        self.prescaler = clk_divisor;
        self
    }

    /// Register value that will be written to UCxCTLW0.
    #[inline]
    pub fn ctlw0(&self) -> &UcxSpiCtw0 {
        &self.ctlw0
    }

    /// Performs hardware configuration and creates the SPI bus. Chip select is driven inactive
    /// (high) before the peripheral leaves reset. Call this once; reconfiguring while a transfer
    /// is in flight is not supported.
    pub fn configure<CS: OutputPin, W: Wait>(
        self,
        mut cs: CS,
        wait: W,
    ) -> Result<SpiBus<USCI, CS, W>, Error<PinError<CS>>> {
        cs.set_high().map_err(Error::Pin)?;
        self.configure_hw();
        debug!(
            "spi: ctlw0 {:#x}, brw {}",
            self.ctlw0.bits(),
            self.prescaler
        );
        Ok(SpiBus {
            usci: self.usci,
            cs,
            wait,
        })
    }

    #[inline]
    fn configure_hw(&self) {
        self.usci.ctw0_set_rst();

        self.usci.ctw0_wr(&self.ctlw0);
        self.usci.brw_wr(self.prescaler);
        self.usci.uclisten_clear();

        self.usci.ctw0_clear_rst();

        self.usci.transmit_interrupt_set(false);
        self.usci.receive_interrupt_set(false);
    }
}

/// An eUSCI peripheral configured as SPI master, together with its chip select line.
pub struct SpiBus<USCI, CS, W = Spin> {
    usci: USCI,
    cs: CS,
    wait: W,
}

impl<USCI: EUsciSpi, CS: OutputPin, W: Wait> SpiBus<USCI, CS, W> {
    /// Transmit one byte and return the byte shifted in at the same time. Blocks until the
    /// peripheral is idle.
    #[inline]
    pub fn exchange_byte(&mut self, out: u8) -> Result<u8, Error<PinError<CS>>> {
        self.usci.txbuf_wr(out);
        self.wait_idle()?;
        Ok(self.usci.rxbuf_rd())
    }

    /// Transmit one byte and leave whatever was received in RXBUF.
    #[inline]
    pub fn send_byte(&mut self, out: u8) -> Result<(), Error<PinError<CS>>> {
        self.usci.txbuf_wr(out);
        self.wait_idle()?;
        Ok(())
    }

    /// Drive chip select low. No setup delay is added.
    #[inline]
    pub fn assert_cs(&mut self) -> Result<(), Error<PinError<CS>>> {
        self.cs.set_low().map_err(Error::Pin)
    }

    /// Drive chip select high.
    #[inline]
    pub fn deassert_cs(&mut self) -> Result<(), Error<PinError<CS>>> {
        self.cs.set_high().map_err(Error::Pin)
    }

    /// Read and drop RXBUF, clearing UCRXIFG and any overrun condition left by bytes nobody
    /// read. Returns whether an overrun had been latched.
    #[inline]
    pub fn discard_rx(&mut self) -> bool {
        let overrun = self.usci.statw_rd().contains(Statw::UCOE);
        let _ = self.usci.rxbuf_rd();
        overrun
    }

    /// Wait until UCBUSY clears.
    #[inline]
    pub fn wait_idle(&mut self) -> Result<(), Timeout> {
        let usci = &self.usci;
        self.wait
            .wait_for(|| !usci.statw_rd().contains(Statw::UCBUSY))
    }

    /// Block on an arbitrary condition with this bus's waiter, its budget stretched over `bytes`
    /// bytes.
    #[inline]
    pub(crate) fn wait_for_bytes<F: FnMut() -> bool>(
        &mut self,
        bytes: u32,
        done: F,
    ) -> Result<(), Timeout> {
        self.wait.wait_for_bytes(bytes, done)
    }

    /// Produce a rising edge on UCTXIFG. This is how the first transfer of a TX-triggered DMA
    /// channel gets started.
    #[inline]
    pub(crate) fn trigger_tx(&mut self) {
        self.usci.ifg_clear(Ifg::UCTXIFG);
        self.usci.ifg_set(Ifg::UCTXIFG);
    }

    /// The underlying peripheral.
    #[inline(always)]
    pub fn usci(&self) -> &USCI {
        &self.usci
    }

    /// Release the peripheral, chip select pin and waiter.
    #[inline]
    pub fn free(self) -> (USCI, CS, W) {
        (self.usci, self.cs, self.wait)
    }
}

mod ehal1 {
    use super::*;
    use embedded_hal::spi::{ErrorType, SpiBus as EhSpiBus};

    impl<USCI: EUsciSpi, CS: OutputPin, W: Wait> ErrorType for SpiBus<USCI, CS, W> {
        type Error = Error<PinError<CS>>;
    }

    impl<USCI: EUsciSpi, CS: OutputPin, W: Wait> EhSpiBus<u8> for SpiBus<USCI, CS, W> {
        /// Clocks out [`DUMMY`] for every byte read.
        fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            for word in words.iter_mut() {
                *word = self.exchange_byte(DUMMY)?;
            }
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            for word in words {
                self.send_byte(*word)?;
            }
            self.discard_rx();
            Ok(())
        }

        /// If `write` is shorter than `read`, [`DUMMY`] is sent for the remainder. Extra
        /// received bytes beyond `read` are dropped.
        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            let len = read.len().max(write.len());
            for i in 0..len {
                let out = write.get(i).copied().unwrap_or(DUMMY);
                let word = self.exchange_byte(out)?;
                if let Some(slot) = read.get_mut(i) {
                    *slot = word;
                }
            }
            Ok(())
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            for word in words.iter_mut() {
                *word = self.exchange_byte(*word)?;
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.wait_idle()?;
            Ok(())
        }
    }
}

mod ehal_nb1 {
    use super::*;
    use embedded_hal_nb::spi::FullDuplex;

    impl<USCI: EUsciSpi, CS: OutputPin, W: Wait> FullDuplex<u8> for SpiBus<USCI, CS, W> {
        /// Check if the Rx interrupt flag is set. If so, return the received byte, otherwise
        /// `WouldBlock`.
        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            if self.usci.ifg_rd().contains(Ifg::UCRXIFG) {
                Ok(self.usci.rxbuf_rd())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }

        /// Check if the Tx interrupt flag is set. If so, write the byte into the Tx buffer,
        /// otherwise `WouldBlock`.
        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            if self.usci.ifg_rd().contains(Ifg::UCTXIFG) {
                self.usci.txbuf_wr(word);
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }
}

#[cfg(feature = "embedded-hal-02")]
mod ehal02 {
    use super::*;
    use embedded_hal_02::spi::FullDuplex;

    impl<USCI: EUsciSpi, CS: OutputPin, W: Wait> FullDuplex<u8> for SpiBus<USCI, CS, W> {
        type Error = void::Void;

        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            if self.usci.ifg_rd().contains(Ifg::UCRXIFG) {
                Ok(self.usci.rxbuf_rd())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }

        fn send(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            if self.usci.ifg_rd().contains(Ifg::UCTXIFG) {
                self.usci.txbuf_wr(word);
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

    // Implementing FullDuplex above gets us a blocking write and transfer implementation for free
    impl<USCI: EUsciSpi, CS: OutputPin, W: Wait>
        embedded_hal_02::blocking::spi::write::Default<u8> for SpiBus<USCI, CS, W>
    {
    }
    impl<USCI: EUsciSpi, CS: OutputPin, W: Wait>
        embedded_hal_02::blocking::spi::transfer::Default<u8> for SpiBus<USCI, CS, W>
    {
    }
}
