//! Memory-mapped register handles for the MSP430FR5994.
//!
//! Each handle is a zero-sized token for one peripheral instance. [`Peripherals::take()`] hands
//! out every token exactly once; [`Steal`] bypasses that for code that already knows it has
//! exclusive access.
//!
//! ```no_run
//! use msp430_extfram::fr5994::{self, Peripherals};
//! use msp430_extfram::{dma::Dma, fram::{Fram, FramConfig}, spi::SpiBusConfig};
//! use msp430_extfram::{command::Density, wait::Spin};
//!
//! let p = Peripherals::take().unwrap();
//! p.PORTS.select_uca3_spi();
//! let cs = p.PORTS.output_pin::<5, 3>();
//! p.PORTS.unlock();
//!
//! let bus = SpiBusConfig::fram_default(p.E_USCI_A3).configure(cs, Spin).unwrap();
//! let dma = Dma::new(p.DMA3, fr5994::UCA3TXIFG, p.DMA4, fr5994::UCA3RXIFG);
//! let mut fram = Fram::new(bus, dma, FramConfig::new(Density::Mb8)).unwrap();
//! fram.write(0x000000, &[4, 3]).unwrap();
//! ```

#![allow(non_snake_case, non_camel_case_types)]

use crate::hw_traits::dma::{DmaChannel, DmaCtl, DmaTrigger};
use crate::hw_traits::eusci::{Ctlw0, EUsciSpi, Ifg, Statw, UcxSpiCtw0};
use crate::hw_traits::Steal;
use core::cell::Cell;
use core::convert::Infallible;
use core::ptr::{read_volatile, write_volatile};
use critical_section::Mutex;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

#[inline(always)]
fn rd16(addr: usize) -> u16 {
    // Only called with addresses of 16-bit peripheral registers on this part
    unsafe { read_volatile(addr as *const u16) }
}

#[inline(always)]
fn wr16(addr: usize, val: u16) {
    unsafe { write_volatile(addr as *mut u16, val) }
}

#[inline(always)]
fn set16(addr: usize, bits: u16) {
    wr16(addr, rd16(addr) | bits)
}

#[inline(always)]
fn clear16(addr: usize, bits: u16) {
    wr16(addr, rd16(addr) & !bits)
}

#[inline(always)]
fn rd8(addr: usize) -> u8 {
    unsafe { read_volatile(addr as *const u8) }
}

#[inline(always)]
fn wr8(addr: usize, val: u8) {
    unsafe { write_volatile(addr as *mut u8, val) }
}

mod usci {
    pub const CTLW0: usize = 0x00;
    pub const BRW: usize = 0x06;
    pub const RXBUF: usize = 0x0C;
    pub const TXBUF: usize = 0x0E;
}

macro_rules! eusci_spi_impl {
    ($EUsci:ident, $base:expr, statw: $statw:expr, ie: $ie:expr, ifg: $ifg:expr) => {
        #[doc = concat!(stringify!($EUsci), " register block")]
        pub struct $EUsci {
            _private: (),
        }

        impl $EUsci {
            const BASE: usize = $base;
        }

        impl Steal for $EUsci {
            #[inline(always)]
            unsafe fn steal() -> Self {
                $EUsci { _private: () }
            }
        }

        impl EUsciSpi for $EUsci {
            #[inline(always)]
            fn ctw0_set_rst(&self) {
                set16(Self::BASE + usci::CTLW0, Ctlw0::UCSWRST.bits());
            }

            #[inline(always)]
            fn ctw0_clear_rst(&self) {
                clear16(Self::BASE + usci::CTLW0, Ctlw0::UCSWRST.bits());
            }

            #[inline(always)]
            fn ctw0_wr(&self, reg: &UcxSpiCtw0) {
                wr16(Self::BASE + usci::CTLW0, reg.bits());
            }

            #[inline(always)]
            fn brw_wr(&self, val: u16) {
                wr16(Self::BASE + usci::BRW, val);
            }

            #[inline(always)]
            fn uclisten_clear(&self) {
                clear16(Self::BASE + $statw, Statw::UCLISTEN.bits());
            }

            #[inline(always)]
            fn statw_rd(&self) -> Statw {
                Statw::from_bits_retain(rd16(Self::BASE + $statw))
            }

            #[inline(always)]
            fn txbuf_wr(&self, val: u8) {
                wr16(Self::BASE + usci::TXBUF, val as u16);
            }

            #[inline(always)]
            fn rxbuf_rd(&self) -> u8 {
                rd16(Self::BASE + usci::RXBUF) as u8
            }

            #[inline(always)]
            fn ifg_rd(&self) -> Ifg {
                Ifg::from_bits_truncate(rd16(Self::BASE + $ifg))
            }

            #[inline(always)]
            fn ifg_set(&self, flags: Ifg) {
                set16(Self::BASE + $ifg, flags.bits());
            }

            #[inline(always)]
            fn ifg_clear(&self, flags: Ifg) {
                clear16(Self::BASE + $ifg, flags.bits());
            }

            #[inline(always)]
            fn transmit_interrupt_set(&self, enable: bool) {
                if enable {
                    set16(Self::BASE + $ie, Ifg::UCTXIFG.bits());
                } else {
                    clear16(Self::BASE + $ie, Ifg::UCTXIFG.bits());
                }
            }

            #[inline(always)]
            fn receive_interrupt_set(&self, enable: bool) {
                if enable {
                    set16(Self::BASE + $ie, Ifg::UCRXIFG.bits());
                } else {
                    clear16(Self::BASE + $ie, Ifg::UCRXIFG.bits());
                }
            }

            #[inline(always)]
            fn txbuf_addr(&self) -> usize {
                Self::BASE + usci::TXBUF
            }

            #[inline(always)]
            fn rxbuf_addr(&self) -> usize {
                Self::BASE + usci::RXBUF
            }
        }
    };
}

// eUSCI_A and eUSCI_B place STATW, IE and IFG differently
eusci_spi_impl!(E_USCI_A0, 0x05C0, statw: 0x0A, ie: 0x1A, ifg: 0x1C);
eusci_spi_impl!(E_USCI_A1, 0x05E0, statw: 0x0A, ie: 0x1A, ifg: 0x1C);
eusci_spi_impl!(E_USCI_A2, 0x0600, statw: 0x0A, ie: 0x1A, ifg: 0x1C);
eusci_spi_impl!(E_USCI_A3, 0x0620, statw: 0x0A, ie: 0x1A, ifg: 0x1C);
eusci_spi_impl!(E_USCI_B0, 0x0640, statw: 0x08, ie: 0x2A, ifg: 0x2C);
eusci_spi_impl!(E_USCI_B1, 0x0680, statw: 0x08, ie: 0x2A, ifg: 0x2C);
eusci_spi_impl!(E_USCI_B2, 0x06C0, statw: 0x08, ie: 0x2A, ifg: 0x2C);
eusci_spi_impl!(E_USCI_B3, 0x0700, statw: 0x08, ie: 0x2A, ifg: 0x2C);

const DMACTL0: usize = 0x0500;

mod dma {
    pub const CTL: usize = 0x00;
    pub const SAL: usize = 0x02;
    pub const SAH: usize = 0x04;
    pub const DAL: usize = 0x06;
    pub const DAH: usize = 0x08;
    pub const SZ: usize = 0x0A;
}

macro_rules! dma_channel_impl {
    ($Dma:ident, $n:literal) => {
        #[doc = concat!("DMA channel ", stringify!($n))]
        pub struct $Dma {
            _private: (),
        }

        impl $Dma {
            const BASE: usize = 0x0510 + 0x10 * $n;
            // DMAxTSEL: even channels in the low byte of DMACTLn, odd ones in the high byte
            const TSEL: usize = DMACTL0 + $n;
        }

        impl Steal for $Dma {
            #[inline(always)]
            unsafe fn steal() -> Self {
                $Dma { _private: () }
            }
        }

        impl DmaChannel for $Dma {
            #[inline(always)]
            fn ctl_rd(&self) -> DmaCtl {
                DmaCtl::from_bits_retain(rd16(Self::BASE + dma::CTL))
            }

            #[inline(always)]
            fn ctl_wr(&self, ctl: DmaCtl) {
                wr16(Self::BASE + dma::CTL, ctl.bits());
            }

            #[inline(always)]
            fn ctl_set(&self, bits: DmaCtl) {
                set16(Self::BASE + dma::CTL, bits.bits());
            }

            #[inline(always)]
            fn ctl_clear(&self, bits: DmaCtl) {
                clear16(Self::BASE + dma::CTL, bits.bits());
            }

            #[inline(always)]
            fn sa_wr(&self, addr: usize) {
                let addr = addr as u32;
                wr16(Self::BASE + dma::SAL, addr as u16);
                wr16(Self::BASE + dma::SAH, (addr >> 16) as u16);
            }

            #[inline(always)]
            fn da_wr(&self, addr: usize) {
                let addr = addr as u32;
                wr16(Self::BASE + dma::DAL, addr as u16);
                wr16(Self::BASE + dma::DAH, (addr >> 16) as u16);
            }

            #[inline(always)]
            fn sz_wr(&self, size: u16) {
                wr16(Self::BASE + dma::SZ, size);
            }

            #[inline(always)]
            fn tsel_wr(&self, trigger: DmaTrigger) {
                wr8(Self::TSEL, trigger.0 & 0x1F);
            }
        }
    };
}

dma_channel_impl!(DMA0, 0);
dma_channel_impl!(DMA1, 1);
dma_channel_impl!(DMA2, 2);
dma_channel_impl!(DMA3, 3);
dma_channel_impl!(DMA4, 4);
dma_channel_impl!(DMA5, 5);

/// UCA2 receive trigger on DMA channels 3 to 5
pub const UCA2RXIFG: DmaTrigger = DmaTrigger(14);
/// UCA2 transmit trigger on DMA channels 3 to 5
pub const UCA2TXIFG: DmaTrigger = DmaTrigger(15);
/// UCA3 receive trigger on DMA channels 3 to 5
pub const UCA3RXIFG: DmaTrigger = DmaTrigger(16);
/// UCA3 transmit trigger on DMA channels 3 to 5
pub const UCA3TXIFG: DmaTrigger = DmaTrigger(17);
/// UCB1 receive trigger on DMA channels 3 to 5
pub const UCB1RXIFG0: DmaTrigger = DmaTrigger(18);
/// UCB1 transmit trigger on DMA channels 3 to 5
pub const UCB1TXIFG0: DmaTrigger = DmaTrigger(19);

mod port {
    pub const OUT: usize = 0x02;
    pub const DIR: usize = 0x04;
    pub const SEL0: usize = 0x0A;
    pub const SEL1: usize = 0x0C;
}

const PM5CTL0: usize = 0x0130;
const LOCKLPM5: u16 = 1 << 0;

// Ports are paired into 16-bit blocks: odd ports at the even address, even ports one byte up
const fn port_base(port: u8) -> usize {
    let pair = ((port - 1) / 2) as usize;
    0x0200 + 0x20 * pair + ((port - 1) % 2) as usize
}

/// Access to the digital I/O ports.
pub struct Ports {
    _private: (),
}

impl Steal for Ports {
    #[inline(always)]
    unsafe fn steal() -> Self {
        Ports { _private: () }
    }
}

impl Ports {
    /// Route P6.0 (UCA3SIMO), P6.1 (UCA3SOMI) and P6.2 (UCA3CLK) to eUSCI_A3.
    pub fn select_uca3_spi(&self) {
        self.select_primary(6, 0b0000_0111);
    }

    /// Give the pins in `mask` on `port` their primary module function (SEL1 = 0, SEL0 = 1).
    pub fn select_primary(&self, port: u8, mask: u8) {
        let base = port_base(port);
        wr8(base + port::SEL1, rd8(base + port::SEL1) & !mask);
        wr8(base + port::SEL0, rd8(base + port::SEL0) | mask);
    }

    /// Configure `P{PORT}.{PIN}` as a GPIO output driven high and return it. Handing out the same
    /// pin twice is not prevented.
    pub fn output_pin<const PORT: u8, const PIN: u8>(&self) -> PortPin<PORT, PIN> {
        let pin = PortPin { _private: () };
        let base = port_base(PORT);
        wr8(base + port::OUT, rd8(base + port::OUT) | PortPin::<PORT, PIN>::MASK);
        wr8(base + port::SEL0, rd8(base + port::SEL0) & !PortPin::<PORT, PIN>::MASK);
        wr8(base + port::SEL1, rd8(base + port::SEL1) & !PortPin::<PORT, PIN>::MASK);
        wr8(base + port::DIR, rd8(base + port::DIR) | PortPin::<PORT, PIN>::MASK);
        pin
    }

    /// Clear LOCKLPM5 so the port configuration takes effect. Pins stay in their reset state
    /// until this is called.
    pub fn unlock(&self) {
        clear16(PM5CTL0, LOCKLPM5);
    }
}

/// GPIO output pin `P{PORT}.{PIN}`, usable as chip select.
pub struct PortPin<const PORT: u8, const PIN: u8> {
    _private: (),
}

impl<const PORT: u8, const PIN: u8> PortPin<PORT, PIN> {
    const BASE: usize = port_base(PORT);
    const MASK: u8 = 1 << PIN;
}

impl<const PORT: u8, const PIN: u8> ErrorType for PortPin<PORT, PIN> {
    type Error = Infallible;
}

impl<const PORT: u8, const PIN: u8> OutputPin for PortPin<PORT, PIN> {
    #[inline(always)]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        wr8(Self::BASE + port::OUT, rd8(Self::BASE + port::OUT) & !Self::MASK);
        Ok(())
    }

    #[inline(always)]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        wr8(Self::BASE + port::OUT, rd8(Self::BASE + port::OUT) | Self::MASK);
        Ok(())
    }
}

impl<const PORT: u8, const PIN: u8> StatefulOutputPin for PortPin<PORT, PIN> {
    #[inline(always)]
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(rd8(Self::BASE + port::OUT) & Self::MASK != 0)
    }

    #[inline(always)]
    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(rd8(Self::BASE + port::OUT) & Self::MASK == 0)
    }
}

/// Every peripheral handle this crate uses, handed out once.
pub struct Peripherals {
    /// eUSCI_A0
    pub E_USCI_A0: E_USCI_A0,
    /// eUSCI_A1
    pub E_USCI_A1: E_USCI_A1,
    /// eUSCI_A2
    pub E_USCI_A2: E_USCI_A2,
    /// eUSCI_A3
    pub E_USCI_A3: E_USCI_A3,
    /// eUSCI_B0
    pub E_USCI_B0: E_USCI_B0,
    /// eUSCI_B1
    pub E_USCI_B1: E_USCI_B1,
    /// eUSCI_B2
    pub E_USCI_B2: E_USCI_B2,
    /// eUSCI_B3
    pub E_USCI_B3: E_USCI_B3,
    /// DMA channel 0
    pub DMA0: DMA0,
    /// DMA channel 1
    pub DMA1: DMA1,
    /// DMA channel 2
    pub DMA2: DMA2,
    /// DMA channel 3
    pub DMA3: DMA3,
    /// DMA channel 4
    pub DMA4: DMA4,
    /// DMA channel 5
    pub DMA5: DMA5,
    /// Digital I/O
    pub PORTS: Ports,
}

static TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

impl Peripherals {
    /// Returns all handles the first time it is called, `None` afterwards.
    pub fn take() -> Option<Self> {
        critical_section::with(|cs| {
            let taken = TAKEN.borrow(cs);
            if taken.get() {
                None
            } else {
                taken.set(true);
                Some(unsafe { Self::steal() })
            }
        })
    }
}

impl Steal for Peripherals {
    unsafe fn steal() -> Self {
        Peripherals {
            E_USCI_A0: E_USCI_A0::steal(),
            E_USCI_A1: E_USCI_A1::steal(),
            E_USCI_A2: E_USCI_A2::steal(),
            E_USCI_A3: E_USCI_A3::steal(),
            E_USCI_B0: E_USCI_B0::steal(),
            E_USCI_B1: E_USCI_B1::steal(),
            E_USCI_B2: E_USCI_B2::steal(),
            E_USCI_B3: E_USCI_B3::steal(),
            DMA0: DMA0::steal(),
            DMA1: DMA1::steal(),
            DMA2: DMA2::steal(),
            DMA3: DMA3::steal(),
            DMA4: DMA4::steal(),
            DMA5: DMA5::steal(),
            PORTS: Ports::steal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_addresses() {
        assert_eq!(E_USCI_A3::BASE + usci::TXBUF, 0x062E);
        assert_eq!(E_USCI_A3::BASE + usci::RXBUF, 0x062C);
        assert_eq!(E_USCI_B1::BASE + usci::TXBUF, 0x068E);
        assert_eq!(DMA3::BASE, 0x0540);
        assert_eq!(DMA4::BASE, 0x0550);
        // DMA3TSEL is the high byte of DMACTL1, DMA4TSEL the low byte of DMACTL2
        assert_eq!(DMA3::TSEL, 0x0503);
        assert_eq!(DMA4::TSEL, 0x0504);
    }

    #[test]
    fn port_addresses() {
        assert_eq!(port_base(1), 0x0200);
        assert_eq!(port_base(2), 0x0201);
        assert_eq!(port_base(5), 0x0240);
        assert_eq!(port_base(6), 0x0241);
        assert_eq!(PortPin::<5, 3>::MASK, 0b1000);
    }

    #[test]
    fn peripherals_are_handed_out_once() {
        assert!(Peripherals::take().is_some());
        assert!(Peripherals::take().is_none());
    }
}
