//! eUSCI registers as seen in SPI mode.

use bitflags::bitflags;

bitflags! {
    /// UCxCTLW0 bits in SPI mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctlw0: u16 {
        /// Software reset enable
        const UCSWRST = 1 << 0;
        /// STE pin function (4-pin mode only)
        const UCSTEM = 1 << 1;
        /// Clock source select, bit 0
        const UCSSEL0 = 1 << 6;
        /// Clock source select, bit 1
        const UCSSEL1 = 1 << 7;
        /// Synchronous mode enable, always set for SPI
        const UCSYNC = 1 << 8;
        /// eUSCI mode, bit 0
        const UCMODE0 = 1 << 9;
        /// eUSCI mode, bit 1
        const UCMODE1 = 1 << 10;
        /// Master mode select
        const UCMST = 1 << 11;
        /// 7-bit character length
        const UC7BIT = 1 << 12;
        /// MSB first
        const UCMSB = 1 << 13;
        /// Clock polarity: inactive state high
        const UCCKPL = 1 << 14;
        /// Clock phase: capture on first edge
        const UCCKPH = 1 << 15;
    }
}

bitflags! {
    /// UCxSTATW bits in SPI mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Statw: u16 {
        /// A transmit or receive operation is in progress
        const UCBUSY = 1 << 0;
        /// Receive overrun: a byte arrived before RXBUF was read
        const UCOE = 1 << 5;
        /// Bus conflict (4-pin master mode)
        const UCFE = 1 << 6;
        /// Loopback
        const UCLISTEN = 1 << 7;
    }
}

bitflags! {
    /// UCxIFG / UCxIE bits shared by SPI mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ifg: u16 {
        /// RXBUF holds a complete byte
        const UCRXIFG = 1 << 0;
        /// TXBUF is empty
        const UCTXIFG = 1 << 1;
    }
}

/// Clock source for the bit clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ucssel {
    /// External UCxCLK. Only meaningful in slave mode.
    Uclk = 0,
    /// ACLK
    Aclk = 1,
    /// SMCLK
    Smclk = 2,
}

/// eUSCI synchronous mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ucmode {
    /// 3-pin SPI, chip select handled in software
    ThreePinSPI = 0,
    /// 4-pin SPI, STE active high
    FourPinSPI1 = 1,
    /// 4-pin SPI, STE active low
    FourPinSPI0 = 2,
}

/// Full contents of UCxCTLW0 for SPI operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UcxSpiCtw0 {
    /// Capture on first clock edge
    pub ucckph: bool,
    /// Clock idles high
    pub ucckpl: bool,
    /// Most significant bit first
    pub ucmsb: bool,
    /// 7-bit characters instead of 8
    pub uc7bit: bool,
    /// Master mode
    pub ucmst: bool,
    /// Synchronous mode, must be set for SPI
    pub ucsync: bool,
    /// STE pin acts as chip select output
    pub ucstem: bool,
    /// Keep the state machine in reset
    pub ucswrst: bool,
    /// Pin mode
    pub ucmode: Ucmode,
    /// Clock source
    pub ucssel: Ucssel,
}

impl UcxSpiCtw0 {
    /// Raw register value.
    pub fn bits(&self) -> u16 {
        let mut reg = Ctlw0::empty();
        reg.set(Ctlw0::UCCKPH, self.ucckph);
        reg.set(Ctlw0::UCCKPL, self.ucckpl);
        reg.set(Ctlw0::UCMSB, self.ucmsb);
        reg.set(Ctlw0::UC7BIT, self.uc7bit);
        reg.set(Ctlw0::UCMST, self.ucmst);
        reg.set(Ctlw0::UCSYNC, self.ucsync);
        reg.set(Ctlw0::UCSTEM, self.ucstem);
        reg.set(Ctlw0::UCSWRST, self.ucswrst);
        reg.bits() | ((self.ucmode as u16) << 9) | ((self.ucssel as u16) << 6)
    }
}

/// Register operations the SPI bus driver needs from an eUSCI peripheral.
///
/// Implementations are expected to be thin: one register access per method.
pub trait EUsciSpi {
    /// Set UCSWRST, holding the state machine in reset.
    fn ctw0_set_rst(&self);
    /// Clear UCSWRST, releasing the state machine.
    fn ctw0_clear_rst(&self);
    /// Overwrite UCxCTLW0. Only call while in reset.
    fn ctw0_wr(&self, reg: &UcxSpiCtw0);
    /// Bit clock prescaler. Only call while in reset.
    fn brw_wr(&self, val: u16);
    /// Disable loopback.
    fn uclisten_clear(&self);
    /// Read UCxSTATW.
    fn statw_rd(&self) -> Statw;

    /// Write a byte to UCxTXBUF, starting a transfer.
    fn txbuf_wr(&self, val: u8);
    /// Read UCxRXBUF. Clears UCRXIFG and UCOE.
    fn rxbuf_rd(&self) -> u8;

    /// Read UCxIFG.
    fn ifg_rd(&self) -> Ifg;
    /// Set flags in UCxIFG. A rising TX/RX flag triggers attached DMA channels.
    fn ifg_set(&self, flags: Ifg);
    /// Clear flags in UCxIFG.
    fn ifg_clear(&self, flags: Ifg);

    /// Enable or disable the transmit interrupt.
    fn transmit_interrupt_set(&self, enable: bool);
    /// Enable or disable the receive interrupt.
    fn receive_interrupt_set(&self, enable: bool);

    /// Bus address of UCxTXBUF, used as a DMA destination.
    fn txbuf_addr(&self) -> usize;
    /// Bus address of UCxRXBUF, used as a DMA source.
    fn rxbuf_addr(&self) -> usize;
}
