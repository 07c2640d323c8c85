//! DMA controller channel registers.

use bitflags::bitflags;

bitflags! {
    /// DMAxCTL bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaCtl: u16 {
        /// Software request, starts a transfer when the trigger source is DMAREQ
        const DMAREQ = 1 << 0;
        /// Transfer aborted by an NMI
        const DMAABORT = 1 << 1;
        /// Interrupt enable
        const DMAIE = 1 << 2;
        /// Interrupt flag, set when DMAxSZ reaches zero
        const DMAIFG = 1 << 3;
        /// Channel enable. Cleared by hardware when a single/block transfer completes.
        const DMAEN = 1 << 4;
        /// Level-sensitive trigger instead of rising edge
        const DMALEVEL = 1 << 5;
        /// Source is a byte
        const DMASRCBYTE = 1 << 6;
        /// Destination is a byte
        const DMADSTBYTE = 1 << 7;
        /// Source address increment mode, bit 0
        const DMASRCINCR0 = 1 << 8;
        /// Source address increment mode, bit 1
        const DMASRCINCR1 = 1 << 9;
        /// Destination address increment mode, bit 0
        const DMADSTINCR0 = 1 << 10;
        /// Destination address increment mode, bit 1
        const DMADSTINCR1 = 1 << 11;
        /// Transfer mode, bit 0
        const DMADT0 = 1 << 12;
        /// Transfer mode, bit 1
        const DMADT1 = 1 << 13;
        /// Transfer mode, bit 2
        const DMADT2 = 1 << 14;
    }
}

/// How a channel moves its source or destination address after each transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddrStep {
    /// Address stays put (peripheral registers, constant fill bytes)
    Fixed = 0b00,
    /// Address decrements
    Decrement = 0b10,
    /// Address increments (memory buffers)
    Increment = 0b11,
}

impl DmaCtl {
    /// Single transfer, rising-edge trigger, byte to byte. `DMADT_0 | DMALEVEL__EDGE` with byte-wide
    /// source and destination, which is the only shape the FRAM transport uses.
    pub fn single_byte(src: AddrStep, dst: AddrStep) -> Self {
        DmaCtl::DMASRCBYTE
            | DmaCtl::DMADSTBYTE
            | DmaCtl::from_bits_retain(((src as u16) << 8) | ((dst as u16) << 10))
    }

    /// Source increment mode encoded in this value.
    pub fn src_step(self) -> AddrStep {
        step_from_bits((self.bits() >> 8) & 0b11)
    }

    /// Destination increment mode encoded in this value.
    pub fn dst_step(self) -> AddrStep {
        step_from_bits((self.bits() >> 10) & 0b11)
    }
}

fn step_from_bits(bits: u16) -> AddrStep {
    match bits {
        0b10 => AddrStep::Decrement,
        0b11 => AddrStep::Increment,
        _ => AddrStep::Fixed,
    }
}

/// DMA trigger source number, as listed in the device datasheet's trigger table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTrigger(pub u8);

impl DmaTrigger {
    /// Software trigger through DMAREQ.
    pub const DMAREQ: DmaTrigger = DmaTrigger(0);
}

/// Register operations on a single DMA channel.
pub trait DmaChannel {
    /// Read DMAxCTL.
    fn ctl_rd(&self) -> DmaCtl;
    /// Overwrite DMAxCTL.
    fn ctl_wr(&self, ctl: DmaCtl);
    /// Set bits in DMAxCTL.
    fn ctl_set(&self, bits: DmaCtl);
    /// Clear bits in DMAxCTL.
    fn ctl_clear(&self, bits: DmaCtl);

    /// Source address.
    fn sa_wr(&self, addr: usize);
    /// Destination address.
    fn da_wr(&self, addr: usize);
    /// Number of transfers. Counts down to zero as the channel runs.
    fn sz_wr(&self, size: u16);

    /// Select the trigger source for this channel (DMAxTSEL in DMACTLn).
    fn tsel_wr(&self, trigger: DmaTrigger);

    /// Whether DMAEN is still set.
    #[inline(always)]
    fn is_enabled(&self) -> bool {
        self.ctl_rd().contains(DmaCtl::DMAEN)
    }
}
