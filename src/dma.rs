//! DMA-driven bulk transfers
//!
//! Two DMA channels move the data phase of a command without the CPU touching each byte. The
//! transmit channel is triggered by UCTXIFG and feeds TXBUF, the receive channel is triggered by
//! UCRXIFG and drains RXBUF. Reads need both, since every inbound byte has to be paid for with an
//! outbound [`DUMMY`]. Writes and fills only use the transmit channel.
//!
//! DMAxSZ is 16 bits wide, so anything longer than [`MAX_CHUNK`] bytes is split into consecutive
//! runs under the same chip select. The bytes on the wire are identical to
//! [`ByteStep`](crate::transfer::ByteStep)'s. Each run is waited on once, with the bus waiter's
//! per-byte budget multiplied by the run length.
//!
//! ```no_run
//! # use msp430_extfram::{fr5994, dma::Dma};
//! let p = fr5994::Peripherals::take().unwrap();
//! let dma = Dma::new(p.DMA3, fr5994::UCA3TXIFG, p.DMA4, fr5994::UCA3RXIFG);
//! ```

use crate::command::DUMMY;
use crate::error::Error;
use crate::hw_traits::dma::{AddrStep, DmaChannel, DmaCtl, DmaTrigger};
use crate::hw_traits::eusci::EUsciSpi;
use crate::spi::SpiBus;
use crate::transfer::BulkTransfer;
use crate::wait::{Timeout, Wait};
use core::sync::atomic::{compiler_fence, Ordering};
use embedded_hal::digital::{ErrorType, OutputPin};

/// Largest number of bytes one channel run can move.
pub const MAX_CHUNK: usize = 0xFFFF;

/// A pair of DMA channels bound to one eUSCI's transmit and receive triggers.
pub struct Dma<TX, RX> {
    tx: TX,
    tx_trigger: DmaTrigger,
    rx: RX,
    rx_trigger: DmaTrigger,
}

impl<TX: DmaChannel, RX: DmaChannel> Dma<TX, RX> {
    /// Take ownership of two channels. `tx_trigger` must be the eUSCI's UCTXIFG trigger number
    /// and `rx_trigger` its UCRXIFG one. Both channels are disabled here.
    pub fn new(tx: TX, tx_trigger: DmaTrigger, rx: RX, rx_trigger: DmaTrigger) -> Self {
        tx.ctl_clear(DmaCtl::DMAEN);
        rx.ctl_clear(DmaCtl::DMAEN);
        Dma {
            tx,
            tx_trigger,
            rx,
            rx_trigger,
        }
    }

    /// Release both channels.
    pub fn free(self) -> (TX, RX) {
        (self.tx, self.rx)
    }

    fn abort(&self) {
        self.tx.ctl_clear(DmaCtl::DMAEN);
        self.rx.ctl_clear(DmaCtl::DMAEN);
        compiler_fence(Ordering::SeqCst);
    }

    fn arm_tx(&self, src: usize, src_step: AddrStep, txbuf: usize, len: u16) {
        self.tx
            .ctl_wr(DmaCtl::single_byte(src_step, AddrStep::Fixed));
        self.tx.tsel_wr(self.tx_trigger);
        self.tx.sa_wr(src);
        self.tx.da_wr(txbuf);
        self.tx.sz_wr(len);
    }

    fn read_chunk<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        chunk: &mut [u8],
    ) -> Result<(), Timeout> {
        let len = chunk.len() as u16;
        let dummy = DUMMY;
        let txbuf = bus.usci().txbuf_addr();
        let rxbuf = bus.usci().rxbuf_addr();

        // A stale UCRXIFG would swallow the rising edge of the first received byte
        bus.discard_rx();

        self.rx
            .ctl_wr(DmaCtl::single_byte(AddrStep::Fixed, AddrStep::Increment));
        self.rx.tsel_wr(self.rx_trigger);
        self.rx.sa_wr(rxbuf);
        self.rx.da_wr(chunk.as_mut_ptr() as usize);
        self.rx.sz_wr(len);
        self.arm_tx(
            core::ptr::addr_of!(dummy) as usize,
            AddrStep::Fixed,
            txbuf,
            len,
        );

        // Receive side first, so it is listening before the first byte completes
        self.rx.ctl_set(DmaCtl::DMAEN);
        self.tx.ctl_set(DmaCtl::DMAEN);
        compiler_fence(Ordering::SeqCst);
        bus.trigger_tx();

        let rx = &self.rx;
        let res = bus.wait_for_bytes(len as u32, || !rx.is_enabled());
        compiler_fence(Ordering::SeqCst);
        res
    }

    fn send_chunk<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        src: usize,
        src_step: AddrStep,
        len: u16,
    ) -> Result<(), Timeout> {
        let txbuf = bus.usci().txbuf_addr();
        self.arm_tx(src, src_step, txbuf, len);
        self.tx.ctl_set(DmaCtl::DMAEN);
        compiler_fence(Ordering::SeqCst);
        bus.trigger_tx();

        let tx = &self.tx;
        bus.wait_for_bytes(len as u32, || !tx.is_enabled())?;
        compiler_fence(Ordering::SeqCst);
        // The channel finishes when the last byte enters TXBUF, not when it leaves the shifter
        bus.wait_idle()
    }

    fn check<E>(&self, res: Result<(), Timeout>) -> Result<(), Error<E>> {
        if res.is_err() {
            self.abort();
            warn!("dma: channel did not finish, aborted");
        }
        res.map_err(Error::from)
    }
}

impl<TX: DmaChannel, RX: DmaChannel> BulkTransfer for Dma<TX, RX> {
    fn read_into<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        dst: &mut [u8],
    ) -> Result<(), Error<<CS as ErrorType>::Error>> {
        if dst.len() > MAX_CHUNK {
            debug!("dma: splitting {} byte read", dst.len());
        }
        for chunk in dst.chunks_mut(MAX_CHUNK) {
            let res = self.read_chunk(bus, chunk);
            self.check(res)?;
        }
        Ok(())
    }

    fn write_from<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        src: &[u8],
    ) -> Result<(), Error<<CS as ErrorType>::Error>> {
        if src.len() > MAX_CHUNK {
            debug!("dma: splitting {} byte write", src.len());
        }
        for chunk in src.chunks(MAX_CHUNK) {
            let res = self.send_chunk(
                bus,
                chunk.as_ptr() as usize,
                AddrStep::Increment,
                chunk.len() as u16,
            );
            self.check(res)?;
        }
        Ok(())
    }

    fn fill<USCI: EUsciSpi, CS: OutputPin, W: Wait>(
        &mut self,
        bus: &mut SpiBus<USCI, CS, W>,
        byte: u8,
        count: u32,
    ) -> Result<(), Error<<CS as ErrorType>::Error>> {
        let mut remaining = count;
        while remaining > 0 {
            let len = remaining.min(MAX_CHUNK as u32) as u16;
            let res = self.send_chunk(
                bus,
                core::ptr::addr_of!(byte) as usize,
                AddrStep::Fixed,
                len,
            );
            self.check(res)?;
            remaining -= len as u32;
        }
        Ok(())
    }
}
