//! Simulated board for host tests: an eUSCI in SPI master mode wired to a serial FRAM, a chip
//! select pin and a two-channel DMA controller. All handles share one [`Board`], so whatever the
//! driver does through the register traits shows up in the FRAM model and the bus trace.

use crate::command::{Density, DEVICE_ID_LEN, SPECIAL_SECTOR_SIZE, UNIQUE_ID_LEN};
use crate::hw_traits::dma::{AddrStep, DmaChannel, DmaCtl, DmaTrigger};
use crate::hw_traits::eusci::{EUsciSpi, Ifg, Statw, UcxSpiCtw0};
use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub const TXBUF_ADDR: usize = 0x062E;
pub const RXBUF_ADDR: usize = 0x062C;
pub const TX_TRIGGER: DmaTrigger = DmaTrigger(17);
pub const RX_TRIGGER: DmaTrigger = DmaTrigger(16);

pub const SIM_DEVICE_ID: [u8; DEVICE_ID_LEN] = [0x7F, 0x7F, 0x7F, 0x7F, 0x7F, 0x7F, 0xC2, 0x24, 0x08];
pub const SIM_UNIQUE_ID: [u8; UNIQUE_ID_LEN] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Select,
    Deselect,
    Byte { mosi: u8, miso: u8 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegOp {
    SetRst,
    ClearRst,
    Ctlw0(u16),
    Brw(u16),
    ListenClear,
    TxIe(bool),
    RxIe(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cmd {
    Opcode,
    StatusOut,
    StatusIn,
    Address { op: u8, acc: u32, count: u8 },
    Dummy(u32),
    ReadData(u32),
    WriteData(u32),
    SpecialRead(u32),
    SpecialWrite(u32),
    IdOut(usize),
    UidOut(usize),
    Ignore,
}

/// Behavioural model of a CY15B10xQN on the other end of the bus.
pub struct FramModel {
    pub mem: Vec<u8>,
    pub special: [u8; SPECIAL_SECTOR_SIZE],
    pub status: u8,
    pub wel: bool,
    pub asleep: bool,
    cmd: Cmd,
    opcode: Option<u8>,
    /// Write-class commands rejected because the latch was clear
    pub rejected_writes: usize,
}

impl FramModel {
    fn new(density: Density) -> Self {
        FramModel {
            mem: std::vec![0u8; density.capacity() as usize],
            special: [0; SPECIAL_SECTOR_SIZE],
            status: 0x00,
            wel: false,
            asleep: false,
            cmd: Cmd::Ignore,
            opcode: None,
            rejected_writes: 0,
        }
    }

    fn mask(&self) -> u32 {
        self.mem.len() as u32 - 1
    }

    fn status_byte(&self) -> u8 {
        if self.wel {
            self.status | 0x02
        } else {
            self.status & !0x02
        }
    }

    fn select(&mut self) {
        self.cmd = if self.asleep { Cmd::Ignore } else { Cmd::Opcode };
        self.opcode = None;
    }

    fn deselect(&mut self) {
        // The latch clears on the rising CS edge that ends any write-class command
        if matches!(self.opcode, Some(0x02) | Some(0x01) | Some(0x42)) {
            self.wel = false;
        }
        self.cmd = Cmd::Ignore;
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        match self.cmd {
            Cmd::Opcode => {
                self.opcode = Some(mosi);
                self.cmd = match mosi {
                    0x06 => {
                        self.wel = true;
                        Cmd::Ignore
                    }
                    0x04 => {
                        self.wel = false;
                        Cmd::Ignore
                    }
                    0x05 => Cmd::StatusOut,
                    0x01 if self.wel => Cmd::StatusIn,
                    0x03 | 0x0B | 0x02 | 0x4B | 0x42 => Cmd::Address {
                        op: mosi,
                        acc: 0,
                        count: 0,
                    },
                    0x9F => Cmd::IdOut(0),
                    0x4C => Cmd::UidOut(0),
                    0xB9 | 0xBA => {
                        self.asleep = true;
                        Cmd::Ignore
                    }
                    _ => {
                        if mosi == 0x01 {
                            self.rejected_writes += 1;
                        }
                        Cmd::Ignore
                    }
                };
                0xFF
            }
            Cmd::StatusOut => self.status_byte(),
            Cmd::StatusIn => {
                self.status = mosi & !0x02;
                self.cmd = Cmd::Ignore;
                0xFF
            }
            Cmd::Address { op, acc, count } => {
                let acc = (acc << 8) | mosi as u32;
                let count = count + 1;
                self.cmd = if count < 3 {
                    Cmd::Address { op, acc, count }
                } else {
                    let addr = acc & self.mask();
                    match op {
                        0x03 => Cmd::ReadData(addr),
                        0x0B => Cmd::Dummy(addr),
                        0x4B => Cmd::SpecialRead(acc),
                        0x02 | 0x42 if !self.wel => {
                            self.rejected_writes += 1;
                            Cmd::Ignore
                        }
                        0x02 => Cmd::WriteData(addr),
                        _ => Cmd::SpecialWrite(acc),
                    }
                };
                0xFF
            }
            Cmd::Dummy(addr) => {
                self.cmd = Cmd::ReadData(addr);
                0xFF
            }
            Cmd::ReadData(addr) => {
                self.cmd = Cmd::ReadData((addr + 1) & self.mask());
                self.mem[addr as usize]
            }
            Cmd::WriteData(addr) => {
                self.mem[addr as usize] = mosi;
                self.cmd = Cmd::WriteData((addr + 1) & self.mask());
                0xFF
            }
            Cmd::SpecialRead(addr) => {
                self.cmd = Cmd::SpecialRead(addr.wrapping_add(1));
                self.special[addr as usize % SPECIAL_SECTOR_SIZE]
            }
            Cmd::SpecialWrite(addr) => {
                self.special[addr as usize % SPECIAL_SECTOR_SIZE] = mosi;
                self.cmd = Cmd::SpecialWrite(addr.wrapping_add(1));
                0xFF
            }
            Cmd::IdOut(i) => {
                self.cmd = Cmd::IdOut(i + 1);
                SIM_DEVICE_ID.get(i).copied().unwrap_or(0x00)
            }
            Cmd::UidOut(i) => {
                self.cmd = Cmd::UidOut(i + 1);
                SIM_UNIQUE_ID.get(i).copied().unwrap_or(0x00)
            }
            Cmd::Ignore => 0xFF,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct DmaRegs {
    ctl: u16,
    sa: usize,
    da: usize,
    sz: u16,
    tsel: u8,
}

pub struct Board {
    pub device: FramModel,
    cs_low: bool,
    rxbuf: u8,
    ifg: Ifg,
    busy: bool,
    overrun: bool,
    stalled: bool,
    record: bool,
    trace: Vec<BusEvent>,
    reg_log: Vec<RegOp>,
    dma: [DmaRegs; 2],
    pending: VecDeque<DmaTrigger>,
    paced: bool,
}

impl Board {
    fn shift(&mut self, mosi: u8) {
        if self.stalled {
            self.busy = true;
            return;
        }
        let miso = if self.cs_low {
            self.device.exchange(mosi)
        } else {
            0xFF
        };
        if self.record {
            self.trace.push(BusEvent::Byte { mosi, miso });
        }
        let rx_was_set = self.ifg.contains(Ifg::UCRXIFG);
        if rx_was_set {
            self.overrun = true;
        }
        self.rxbuf = miso;
        self.ifg.insert(Ifg::UCRXIFG | Ifg::UCTXIFG);
        if !rx_was_set {
            self.pending.push_back(RX_TRIGGER);
        }
        self.pending.push_back(TX_TRIGGER);
    }

    fn read_rxbuf(&mut self) -> u8 {
        self.ifg.remove(Ifg::UCRXIFG);
        self.overrun = false;
        self.rxbuf
    }

    fn dma_active(&self) -> bool {
        self.dma.iter().any(|regs| regs.ctl & DmaCtl::DMAEN.bits() != 0)
    }

    fn run_one(&mut self) {
        if let Some(trigger) = self.pending.pop_front() {
            for ch in 0..self.dma.len() {
                let regs = self.dma[ch];
                if regs.tsel == trigger.0 && regs.ctl & DmaCtl::DMAEN.bits() != 0 {
                    self.dma_step(ch);
                }
            }
        }
        if !self.dma_active() {
            self.pending.clear();
        }
    }

    fn run_dma(&mut self) {
        while !self.pending.is_empty() {
            self.run_one();
        }
    }

    // Paced channels only move when polled, so triggers queue up while a channel is armed
    fn kick_dma(&mut self) {
        if !self.paced || !self.dma_active() {
            self.run_dma();
        }
    }

    fn dma_step(&mut self, ch: usize) {
        let regs = self.dma[ch];
        let byte = if regs.sa == RXBUF_ADDR {
            self.read_rxbuf()
        } else {
            // The driver hands the channel addresses of live buffers for the whole transfer
            unsafe { *(regs.sa as *const u8) }
        };
        if regs.da == TXBUF_ADDR {
            self.ifg.remove(Ifg::UCTXIFG);
            self.shift(byte);
        } else {
            unsafe { *(regs.da as *mut u8) = byte };
        }

        let ctl = DmaCtl::from_bits_retain(regs.ctl);
        let regs = &mut self.dma[ch];
        regs.sa = step(regs.sa, ctl.src_step());
        regs.da = step(regs.da, ctl.dst_step());
        regs.sz -= 1;
        if regs.sz == 0 {
            regs.ctl &= !DmaCtl::DMAEN.bits();
            regs.ctl |= DmaCtl::DMAIFG.bits();
        }
    }
}

fn step(addr: usize, step: AddrStep) -> usize {
    match step {
        AddrStep::Fixed => addr,
        AddrStep::Increment => addr + 1,
        AddrStep::Decrement => addr - 1,
    }
}

#[derive(Clone)]
pub struct Sim(Rc<RefCell<Board>>);

impl Sim {
    pub fn new(density: Density) -> Self {
        Sim(Rc::new(RefCell::new(Board {
            device: FramModel::new(density),
            cs_low: false,
            rxbuf: 0,
            ifg: Ifg::UCTXIFG,
            busy: false,
            overrun: false,
            stalled: false,
            record: true,
            trace: Vec::new(),
            reg_log: Vec::new(),
            dma: [DmaRegs::default(); 2],
            pending: VecDeque::new(),
            paced: false,
        })))
    }

    pub fn usci(&self) -> SimUsci {
        SimUsci(self.0.clone())
    }

    pub fn cs(&self) -> SimCs {
        SimCs(self.0.clone())
    }

    pub fn dma(&self, ch: usize) -> SimDma {
        SimDma(self.0.clone(), ch)
    }

    pub fn board(&self) -> std::cell::RefMut<'_, Board> {
        self.0.borrow_mut()
    }

    /// Peripheral stops completing transfers: UCBUSY stays set and DMA never advances.
    pub fn stall(&self) {
        self.0.borrow_mut().stalled = true;
    }

    /// DMA advances by one trigger each time a channel's control register is read, instead of
    /// running to completion as soon as it is triggered.
    pub fn pace_dma(&self) {
        self.0.borrow_mut().paced = true;
    }

    pub fn record(&self, on: bool) {
        self.0.borrow_mut().record = on;
    }

    pub fn trace(&self) -> Vec<BusEvent> {
        self.0.borrow().trace.clone()
    }

    pub fn clear_trace(&self) {
        self.0.borrow_mut().trace.clear();
    }

    pub fn reg_log(&self) -> Vec<RegOp> {
        self.0.borrow().reg_log.clone()
    }

    pub fn cs_asserted(&self) -> bool {
        self.0.borrow().cs_low
    }

    pub fn status(&self) -> u8 {
        self.0.borrow().device.status_byte()
    }

    pub fn memory(&self, from: usize, len: usize) -> Vec<u8> {
        self.0.borrow().device.mem[from..from + len].to_vec()
    }

    pub fn fill_memory(&self, byte: u8) {
        self.0.borrow_mut().device.mem.iter_mut().for_each(|b| *b = byte);
    }

    /// MOSI bytes of every completed CS-framed command, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for event in self.0.borrow().trace.iter() {
            match *event {
                BusEvent::Select => current = Some(Vec::new()),
                BusEvent::Deselect => {
                    if let Some(frame) = current.take() {
                        frames.push(frame);
                    }
                }
                BusEvent::Byte { mosi, .. } => {
                    if let Some(frame) = current.as_mut() {
                        frame.push(mosi);
                    }
                }
            }
        }
        frames
    }
}

pub struct SimUsci(Rc<RefCell<Board>>);

impl EUsciSpi for SimUsci {
    fn ctw0_set_rst(&self) {
        self.0.borrow_mut().reg_log.push(RegOp::SetRst);
    }

    fn ctw0_clear_rst(&self) {
        self.0.borrow_mut().reg_log.push(RegOp::ClearRst);
    }

    fn ctw0_wr(&self, reg: &UcxSpiCtw0) {
        self.0.borrow_mut().reg_log.push(RegOp::Ctlw0(reg.bits()));
    }

    fn brw_wr(&self, val: u16) {
        self.0.borrow_mut().reg_log.push(RegOp::Brw(val));
    }

    fn uclisten_clear(&self) {
        self.0.borrow_mut().reg_log.push(RegOp::ListenClear);
    }

    fn statw_rd(&self) -> Statw {
        let board = self.0.borrow();
        let mut statw = Statw::empty();
        statw.set(Statw::UCBUSY, board.busy);
        statw.set(Statw::UCOE, board.overrun);
        statw
    }

    fn txbuf_wr(&self, val: u8) {
        let mut board = self.0.borrow_mut();
        board.ifg.remove(Ifg::UCTXIFG);
        board.shift(val);
        board.kick_dma();
    }

    fn rxbuf_rd(&self) -> u8 {
        self.0.borrow_mut().read_rxbuf()
    }

    fn ifg_rd(&self) -> Ifg {
        self.0.borrow().ifg
    }

    fn ifg_set(&self, flags: Ifg) {
        let mut board = self.0.borrow_mut();
        let rising = flags & !board.ifg;
        board.ifg.insert(flags);
        if rising.contains(Ifg::UCRXIFG) {
            board.pending.push_back(RX_TRIGGER);
        }
        if rising.contains(Ifg::UCTXIFG) {
            board.pending.push_back(TX_TRIGGER);
        }
        board.kick_dma();
    }

    fn ifg_clear(&self, flags: Ifg) {
        self.0.borrow_mut().ifg.remove(flags);
    }

    fn transmit_interrupt_set(&self, enable: bool) {
        self.0.borrow_mut().reg_log.push(RegOp::TxIe(enable));
    }

    fn receive_interrupt_set(&self, enable: bool) {
        self.0.borrow_mut().reg_log.push(RegOp::RxIe(enable));
    }

    fn txbuf_addr(&self) -> usize {
        TXBUF_ADDR
    }

    fn rxbuf_addr(&self) -> usize {
        RXBUF_ADDR
    }
}

pub struct SimCs(Rc<RefCell<Board>>);

impl embedded_hal::digital::ErrorType for SimCs {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut board = self.0.borrow_mut();
        if !board.cs_low {
            board.cs_low = true;
            board.device.select();
            if board.record {
                board.trace.push(BusEvent::Select);
            }
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut board = self.0.borrow_mut();
        if board.cs_low {
            board.cs_low = false;
            board.device.deselect();
            if board.record {
                board.trace.push(BusEvent::Deselect);
            }
        }
        Ok(())
    }
}

pub struct SimDma(Rc<RefCell<Board>>, usize);

impl DmaChannel for SimDma {
    fn ctl_rd(&self) -> DmaCtl {
        let mut board = self.0.borrow_mut();
        if board.paced {
            board.run_one();
        }
        DmaCtl::from_bits_retain(board.dma[self.1].ctl)
    }

    fn ctl_wr(&self, ctl: DmaCtl) {
        self.0.borrow_mut().dma[self.1].ctl = ctl.bits();
    }

    fn ctl_set(&self, bits: DmaCtl) {
        self.0.borrow_mut().dma[self.1].ctl |= bits.bits();
    }

    fn ctl_clear(&self, bits: DmaCtl) {
        self.0.borrow_mut().dma[self.1].ctl &= !bits.bits();
    }

    fn sa_wr(&self, addr: usize) {
        self.0.borrow_mut().dma[self.1].sa = addr;
    }

    fn da_wr(&self, addr: usize) {
        self.0.borrow_mut().dma[self.1].da = addr;
    }

    fn sz_wr(&self, size: u16) {
        self.0.borrow_mut().dma[self.1].sz = size;
    }

    fn tsel_wr(&self, trigger: DmaTrigger) {
        self.0.borrow_mut().dma[self.1].tsel = trigger.0;
    }
}

/// Chip select pin whose every operation fails.
pub struct BrokenPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl embedded_hal::digital::ErrorType for BrokenPin {
    type Error = PinFault;
}

impl embedded_hal::digital::OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }
}
