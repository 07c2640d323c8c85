//! FRAM command set, addressing and identification data.

use bitflags::bitflags;

/// Instruction opcodes understood by CY15B104QN / CY15B108QN class serial FRAMs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Set the write enable latch
    WriteEnable = 0x06,
    /// Reset the write enable latch
    WriteDisable = 0x04,
    /// Read the status register
    ReadStatus = 0x05,
    /// Write the status register
    WriteStatus = 0x01,
    /// Read memory data
    Read = 0x03,
    /// Fast read memory data. One dummy byte follows the address.
    FastRead = 0x0B,
    /// Write memory data
    Write = 0x02,
    /// Enter hibernate mode. Same opcode as SLEEP on older parts.
    Hibernate = 0xB9,
    /// Read the device ID
    ReadId = 0x9F,
    /// Special sector write
    SpecialSectorWrite = 0x42,
    /// Special sector read
    SpecialSectorRead = 0x4B,
    /// Read the unique ID
    ReadUniqueId = 0x4C,
    /// Enter deep power-down
    DeepPowerDown = 0xBA,
}

impl Opcode {
    /// SLEEP shares its opcode with hibernate.
    pub const SLEEP: Opcode = Opcode::Hibernate;

    /// Whether the device must see WREN before this command.
    #[inline]
    pub fn needs_write_enable(self) -> bool {
        matches!(
            self,
            Opcode::Write | Opcode::WriteStatus | Opcode::SpecialSectorWrite
        )
    }
}

/// Byte clocked out whenever only the inbound stream matters.
pub const DUMMY: u8 = 0xFF;

/// Byte written across the whole array by an erase.
pub const ERASE_FILL: u8 = 0xFF;

/// Size of the special sector in bytes.
pub const SPECIAL_SECTOR_SIZE: usize = 256;

/// Length of the RDID response.
pub const DEVICE_ID_LEN: usize = 9;

/// Length of the RUID response.
pub const UNIQUE_ID_LEN: usize = 8;

/// Highest address on a 4 Mbit part
pub const _4M: u32 = 0x07FFFF;
/// Highest address on an 8 Mbit part
pub const _8M: u32 = 0x0FFFFF;

const ADDRESS_MASK: u32 = 0x0F_FFFF;

/// 20-bit offset into the FRAM array.
///
/// Bits above 19 are dropped when the address goes on the wire. The device itself only decodes
/// as many bits as it has capacity for and wraps silently, so no range checking happens here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub u32);

impl Address {
    /// Wire order: bits 19:16, then 15:8, then 7:0.
    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        let addr = self.0 & ADDRESS_MASK;
        [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
    }

    /// Address `offset` bytes further on.
    #[inline]
    pub fn offset(self, offset: u32) -> Address {
        Address(self.0.wrapping_add(offset))
    }
}

impl From<u32> for Address {
    #[inline(always)]
    fn from(addr: u32) -> Self {
        Address(addr)
    }
}

/// Array size of the attached part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Density {
    /// 4 Mbit, 512 KiB. Addresses 0x00000 - 0x7FFFF. Clock up to 40 MHz.
    Mb4,
    /// 8 Mbit, 1 MiB. Addresses 0x00000 - 0xFFFFF. Clock up to 20 MHz.
    Mb8,
}

impl Density {
    /// Number of bytes in the array.
    #[inline]
    pub const fn capacity(self) -> u32 {
        self.last_address() + 1
    }

    /// Highest valid address.
    #[inline]
    pub const fn last_address(self) -> u32 {
        match self {
            Density::Mb4 => _4M,
            Density::Mb8 => _8M,
        }
    }
}

bitflags! {
    /// Status register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Write enable latch. Set by WREN, cleared by WRDI and after every write-class command.
        const WEL = 1 << 1;
        /// Block protect bit 0
        const BP0 = 1 << 2;
        /// Block protect bit 1
        const BP1 = 1 << 3;
        /// Write protect pin enable
        const WPEN = 1 << 7;

        const _ = !0;
    }
}

/// Status written during initialization. Clears both block protect bits so the whole array is
/// writable.
pub const DEFAULT_STATUS: u8 = 0xC0;

/// Decoded RDID response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId {
    /// Number of 0x7F continuation bytes before the manufacturer code (JEDEC bank - 1).
    pub continuation: u8,
    /// JEDEC manufacturer code. 0xC2 for Cypress/Infineon.
    pub manufacturer: u8,
    /// Product ID: family and density in the first byte, revision in the second.
    pub product: [u8; 2],
}

impl DeviceId {
    /// Decode the 9-byte RDID response. Missing trailing bytes are treated as zero.
    pub fn from_bytes(buf: &[u8; DEVICE_ID_LEN]) -> Self {
        let continuation = buf.iter().take_while(|&&b| b == 0x7F).count();
        let rest = &buf[continuation.min(DEVICE_ID_LEN)..];
        let byte = |i: usize| rest.get(i).copied().unwrap_or(0);

        DeviceId {
            continuation: continuation as u8,
            manufacturer: byte(0),
            product: [byte(1), byte(2)],
        }
    }

    /// Array density encoded in the product ID, if it is one this driver knows.
    pub fn density(&self) -> Option<Density> {
        match self.product[0] & 0x1F {
            0x03 => Some(Density::Mb4),
            0x04 => Some(Density::Mb8),
            _ => None,
        }
    }
}

/// Factory-programmed unique identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UniqueId(pub [u8; UNIQUE_ID_LEN]);

impl UniqueId {
    /// Identifier as a big-endian integer.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}
