//! Bit level views of the feature registers.
//!
//! Each register is read and written as a single byte; the structs here decode that
//! byte into named fields and encode them back. Bits not named are kept in `reserved`
//! so a read-modify-write does not disturb them.

use crate::ECCStatus;

/// Status register (0xC0), read only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    /// Operation in progress
    pub oip: bool,
    /// Write enable latch
    pub wel: bool,
    pub erase_fail: bool,
    pub program_fail: bool,
    /// Raw 3-bit ECC syndrome of the last page read
    pub ecc_syndrome: u8,
    /// Cache read busy
    pub cache_busy: bool,
}

impl Status {
    pub const OIP: u8 = 1 << 0;
    pub const WEL: u8 = 1 << 1;
    pub const E_FAIL: u8 = 1 << 2;
    pub const P_FAIL: u8 = 1 << 3;
    pub const ECCS_SHIFT: u8 = 4;
    pub const ECCS_MASK: u8 = 0b111 << Self::ECCS_SHIFT;
    pub const CRBSY: u8 = 1 << 7;

    pub fn from_byte(byte: u8) -> Self {
        Status {
            oip: byte & Self::OIP != 0,
            wel: byte & Self::WEL != 0,
            erase_fail: byte & Self::E_FAIL != 0,
            program_fail: byte & Self::P_FAIL != 0,
            ecc_syndrome: (byte & Self::ECCS_MASK) >> Self::ECCS_SHIFT,
            cache_busy: byte & Self::CRBSY != 0,
        }
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = (self.ecc_syndrome << Self::ECCS_SHIFT) & Self::ECCS_MASK;
        byte |= flag(self.oip, Self::OIP);
        byte |= flag(self.wel, Self::WEL);
        byte |= flag(self.erase_fail, Self::E_FAIL);
        byte |= flag(self.program_fail, Self::P_FAIL);
        byte |= flag(self.cache_busy, Self::CRBSY);
        byte
    }

    /// ECC outcome of the last page read
    pub fn ecc(&self) -> ECCStatus {
        ECCStatus::from_syndrome(self.ecc_syndrome)
    }
}

/// Block lock register (0xA0). All protect bits clear means every block is writable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockLock {
    pub wp_hold_disable: bool,
    /// Top/bottom select of the protected range
    pub tb: bool,
    /// Block protect bits BP0..BP3
    pub bp: u8,
    /// Block register write disable
    pub brwd: bool,
    pub reserved: u8,
}

impl BlockLock {
    pub const WP_HOLD_DISABLE: u8 = 1 << 1;
    pub const TB: u8 = 1 << 2;
    pub const BP_SHIFT: u8 = 3;
    pub const BP_MASK: u8 = 0b1111 << Self::BP_SHIFT;
    pub const BRWD: u8 = 1 << 7;
    const RESERVED_MASK: u8 = 1 << 0;

    /// Register value with nothing locked
    pub const UNLOCKED: BlockLock = BlockLock {
        wp_hold_disable: false,
        tb: false,
        bp: 0,
        brwd: false,
        reserved: 0,
    };

    pub fn from_byte(byte: u8) -> Self {
        BlockLock {
            wp_hold_disable: byte & Self::WP_HOLD_DISABLE != 0,
            tb: byte & Self::TB != 0,
            bp: (byte & Self::BP_MASK) >> Self::BP_SHIFT,
            brwd: byte & Self::BRWD != 0,
            reserved: byte & Self::RESERVED_MASK,
        }
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = (self.bp << Self::BP_SHIFT) & Self::BP_MASK;
        byte |= flag(self.wp_hold_disable, Self::WP_HOLD_DISABLE);
        byte |= flag(self.tb, Self::TB);
        byte |= flag(self.brwd, Self::BRWD);
        byte | (self.reserved & Self::RESERVED_MASK)
    }

    pub fn is_locked(&self) -> bool {
        self.bp != 0
    }
}

/// Configuration register (0xB0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Configuration {
    pub cfg0: bool,
    pub ecc_enabled: bool,
    /// Lock tight enable
    pub lot_en: bool,
    pub cfg1: bool,
    pub cfg2: bool,
    pub reserved: u8,
}

impl Configuration {
    pub const CFG0: u8 = 1 << 1;
    pub const ECC_EN: u8 = 1 << 4;
    pub const LOT_EN: u8 = 1 << 5;
    pub const CFG1: u8 = 1 << 6;
    pub const CFG2: u8 = 1 << 7;
    const RESERVED_MASK: u8 = 0b0000_1101;

    pub fn from_byte(byte: u8) -> Self {
        Configuration {
            cfg0: byte & Self::CFG0 != 0,
            ecc_enabled: byte & Self::ECC_EN != 0,
            lot_en: byte & Self::LOT_EN != 0,
            cfg1: byte & Self::CFG1 != 0,
            cfg2: byte & Self::CFG2 != 0,
            reserved: byte & Self::RESERVED_MASK,
        }
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = self.reserved & Self::RESERVED_MASK;
        byte |= flag(self.cfg0, Self::CFG0);
        byte |= flag(self.ecc_enabled, Self::ECC_EN);
        byte |= flag(self.lot_en, Self::LOT_EN);
        byte |= flag(self.cfg1, Self::CFG1);
        byte |= flag(self.cfg2, Self::CFG2);
        byte
    }
}

/// Die select register (0xC0 on this part, shared with status)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DieSelect {
    pub ds0: bool,
    pub reserved: u8,
}

impl DieSelect {
    pub const DS0: u8 = 1 << 6;

    pub fn from_byte(byte: u8) -> Self {
        DieSelect {
            ds0: byte & Self::DS0 != 0,
            reserved: byte & !Self::DS0,
        }
    }

    pub fn to_byte(&self) -> u8 {
        (self.reserved & !Self::DS0) | flag(self.ds0, Self::DS0)
    }
}

fn flag(set: bool, bit: u8) -> u8 {
    if set {
        bit
    } else {
        0
    }
}
