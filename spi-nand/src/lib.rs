#![no_std]
// Must be first to share macros across crate
pub(crate) mod fmt;

pub mod cmd_blocking;
mod device;
pub mod error;
pub mod register;
pub mod timeout;

pub use device::SpiNandDevice;
pub use timeout::{Clock, Timeout};

/// Core trait that a NAND flash device must implement.
///
/// Enables use of the [crate::cmd_blocking::SpiNandBlocking] trait.
///
/// At minimum requires the [SpiNand::PAGE_SIZE] generic, [SpiNand::OOB_SIZE],
/// [SpiNand::PAGES_PER_BLOCK], [SpiNand::BLOCK_COUNT] and the JEDEC identity constants
/// to define the size, layout and identity of the device.
///
/// Default command implementations in [crate::cmd_blocking::SpiNandBlocking] can be
/// overriden by changing the COMMAND and REGISTER constants.
pub trait SpiNand<const N: usize> {
    // Device layout
    /// The size of the data area of a page in bytes
    const PAGE_SIZE: u32 = N as u32;
    /// The size of the spare area of a page in bytes
    const OOB_SIZE: u32;
    /// The number of pages in a block. Must be a power of two.
    const PAGES_PER_BLOCK: u32;
    /// The number of blocks in the device
    const BLOCK_COUNT: u32;
    /// Data + spare area of a page
    const RAW_PAGE_SIZE: u32 = Self::PAGE_SIZE + Self::OOB_SIZE;

    // Identity
    /// Manufacturer byte returned by the read ID command
    const JEDEC_MANUFACTURER_ID: u8;
    /// Device byte returned by the read ID command
    const JEDEC_DEVICE_ID: u8;

    // Timing
    /// Budget of an operation started through [embedded_nand::NandFlash]
    const OPERATION_TIMEOUT_MS: u32 = 3000;
    /// Settle time around reset during init
    const RESET_DELAY_MS: u32 = 2;

    // Commands
    /// The command to reset the flash device
    const RESET_COMMAND: u8 = 0xFF;
    /// The command to read the JEDEC ID of the flash device
    const JEDEC_COMMAND: u8 = 0x9F;
    /// Command to write a feature register
    const SET_FEATURE_COMMAND: u8 = 0x1F;
    /// Command to read a feature register
    const GET_FEATURE_COMMAND: u8 = 0x0F;
    /// Command to read a page into the device cache register
    const PAGE_READ_COMMAND: u8 = 0x13;
    /// Command to read bytes from the device cache register
    const READ_FROM_CACHE_COMMAND: u8 = 0x03;
    /// Enable writing to the flash device, including erasing
    const WRITE_ENABLE_COMMAND: u8 = 0x06;
    /// Command to write bytes to the cache register, resetting current values (0xFF)
    const PROGRAM_LOAD_COMMAND: u8 = 0x02;
    /// Command to write bytes to the cache register, without resetting current values
    const PROGRAM_RANDOM_LOAD_COMMAND: u8 = 0x84;
    /// Command to program the cache register to a page
    const PROGRAM_EXECUTE_COMMAND: u8 = 0x10;
    /// Command to erase a block of flash memory
    const BLOCK_ERASE_COMMAND: u8 = 0xD8;

    // Feature registers
    const STATUS_REGISTER: u8 = 0xC0;
    const BLOCK_LOCK_REGISTER: u8 = 0xA0;
    const CONFIGURATION_REGISTER: u8 = 0xB0;
    const DIE_SELECT_REGISTER: u8 = 0xC0;
}

/// Possible ECC status values after performing a read operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ECCStatus {
    /// No errors detected, or 1-3 bits corrected
    Ok,
    /// Errors detected and corrected, data still good
    Corrected,
    /// Errors corrected close to the limit (4-8 bits), page should be rewritten
    Failing,
    /// Errors detected but not corrected
    Failed,
}

impl ECCStatus {
    /// Classify the 3-bit syndrome from the status register
    pub fn from_syndrome(syndrome: u8) -> Self {
        match syndrome & 0b111 {
            0 => ECCStatus::Ok,
            1 => ECCStatus::Corrected,
            3 | 5 => ECCStatus::Failing,
            _ => ECCStatus::Failed,
        }
    }

    /// Whether the data read from the cache can be trusted
    pub fn is_usable(&self) -> bool {
        !matches!(self, ECCStatus::Failed)
    }
}

/// The JEDEC identity of a flash device as returned by the read ID command
/// See https://www.jedec.org/standards-documents/docs/jep-106ab for a list of JEDEC IDs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JedecID {
    /// Manufacturer byte
    manufacturer: u8,
    /// Device byte
    device: u8,
}

impl JedecID {
    pub fn new(manufacturer: u8, device: u8) -> Self {
        JedecID {
            manufacturer,
            device,
        }
    }

    pub fn manufacturer(&self) -> u8 {
        self.manufacturer
    }

    pub fn device(&self) -> u8 {
        self.device
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for JedecID {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "JedecID(manufacturer: {:02X}, device: {:02X})",
            self.manufacturer,
            self.device
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecc_classification_is_exhaustive() {
        let expected = [
            ECCStatus::Ok,
            ECCStatus::Corrected,
            ECCStatus::Failed,
            ECCStatus::Failing,
            ECCStatus::Failed,
            ECCStatus::Failing,
            ECCStatus::Failed,
            ECCStatus::Failed,
        ];
        for (syndrome, status) in expected.iter().enumerate() {
            assert_eq!(ECCStatus::from_syndrome(syndrome as u8), *status);
        }
    }

    #[test]
    fn only_failed_is_unusable() {
        assert!(ECCStatus::Ok.is_usable());
        assert!(ECCStatus::Corrected.is_usable());
        assert!(ECCStatus::Failing.is_usable());
        assert!(!ECCStatus::Failed.is_usable());
    }
}
