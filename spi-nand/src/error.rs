use core::fmt::Debug;
use embedded_nand::{NandFlashError, NandFlashErrorKind};

/// Error type for the SPI NAND driver.
///
/// It is generic over the SPI error type (SE), which allows for different SPI implementations.
/// Every driver operation returns one of these as a value; nothing is retried internally.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpiNandError<SE> {
    /// Error from the SPI peripheral
    #[error("SpiDevice error: {0}")]
    Transport(SE),
    /// The operation's time budget ran out
    #[error("Operation timed out")]
    Timeout,
    /// The chip did not identify as the supported part
    #[error("Unexpected device ID")]
    DeviceId,
    /// Row or column address outside the device geometry
    #[error("Address out of bounds")]
    BadAddress,
    /// Requested length runs past the end of the data + spare area
    #[error("Invalid length")]
    InvalidLen,
    /// Read was successful, but close to the correction limit.
    /// The page should be rewritten.
    #[error("Read corrected, page needs refresh")]
    EccRefresh,
    /// Read data could not be corrected
    #[error("Uncorrectable ECC error")]
    EccErr,
    /// Program failed.
    /// This can happen if the write is disabled, block is protected or the block has failed.
    #[error("Program failed")]
    ProgramFailed,
    /// Block Erase failed.
    /// This can happen if the block is protected, write is disabled or block has failed.
    #[error("Erase failed")]
    EraseFailed,
    /// Other error
    #[error("Other error. Should not happen")]
    Other,
}

// Convert from SPI error to more generic NandFlashError
impl<SE: Debug> NandFlashError for SpiNandError<SE> {
    fn kind(&self) -> NandFlashErrorKind {
        match self {
            SpiNandError::Transport(_) => NandFlashErrorKind::Transport,
            SpiNandError::Timeout => NandFlashErrorKind::Timeout,
            SpiNandError::DeviceId => NandFlashErrorKind::DeviceId,
            SpiNandError::BadAddress => NandFlashErrorKind::OutOfBounds,
            SpiNandError::InvalidLen => NandFlashErrorKind::InvalidLength,
            SpiNandError::EccRefresh => NandFlashErrorKind::EccRefresh,
            SpiNandError::EccErr => NandFlashErrorKind::EccUncorrectable,
            SpiNandError::ProgramFailed => NandFlashErrorKind::ProgramFail,
            SpiNandError::EraseFailed => NandFlashErrorKind::EraseFail,
            SpiNandError::Other => NandFlashErrorKind::Other,
        }
    }
}

// This impl is only for the helper check functions for auto conversion from errors
impl<SE> From<NandFlashErrorKind> for SpiNandError<SE> {
    fn from(kind: NandFlashErrorKind) -> Self {
        match kind {
            NandFlashErrorKind::OutOfBounds => SpiNandError::BadAddress,
            NandFlashErrorKind::InvalidLength => SpiNandError::InvalidLen,
            NandFlashErrorKind::Timeout => SpiNandError::Timeout,
            NandFlashErrorKind::DeviceId => SpiNandError::DeviceId,
            NandFlashErrorKind::EccRefresh => SpiNandError::EccRefresh,
            NandFlashErrorKind::EccUncorrectable => SpiNandError::EccErr,
            NandFlashErrorKind::ProgramFail => SpiNandError::ProgramFailed,
            NandFlashErrorKind::EraseFail => SpiNandError::EraseFailed,
            _ => SpiNandError::Other,
        }
    }
}
