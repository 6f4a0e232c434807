/// Outcome of a NAND call as the flash translation layer sees it.
///
/// Only bad blocks and ECC failures change what the FTL does next, every other cause
/// is folded into [FtlError::NoError]: the call failed, with no reason given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FtlError {
    /// Failed without a cause the FTL can act on
    #[error("NAND operation failed")]
    NoError,
    /// The block failed to program or erase and should be retired
    #[error("Bad block")]
    BadBlock,
    /// The page could not be read back correctly
    #[error("ECC error")]
    EccError,
}

/// Errors of the map operations of the flash translation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapError {
    #[error("NAND error: {0}")]
    Nand(#[from] FtlError),
    /// Too many bad blocks to keep going
    #[error("Too many bad blocks")]
    TooBad,
    /// A write failed and the journal needs recovery
    #[error("Journal recovery required")]
    Recover,
    #[error("Journal is full")]
    JournalFull,
    /// No valid checkpoint, or the sector was never written
    #[error("Not found")]
    NotFound,
    #[error("Map is full")]
    MapFull,
    #[error("Map is corrupt")]
    CorruptMap,
}
