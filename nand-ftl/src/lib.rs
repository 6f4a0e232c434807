#![no_std]
// Must be first to share macros across crate
pub(crate) mod fmt;

mod adapter;
pub mod error;

pub use adapter::NandFtlAdapter;
pub use error::{FtlError, MapError};

/// Flat page number: the block number concatenated with the page within the block.
/// Numerically the same as the row address of the page.
pub type FtlPage = u32;

/// Erase block number
pub type FtlBlock = u32;

/// Garbage collection ratio handed to the flash translation layer at init
pub const GC_RATIO: u8 = 4;

/// The calls a flash translation layer makes into the NAND below it.
///
/// Implementations own whatever scratch space they need; calls are not reentrant.
pub trait FtlNand {
    /// Base-2 logarithm of the page size
    fn log2_page_size(&self) -> u8;

    /// Base-2 logarithm of the number of pages in an erase block
    fn log2_ppb(&self) -> u8;

    /// Total number of erase blocks
    fn num_blocks(&self) -> u32;

    fn page_size(&self) -> usize {
        1 << self.log2_page_size()
    }

    fn pages_per_block(&self) -> u32 {
        1 << self.log2_ppb()
    }

    /// Bring up the chip below
    fn init(&mut self) -> Result<(), FtlError>;

    /// Is the given block bad? A block that cannot be checked counts as bad.
    fn is_bad(&mut self, block: FtlBlock) -> bool;

    /// Mark the given block as bad, or attempt to.
    /// Nothing can be done about a failure, so none is reported.
    fn mark_bad(&mut self, block: FtlBlock);

    /// Erase the given block. A failed erase reports [FtlError::BadBlock].
    fn erase(&mut self, block: FtlBlock) -> Result<(), FtlError>;

    /// Program the given page from offset 0.
    /// Pages are programmed sequentially within a block and never reprogrammed.
    /// A failed program reports [FtlError::BadBlock].
    fn prog(&mut self, page: FtlPage, data: &[u8]) -> Result<(), FtlError>;

    /// Check the given page is erased. A page that cannot be read is not free.
    fn is_free(&mut self, page: FtlPage) -> bool;

    /// Read `data.len()` bytes of a page from `offset`.
    /// An uncorrectable read reports [FtlError::EccError].
    fn read(&mut self, page: FtlPage, offset: usize, data: &mut [u8]) -> Result<(), FtlError>;

    /// Read a page from one location and reprogram it in another, with ECC.
    fn copy(&mut self, src: FtlPage, dst: FtlPage) -> Result<(), FtlError>;
}

/// Map operations of a flash translation layer, sector in, sector out.
///
/// The page buffer is owned by the caller and lent for each call; it must hold at
/// least one page of the underlying [FtlNand].
pub trait FlashTranslation {
    type Nand: FtlNand;

    fn nand(&self) -> &Self::Nand;

    fn nand_mut(&mut self) -> &mut Self::Nand;

    /// Start from an empty map
    fn init(&mut self, page_buf: &mut [u8], gc_ratio: u8);

    /// Pick up the map persisted on the NAND
    fn resume(&mut self, page_buf: &mut [u8]) -> Result<(), MapError>;

    /// Number of sectors the map can hold
    fn capacity(&self) -> u32;

    fn read(&mut self, page_buf: &mut [u8], sector: u32, data: &mut [u8]) -> Result<(), MapError>;

    fn write(&mut self, page_buf: &mut [u8], sector: u32, data: &[u8]) -> Result<(), MapError>;

    /// Persist everything written so far
    fn sync(&mut self, page_buf: &mut [u8]) -> Result<(), MapError>;

    /// Drop the contents of a sector
    fn trim(&mut self, page_buf: &mut [u8], sector: u32) -> Result<(), MapError>;
}
