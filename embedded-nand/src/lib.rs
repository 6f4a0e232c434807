#![no_std]
// Must be first to share macros across crate
pub(crate) mod fmt;

mod address;
pub mod iter;
pub use address::{ColumnAddress, RowAddress};

/// Value of the spare-area marker byte of a block condemned as bad
pub const BAD_BLOCK_MARK: u8 = 0x00;

pub trait NandFlashError {
    /// Convert a specific NAND flash error into a generic error kind
    fn kind(&self) -> NandFlashErrorKind;
}

/// A trait that NandFlash implementations can use to share an error type.
pub trait ErrorType {
    /// Errors returned by this NAND flash.
    type Error: NandFlashError + From<NandFlashErrorKind>;
}

/// NAND flash error kinds.
///
/// NAND flash implementations must map their error to those generic error kinds through the
/// [`NandFlashError`] trait. Layers above the driver narrow errors on these kinds only.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum NandFlashErrorKind {
    /// Row or column address outside the device geometry.
    OutOfBounds,

    /// Requested length runs past the end of the data + spare area.
    InvalidLength,

    /// The bus transfer itself failed.
    Transport,

    /// The operation's time budget ran out.
    Timeout,

    /// The device did not identify as a supported part.
    DeviceId,

    /// Read was successful but bit errors were corrected close to the limit.
    /// The page should be rewritten.
    EccRefresh,

    /// Read data could not be corrected.
    EccUncorrectable,

    /// The device reported a program failure.
    ProgramFail,

    /// The device reported an erase failure.
    EraseFail,

    /// Error specific to the implementation.
    Other,
}

/// Raw NAND flash addressed by row (block + page) and column.
///
/// This is the capability the flash translation layer adapter holds: any chip driver
/// (or an in-memory double such as [test::VirtualNandFlash]) implementing it can sit
/// underneath the adapters.
///
/// Implementations are not reentrant; `&mut self` serialises access to the chip.
pub trait NandFlash: ErrorType {
    /// Size of the data area of a page in bytes
    const PAGE_SIZE: usize;

    /// Size of the spare (out of band) area of a page in bytes
    const OOB_SIZE: usize;

    /// Number of pages in a block. Must be a power of two.
    const PAGES_PER_BLOCK: usize;

    /// Number of blocks
    const BLOCK_COUNT: usize;

    /// Size of data + spare area of a page
    const RAW_PAGE_SIZE: usize = Self::PAGE_SIZE + Self::OOB_SIZE;

    /// Column of the bad block marker: first byte of the spare area
    const BAD_BLOCK_MARKER_COLUMN: u16 = Self::PAGE_SIZE as u16;

    /// Bring the device up: reset, identify and apply the chip-wide configuration.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Read `buf.len()` bytes of page `row` starting at `column`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address or length is out of range, with no bus activity.
    /// The implementation can use [`check_row`], [`check_column`] and [`check_length`].
    fn page_read(
        &mut self,
        row: RowAddress,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Program `data` into page `row` starting at `column`. The page must be erased.
    fn page_program(
        &mut self,
        row: RowAddress,
        column: ColumnAddress,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Copy page `src` to page `dst` without transferring the data to the host.
    ///
    /// Source and destination must be reachable from the same on-chip cache register.
    fn page_copy(&mut self, src: RowAddress, dst: RowAddress) -> Result<(), Self::Error>;

    /// Erase the block containing `row`. The page part of `row` is ignored.
    fn block_erase(&mut self, row: RowAddress) -> Result<(), Self::Error>;

    /// Check the bad block marker of the block containing `row`.
    ///
    /// Read errors are returned unchanged; deciding what an unreadable marker means is
    /// up to the caller.
    fn block_is_bad(&mut self, row: RowAddress) -> Result<bool, Self::Error> {
        let row = row.with_page(0, Self::PAGES_PER_BLOCK as u32);
        let mut mark = [0xFF; 1];
        self.page_read(
            row,
            ColumnAddress::new(Self::BAD_BLOCK_MARKER_COLUMN),
            &mut mark,
        )?;
        Ok(mark[0] == BAD_BLOCK_MARK)
    }

    /// Write the bad block marker of the block containing `row`
    fn block_mark_bad(&mut self, row: RowAddress) -> Result<(), Self::Error> {
        let row = row.with_page(0, Self::PAGES_PER_BLOCK as u32);
        debug!("Marking block {} as bad", row.block(Self::PAGES_PER_BLOCK as u32));
        self.page_program(
            row,
            ColumnAddress::new(Self::BAD_BLOCK_MARKER_COLUMN),
            &[BAD_BLOCK_MARK],
        )
    }

    /// Check that every byte of data + spare area of page `row` is erased (0xFF).
    ///
    /// `scratch` must hold at least [NandFlash::RAW_PAGE_SIZE] bytes; it is clobbered.
    fn page_is_free(&mut self, row: RowAddress, scratch: &mut [u8]) -> Result<bool, Self::Error> {
        let scratch = scratch
            .get_mut(..Self::RAW_PAGE_SIZE)
            .ok_or(NandFlashErrorKind::InvalidLength)?;
        self.page_read(row, ColumnAddress::new(0), scratch)?;
        Ok(scratch
            .chunks(4)
            .all(|word| word.iter().all(|&b| b == 0xFF)))
    }

    /// Erase every block not marked bad.
    ///
    /// Stops at the first error from either the marker check or the erase.
    fn clear_all(&mut self) -> Result<(), Self::Error> {
        for row in self.block_iter(0) {
            if self.block_is_bad(row)? {
                warn!(
                    "Skipping bad block {}",
                    row.block(Self::PAGES_PER_BLOCK as u32)
                );
                continue;
            }
            self.block_erase(row)?;
        }
        Ok(())
    }

    /// Iterate over the first page of each block from `start`
    fn block_iter(&self, start: u32) -> iter::BlockIter {
        iter::BlockIter {
            pages_per_block: Self::PAGES_PER_BLOCK as u32,
            count: start,
            block_count: Self::BLOCK_COUNT as u32,
        }
    }

    /// Iterate over the pages of the block containing `row`
    fn page_iter(&self, row: RowAddress) -> iter::PageIter {
        let first = row.with_page(0, Self::PAGES_PER_BLOCK as u32);
        iter::PageIter {
            next: first,
            end: first.as_u32() + Self::PAGES_PER_BLOCK as u32,
        }
    }
}

/// Return whether a row address lies within the device geometry.
///
/// The page field of a packed row is always below the pages per block, so only the
/// block needs checking here. Use [`row_from_parts`] to validate separate fields.
pub fn check_row<T: NandFlash>(row: RowAddress) -> Result<(), NandFlashErrorKind> {
    if row.block(T::PAGES_PER_BLOCK as u32) >= T::BLOCK_COUNT as u32 {
        return Err(NandFlashErrorKind::OutOfBounds);
    }
    Ok(())
}

/// Pack a block and page into a row address, rejecting either field out of range.
pub fn row_from_parts<T: NandFlash>(block: u32, page: u32) -> Result<RowAddress, NandFlashErrorKind> {
    let ppb = T::PAGES_PER_BLOCK as u32;
    if page >= ppb || block >= T::BLOCK_COUNT as u32 {
        return Err(NandFlashErrorKind::OutOfBounds);
    }
    Ok(RowAddress::from_parts(block, page, ppb))
}

/// Return whether a column address lies within the data + spare area.
pub fn check_column<T: NandFlash>(column: ColumnAddress) -> Result<(), NandFlashErrorKind> {
    if column.as_u16() as usize >= T::RAW_PAGE_SIZE {
        return Err(NandFlashErrorKind::OutOfBounds);
    }
    Ok(())
}

/// Return whether `length` bytes starting at `column` fit in the data + spare area.
///
/// The column must already have passed [`check_column`].
pub fn check_length<T: NandFlash>(
    column: ColumnAddress,
    length: usize,
) -> Result<(), NandFlashErrorKind> {
    if length > T::RAW_PAGE_SIZE - column.as_u16() as usize {
        return Err(NandFlashErrorKind::InvalidLength);
    }
    Ok(())
}

/// Address, column and length checks shared by every page access
pub fn check_access<T: NandFlash>(
    row: RowAddress,
    column: ColumnAddress,
    length: usize,
) -> Result<(), NandFlashErrorKind> {
    check_row::<T>(row)?;
    check_column::<T>(column)?;
    check_length::<T>(column, length)
}
