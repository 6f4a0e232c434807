use embedded_nand::{
    row_from_parts, ColumnAddress, NandFlash, NandFlashError, NandFlashErrorKind, RowAddress,
};

use crate::{FtlBlock, FtlError, FtlNand, FtlPage};

/// Presents a [NandFlash] to a flash translation layer.
///
/// FTL page numbers are row addresses and FTL blocks are erase blocks, so translation
/// is a reinterpretation of the integer. Driver errors are narrowed to [FtlError] on
/// their [NandFlashErrorKind].
///
/// `S` is the size of the scratch buffer used by [FtlNand::is_free]; it must hold the
/// data and spare area of a page, which is checked at compile time.
pub struct NandFtlAdapter<F, const S: usize> {
    flash: F,
    scratch: [u8; S],
}

impl<F: NandFlash, const S: usize> NandFtlAdapter<F, S> {
    const SCRATCH_FITS_PAGE: () = assert!(
        S >= F::PAGE_SIZE + F::OOB_SIZE,
        "scratch buffer smaller than a raw page"
    );

    pub fn new(flash: F) -> Self {
        let () = Self::SCRATCH_FITS_PAGE;
        NandFtlAdapter {
            flash,
            scratch: [0xFF; S],
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    /// First page of `block`, or an error if the block is not on the chip
    fn block_row(block: FtlBlock) -> Result<RowAddress, FtlError> {
        row_from_parts::<F>(block, 0).map_err(|_| {
            debug!("Block {} out of range", block);
            FtlError::NoError
        })
    }
}

type Narrowing = &'static [(NandFlashErrorKind, FtlError)];

const ERASE_ERRORS: Narrowing = &[(NandFlashErrorKind::EraseFail, FtlError::BadBlock)];
const PROG_ERRORS: Narrowing = &[(NandFlashErrorKind::ProgramFail, FtlError::BadBlock)];
const READ_ERRORS: Narrowing = &[(NandFlashErrorKind::EccUncorrectable, FtlError::EccError)];
const COPY_ERRORS: Narrowing = &[
    (NandFlashErrorKind::EccUncorrectable, FtlError::EccError),
    (NandFlashErrorKind::ProgramFail, FtlError::BadBlock),
];

/// Narrow a driver error to what the FTL understands. Kinds not listed in `known`
/// become a failure without cause.
fn narrow<E: NandFlashError>(error: &E, known: Narrowing) -> FtlError {
    let kind = error.kind();
    known
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(FtlError::NoError, |(_, narrowed)| *narrowed)
}

impl<F: NandFlash, const S: usize> FtlNand for NandFtlAdapter<F, S> {
    fn log2_page_size(&self) -> u8 {
        F::PAGE_SIZE.trailing_zeros() as u8
    }

    fn log2_ppb(&self) -> u8 {
        F::PAGES_PER_BLOCK.trailing_zeros() as u8
    }

    fn num_blocks(&self) -> u32 {
        F::BLOCK_COUNT as u32
    }

    fn init(&mut self) -> Result<(), FtlError> {
        self.flash.init().map_err(|e| {
            debug!("NAND init failed: {:?}", e.kind());
            FtlError::NoError
        })
    }

    fn is_bad(&mut self, block: FtlBlock) -> bool {
        let Ok(row) = Self::block_row(block) else {
            return true;
        };
        match self.flash.block_is_bad(row) {
            Ok(bad) => bad,
            Err(e) => {
                debug!("Block {} unreadable ({:?}), treating as bad", block, e.kind());
                true
            }
        }
    }

    fn mark_bad(&mut self, block: FtlBlock) {
        let Ok(row) = Self::block_row(block) else {
            return;
        };
        if let Err(e) = self.flash.block_mark_bad(row) {
            debug!("Marking block {} bad failed: {:?}", block, e.kind());
        }
    }

    fn erase(&mut self, block: FtlBlock) -> Result<(), FtlError> {
        let row = Self::block_row(block)?;
        self.flash.block_erase(row).map_err(|e| {
            debug!("Erase of block {} failed: {:?}", block, e.kind());
            narrow(&e, ERASE_ERRORS)
        })
    }

    fn prog(&mut self, page: FtlPage, data: &[u8]) -> Result<(), FtlError> {
        self.flash
            .page_program(RowAddress::new(page), ColumnAddress::new(0), data)
            .map_err(|e| {
                debug!("Program of page {} failed: {:?}", page, e.kind());
                narrow(&e, PROG_ERRORS)
            })
    }

    fn is_free(&mut self, page: FtlPage) -> bool {
        self.flash
            .page_is_free(RowAddress::new(page), &mut self.scratch)
            .unwrap_or_else(|e| {
                debug!("Page {} unreadable ({:?}), not free", page, e.kind());
                false
            })
    }

    fn read(&mut self, page: FtlPage, offset: usize, data: &mut [u8]) -> Result<(), FtlError> {
        let column = u16::try_from(offset).map_err(|_| FtlError::NoError)?;
        self.flash
            .page_read(RowAddress::new(page), ColumnAddress::new(column), data)
            .map_err(|e| {
                debug!("Read of page {} failed: {:?}", page, e.kind());
                narrow(&e, READ_ERRORS)
            })
    }

    fn copy(&mut self, src: FtlPage, dst: FtlPage) -> Result<(), FtlError> {
        self.flash
            .page_copy(RowAddress::new(src), RowAddress::new(dst))
            .map_err(|e| {
                debug!("Copy of page {} to {} failed: {:?}", src, dst, e.kind());
                narrow(&e, COPY_ERRORS)
            })
    }
}
