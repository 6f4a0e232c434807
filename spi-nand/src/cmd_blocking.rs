use embedded_hal::spi::{Operation, SpiDevice};
use embedded_nand::{ColumnAddress, RowAddress};
use utils::{spi_transaction, spi_transfer_in_place, spi_write};

use crate::{
    error::SpiNandError,
    register::{BlockLock, Configuration, Status},
    Clock, ECCStatus, JedecID, SpiNand, Timeout,
};

/// Blocking SPI NAND flash trait.
/// Contains the low level, single SPI transaction commands.
///
/// Compound functions are provided for status polling and the read/program/copy/erase
/// sequences, including the required write enable, waiting and checking for errors.
///
/// Every function takes the [Timeout] of the operation it is part of. Each SPI
/// transaction is skipped if the budget is already spent, and reports
/// [SpiNandError::Timeout] if the budget ran out while it was on the bus.
///
/// The default implementations are fairly generic and should work for most SPI NAND flash devices.
/// Look to make changes to the [SpiNand] trait first to change the default behavior.
/// If this isn't possible, override the default function(s).
///
/// None of these functions validate addresses; that is done by [crate::SpiNandDevice]
/// before the first transaction.
pub trait SpiNandBlocking<SPI: SpiDevice, const N: usize>: SpiNand<N> {
    // ============= Commands =============

    /// Issue a reset command to the flash device
    fn reset_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::RESET_COMMAND], timeout)
    }

    /// Read the manufacturer and device ID.
    /// The ID bytes follow the command and one dummy byte.
    fn read_jedec_id_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<JedecID, SpiNandError<SPI::Error>> {
        let mut buf = [Self::JEDEC_COMMAND, 0, 0, 0];
        spi_transfer_in_place(spi, &mut buf, timeout)?;
        Ok(JedecID::new(buf[2], buf[3]))
    }

    /// Read a feature register
    fn get_feature_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        register: u8,
        timeout: &Timeout<'_, C>,
    ) -> Result<u8, SpiNandError<SPI::Error>> {
        let mut buf = [Self::GET_FEATURE_COMMAND, register, 0];
        spi_transfer_in_place(spi, &mut buf, timeout)?;
        Ok(buf[2])
    }

    /// Write a feature register
    fn set_feature_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        register: u8,
        value: u8,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::SET_FEATURE_COMMAND, register, value], timeout)
    }

    /// Enable writing to the flash device.
    /// Cleared by the chip after each program or erase.
    fn write_enable_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::WRITE_ENABLE_COMMAND], timeout)
    }

    /// Read a page into the device cache register
    fn page_read_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let [r0, r1, r2] = row.to_be_bytes();
        spi_write(spi, &[Self::PAGE_READ_COMMAND, r0, r1, r2], timeout)
    }

    /// Read bytes from the cache register starting from column address
    fn read_from_cache_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        column: ColumnAddress,
        buf: &mut [u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let [c0, c1] = column.to_be_bytes();
        spi_transaction(
            spi,
            &mut [
                Operation::Write(&[Self::READ_FROM_CACHE_COMMAND, c0, c1, 0]),
                Operation::Read(buf),
            ],
            timeout,
        )
    }

    /// Write bytes to the cache register
    ///
    /// This will reset the cache register to 0xFF
    ///
    /// Use [SpiNandBlocking::write_enable_cmd] to enable writing before this command
    ///
    /// Use [SpiNandBlocking::program_execute_cmd] to write the cache register to a page
    fn program_load_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        column: ColumnAddress,
        data: &[u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let [c0, c1] = column.to_be_bytes();
        spi_transaction(
            spi,
            &mut [
                Operation::Write(&[Self::PROGRAM_LOAD_COMMAND, c0, c1]),
                Operation::Write(data),
            ],
            timeout,
        )
    }

    /// Write bytes to the cache register without resetting it.
    ///
    /// An empty `data` leaves the cache as it is, which is how an internal page copy
    /// is done.
    fn program_random_load_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        column: ColumnAddress,
        data: &[u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let [c0, c1] = column.to_be_bytes();
        spi_transaction(
            spi,
            &mut [
                Operation::Write(&[Self::PROGRAM_RANDOM_LOAD_COMMAND, c0, c1]),
                Operation::Write(data),
            ],
            timeout,
        )
    }

    /// Write the cache register to a page
    ///
    /// Use [SpiNandBlocking::poll_until_ready] to wait for the write to complete
    /// and check the program fail bit of the returned status
    fn program_execute_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let [r0, r1, r2] = row.to_be_bytes();
        spi_write(spi, &[Self::PROGRAM_EXECUTE_COMMAND, r0, r1, r2], timeout)
    }

    /// Erase the block containing `row`
    fn block_erase_cmd<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let [r0, r1, r2] = row.to_be_bytes();
        spi_write(spi, &[Self::BLOCK_ERASE_COMMAND, r0, r1, r2], timeout)
    }

    // ============= Status functions ============

    /// Read and decode the status register
    fn read_status<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<Status, SpiNandError<SPI::Error>> {
        Ok(Status::from_byte(self.get_feature_cmd(
            spi,
            Self::STATUS_REGISTER,
            timeout,
        )?))
    }

    /// Read the status register until the operation in progress bit clears.
    ///
    /// Returns the first status with OIP clear. The whole loop shares `timeout` with
    /// the rest of the operation; it is never re-armed.
    fn poll_until_ready<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<Status, SpiNandError<SPI::Error>> {
        loop {
            let status = self.read_status(spi, timeout)?;
            if !status.oip {
                return Ok(status);
            }
            if timeout.expired() {
                warn!("Device still busy after {} ms", timeout.elapsed());
                return Err(SpiNandError::Timeout);
            }
        }
    }

    /// Clear every block protect bit
    fn unlock_all_blocks<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        self.set_feature_cmd(
            spi,
            Self::BLOCK_LOCK_REGISTER,
            BlockLock::UNLOCKED.to_byte(),
            timeout,
        )
    }

    /// Turn on the internal ECC engine
    fn enable_ecc<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let config = Configuration {
            ecc_enabled: true,
            ..Default::default()
        };
        self.set_feature_cmd(spi, Self::CONFIGURATION_REGISTER, config.to_byte(), timeout)
    }

    // ============= Compound functions =============

    /// Reset the device and wait until it is ready
    fn reset<C: Clock>(
        &self,
        spi: &mut SPI,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        self.reset_cmd(spi, timeout)?;
        self.poll_until_ready(spi, timeout)?;
        Ok(())
    }

    /// Load a page into the cache register and return its ECC outcome
    fn load_page<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        timeout: &Timeout<'_, C>,
    ) -> Result<ECCStatus, SpiNandError<SPI::Error>> {
        self.page_read_cmd(spi, row, timeout)?;
        let status = self.poll_until_ready(spi, timeout)?;
        Ok(status.ecc())
    }

    /// Read a slice of a page.
    ///
    /// An uncorrectable page fails with [SpiNandError::EccErr] before any data is read
    /// from the cache. A page that needs a refresh is read into `buf` and then reported
    /// as [SpiNandError::EccRefresh].
    fn read_page_slice<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        column: ColumnAddress,
        buf: &mut [u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let ecc = self.load_page(spi, row, timeout)?;
        if !ecc.is_usable() {
            return Err(SpiNandError::EccErr);
        }
        self.read_from_cache_cmd(spi, column, buf, timeout)?;
        match ecc {
            ECCStatus::Failing => Err(SpiNandError::EccRefresh),
            _ => Ok(()),
        }
    }

    /// Write a slice to a page
    ///
    /// The page must be erased first, unwritten bytes are left at 0xFF
    fn write_page_slice<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        column: ColumnAddress,
        data: &[u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        // Enable writing
        self.write_enable_cmd(spi, timeout)?;
        // Write to the cache register
        self.program_load_cmd(spi, column, data, timeout)?;
        // Write the cache register to the page
        self.program_execute_cmd(spi, row, timeout)?;
        // Wait for the write to complete and check if it failed
        if self.poll_until_ready(spi, timeout)?.program_fail {
            warn!("Program failed at row {}", row.as_u32());
            return Err(SpiNandError::ProgramFailed);
        }
        Ok(())
    }

    /// Copy a page to another through the cache register.
    ///
    /// Source and destination must be served by the same cache register (same plane).
    /// This is not checked.
    fn copy_page<C: Clock>(
        &self,
        spi: &mut SPI,
        src: RowAddress,
        dst: RowAddress,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        // Load the source page, the copy rewrites a page needing refresh anyway
        if !self.load_page(spi, src, timeout)?.is_usable() {
            return Err(SpiNandError::EccErr);
        }
        self.write_enable_cmd(spi, timeout)?;
        // Keep the cache contents
        self.program_random_load_cmd(spi, ColumnAddress::new(0), &[], timeout)?;
        self.program_execute_cmd(spi, dst, timeout)?;
        if self.poll_until_ready(spi, timeout)?.program_fail {
            warn!("Copy to row {} failed", dst.as_u32());
            return Err(SpiNandError::ProgramFailed);
        }
        Ok(())
    }

    /// Erase the block containing `row`
    fn erase_block<C: Clock>(
        &self,
        spi: &mut SPI,
        row: RowAddress,
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        // Enable writing
        self.write_enable_cmd(spi, timeout)?;
        // Erase the block
        self.block_erase_cmd(spi, row, timeout)?;
        // Wait for the erase to complete and check if it failed
        if self.poll_until_ready(spi, timeout)?.erase_fail {
            warn!("Erase failed at row {}", row.as_u32());
            return Err(SpiNandError::EraseFailed);
        }
        Ok(())
    }
}

pub mod utils {
    use embedded_hal::spi::{Operation, SpiDevice};

    use super::SpiNandError;
    use crate::{Clock, Timeout};

    /// Run one SPI transaction inside the budget of `timeout`.
    ///
    /// Nothing is sent if the budget is already spent. A transaction that finishes
    /// after the budget ran out is reported as a timeout.
    fn guarded<SE, C: Clock>(
        timeout: &Timeout<'_, C>,
        transfer: impl FnOnce() -> Result<(), SE>,
    ) -> Result<(), SpiNandError<SE>> {
        if timeout.expired() {
            return Err(SpiNandError::Timeout);
        }
        transfer().map_err(SpiNandError::Transport)?;
        if timeout.expired() {
            return Err(SpiNandError::Timeout);
        }
        Ok(())
    }

    /// Wrapper around [SpiDevice::write] that maps errors
    pub fn spi_write<SPI: SpiDevice, C: Clock>(
        spi: &mut SPI,
        buf: &[u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        guarded(timeout, || spi.write(buf))
    }

    /// Wrapper around [SpiDevice::transfer_in_place] that maps errors
    pub fn spi_transfer_in_place<SPI: SpiDevice, C: Clock>(
        spi: &mut SPI,
        buf: &mut [u8],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        guarded(timeout, || spi.transfer_in_place(buf))
    }

    /// Wrapper around [SpiDevice::transaction] that maps errors
    pub fn spi_transaction<SPI: SpiDevice, C: Clock>(
        spi: &mut SPI,
        operations: &mut [Operation<'_, u8>],
        timeout: &Timeout<'_, C>,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        guarded(timeout, || spi.transaction(operations))
    }
}
