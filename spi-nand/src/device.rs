use core::fmt::Debug;

use embedded_hal::{delay::DelayNs, spi::SpiDevice};
use embedded_nand::{check_access, check_row, ColumnAddress, ErrorType, NandFlash, RowAddress};

use crate::{cmd_blocking::SpiNandBlocking, error::SpiNandError, Clock, Timeout};

use super::JedecID;

/// Concrete type that implements all the flash device features.
///
/// This type is generic over the SPI peripheral, the flash device, the millisecond
/// clock that bounds every operation and the delay used while the chip settles.
/// The aim is to support a wide range of SPI NAND devices by implementing the
/// defacto standard commands in the [SpiNandBlocking] trait.
/// These are configurable to some extent by the [crate::SpiNand] trait, which also
/// defines the layout and identity of the device.
///
/// For overwriting specific commands, the functions in [SpiNandBlocking] should be
/// overwritten.
///
/// [SpiNandDevice] implements the [embedded_nand::NandFlash] trait, which is what the
/// flash translation layer adapter holds. Operations started through that trait use
/// the [crate::SpiNand::OPERATION_TIMEOUT_MS] budget; the `*_blocking` methods take
/// an explicit budget instead.
///
/// Addresses and lengths are validated before the first SPI transaction, so a rejected
/// call never touches the bus. The device is not reentrant: `&mut self` is the guard.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiNandDevice<SPI, D, CLK, DELAY, const N: usize> {
    pub spi: SPI,
    pub device: D,
    pub clock: CLK,
    pub delay: DELAY,
}
// Manually implement Debug to avoid bounds on SPI
// D must implement Debug, which should be fine as its just data
impl<SPI, D, CLK, DELAY, const N: usize> Debug for SpiNandDevice<SPI, D, CLK, DELAY, N>
where
    D: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpiNandDevice")
            .field("device", &self.device)
            .finish()
    }
}

impl<SPI, D, CLK, DELAY, const N: usize> SpiNandDevice<SPI, D, CLK, DELAY, N> {
    /// Create a new [SpiNandDevice] with the given SPI peripheral, flash device, clock and delay.
    pub fn new(spi: SPI, device: D, clock: CLK, delay: DELAY) -> Self {
        SpiNandDevice {
            spi,
            device,
            clock,
            delay,
        }
    }
}

impl<SPI, D, CLK, DELAY, const N: usize> SpiNandDevice<SPI, D, CLK, DELAY, N>
where
    SPI: SpiDevice,
    D: SpiNandBlocking<SPI, N>,
    CLK: Clock,
    DELAY: DelayNs,
{
    /// Reset, identify and configure the chip.
    ///
    /// Fails with [SpiNandError::DeviceId] if the chip is not the part described by `D`,
    /// in which case no register is written.
    pub fn init_blocking(&mut self) -> Result<(), SpiNandError<SPI::Error>> {
        let timeout = Timeout::new(&self.clock, D::OPERATION_TIMEOUT_MS);
        self.delay.delay_ms(D::RESET_DELAY_MS);
        debug!("Resetting device");
        self.device.reset(&mut self.spi, &timeout)?;
        self.delay.delay_ms(D::RESET_DELAY_MS);

        let id = self.device.read_jedec_id_cmd(&mut self.spi, &timeout)?;
        if id.manufacturer() != D::JEDEC_MANUFACTURER_ID || id.device() != D::JEDEC_DEVICE_ID {
            error!(
                "Unexpected device ID {:02X} {:02X}",
                id.manufacturer(),
                id.device()
            );
            return Err(SpiNandError::DeviceId);
        }
        debug!(
            "Found device {:02X} {:02X}",
            id.manufacturer(),
            id.device()
        );

        debug!("Unlocking all blocks");
        self.device.unlock_all_blocks(&mut self.spi, &timeout)?;
        debug!("Enabling ECC");
        self.device.enable_ecc(&mut self.spi, &timeout)
    }

    /// Get the Jedec ID of the flash device using blocking SPI
    pub fn jedec_blocking(&mut self, timeout_ms: u32) -> Result<JedecID, SpiNandError<SPI::Error>> {
        let timeout = Timeout::new(&self.clock, timeout_ms);
        self.device.read_jedec_id_cmd(&mut self.spi, &timeout)
    }

    /// Read `buf.len()` bytes of page `row` from `column` within `timeout_ms`.
    ///
    /// Returns [SpiNandError::EccRefresh] with `buf` filled when the page should be
    /// rewritten, and [SpiNandError::EccErr] with `buf` untouched when it is unreadable.
    pub fn page_read_blocking(
        &mut self,
        row: RowAddress,
        column: ColumnAddress,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        check_access::<Self>(row, column, buf.len())?;
        let timeout = Timeout::new(&self.clock, timeout_ms);
        self.device
            .read_page_slice(&mut self.spi, row, column, buf, &timeout)
    }

    /// Program `data` into page `row` from `column` within `timeout_ms`.
    /// The page must be erased before writing.
    pub fn page_program_blocking(
        &mut self,
        row: RowAddress,
        column: ColumnAddress,
        data: &[u8],
        timeout_ms: u32,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        check_access::<Self>(row, column, data.len())?;
        let timeout = Timeout::new(&self.clock, timeout_ms);
        self.device
            .write_page_slice(&mut self.spi, row, column, data, &timeout)
    }

    /// Copy page `src` to `dst` inside the chip.
    ///
    /// Both pages must be served by the same cache register (same plane); the
    /// supported single plane parts always satisfy this and it is not checked.
    pub fn page_copy_blocking(
        &mut self,
        src: RowAddress,
        dst: RowAddress,
        timeout_ms: u32,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        check_row::<Self>(src)?;
        check_row::<Self>(dst)?;
        let timeout = Timeout::new(&self.clock, timeout_ms);
        self.device.copy_page(&mut self.spi, src, dst, &timeout)
    }

    /// Erase the block containing `row`
    pub fn block_erase_blocking(
        &mut self,
        row: RowAddress,
        timeout_ms: u32,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let row = row.with_page(0, D::PAGES_PER_BLOCK);
        check_row::<Self>(row)?;
        let timeout = Timeout::new(&self.clock, timeout_ms);
        self.device.erase_block(&mut self.spi, row, &timeout)
    }
}

impl<SPI: SpiDevice, D, CLK, DELAY, const N: usize> ErrorType
    for SpiNandDevice<SPI, D, CLK, DELAY, N>
{
    type Error = SpiNandError<SPI::Error>;
}

impl<SPI, D, CLK, DELAY, const N: usize> NandFlash for SpiNandDevice<SPI, D, CLK, DELAY, N>
where
    SPI: SpiDevice,
    D: SpiNandBlocking<SPI, N>,
    CLK: Clock,
    DELAY: DelayNs,
{
    const PAGE_SIZE: usize = D::PAGE_SIZE as usize;
    const OOB_SIZE: usize = D::OOB_SIZE as usize;
    const PAGES_PER_BLOCK: usize = D::PAGES_PER_BLOCK as usize;
    const BLOCK_COUNT: usize = D::BLOCK_COUNT as usize;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.init_blocking()
    }

    fn page_read(
        &mut self,
        row: RowAddress,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        trace!(
            "Reading {} bytes from row {} column {}",
            buf.len(),
            row.as_u32(),
            column.as_u16()
        );
        self.page_read_blocking(row, column, buf, D::OPERATION_TIMEOUT_MS)
    }

    fn page_program(
        &mut self,
        row: RowAddress,
        column: ColumnAddress,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        trace!(
            "Programming {} bytes to row {} column {}",
            data.len(),
            row.as_u32(),
            column.as_u16()
        );
        self.page_program_blocking(row, column, data, D::OPERATION_TIMEOUT_MS)
    }

    fn page_copy(&mut self, src: RowAddress, dst: RowAddress) -> Result<(), Self::Error> {
        trace!("Copying row {} to row {}", src.as_u32(), dst.as_u32());
        self.page_copy_blocking(src, dst, D::OPERATION_TIMEOUT_MS)
    }

    fn block_erase(&mut self, row: RowAddress) -> Result<(), Self::Error> {
        trace!("Erasing block {}", row.block(D::PAGES_PER_BLOCK));
        self.block_erase_blocking(row, D::OPERATION_TIMEOUT_MS)
    }
}
