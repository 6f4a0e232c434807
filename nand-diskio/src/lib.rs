#![no_std]
//! Sector level block device on top of a flash translation layer.
//!
//! One sector is one NAND page. The disk owns the page buffer the FTL works in and
//! lends it for every call.

// Must be first to share macros across crate
pub(crate) mod fmt;

use nand_ftl::{FlashTranslation, FtlNand, GC_RATIO};

/// Drive status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiskStatus {
    Ready,
    NotInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiskError {
    /// Unrecoverable error while accessing the flash
    #[error("Disk I/O error")]
    Error,
    /// Invalid argument
    #[error("Invalid parameter")]
    ParameterError,
    /// The drive has not been initialised
    #[error("Drive not ready")]
    NotReady,
}

/// Control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ioctl {
    /// Flush everything written to the flash
    Sync,
    GetSectorCount,
    GetSectorSize,
    /// Erase block size in sectors
    GetBlockSize,
    /// Drop the sectors `start..=end`
    Trim { start: u32, end: u32 },
    /// Any command code the drive does not know
    Other(u8),
}

/// Answer to an [Ioctl]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoctlData {
    None,
    SectorCount(u32),
    SectorSize(u16),
    BlockSize(u32),
}

/// Block device over a flash translation layer `T` with `N` byte sectors.
///
/// `N` must equal the page size of the NAND below the FTL, [NandDisk::initialize]
/// refuses to bring the drive up otherwise.
pub struct NandDisk<T, const N: usize> {
    ftl: T,
    page_buf: [u8; N],
    status: DiskStatus,
}

impl<T: FlashTranslation, const N: usize> NandDisk<T, N> {
    pub fn new(ftl: T) -> Self {
        NandDisk {
            ftl,
            page_buf: [0; N],
            status: DiskStatus::NotInitialized,
        }
    }

    pub fn ftl(&self) -> &T {
        &self.ftl
    }

    pub fn ftl_mut(&mut self) -> &mut T {
        &mut self.ftl
    }

    /// Bring up the NAND and the map.
    ///
    /// The drive is not ready until this returns `Ok`, also when re-initialising.
    /// Only a NAND failure is fatal. A map that cannot be resumed leaves the drive
    /// empty but usable.
    pub fn initialize(&mut self) -> Result<(), DiskError> {
        let page_size = self.ftl.nand().page_size();
        if page_size != N {
            error!("Sector size {} does not match page size {}", N, page_size);
            return Err(DiskError::ParameterError);
        }
        self.status = DiskStatus::NotInitialized;
        self.ftl.nand_mut().init().map_err(|e| {
            error!("NAND init failed: {:?}", e);
            DiskError::NotReady
        })?;
        self.ftl.init(&mut self.page_buf, GC_RATIO);
        if let Err(e) = self.ftl.resume(&mut self.page_buf) {
            info!("No map to resume ({:?}), starting empty", e);
        }
        self.status = DiskStatus::Ready;
        Ok(())
    }

    pub fn status(&self) -> DiskStatus {
        self.status
    }

    fn ensure_ready(&self) -> Result<(), DiskError> {
        match self.status {
            DiskStatus::Ready => Ok(()),
            DiskStatus::NotInitialized => Err(DiskError::NotReady),
        }
    }

    /// Read `count` sectors from `sector` into `buf`
    pub fn read(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<(), DiskError> {
        self.ensure_ready()?;
        let len = Self::span(sector, count)?;
        let buf = buf.get_mut(..len).ok_or(DiskError::ParameterError)?;
        for (i, chunk) in buf.chunks_exact_mut(N).enumerate() {
            let sector = sector + i as u32;
            self.ftl
                .read(&mut self.page_buf, sector, chunk)
                .map_err(|e| {
                    error!("Read of sector {} failed: {:?}", sector, e);
                    DiskError::Error
                })?;
        }
        Ok(())
    }

    /// Write `count` sectors from `buf` at `sector`
    pub fn write(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<(), DiskError> {
        self.ensure_ready()?;
        let len = Self::span(sector, count)?;
        let buf = buf.get(..len).ok_or(DiskError::ParameterError)?;
        for (i, chunk) in buf.chunks_exact(N).enumerate() {
            let sector = sector + i as u32;
            self.ftl
                .write(&mut self.page_buf, sector, chunk)
                .map_err(|e| {
                    error!("Write of sector {} failed: {:?}", sector, e);
                    DiskError::Error
                })?;
        }
        Ok(())
    }

    pub fn ioctl(&mut self, cmd: Ioctl) -> Result<IoctlData, DiskError> {
        self.ensure_ready()?;
        match cmd {
            Ioctl::Sync => {
                self.ftl.sync(&mut self.page_buf).map_err(|e| {
                    error!("Sync failed: {:?}", e);
                    DiskError::Error
                })?;
                Ok(IoctlData::None)
            }
            Ioctl::GetSectorCount => Ok(IoctlData::SectorCount(self.ftl.capacity())),
            Ioctl::GetSectorSize => Ok(IoctlData::SectorSize(N as u16)),
            Ioctl::GetBlockSize => Ok(IoctlData::BlockSize(self.ftl.nand().pages_per_block())),
            Ioctl::Trim { start, end } => {
                for sector in start..=end {
                    self.ftl.trim(&mut self.page_buf, sector).map_err(|e| {
                        error!("Trim of sector {} failed: {:?}", sector, e);
                        DiskError::Error
                    })?;
                }
                Ok(IoctlData::None)
            }
            Ioctl::Other(code) => {
                debug!("Unknown ioctl {}", code);
                Err(DiskError::ParameterError)
            }
        }
    }

    /// Bytes covered by `count` sectors from `sector`
    fn span(sector: u32, count: u32) -> Result<usize, DiskError> {
        sector
            .checked_add(count)
            .and_then(|_| (count as usize).checked_mul(N))
            .ok_or(DiskError::ParameterError)
    }
}
