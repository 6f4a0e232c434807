//! Simulated SPI NAND chip for the driver tests.
//!
//! Decodes the command bytes of each transaction the way the silicon does: data
//! flows through a cache register, reads and programs take a few status polls to
//! finish, and erase/program failures or ECC syndromes can be injected per block or
//! per page. Every transaction is counted and its opcode logged.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, ErrorKind, Operation, SpiDevice};
use spi_nand::{cmd_blocking::SpiNandBlocking, Clock, SpiNand, SpiNandDevice};

pub const PAGE_SIZE: usize = 2048;
pub const OOB_SIZE: usize = 64;
pub const RAW_PAGE_SIZE: usize = PAGE_SIZE + OOB_SIZE;
pub const PAGES_PER_BLOCK: u32 = 64;
pub const BLOCK_COUNT: u32 = 1024;
pub const MANUFACTURER: u8 = 0x2C;
pub const DEVICE: u8 = 0x14;

/// Status polls a read, program or erase stays busy for
const BUSY_POLLS: u32 = 2;

/// Chip profile matching the simulated part
#[derive(Debug)]
pub struct TestChip;

impl SpiNand<PAGE_SIZE> for TestChip {
    const OOB_SIZE: u32 = OOB_SIZE as u32;
    const PAGES_PER_BLOCK: u32 = PAGES_PER_BLOCK;
    const BLOCK_COUNT: u32 = BLOCK_COUNT;
    const JEDEC_MANUFACTURER_ID: u8 = MANUFACTURER;
    const JEDEC_DEVICE_ID: u8 = DEVICE;
}

impl<SPI: SpiDevice> SpiNandBlocking<SPI, PAGE_SIZE> for TestChip {}

pub type Device = SpiNandDevice<SimChip, TestChip, FakeClock, NoDelay, PAGE_SIZE>;

/// A device on a fresh chip, not yet initialised
pub fn device() -> Device {
    SpiNandDevice::new(SimChip::new(), TestChip, FakeClock::new(1), NoDelay)
}

/// Clock advancing by `tick` milliseconds each time it is read
pub struct FakeClock {
    now: Cell<u32>,
    tick: u32,
}

impl FakeClock {
    pub fn new(tick: u32) -> Self {
        FakeClock {
            now: Cell::new(0),
            tick,
        }
    }

    pub fn now(&self) -> u32 {
        self.now.get()
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.tick));
        now
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub struct SimChip {
    pub manufacturer: u8,
    pub device: u8,
    pages: HashMap<u32, Vec<u8>>,
    cache: Vec<u8>,
    busy_polls: u32,
    wel: bool,
    erase_fail: bool,
    program_fail: bool,
    ecc_syndrome: u8,
    pub block_lock: u8,
    pub configuration: u8,
    /// Never finish an operation
    pub stuck_busy: bool,
    /// Fail every transaction at the transport level
    pub transport_down: bool,
    pub erase_fail_blocks: HashSet<u32>,
    pub program_fail_blocks: HashSet<u32>,
    /// ECC syndrome reported after loading a given row
    pub syndromes: HashMap<u32, u8>,
    pub transactions: usize,
    /// First byte of every transaction, in order
    pub opcodes: Vec<u8>,
    command: Vec<u8>,
}

impl SimChip {
    pub fn new() -> Self {
        SimChip {
            manufacturer: MANUFACTURER,
            device: DEVICE,
            pages: HashMap::new(),
            cache: vec![0xFF; RAW_PAGE_SIZE],
            busy_polls: 0,
            wel: false,
            erase_fail: false,
            program_fail: false,
            ecc_syndrome: 0,
            // Locked at power up
            block_lock: 0x38,
            configuration: 0x00,
            stuck_busy: false,
            transport_down: false,
            erase_fail_blocks: HashSet::new(),
            program_fail_blocks: HashSet::new(),
            syndromes: HashMap::new(),
            transactions: 0,
            opcodes: Vec::new(),
            command: Vec::new(),
        }
    }

    /// Raw data + spare contents of a page
    pub fn page(&self, row: u32) -> Vec<u8> {
        self.pages
            .get(&row)
            .cloned()
            .unwrap_or_else(|| vec![0xFF; RAW_PAGE_SIZE])
    }

    /// Store raw contents directly, bypassing the command set
    pub fn set_page(&mut self, row: u32, data: &[u8]) {
        let mut page = vec![0xFF; RAW_PAGE_SIZE];
        page[..data.len()].copy_from_slice(data);
        self.pages.insert(row, page);
    }

    pub fn count(&self, opcode: u8) -> usize {
        self.opcodes.iter().filter(|&&op| op == opcode).count()
    }

    pub fn clear_log(&mut self) {
        self.transactions = 0;
        self.opcodes.clear();
    }

    fn status(&self) -> u8 {
        let mut status = (self.ecc_syndrome & 0b111) << 4;
        if self.stuck_busy || self.busy_polls > 0 {
            status |= 0x01;
        }
        if self.wel {
            status |= 0x02;
        }
        if self.erase_fail {
            status |= 0x04;
        }
        if self.program_fail {
            status |= 0x08;
        }
        status
    }

    fn row(&self) -> u32 {
        (self.command[1] as u32) << 16 | (self.command[2] as u32) << 8 | self.command[3] as u32
    }

    fn column(&self) -> usize {
        ((self.command[1] as usize & 0x0F) << 8) | self.command[2] as usize
    }

    /// Shift one byte in, return the byte shifted out
    fn clock_byte(&mut self, mosi: u8) -> u8 {
        let index = self.command.len();
        self.command.push(mosi);
        match (self.command[0], index) {
            (0x9F, 2) => self.manufacturer,
            (0x9F, 3) => self.device,
            (0x0F, 2) => match self.command[1] {
                0xC0 => {
                    let status = self.status();
                    self.busy_polls = self.busy_polls.saturating_sub(1);
                    status
                }
                0xA0 => self.block_lock,
                0xB0 => self.configuration,
                _ => 0,
            },
            (0x03, i) if i >= 4 => {
                let column = self.column() + i - 4;
                self.cache.get(column).copied().unwrap_or(0xFF)
            }
            _ => 0,
        }
    }

    /// Chip select released: act on the complete command
    fn finish(&mut self) {
        match self.command[0] {
            0xFF => {
                self.wel = false;
                self.erase_fail = false;
                self.program_fail = false;
                self.ecc_syndrome = 0;
                self.busy_polls = BUSY_POLLS;
            }
            0x1F if self.command.len() >= 3 => match self.command[1] {
                0xA0 => self.block_lock = self.command[2],
                0xB0 => self.configuration = self.command[2],
                _ => {}
            },
            0x06 => self.wel = true,
            0x13 => {
                let row = self.row();
                self.cache = self.page(row);
                self.ecc_syndrome = self.syndromes.get(&row).copied().unwrap_or(0);
                self.busy_polls = BUSY_POLLS;
            }
            0x02 | 0x84 => {
                if self.command[0] == 0x02 {
                    self.cache.fill(0xFF);
                }
                let column = self.column();
                for (i, b) in self.command[3..].iter().enumerate() {
                    if let Some(c) = self.cache.get_mut(column + i) {
                        *c = *b;
                    }
                }
            }
            0x10 => {
                let row = self.row();
                let block = row / PAGES_PER_BLOCK;
                self.program_fail = !self.wel
                    || self.block_lock != 0
                    || self.program_fail_blocks.contains(&block);
                if !self.program_fail {
                    let mut page = self.page(row);
                    page.iter_mut()
                        .zip(self.cache.iter())
                        .for_each(|(p, c)| *p &= *c);
                    self.pages.insert(row, page);
                }
                self.wel = false;
                self.busy_polls = BUSY_POLLS;
            }
            0xD8 => {
                let block = self.row() / PAGES_PER_BLOCK;
                self.erase_fail =
                    !self.wel || self.block_lock != 0 || self.erase_fail_blocks.contains(&block);
                if !self.erase_fail {
                    self.pages.retain(|row, _| row / PAGES_PER_BLOCK != block);
                }
                self.wel = false;
                self.busy_polls = BUSY_POLLS;
            }
            _ => {}
        }
        self.command.clear();
    }
}

impl spi::ErrorType for SimChip {
    type Error = ErrorKind;
}

impl SpiDevice for SimChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.transport_down {
            return Err(ErrorKind::Other);
        }
        self.transactions += 1;
        self.command.clear();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(buf) => {
                    for b in buf.iter() {
                        self.clock_byte(*b);
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.clock_byte(0x00);
                    }
                }
                Operation::Transfer(read, write) => {
                    for i in 0..read.len().max(write.len()) {
                        let miso = self.clock_byte(write.get(i).copied().unwrap_or(0x00));
                        if let Some(r) = read.get_mut(i) {
                            *r = miso;
                        }
                    }
                }
                Operation::TransferInPlace(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.clock_byte(*b);
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }
        if let Some(&opcode) = self.command.first() {
            self.opcodes.push(opcode);
            self.finish();
        }
        Ok(())
    }
}
