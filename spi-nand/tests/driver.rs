mod sim;

use embedded_nand::{row_from_parts, ColumnAddress, NandFlash, NandFlashErrorKind, RowAddress};
use sim::{device, Device, BLOCK_COUNT, PAGES_PER_BLOCK, PAGE_SIZE, RAW_PAGE_SIZE};
use spi_nand::error::SpiNandError;

// Adds logging to the test automatically
// control with RUST_LOG="LEVEL"
// requires --features log passed to cargo test
use test_log::test;

const READ_FROM_CACHE: u8 = 0x03;
const SET_FEATURE: u8 = 0x1F;
const PROGRAM_EXECUTE: u8 = 0x10;
const BLOCK_ERASE: u8 = 0xD8;

fn row(block: u32, page: u32) -> RowAddress {
    RowAddress::from_parts(block, page, PAGES_PER_BLOCK)
}

fn ready() -> Device {
    let mut dev = device();
    dev.init_blocking().unwrap();
    dev.spi.clear_log();
    dev
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

#[test]
fn init_configures_chip() {
    let mut dev = device();
    dev.init_blocking().unwrap();
    assert_eq!(dev.spi.block_lock, 0x00);
    assert_eq!(dev.spi.configuration, 0x10);
    // Reset first, ID before any register write
    assert_eq!(dev.spi.opcodes.first(), Some(&0xFF));
    let id_at = dev.spi.opcodes.iter().position(|&op| op == 0x9F).unwrap();
    let first_set = dev
        .spi
        .opcodes
        .iter()
        .position(|&op| op == SET_FEATURE)
        .unwrap();
    assert!(id_at < first_set);
    assert_eq!(dev.spi.count(SET_FEATURE), 2);
}

#[test]
fn init_rejects_other_part() {
    let mut dev = device();
    dev.spi.device = 0x15;
    assert!(matches!(dev.init_blocking(), Err(SpiNandError::DeviceId)));
    assert_eq!(dev.spi.count(SET_FEATURE), 0);
    assert_eq!(dev.spi.block_lock, 0x38);
    assert_eq!(dev.spi.configuration, 0x00);
}

#[test]
fn read_id() {
    let mut dev = device();
    let id = dev.jedec_blocking(100).unwrap();
    assert_eq!(id.manufacturer(), 0x2C);
    assert_eq!(id.device(), 0x14);
}

#[test]
fn invalid_addresses_never_reach_the_bus() {
    let mut dev = ready();
    let mut buf = [0; 4];
    let outside = row(BLOCK_COUNT, 0);

    assert!(matches!(
        dev.page_read(outside, ColumnAddress::new(0), &mut buf),
        Err(SpiNandError::BadAddress)
    ));
    assert!(matches!(
        dev.page_program(outside, ColumnAddress::new(0), &buf),
        Err(SpiNandError::BadAddress)
    ));
    assert!(matches!(
        dev.page_read(row(0, 0), ColumnAddress::new(RAW_PAGE_SIZE as u16), &mut buf),
        Err(SpiNandError::BadAddress)
    ));
    assert!(matches!(
        dev.page_read(
            row(0, 0),
            ColumnAddress::new(RAW_PAGE_SIZE as u16 - 3),
            &mut buf
        ),
        Err(SpiNandError::InvalidLen)
    ));
    assert!(matches!(
        dev.block_erase(outside),
        Err(SpiNandError::BadAddress)
    ));
    assert!(matches!(
        dev.page_copy(row(0, 0), outside),
        Err(SpiNandError::BadAddress)
    ));
    assert_eq!(dev.spi.transactions, 0);

    assert_eq!(
        row_from_parts::<Device>(0, PAGES_PER_BLOCK),
        Err(NandFlashErrorKind::OutOfBounds)
    );
    assert_eq!(
        row_from_parts::<Device>(BLOCK_COUNT, 0),
        Err(NandFlashErrorKind::OutOfBounds)
    );
    assert_eq!(
        row_from_parts::<Device>(BLOCK_COUNT - 1, PAGES_PER_BLOCK - 1),
        Ok(row(BLOCK_COUNT - 1, PAGES_PER_BLOCK - 1))
    );
}

#[test]
fn program_then_read_round_trip() {
    let mut dev = ready();
    let data = pattern(RAW_PAGE_SIZE);
    dev.page_program(row(3, 5), ColumnAddress::new(0), &data)
        .unwrap();
    let mut out = vec![0; RAW_PAGE_SIZE];
    dev.page_read(row(3, 5), ColumnAddress::new(0), &mut out)
        .unwrap();
    assert_eq!(out, data);
    assert_eq!(dev.spi.page(row(3, 5).as_u32()), data);

    // Partial access in the middle of another page
    let data = pattern(100);
    dev.page_program(row(3, 6), ColumnAddress::new(1000), &data)
        .unwrap();
    let mut out = vec![0; 100];
    dev.page_read(row(3, 6), ColumnAddress::new(1000), &mut out)
        .unwrap();
    assert_eq!(out, data);
    assert!(dev.spi.page(row(3, 6).as_u32())[..1000]
        .iter()
        .all(|&b| b == 0xFF));
}

#[test]
fn page_is_free_after_erase_until_programmed() {
    let mut dev = ready();
    let mut scratch = vec![0; RAW_PAGE_SIZE];
    dev.spi.set_page(row(7, 3).as_u32(), &[0x12, 0x34]);
    dev.block_erase(row(7, 0)).unwrap();
    for page in dev.page_iter(row(7, 0)) {
        assert!(dev.page_is_free(page, &mut scratch).unwrap());
    }
    dev.page_program(row(7, 3), ColumnAddress::new(PAGE_SIZE as u16 + 10), &[0xFE])
        .unwrap();
    assert!(!dev.page_is_free(row(7, 3), &mut scratch).unwrap());
    assert!(dev.page_is_free(row(7, 4), &mut scratch).unwrap());
}

#[test]
fn mark_bad_then_is_bad() {
    let mut dev = ready();
    dev.block_erase(row(9, 0)).unwrap();
    assert!(!dev.block_is_bad(row(9, 0)).unwrap());
    dev.block_mark_bad(row(9, 17)).unwrap();
    assert!(dev.block_is_bad(row(9, 0)).unwrap());
    assert!(dev.block_is_bad(row(9, 40)).unwrap());
    assert_eq!(dev.spi.page(row(9, 0).as_u32())[PAGE_SIZE], 0x00);
    assert!(!dev.block_is_bad(row(10, 0)).unwrap());
}

#[test]
fn erase_is_block_granular() {
    let mut dev = ready();
    dev.spi.set_page(row(5, 0).as_u32(), &[0]);
    dev.spi.set_page(row(5, 33).as_u32(), &[0]);
    dev.spi.set_page(row(6, 0).as_u32(), &[0]);
    dev.block_erase(row(5, 33)).unwrap();
    assert_eq!(dev.spi.page(row(5, 0).as_u32())[0], 0xFF);
    assert_eq!(dev.spi.page(row(5, 33).as_u32())[0], 0xFF);
    assert_eq!(dev.spi.page(row(6, 0).as_u32())[0], 0x00);
}

#[test]
fn zero_budget_times_out_without_bus_activity() {
    let mut dev = ready();
    let mut buf = [0; 8];
    assert!(matches!(
        dev.page_read_blocking(row(1, 1), ColumnAddress::new(0), &mut buf, 0),
        Err(SpiNandError::Timeout)
    ));
    assert!(matches!(
        dev.block_erase_blocking(row(1, 0), 0),
        Err(SpiNandError::Timeout)
    ));
    assert_eq!(dev.spi.transactions, 0);
}

#[test]
fn stuck_chip_times_out_within_budget() {
    let mut dev = ready();
    dev.spi.stuck_busy = true;
    let start = dev.clock.now();
    let mut buf = [0; 8];
    assert!(matches!(
        dev.page_read_blocking(row(1, 1), ColumnAddress::new(0), &mut buf, 50),
        Err(SpiNandError::Timeout)
    ));
    let elapsed = dev.clock.now() - start;
    assert!(elapsed >= 50);
    assert!(elapsed <= 55, "took {elapsed} ms");
    assert_eq!(dev.spi.count(READ_FROM_CACHE), 0);
}

#[test]
fn budget_is_shared_across_steps() {
    let mut dev = ready();
    // Enough for the program to start, not for it to finish
    dev.spi.stuck_busy = true;
    assert!(matches!(
        dev.page_program_blocking(row(2, 0), ColumnAddress::new(0), &[1, 2], 20),
        Err(SpiNandError::Timeout)
    ));
    assert_eq!(dev.spi.count(PROGRAM_EXECUTE), 1);
    let polls = dev.spi.transactions - 3;
    // Each poll costs at least two ticks of the 20 ms budget
    assert!(polls <= 10, "{polls} polls");
}

#[test]
fn transport_errors_are_reported() {
    let mut dev = ready();
    dev.spi.transport_down = true;
    let mut buf = [0; 1];
    assert!(matches!(
        dev.page_read(row(0, 0), ColumnAddress::new(0), &mut buf),
        Err(SpiNandError::Transport(_))
    ));
}

#[test]
fn ecc_syndromes() {
    let mut dev = ready();
    let data = pattern(16);
    for block in 0..3 {
        dev.spi.set_page(row(block, 0).as_u32(), &data);
    }
    dev.spi.syndromes.insert(row(0, 0).as_u32(), 1);
    dev.spi.syndromes.insert(row(1, 0).as_u32(), 5);
    dev.spi.syndromes.insert(row(2, 0).as_u32(), 2);

    let mut out = vec![0; 16];
    dev.page_read(row(0, 0), ColumnAddress::new(0), &mut out)
        .unwrap();
    assert_eq!(out, data);

    // Data is returned along with the refresh hint
    let mut out = vec![0; 16];
    assert!(matches!(
        dev.page_read(row(1, 0), ColumnAddress::new(0), &mut out),
        Err(SpiNandError::EccRefresh)
    ));
    assert_eq!(out, data);

    dev.spi.clear_log();
    let mut out = vec![0; 16];
    assert!(matches!(
        dev.page_read(row(2, 0), ColumnAddress::new(0), &mut out),
        Err(SpiNandError::EccErr)
    ));
    assert_eq!(out, vec![0; 16]);
    assert_eq!(dev.spi.count(READ_FROM_CACHE), 0);
}

#[test]
fn copy_through_cache() {
    let mut dev = ready();
    let data = pattern(RAW_PAGE_SIZE);
    dev.spi.set_page(row(6, 1).as_u32(), &data);
    dev.page_copy(row(6, 1), row(6, 10)).unwrap();
    assert_eq!(dev.spi.page(row(6, 10).as_u32()), data);
    assert_eq!(dev.spi.count(0x84), 1);
    assert_eq!(dev.spi.count(READ_FROM_CACHE), 0);

    // A page needing refresh is still copied
    dev.spi.syndromes.insert(row(6, 1).as_u32(), 3);
    dev.page_copy(row(6, 1), row(6, 11)).unwrap();
    assert_eq!(dev.spi.page(row(6, 11).as_u32()), data);
}

#[test]
fn copy_of_unreadable_page_is_not_programmed() {
    let mut dev = ready();
    dev.spi.syndromes.insert(row(6, 1).as_u32(), 2);
    assert!(matches!(
        dev.page_copy(row(6, 1), row(6, 12)),
        Err(SpiNandError::EccErr)
    ));
    assert_eq!(dev.spi.count(PROGRAM_EXECUTE), 0);
}

#[test]
fn program_and_erase_failures() {
    let mut dev = ready();
    dev.spi.program_fail_blocks.insert(8);
    dev.spi.erase_fail_blocks.insert(8);
    assert!(matches!(
        dev.page_program(row(8, 2), ColumnAddress::new(0), &[0]),
        Err(SpiNandError::ProgramFailed)
    ));
    assert!(matches!(
        dev.page_copy(row(7, 2), row(8, 2)),
        Err(SpiNandError::ProgramFailed)
    ));
    assert!(matches!(
        dev.block_erase(row(8, 0)),
        Err(SpiNandError::EraseFailed)
    ));
}

#[test]
fn clear_all_skips_bad_blocks() {
    let mut dev = ready();
    dev.block_mark_bad(row(2, 0)).unwrap();
    dev.block_mark_bad(row(5, 0)).unwrap();
    dev.spi.set_page(row(3, 7).as_u32(), &[0]);
    dev.spi.clear_log();

    dev.clear_all().unwrap();
    assert_eq!(dev.spi.count(BLOCK_ERASE), BLOCK_COUNT as usize - 2);
    assert!(dev.block_is_bad(row(2, 0)).unwrap());
    assert!(dev.block_is_bad(row(5, 0)).unwrap());
    assert_eq!(dev.spi.page(row(3, 7).as_u32())[0], 0xFF);
}

#[test]
fn clear_all_stops_at_first_erase_failure() {
    let mut dev = ready();
    dev.spi.erase_fail_blocks.insert(4);
    assert!(matches!(dev.clear_all(), Err(SpiNandError::EraseFailed)));
    assert_eq!(dev.spi.count(BLOCK_ERASE), 5);
}

#[test]
fn clear_all_stops_at_first_unreadable_marker() {
    let mut dev = ready();
    dev.spi.syndromes.insert(row(3, 0).as_u32(), 7);
    assert!(matches!(dev.clear_all(), Err(SpiNandError::EccErr)));
    assert_eq!(dev.spi.count(BLOCK_ERASE), 3);
}
