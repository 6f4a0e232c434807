#![no_std]
//! Chip profiles for [spi_nand::SpiNandDevice].

pub mod micron;
