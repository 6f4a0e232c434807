use core::fmt::Display;

/// Row address of a page: the block number packed above the page-in-block number.
///
/// The page occupies the low `log2(pages_per_block)` bits, the block the rest,
/// so the raw value is also the flat page index used by flash translation layers.
/// Geometry is passed in by the caller, the address itself stores only the raw value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowAddress(pub(crate) u32);

impl RowAddress {
    pub fn new(raw: u32) -> Self {
        RowAddress(raw)
    }

    /// Address of the first page of `block`.
    /// Packing wraps, bounds are checked by [crate::row_from_parts].
    pub fn from_block(block: u32, pages_per_block: u32) -> Self {
        RowAddress(block.wrapping_mul(pages_per_block))
    }

    pub fn from_parts(block: u32, page: u32, pages_per_block: u32) -> Self {
        RowAddress(block.wrapping_mul(pages_per_block).wrapping_add(page))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn block(&self, pages_per_block: u32) -> u32 {
        self.0 / pages_per_block
    }

    pub fn page(&self, pages_per_block: u32) -> u32 {
        self.0 % pages_per_block
    }

    /// Same block, different page
    pub fn with_page(&self, page: u32, pages_per_block: u32) -> Self {
        RowAddress::from_parts(self.block(pages_per_block), page, pages_per_block)
    }

    /// Address bytes in wire order (24 bit, MSB first)
    pub fn to_be_bytes(&self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    pub fn inc(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

impl From<RowAddress> for u32 {
    fn from(row: RowAddress) -> Self {
        row.as_u32()
    }
}

impl Display for RowAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Byte offset within the data + spare area of a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnAddress(pub(crate) u16);

impl ColumnAddress {
    pub fn new(address: u16) -> Self {
        ColumnAddress(address)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Column bytes in wire order. Only the low 12 bits are addressable.
    pub fn to_be_bytes(&self) -> [u8; 2] {
        [((self.0 >> 8) & 0x0F) as u8, self.0 as u8]
    }
}

impl From<ColumnAddress> for u16 {
    fn from(ca: ColumnAddress) -> Self {
        ca.as_u16()
    }
}

impl Display for ColumnAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}
