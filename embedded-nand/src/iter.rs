use crate::RowAddress;

/// Iterate over the first-page row address of each block in nand flash
pub struct BlockIter {
    pub(crate) pages_per_block: u32,
    pub(crate) count: u32,
    pub(crate) block_count: u32,
}

impl Iterator for BlockIter {
    type Item = RowAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.count < self.block_count {
            let row = RowAddress::from_block(self.count, self.pages_per_block);
            self.count += 1;
            Some(row)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.block_count.saturating_sub(self.count) as usize;
        (remaining, Some(remaining))
    }
}

/// Iterate over the row addresses of the pages in one block
pub struct PageIter {
    pub(crate) next: RowAddress,
    pub(crate) end: u32,
}

impl Iterator for PageIter {
    type Item = RowAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.as_u32() < self.end {
            let row = self.next;
            self.next.inc();
            Some(row)
        } else {
            None
        }
    }
}
