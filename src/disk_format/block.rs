use std::mem::size_of;
use std::ops::Range;

/// size of a block in bytes
pub const BLOCK_SIZE: usize = 1024;

/// number of blocks on the disk, including the superblock
pub const NUM_BLOCKS: usize = 128;

/// The total size of a disk image in bytes.
pub const DISK_SIZE: usize = NUM_BLOCKS * BLOCK_SIZE;

/// The block holding the superblock.
pub const SUPERBLOCK_NUMBER: BlockNumber = 0;

/// The first block that can hold file data.
pub const FIRST_DATA_BLOCK: BlockNumber = 1;

pub type Block = [u8; BLOCK_SIZE];
const_assert!(size_of::<Block>() == BLOCK_SIZE);

pub const ZERO_BLOCK: Block = [0; BLOCK_SIZE];

// block numbers are stored as single bytes on disk, but we use `usize`s to avoid littering
// the code with casts.
pub type BlockNumber = usize;

/// A contiguous run of blocks occupied by one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    /// The first block of the run.
    pub start: BlockNumber,
    /// The number of blocks in the run.
    pub len: usize,
}

impl Extent {
    pub fn new(start: BlockNumber, len: usize) -> Self {
        Self { start, len }
    }

    /// The block numbers covered by this extent.
    pub fn blocks(&self) -> Range<BlockNumber> {
        self.start..self.start + self.len
    }

    /// The block number holding the `n`th block of the extent.
    pub fn nth(&self, n: usize) -> Option<BlockNumber> {
        (n < self.len).then_some(self.start + n)
    }
}
