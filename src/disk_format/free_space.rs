use std::fmt::{self, Debug};

use bitvec::prelude::*;

use super::block::{BlockNumber, NUM_BLOCKS, SUPERBLOCK_NUMBER};

/// The number of bytes occupied by the free-space bitmap.
pub const FREE_SPACE_MAP_SIZE: usize = NUM_BLOCKS / 8;
const_assert!(NUM_BLOCKS % 8 == 0);

/// The free-space bitmap at the start of the superblock.
///
/// The bit for block `n` lives in byte `n / 8` at bit position `7 - (n % 8)`, i.e. bits are
/// numbered most-significant first within each byte. A set bit means "used".
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FreeSpaceMap(BitArray<[u8; FREE_SPACE_MAP_SIZE], Msb0>);

impl FreeSpaceMap {
    /// A bitmap in which only the superblock is marked as used.
    pub fn new() -> Self {
        let mut map = Self::from_bytes([0; FREE_SPACE_MAP_SIZE]);
        map.set_used(SUPERBLOCK_NUMBER, true);
        map
    }

    pub fn from_bytes(bytes: [u8; FREE_SPACE_MAP_SIZE]) -> Self {
        Self(BitArray::new(bytes))
    }

    pub fn to_bytes(&self) -> [u8; FREE_SPACE_MAP_SIZE] {
        self.0.into_inner()
    }

    pub fn is_used(&self, block_number: BlockNumber) -> bool {
        self.0[block_number]
    }

    pub fn is_free(&self, block_number: BlockNumber) -> bool {
        !self.is_used(block_number)
    }

    pub fn set_used(&mut self, block_number: BlockNumber, used: bool) {
        self.0.set(block_number, used);
    }

    /// Marks every block as free, including the superblock.
    pub fn clear(&mut self) {
        self.0.fill(false);
    }

    /// The number of blocks marked as used.
    pub fn count_used(&self) -> usize {
        self.0.count_ones()
    }

    pub(crate) fn bits(&self) -> &BitSlice<u8, Msb0> {
        self.0.as_bitslice()
    }

    pub(crate) fn bits_mut(&mut self) -> &mut BitSlice<u8, Msb0> {
        self.0.as_mut_bitslice()
    }
}

impl Default for FreeSpaceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FreeSpaceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FreeSpaceMap")
            .field(&self.0.iter_ones().collect::<Vec<_>>())
            .finish()
    }
}
