use std::cell::RefCell;

use anyhow::{ensure, Result};

use crate::disk_format::{
    block::{Block, BlockNumber, BLOCK_SIZE, NUM_BLOCKS},
    superblock::Superblock,
};

use super::block_storage::BlockStorage;

/// A disk image held in memory.
pub struct MemoryStorage {
    blocks: RefCell<Vec<Block>>,
}

impl MemoryStorage {
    /// An image where every byte is zero, including the superblock.
    pub fn zeroed() -> Self {
        Self {
            blocks: RefCell::new(vec![[0; BLOCK_SIZE]; NUM_BLOCKS]),
        }
    }

    /// A freshly formatted image.
    pub fn formatted() -> Result<Self> {
        Self::with_superblock(&Superblock::new())
    }

    /// An image with zeroed data blocks and the given superblock.
    pub fn with_superblock(superblock: &Superblock) -> Result<Self> {
        let storage = Self::zeroed();
        storage.write_block(0, &superblock.to_block()?)?;

        Ok(storage)
    }
}

impl BlockStorage for MemoryStorage {
    fn read_block(&self, block_number: BlockNumber) -> Result<Block> {
        ensure!(block_number < NUM_BLOCKS, "block number out of bounds");

        Ok(self.blocks.borrow()[block_number])
    }

    fn write_block(&self, block_number: BlockNumber, block: &Block) -> Result<()> {
        ensure!(block_number < NUM_BLOCKS, "block number out of bounds");

        self.blocks.borrow_mut()[block_number] = *block;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_superblock() {
        let storage = MemoryStorage::formatted().unwrap();
        let superblock = Superblock::from_block(&storage.read_block(0).unwrap()).unwrap();

        assert_eq!(superblock, Superblock::new());
    }

    #[test]
    fn test_read_out_of_bounds_block() {
        let storage = MemoryStorage::zeroed();

        assert!(storage.read_block(NUM_BLOCKS - 1).is_ok());
        assert!(storage.read_block(NUM_BLOCKS).is_err());
        assert!(storage.write_block(NUM_BLOCKS, &[0; BLOCK_SIZE]).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let storage = MemoryStorage::zeroed();
        storage.write_block(3, &[0xfe; BLOCK_SIZE]).unwrap();

        assert_eq!(storage.read_block(3).unwrap(), [0xfe; BLOCK_SIZE]);
        assert_eq!(storage.read_block(4).unwrap(), [0; BLOCK_SIZE]);
    }
}
