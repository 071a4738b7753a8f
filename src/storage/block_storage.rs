use anyhow::Result;

use crate::disk_format::block::{Block, BlockNumber};

/// Block-addressed storage for one disk image.
///
/// Implementations do no caching. Block numbers are validated by callers.
pub trait BlockStorage {
    fn read_block(&self, block_number: BlockNumber) -> Result<Block>;

    fn write_block(&self, block_number: BlockNumber, block: &Block) -> Result<()>;
}
