use anyhow::{anyhow, Context, Result};

use super::{
    block::{Block, BLOCK_SIZE},
    free_space::{FreeSpaceMap, FREE_SPACE_MAP_SIZE},
    inode::{Inode, InodeIndex, INODE_SIZE, NUM_INODES},
};

const_assert!(FREE_SPACE_MAP_SIZE + NUM_INODES * INODE_SIZE == BLOCK_SIZE);

/// The contents of block zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    /// Tracks the allocation status of blocks.
    pub free_space: FreeSpaceMap,
    /// The inode table.
    pub inodes: [Inode; NUM_INODES],
}

impl Superblock {
    /// The superblock of a freshly formatted disk: no inodes, only block zero in use.
    pub fn new() -> Self {
        Self {
            free_space: FreeSpaceMap::new(),
            inodes: [Inode::FREE; NUM_INODES],
        }
    }

    /// Decodes a superblock. Every byte is preserved, consistent or not.
    pub fn from_block(block: &Block) -> Result<Self> {
        let (bitmap_bytes, inode_bytes) = block.split_at(FREE_SPACE_MAP_SIZE);

        let free_space = FreeSpaceMap::from_bytes(
            bitmap_bytes
                .try_into()
                .context("parsing free space map")?,
        );

        let inodes = inode_bytes
            .chunks_exact(INODE_SIZE)
            .map(|bytes| bincode::deserialize::<Inode>(bytes).context("parsing inode"))
            .collect::<Result<Vec<_>>>()?
            .try_into()
            .map_err(|inodes: Vec<Inode>| {
                anyhow!("expected {NUM_INODES} inodes, found {}", inodes.len())
            })?;

        Ok(Self { free_space, inodes })
    }

    /// Encodes the superblock into exactly one block.
    pub fn to_block(&self) -> Result<Block> {
        let block = [
            self.free_space.to_bytes().to_vec(),
            serialize_inodes(&self.inodes)?,
        ]
        .concat();

        block
            .try_into()
            .map_err(|block: Vec<u8>| anyhow!("superblock encoded to {} bytes", block.len()))
    }

    /// Indices of the used inodes whose parent is `parent`, in ascending order.
    pub fn children_of(&self, parent: InodeIndex) -> impl Iterator<Item = InodeIndex> + '_ {
        self.inodes
            .iter()
            .enumerate()
            .filter(move |(_, inode)| inode.is_child_of(parent))
            .map(|(index, _)| index)
    }

    /// The first unused inode slot.
    pub fn first_free_inode(&self) -> Option<InodeIndex> {
        self.inodes.iter().position(|inode| !inode.is_used())
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a slice of inodes.
fn serialize_inodes(inodes: &[Inode]) -> Result<Vec<u8>> {
    Ok(inodes
        .iter()
        .map(|inode| bincode::serialize(inode).context("serializing inode"))
        .collect::<Result<Vec<_>>>()?
        .concat())
}
