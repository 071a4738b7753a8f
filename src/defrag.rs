//! Compaction of file extents toward the start of the disk.

use log::{debug, info};

use crate::{
    disk_format::block::{Extent, FIRST_DATA_BLOCK, NUM_BLOCKS, SUPERBLOCK_NUMBER, ZERO_BLOCK},
    error::FsError,
    filesystem::FileSystem,
    storage::BlockStorage,
};

impl<S: BlockStorage> FileSystem<S> {
    /// Moves every file down so that files occupy one unbroken run starting at the first data
    /// block, in their current on-disk order. Blocks past the run are zeroed and the free-space
    /// bitmap is rebuilt.
    ///
    /// Only start blocks change. Names, sizes, types, parents and file contents are preserved.
    pub fn defragment(&mut self) -> Result<(), FsError> {
        let mut files: Vec<_> = self
            .superblock
            .inodes
            .iter()
            .enumerate()
            .filter(|(_, inode)| inode.is_file())
            .map(|(index, inode)| (index, inode.extent()))
            .collect();

        // stable, so files with equal start blocks keep their slot order
        files.sort_by_key(|(_, extent)| extent.start);

        let mut cursor = FIRST_DATA_BLOCK;
        let mut moved = 0;
        for (index, extent) in files.iter_mut() {
            // an empty file after a full run stays put, since block 128 does not exist
            let past_end = extent.len == 0 && cursor == NUM_BLOCKS;
            if extent.start != cursor && !past_end {
                let destination = Extent::new(cursor, extent.len);
                debug!("moving slot {index} from {extent:?} to {destination:?}");

                // the destination never starts after the source, so copying forward is safe
                for (from, to) in extent.blocks().zip(destination.blocks()) {
                    let block = self.storage().read_block(from)?;
                    self.storage().write_block(to, &block)?;
                }

                self.superblock.inodes[*index].set_start_block(cursor);
                *extent = destination;
                moved += 1;
            }

            cursor += extent.len;
        }

        for block_number in cursor..NUM_BLOCKS {
            self.storage().write_block(block_number, &ZERO_BLOCK)?;
        }

        let free_space = &mut self.superblock.free_space;
        free_space.clear();
        free_space.set_used(SUPERBLOCK_NUMBER, true);
        for (_, extent) in &files {
            free_space.mark_extent(*extent, true);
        }

        info!(
            "defragmented {}: moved {moved} of {} files, {} blocks free",
            self.name(),
            files.len(),
            NUM_BLOCKS - cursor
        );

        self.save_superblock()
    }
}
