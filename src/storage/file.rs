use std::fs::File;
use std::os::unix::prelude::FileExt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::disk_format::block::{Block, BlockNumber, BLOCK_SIZE, DISK_SIZE};
use crate::disk_format::superblock::Superblock;

use super::block_storage::BlockStorage;

/// A disk image stored in a regular file.
pub struct FileBackedStorage(File);

impl FileBackedStorage {
    pub fn new(file: File) -> Self {
        FileBackedStorage(file)
    }

    /// Opens an existing image in read-write mode.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("unable to open {} in read-write mode", path.display()))?;

        Ok(Self::new(file))
    }

    /// Creates a formatted image: every block zeroed except the superblock, which marks only
    /// itself as used.
    pub fn create(path: &Path, overwrite: bool) -> Result<Self> {
        let mut options = File::options();
        options.read(true).write(true);

        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let file = options
            .open(path)
            .with_context(|| format!("unable to create {}", path.display()))?;
        file.set_len(DISK_SIZE as u64)
            .context("resizing disk image")?;

        let storage = Self::new(file);
        storage.write_block(0, &Superblock::new().to_block()?)?;

        Ok(storage)
    }
}

impl BlockStorage for FileBackedStorage {
    fn read_block(&self, block_number: BlockNumber) -> Result<Block> {
        let mut buf = [0; BLOCK_SIZE];
        let position = block_number * BLOCK_SIZE;

        self.0
            .read_exact_at(&mut buf, position as u64)
            .with_context(|| format!("reading block {block_number}"))?;

        Ok(buf)
    }

    fn write_block(&self, block_number: BlockNumber, block: &Block) -> Result<()> {
        let position = block_number * BLOCK_SIZE;

        self.0
            .write_all_at(block, position as u64)
            .with_context(|| format!("writing block {block_number}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::disk_format::block::NUM_BLOCKS;

    use super::*;

    #[test]
    fn test_create_formats_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk0");

        let storage = FileBackedStorage::create(&path, false).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), DISK_SIZE as u64);
        assert_eq!(storage.read_block(0).unwrap(), Superblock::new().to_block().unwrap());
        assert_eq!(storage.read_block(NUM_BLOCKS - 1).unwrap(), [0; BLOCK_SIZE]);
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk0");

        FileBackedStorage::create(&path, false).unwrap();
        assert!(FileBackedStorage::create(&path, false).is_err());
        assert!(FileBackedStorage::create(&path, true).is_ok());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk0");
        FileBackedStorage::create(&path, false).unwrap();

        let storage = FileBackedStorage::open(&path).unwrap();
        storage.write_block(42, &[0xab; BLOCK_SIZE]).unwrap();

        let reopened = FileBackedStorage::open(&path).unwrap();
        assert_eq!(reopened.read_block(42).unwrap(), [0xab; BLOCK_SIZE]);
        assert_eq!(reopened.read_block(41).unwrap(), [0; BLOCK_SIZE]);
    }

    #[test]
    fn test_short_image() {
        let file = tempfile::tempfile().unwrap();
        file.set_len(100).unwrap();

        let storage = FileBackedStorage::new(file);
        assert!(storage.read_block(0).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileBackedStorage::open(&dir.path().join("missing")).is_err());
    }
}
