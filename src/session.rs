use std::path::Path;

use log::{info, warn};

use crate::{
    disk_format::{
        block::{Block, BLOCK_SIZE, ZERO_BLOCK},
        inode::{InodeIndex, InodeName, ROOT_INDEX},
    },
    error::FsError,
    filesystem::{FileSystem, Listing},
    storage::{BlockStorage, FileBackedStorage},
};

/// The state shared by every command: the mounted disk, if any, the current directory, and the
/// one-block I/O buffer.
///
/// The buffer outlives mounts; mounting only replaces the disk and returns to the root.
pub struct Session<S: BlockStorage = FileBackedStorage> {
    filesystem: Option<FileSystem<S>>,
    current_directory: InodeIndex,
    buffer: Block,
}

impl Session<FileBackedStorage> {
    /// Mounts the disk image at `path`.
    pub fn mount(&mut self, path: &Path) -> Result<(), FsError> {
        let disk = path.display().to_string();

        let storage = FileBackedStorage::open(path).map_err(|err| {
            warn!("{err:#}");
            FsError::DiskUnavailable { disk: disk.clone() }
        })?;

        self.mount_storage(&disk, storage)
    }
}

impl<S: BlockStorage> Session<S> {
    pub fn new() -> Self {
        Self {
            filesystem: None,
            current_directory: ROOT_INDEX,
            buffer: ZERO_BLOCK,
        }
    }

    /// Mounts `storage` under the name `disk`.
    ///
    /// The previous disk stays mounted unless the new one is readable and consistent.
    pub fn mount_storage(&mut self, disk: &str, storage: S) -> Result<(), FsError> {
        let filesystem = FileSystem::open(disk, storage)?;

        if let Some(previous) = self.filesystem.replace(filesystem) {
            info!("unmounted {}", previous.name());
        }
        self.current_directory = ROOT_INDEX;

        info!("mounted {disk}");
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.filesystem.is_some()
    }

    pub fn filesystem(&self) -> Option<&FileSystem<S>> {
        self.filesystem.as_ref()
    }

    /// The current directory's inode index, or [`ROOT_INDEX`].
    pub fn current_directory(&self) -> InodeIndex {
        self.current_directory
    }

    pub fn buffer(&self) -> &Block {
        &self.buffer
    }

    fn mounted(&self) -> Result<&FileSystem<S>, FsError> {
        self.filesystem.as_ref().ok_or(FsError::NotMounted)
    }

    fn mounted_mut(&mut self) -> Result<&mut FileSystem<S>, FsError> {
        self.filesystem.as_mut().ok_or(FsError::NotMounted)
    }

    /// Creates a file of `size` blocks, or a directory if `size` is zero, in the current
    /// directory.
    pub fn create(&mut self, name: InodeName, size: usize) -> Result<(), FsError> {
        let directory = self.current_directory;
        self.mounted_mut()?.create(directory, name, size)?;

        Ok(())
    }

    /// Deletes an entry of the current directory, recursively.
    pub fn delete(&mut self, name: InodeName) -> Result<(), FsError> {
        let directory = self.current_directory;
        self.mounted_mut()?.delete(directory, name)
    }

    /// Reads block `n` of a file in the current directory into the buffer.
    pub fn read(&mut self, name: InodeName, n: usize) -> Result<(), FsError> {
        let block = self.mounted()?.read_file_block(self.current_directory, name, n)?;
        self.buffer = block;

        Ok(())
    }

    /// Writes the buffer to block `n` of a file in the current directory.
    pub fn write(&self, name: InodeName, n: usize) -> Result<(), FsError> {
        self.mounted()?
            .write_file_block(self.current_directory, name, n, &self.buffer)
    }

    /// Replaces the buffer with `bytes`, zero-padded to a full block. Bytes beyond one block are
    /// ignored.
    pub fn set_buffer(&mut self, bytes: &[u8]) -> Result<(), FsError> {
        self.mounted()?;

        let len = bytes.len().min(BLOCK_SIZE);
        self.buffer = ZERO_BLOCK;
        self.buffer[..len].copy_from_slice(&bytes[..len]);

        Ok(())
    }

    /// Lists the current directory.
    pub fn list(&self) -> Result<Listing, FsError> {
        Ok(self.mounted()?.list(self.current_directory))
    }

    /// Changes the current directory. `.` stays put and `..` at the root stays at the root.
    pub fn change_directory(&mut self, name: InodeName) -> Result<(), FsError> {
        let filesystem = self.mounted()?;

        let directory = if name == InodeName::SELF {
            self.current_directory
        } else if name == InodeName::PARENT {
            filesystem.parent_of(self.current_directory)
        } else {
            filesystem.resolve_directory(self.current_directory, name)?
        };

        self.current_directory = directory;
        Ok(())
    }

    pub fn defragment(&mut self) -> Result<(), FsError> {
        self.mounted_mut()?.defragment()
    }
}

impl<S: BlockStorage> Default for Session<S> {
    fn default() -> Self {
        Self::new()
    }
}
