use std::fmt;
use std::io::{self, Write};

use log::{debug, info, warn};

use crate::{
    consistency::check_consistency,
    disk_format::{
        block::{Block, BlockNumber, SUPERBLOCK_NUMBER, ZERO_BLOCK},
        inode::{Inode, InodeIndex, InodeName, MAX_NAME_LEN, ROOT_INDEX},
        superblock::Superblock,
    },
    error::{EntryKind, FsError},
    storage::BlockStorage,
};

/// A mounted disk image: its storage, its name, and the in-memory copy of its superblock.
///
/// The in-memory superblock is the source of truth while mounted. Every operation that changes it
/// writes it back to block zero before returning, and an operation that fails leaves it untouched.
pub struct FileSystem<S: BlockStorage> {
    storage: S,
    name: String,
    pub(crate) superblock: Superblock,
}

impl<S: BlockStorage> FileSystem<S> {
    /// Reads the superblock of `storage` and checks it for consistency.
    pub fn open(name: &str, storage: S) -> Result<Self, FsError> {
        let block = storage.read_block(SUPERBLOCK_NUMBER).map_err(|err| {
            warn!("unable to read superblock of {name}: {err:#}");
            FsError::DiskUnavailable {
                disk: name.to_owned(),
            }
        })?;

        let superblock = Superblock::from_block(&block)?;

        if let Err(rule) = check_consistency(&superblock) {
            warn!("{name} violates consistency rule {}: {rule:?}", rule.code());
            return Err(FsError::Inconsistent {
                disk: name.to_owned(),
                rule,
            });
        }

        info!(
            "{name}: {} inodes in use, {} blocks in use",
            superblock.inodes.iter().filter(|i| i.is_used()).count(),
            superblock.free_space.count_used()
        );

        Ok(Self {
            storage,
            name: name.to_owned(),
            superblock,
        })
    }

    /// The name the disk was mounted under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn save_superblock(&self) -> Result<(), FsError> {
        let block = self.superblock.to_block()?;
        self.storage.write_block(SUPERBLOCK_NUMBER, &block)?;

        Ok(())
    }

    /// Finds the entry of `directory` called `name`, ignoring case.
    pub fn lookup(&self, directory: InodeIndex, name: &InodeName) -> Option<InodeIndex> {
        self.superblock
            .children_of(directory)
            .find(|&index| self.superblock.inodes[index].name.matches(name))
    }

    /// Creates a directory (`size == 0`) or a file of `size` zeroed blocks in `directory`.
    pub fn create(
        &mut self,
        directory: InodeIndex,
        name: InodeName,
        size: usize,
    ) -> Result<InodeIndex, FsError> {
        let index = self
            .superblock
            .first_free_inode()
            .ok_or_else(|| FsError::TableFull {
                disk: self.name.clone(),
                name,
            })?;

        if name.is_reserved() || self.lookup(directory, &name).is_some() {
            return Err(FsError::NameConflict { name });
        }

        let inode = if size == 0 {
            Inode::directory(name, directory)
        } else {
            let extent = self
                .superblock
                .free_space
                .find_contiguous(size)
                .ok_or_else(|| FsError::NoSpace {
                    disk: self.name.clone(),
                    size,
                })?;

            for block_number in extent.blocks() {
                self.storage.write_block(block_number, &ZERO_BLOCK)?;
            }
            self.superblock.free_space.mark_extent(extent, true);

            Inode::file(name, directory, extent)
        };

        debug!("created {inode:?} in slot {index}");
        self.superblock.inodes[index] = inode;
        self.save_superblock()?;

        Ok(index)
    }

    /// Deletes the entry of `directory` called `name`. Directories are deleted along with
    /// everything beneath them.
    pub fn delete(&mut self, directory: InodeIndex, name: InodeName) -> Result<(), FsError> {
        let index = self.lookup(directory, &name).ok_or(FsError::NotFound {
            name,
            expected: EntryKind::Any,
        })?;

        self.delete_inode(index)?;
        self.save_superblock()
    }

    /// Depth-first: children first, then the inode's own blocks, then the slot itself.
    fn delete_inode(&mut self, index: InodeIndex) -> Result<(), FsError> {
        let inode = self.superblock.inodes[index];
        if !inode.is_used() {
            return Ok(());
        }

        if inode.is_directory() {
            let children: Vec<_> = self.superblock.children_of(index).collect();
            for child in children {
                self.delete_inode(child)?;
            }
        } else {
            let extent = inode.extent();
            for block_number in extent.blocks() {
                self.storage.write_block(block_number, &ZERO_BLOCK)?;
            }
            self.superblock.free_space.mark_extent(extent, false);
        }

        debug!("deleted {inode:?} from slot {index}");
        self.superblock.inodes[index] = Inode::FREE;

        Ok(())
    }

    /// Resolves block `n` of the file called `name` in `directory`.
    fn file_block_number(
        &self,
        directory: InodeIndex,
        name: InodeName,
        n: usize,
    ) -> Result<BlockNumber, FsError> {
        let index = self.lookup(directory, &name).ok_or(FsError::NotFound {
            name,
            expected: EntryKind::File,
        })?;

        let inode = &self.superblock.inodes[index];
        if inode.is_directory() {
            return Err(FsError::WrongKind {
                name,
                expected: EntryKind::File,
            });
        }

        inode
            .extent()
            .nth(n)
            .ok_or(FsError::OutOfRange { name, block: n })
    }

    /// Reads block `n` of the file called `name` in `directory`.
    pub fn read_file_block(
        &self,
        directory: InodeIndex,
        name: InodeName,
        n: usize,
    ) -> Result<Block, FsError> {
        let block_number = self.file_block_number(directory, name, n)?;

        Ok(self.storage.read_block(block_number)?)
    }

    /// Overwrites block `n` of the file called `name` in `directory`.
    pub fn write_file_block(
        &self,
        directory: InodeIndex,
        name: InodeName,
        n: usize,
        block: &Block,
    ) -> Result<(), FsError> {
        let block_number = self.file_block_number(directory, name, n)?;

        Ok(self.storage.write_block(block_number, block)?)
    }

    /// The parent of `directory`. The root is its own parent.
    pub fn parent_of(&self, directory: InodeIndex) -> InodeIndex {
        if directory == ROOT_INDEX {
            ROOT_INDEX
        } else {
            self.superblock.inodes[directory].parent()
        }
    }

    /// The number of entries in `directory`, counting `.` and `..`.
    pub fn entry_count(&self, directory: InodeIndex) -> usize {
        self.superblock.children_of(directory).count() + 2
    }

    /// Resolves the subdirectory of `directory` called `name`.
    pub fn resolve_directory(
        &self,
        directory: InodeIndex,
        name: InodeName,
    ) -> Result<InodeIndex, FsError> {
        let index = self.lookup(directory, &name).ok_or(FsError::NotFound {
            name,
            expected: EntryKind::Directory,
        })?;

        if !self.superblock.inodes[index].is_directory() {
            return Err(FsError::WrongKind {
                name,
                expected: EntryKind::Directory,
            });
        }

        Ok(index)
    }

    /// Lists `directory`: `.`, `..`, then its entries in slot order.
    pub fn list(&self, directory: InodeIndex) -> Listing {
        let mut entries = vec![
            ListingEntry {
                name: InodeName::SELF,
                kind: ListingKind::Directory {
                    entries: self.entry_count(directory),
                },
            },
            ListingEntry {
                name: InodeName::PARENT,
                kind: ListingKind::Directory {
                    entries: self.entry_count(self.parent_of(directory)),
                },
            },
        ];

        entries.extend(self.superblock.children_of(directory).map(|index| {
            let inode = &self.superblock.inodes[index];
            let kind = if inode.is_directory() {
                ListingKind::Directory {
                    entries: self.entry_count(index),
                }
            } else {
                ListingKind::File {
                    blocks: inode.size(),
                }
            };

            ListingEntry {
                name: inode.name,
                kind,
            }
        }));

        Listing(entries)
    }
}

/// The contents of a directory, as reported by [`FileSystem::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing(pub Vec<ListingEntry>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: InodeName,
    pub kind: ListingKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingKind {
    /// A file and its size in blocks.
    File { blocks: usize },
    /// A directory and its entry count, including `.` and `..`.
    Directory { entries: usize },
}

impl ListingEntry {
    /// Writes the entry as one line, with the name bytes exactly as stored on disk.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let name = self.name.as_bytes();
        out.write_all(name)?;
        write!(out, "{:pad$}", "", pad = MAX_NAME_LEN.saturating_sub(name.len()))?;

        match self.kind {
            ListingKind::File { blocks } => writeln!(out, " {blocks:>3} KB"),
            ListingKind::Directory { entries } => writeln!(out, " {entries:>3}"),
        }
    }
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ListingKind::File { blocks } => write!(f, "{:<5} {:>3} KB", self.name, blocks),
            ListingKind::Directory { entries } => write!(f, "{:<5} {:>3}", self.name, entries),
        }
    }
}

impl Listing {
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.0.iter().try_for_each(|entry| entry.write_to(out))
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.0 {
            writeln!(f, "{entry}")?;
        }

        Ok(())
    }
}
