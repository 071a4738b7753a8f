use std::fmt::{self, Debug};
use std::mem::size_of;

use anyhow::ensure;
use serde::{Deserialize, Serialize};

use super::block::{BlockNumber, Extent};

/// The number of bytes occupied by an inode.
pub const INODE_SIZE: usize = 8;
const_assert!(size_of::<Inode>() == INODE_SIZE);

/// The number of inode slots in the superblock.
pub const NUM_INODES: usize = 126;

/// The parent index denoting the root directory, which has no inode slot.
pub const ROOT_INDEX: InodeIndex = 127;

/// A parent index that never refers to a valid directory.
pub const RESERVED_INDEX: InodeIndex = 126;

/// The number of bytes in an inode name.
pub const MAX_NAME_LEN: usize = 5;
const_assert!(size_of::<InodeName>() == MAX_NAME_LEN);

// inode indices fit in 7 bits on disk
pub type InodeIndex = usize;

/// bit 7 of `used_size`
const USED_MASK: u8 = 0x80;
/// bits 0-6 of `used_size`
const SIZE_MASK: u8 = 0x7f;
/// bit 7 of `dir_parent`
const DIRECTORY_MASK: u8 = 0x80;
/// bits 0-6 of `dir_parent`
const PARENT_MASK: u8 = 0x7f;

/// An inode slot, exactly as laid out on disk.
///
/// Two of the bytes pack two fields each; they are only accessed through the accessor methods
/// below so that the bit layout stays explicit.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Inode {
    /// The name of the file or directory.
    pub name: InodeName,
    /// bit 7: in use; bits 0-6: size in blocks
    used_size: u8,
    /// The first block of a file's extent. Zero for directories.
    start_block: u8,
    /// bit 7: is a directory; bits 0-6: index of the parent inode
    dir_parent: u8,
}

impl Inode {
    /// An unused inode slot. Every byte is zero.
    pub const FREE: Inode = Inode {
        name: InodeName([0; MAX_NAME_LEN]),
        used_size: 0,
        start_block: 0,
        dir_parent: 0,
    };

    /// A used directory inode.
    pub fn directory(name: InodeName, parent: InodeIndex) -> Self {
        let mut inode = Self::FREE;
        inode.name = name;
        inode.set_used(true);
        inode.set_directory(true);
        inode.set_parent(parent);
        inode
    }

    /// A used file inode occupying `extent`.
    pub fn file(name: InodeName, parent: InodeIndex, extent: Extent) -> Self {
        let mut inode = Self::FREE;
        inode.name = name;
        inode.set_used(true);
        inode.set_size(extent.len);
        inode.set_start_block(extent.start);
        inode.set_parent(parent);
        inode
    }

    /// Builds an inode from its four raw fields.
    pub fn from_raw(
        name: [u8; MAX_NAME_LEN],
        used_size: u8,
        start_block: u8,
        dir_parent: u8,
    ) -> Self {
        Self {
            name: InodeName(name),
            used_size,
            start_block,
            dir_parent,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_size & USED_MASK != 0
    }

    pub fn set_used(&mut self, used: bool) {
        if used {
            self.used_size |= USED_MASK;
        } else {
            self.used_size &= SIZE_MASK;
        }
    }

    /// The file size in blocks.
    pub fn size(&self) -> usize {
        (self.used_size & SIZE_MASK) as usize
    }

    pub fn set_size(&mut self, size: usize) {
        self.used_size = (self.used_size & USED_MASK) | (size as u8 & SIZE_MASK);
    }

    pub fn start_block(&self) -> BlockNumber {
        self.start_block as BlockNumber
    }

    pub fn set_start_block(&mut self, start_block: BlockNumber) {
        self.start_block = start_block as u8;
    }

    pub fn is_directory(&self) -> bool {
        self.dir_parent & DIRECTORY_MASK != 0
    }

    pub fn set_directory(&mut self, is_directory: bool) {
        if is_directory {
            self.dir_parent |= DIRECTORY_MASK;
        } else {
            self.dir_parent &= PARENT_MASK;
        }
    }

    /// The index of the parent inode, or [`ROOT_INDEX`].
    pub fn parent(&self) -> InodeIndex {
        (self.dir_parent & PARENT_MASK) as InodeIndex
    }

    pub fn set_parent(&mut self, parent: InodeIndex) {
        self.dir_parent = (self.dir_parent & DIRECTORY_MASK) | (parent as u8 & PARENT_MASK);
    }

    /// Whether this is a used, non-directory inode.
    pub fn is_file(&self) -> bool {
        self.is_used() && !self.is_directory()
    }

    /// Whether this is a used inode whose parent is `parent`.
    pub fn is_child_of(&self, parent: InodeIndex) -> bool {
        self.is_used() && self.parent() == parent
    }

    /// The blocks occupied by this inode. Empty for directories.
    pub fn extent(&self) -> Extent {
        Extent::new(self.start_block(), self.size())
    }

    /// Whether all eight bytes are zero.
    pub fn is_zeroed(&self) -> bool {
        *self == Self::FREE
    }
}

impl Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("name", &self.name)
            .field("used", &self.is_used())
            .field("size", &self.size())
            .field("start_block", &self.start_block())
            .field("is_directory", &self.is_directory())
            .field("parent", &self.parent())
            .finish()
    }
}

/// A file or directory name, as stored in an [`Inode`].
///
/// Names occupy exactly [`MAX_NAME_LEN`] bytes and need not be nul-terminated. Shorter names are
/// padded with nul bytes. Names compare case-insensitively through [`InodeName::matches`]; the
/// derived equality compares raw bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct InodeName([u8; MAX_NAME_LEN]);

impl InodeName {
    /// The name that refers to the current directory.
    pub const SELF: InodeName = InodeName(*b".\0\0\0\0");
    /// The name that refers to the parent directory.
    pub const PARENT: InodeName = InodeName(*b"..\0\0\0");

    /// The significant bytes of the name, up to the first nul byte.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        &self.0[..len]
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, other: &InodeName) -> bool {
        self.as_bytes().eq_ignore_ascii_case(other.as_bytes())
    }

    /// Whether this is `.` or `..`.
    pub fn is_reserved(&self) -> bool {
        *self == Self::SELF || *self == Self::PARENT
    }

    /// The first raw byte. Used inodes must have a non-zero first byte.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }
}

impl TryFrom<&str> for InodeName {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.as_bytes())
    }
}

impl TryFrom<&[u8]> for InodeName {
    type Error = anyhow::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        ensure!(!bytes.is_empty(), "name is empty");
        ensure!(
            bytes.len() <= MAX_NAME_LEN,
            "name is more than {MAX_NAME_LEN} bytes long"
        );
        ensure!(!bytes.contains(&0), "name contains a nul byte");

        let mut converted = [0; MAX_NAME_LEN];
        converted[..bytes.len()].copy_from_slice(bytes);

        Ok(InodeName(converted))
    }
}

impl fmt::Display for InodeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl Debug for InodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InodeName")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}
