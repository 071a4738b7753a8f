use std::fmt;

use thiserror::Error;

use crate::consistency::Inconsistency;
use crate::disk_format::inode::InodeName;

/// The kind of entry an operation was looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Any file or directory.
    Any,
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Any => "File or directory",
            EntryKind::File => "File",
            EntryKind::Directory => "Directory",
        })
    }
}

/// Errors reported by filesystem operations. None of them are fatal to the session, and a failed
/// operation leaves the mounted superblock untouched.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No file system is mounted")]
    NotMounted,

    #[error("Cannot find disk {disk}")]
    DiskUnavailable { disk: String },

    #[error("File system in {disk} is inconsistent (error code: {})", .rule.code())]
    Inconsistent { disk: String, rule: Inconsistency },

    #[error("Superblock in disk {disk} is full, cannot create {name}")]
    TableFull { disk: String, name: InodeName },

    #[error("File or directory {name} already exists")]
    NameConflict { name: InodeName },

    #[error("Cannot allocate {size} blocks on {disk}")]
    NoSpace { disk: String, size: usize },

    #[error("{expected} {name} does not exist")]
    NotFound { name: InodeName, expected: EntryKind },

    /// The entry exists but is not of the expected kind.
    #[error("{expected} {name} does not exist")]
    WrongKind { name: InodeName, expected: EntryKind },

    #[error("{name} does not have block {block}")]
    OutOfRange { name: InodeName, block: usize },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
