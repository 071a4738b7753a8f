//! Mount-time validation of a superblock snapshot.
//!
//! The rules are checked in a fixed order and the first violated rule is reported. A rule is only
//! evaluated once every earlier rule holds for the whole inode table.

use std::iter;

use crate::disk_format::{
    block::{FIRST_DATA_BLOCK, NUM_BLOCKS, SUPERBLOCK_NUMBER},
    inode::{InodeIndex, NUM_INODES, RESERVED_INDEX, ROOT_INDEX},
    superblock::Superblock,
};

/// A violated consistency rule. The discriminant is the rule's error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Inconsistency {
    /// A free inode has a non-zero byte, or a used inode has an empty name.
    InodeState = 1,
    /// A file's extent starts outside the data blocks or runs past the last block.
    FileExtent = 2,
    /// A directory has a non-zero size or start block.
    DirectoryExtent = 3,
    /// An inode's parent is itself, the reserved index, or not a used directory.
    InvalidParent = 4,
    /// Two entries of one directory have the same name.
    DuplicateName = 5,
    /// The free-space bitmap disagrees with the blocks that files occupy.
    BlockAllocation = 6,
}

impl Inconsistency {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Checks the superblock against every consistency rule, in order.
pub fn check_consistency(superblock: &Superblock) -> Result<(), Inconsistency> {
    check_inode_state(superblock)?;
    check_file_extents(superblock)?;
    check_directory_extents(superblock)?;
    check_parents(superblock)?;
    check_unique_names(superblock)?;
    check_block_allocation(superblock)?;

    Ok(())
}

fn check_inode_state(superblock: &Superblock) -> Result<(), Inconsistency> {
    for inode in &superblock.inodes {
        let valid = if inode.is_used() {
            inode.name.first_byte() != 0
        } else {
            inode.is_zeroed()
        };

        if !valid {
            return Err(Inconsistency::InodeState);
        }
    }

    Ok(())
}

fn check_file_extents(superblock: &Superblock) -> Result<(), Inconsistency> {
    for inode in superblock.inodes.iter().filter(|inode| inode.is_file()) {
        let start = inode.start_block();

        if !(FIRST_DATA_BLOCK..NUM_BLOCKS).contains(&start) || start + inode.size() > NUM_BLOCKS {
            return Err(Inconsistency::FileExtent);
        }
    }

    Ok(())
}

fn check_directory_extents(superblock: &Superblock) -> Result<(), Inconsistency> {
    let invalid = superblock
        .inodes
        .iter()
        .filter(|inode| inode.is_used() && inode.is_directory())
        .any(|inode| inode.size() != 0 || inode.start_block() != 0);

    if invalid {
        return Err(Inconsistency::DirectoryExtent);
    }

    Ok(())
}

fn check_parents(superblock: &Superblock) -> Result<(), Inconsistency> {
    for (index, inode) in superblock.inodes.iter().enumerate() {
        if !inode.is_used() {
            continue;
        }

        let parent = inode.parent();
        if parent == index || parent == RESERVED_INDEX {
            return Err(Inconsistency::InvalidParent);
        }

        if parent < NUM_INODES {
            let parent_inode = &superblock.inodes[parent];
            if !parent_inode.is_used() || !parent_inode.is_directory() {
                return Err(Inconsistency::InvalidParent);
            }
        }
    }

    Ok(())
}

fn check_unique_names(superblock: &Superblock) -> Result<(), Inconsistency> {
    let directories = superblock
        .inodes
        .iter()
        .enumerate()
        .filter(|(_, inode)| inode.is_used() && inode.is_directory())
        .map(|(index, _)| index);

    for directory in iter::once(ROOT_INDEX).chain(directories) {
        if has_duplicate_names(superblock, directory) {
            return Err(Inconsistency::DuplicateName);
        }
    }

    Ok(())
}

/// Compares every pair of entries in `directory`.
fn has_duplicate_names(superblock: &Superblock, directory: InodeIndex) -> bool {
    let children: Vec<_> = superblock
        .children_of(directory)
        .map(|index| superblock.inodes[index].name)
        .collect();

    children.iter().enumerate().any(|(i, name)| {
        children[i + 1..]
            .iter()
            .any(|other| name.matches(other))
    })
}

fn check_block_allocation(superblock: &Superblock) -> Result<(), Inconsistency> {
    let mut allocation_counts = [0usize; NUM_BLOCKS];
    allocation_counts[SUPERBLOCK_NUMBER] = 1;

    for inode in superblock.inodes.iter().filter(|inode| inode.is_file()) {
        for block in inode.extent().blocks() {
            allocation_counts[block] += 1;
        }
    }

    for (block, &count) in allocation_counts.iter().enumerate() {
        let consistent = if superblock.free_space.is_free(block) {
            count == 0
        } else {
            count == 1
        };

        if !consistent {
            return Err(Inconsistency::BlockAllocation);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::disk_format::{
        block::Extent,
        inode::{Inode, InodeName},
    };

    use super::*;

    fn name(s: &str) -> InodeName {
        InodeName::try_from(s).unwrap()
    }

    /// A superblock with a file at blocks 1-2 and a directory holding a file at block 3.
    fn populated() -> Superblock {
        let mut superblock = Superblock::new();
        superblock.inodes[0] = Inode::file(name("a"), ROOT_INDEX, Extent::new(1, 2));
        superblock.inodes[1] = Inode::directory(name("dir"), ROOT_INDEX);
        superblock.inodes[2] = Inode::file(name("b"), 1, Extent::new(3, 1));
        for block in 1..=3 {
            superblock.free_space.set_used(block, true);
        }
        superblock
    }

    #[test]
    fn test_consistent() {
        assert_eq!(check_consistency(&Superblock::new()), Ok(()));
        assert_eq!(check_consistency(&populated()), Ok(()));
    }

    #[test]
    fn test_free_inode_with_data() {
        let mut superblock = populated();
        superblock.inodes[10] = Inode::from_raw([0; 5], 0, 4, 0);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InodeState));
    }

    #[test]
    fn test_free_inode_with_name_only() {
        let mut superblock = populated();
        superblock.inodes[10] = Inode::from_raw(*b"x\0\0\0\0", 0, 0, 0);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InodeState));
    }

    #[test]
    fn test_used_inode_without_name() {
        let mut superblock = populated();
        superblock.inodes[1] = Inode::from_raw(*b"\0dir\0", 0x80, 0, 0xff);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InodeState));
    }

    #[test]
    fn test_file_start_block_zero() {
        let mut superblock = populated();
        superblock.inodes[0].set_start_block(0);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::FileExtent));
    }

    #[test]
    fn test_file_past_last_block() {
        let mut superblock = Superblock::new();
        superblock.inodes[0] = Inode::file(name("a"), ROOT_INDEX, Extent::new(127, 2));

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::FileExtent));
    }

    #[test]
    fn test_file_ending_at_last_block() {
        let mut superblock = Superblock::new();
        superblock.inodes[0] = Inode::file(name("a"), ROOT_INDEX, Extent::new(126, 2));
        superblock.free_space.set_used(126, true);
        superblock.free_space.set_used(127, true);

        assert_eq!(check_consistency(&superblock), Ok(()));
    }

    #[test]
    fn test_directory_with_size() {
        let mut superblock = populated();
        superblock.inodes[1].set_size(1);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::DirectoryExtent));
    }

    #[test]
    fn test_directory_with_start_block() {
        let mut superblock = populated();
        superblock.inodes[1].set_start_block(5);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::DirectoryExtent));
    }

    #[test]
    fn test_self_parent() {
        let mut superblock = populated();
        superblock.inodes[1].set_parent(1);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InvalidParent));
    }

    #[test]
    fn test_reserved_parent() {
        let mut superblock = populated();
        superblock.inodes[0].set_parent(RESERVED_INDEX);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InvalidParent));
    }

    #[test]
    fn test_parent_is_file() {
        let mut superblock = populated();
        superblock.inodes[2].set_parent(0);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InvalidParent));
    }

    #[test]
    fn test_parent_is_free() {
        let mut superblock = populated();
        superblock.inodes[2].set_parent(50);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InvalidParent));
    }

    #[test]
    fn test_duplicate_names_in_root_ignore_case() {
        let mut superblock = populated();
        superblock.inodes[3] = Inode::directory(name("DIR"), ROOT_INDEX);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::DuplicateName));
    }

    #[test]
    fn test_duplicate_names_in_subdirectory() {
        let mut superblock = populated();
        superblock.inodes[3] = Inode::directory(name("B"), 1);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::DuplicateName));
    }

    #[test]
    fn test_same_name_in_different_directories() {
        let mut superblock = populated();
        superblock.inodes[3] = Inode::directory(name("a"), 1);

        assert_eq!(check_consistency(&superblock), Ok(()));
    }

    #[test]
    fn test_allocated_block_marked_free() {
        let mut superblock = populated();
        superblock.free_space.set_used(2, false);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::BlockAllocation));
    }

    #[test]
    fn test_unallocated_block_marked_used() {
        let mut superblock = populated();
        superblock.free_space.set_used(100, true);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::BlockAllocation));
    }

    #[test]
    fn test_superblock_marked_free() {
        let mut superblock = populated();
        superblock.free_space.set_used(0, false);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::BlockAllocation));
    }

    #[test]
    fn test_overlapping_files() {
        let mut superblock = populated();
        superblock.inodes[3] = Inode::file(name("c"), ROOT_INDEX, Extent::new(2, 1));

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::BlockAllocation));
    }

    #[test]
    fn test_first_violated_rule_wins() {
        let mut superblock = populated();
        // violates rules 6, 4 and 2
        superblock.inodes[0].set_start_block(0);
        superblock.inodes[2].set_parent(RESERVED_INDEX);
        superblock.free_space.set_used(100, true);

        assert_eq!(check_consistency(&superblock), Err(Inconsistency::FileExtent));

        // a later slot violating rule 1 still takes precedence
        superblock.inodes[125] = Inode::from_raw([0; 5], 0x01, 0, 0);
        assert_eq!(check_consistency(&superblock), Err(Inconsistency::InodeState));
    }

    #[test]
    fn test_codes() {
        assert_eq!(Inconsistency::InodeState.code(), 1);
        assert_eq!(Inconsistency::BlockAllocation.code(), 6);
    }
}
