/// Perform a const assertion.
macro_rules! const_assert {
    ($($tt:tt)*) => {
        const _: () = assert!($($tt)*);
    }
}

/// Blocks, block numbers and extents.
pub mod block;
/// The free-space bitmap.
pub mod free_space;
/// Inodes and inode names.
pub mod inode;
/// The superblock: free-space bitmap followed by the inode table.
pub mod superblock;
