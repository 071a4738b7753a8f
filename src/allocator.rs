//! First-fit contiguous block allocation over the free-space bitmap.

use crate::disk_format::{
    block::{Extent, FIRST_DATA_BLOCK, NUM_BLOCKS},
    free_space::FreeSpaceMap,
};

impl FreeSpaceMap {
    /// Finds the lowest-numbered run of `size` free data blocks.
    ///
    /// Directories never allocate blocks, so a request for zero blocks finds nothing.
    pub fn find_contiguous(&self, size: usize) -> Option<Extent> {
        if size == 0 || size > NUM_BLOCKS - FIRST_DATA_BLOCK {
            return None;
        }

        let bits = self.bits();
        (FIRST_DATA_BLOCK..=NUM_BLOCKS - size)
            .find(|&start| bits[start..start + size].not_any())
            .map(|start| Extent::new(start, size))
    }

    /// Marks every block of `extent` as used or free. The extent is not bounds-checked.
    pub fn mark_extent(&mut self, extent: Extent, used: bool) {
        self.bits_mut()[extent.blocks()].fill(used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_disk() {
        let map = FreeSpaceMap::new();

        assert_eq!(map.find_contiguous(1), Some(Extent::new(1, 1)));
        assert_eq!(map.find_contiguous(127), Some(Extent::new(1, 127)));
        assert_eq!(map.find_contiguous(128), None);
        assert_eq!(map.find_contiguous(0), None);
    }

    #[test]
    fn test_first_fit() {
        let mut map = FreeSpaceMap::new();
        map.mark_extent(Extent::new(1, 2), true);
        map.mark_extent(Extent::new(5, 10), true);

        // blocks 3-4 are the first gap
        assert_eq!(map.find_contiguous(2), Some(Extent::new(3, 2)));
        assert_eq!(map.find_contiguous(3), Some(Extent::new(15, 3)));
    }

    #[test]
    fn test_run_ending_at_last_block() {
        let mut map = FreeSpaceMap::new();
        map.mark_extent(Extent::new(1, 120), true);

        assert_eq!(map.find_contiguous(7), Some(Extent::new(121, 7)));
        assert_eq!(map.find_contiguous(8), None);
    }

    #[test]
    fn test_fragmented_space() {
        let mut map = FreeSpaceMap::new();
        for start in (1..NUM_BLOCKS).step_by(2) {
            map.set_used(start, true);
        }

        assert_eq!(map.find_contiguous(1), Some(Extent::new(2, 1)));
        assert_eq!(map.find_contiguous(2), None);
    }

    #[test]
    fn test_mark_extent() {
        let mut map = FreeSpaceMap::new();

        map.mark_extent(Extent::new(8, 9), true);
        assert_eq!(map.count_used(), 10);
        assert!(map.is_used(8) && map.is_used(16));
        assert!(map.is_free(7) && map.is_free(17));

        map.mark_extent(Extent::new(8, 9), false);
        assert_eq!(map, FreeSpaceMap::new());
    }
}
