//! Per-class singly linked free lists.
//!
//! One list head per size class. Every block reachable from `heads[i]` has
//! exactly size `(i + 1) * ALIGN` and came either from the pool or from a
//! returned block of that class. Push and pop work at the head, so the
//! most recently freed block of a class is the first served.

use segfit_membrane::Block;

use crate::size_class::{NUM_CLASSES, class_size};

/// The array of free list heads, one per size class.
pub struct FreeLists {
    heads: [Option<Block>; NUM_CLASSES],
}

impl FreeLists {
    /// Creates all-empty lists, the valid starting state.
    pub fn new() -> Self {
        Self {
            heads: [None; NUM_CLASSES],
        }
    }

    /// Pops the head block of `class`, if any.
    pub fn pop(&mut self, class: usize) -> Option<Block> {
        let head = self.heads[class]?;
        self.heads[class] = head.next();
        Some(head)
    }

    /// Prepends `block` to the list of `class`. O(1).
    pub fn push(&mut self, class: usize, block: Block) {
        block.set_next(self.heads[class]);
        self.heads[class] = Some(block);
    }

    /// Threads `count` contiguous blocks of `block_size` bytes, starting at
    /// `first`, into the list of `class`.
    ///
    /// Called only on a refill, when the list is empty: the last block in
    /// the run terminates the chain.
    pub fn adopt_run(&mut self, class: usize, first: Block, block_size: usize, count: usize) {
        debug_assert!(count >= 1);
        debug_assert!(self.heads[class].is_none());
        self.heads[class] = Some(first);
        let mut current = first;
        for _ in 1..count {
            let following = current.step(block_size);
            current.set_next(Some(following));
            current = following;
        }
        current.set_next(None);
    }

    /// Detaches one block from the first nonempty list whose class is
    /// `min_class` or larger.
    ///
    /// Returns the block and its size. This is the pool's
    /// growth-failure fallback: the detached block becomes the new pool
    /// region.
    pub fn scavenge(&mut self, min_class: usize) -> Option<(Block, usize)> {
        for class in min_class..NUM_CLASSES {
            if let Some(block) = self.pop(class) {
                return Some((block, class_size(class)));
            }
        }
        None
    }

    /// Walks the list of `class` and counts its blocks. Diagnostic use.
    pub fn len(&self, class: usize) -> usize {
        let mut count = 0;
        let mut cursor = self.heads[class];
        while let Some(block) = cursor {
            count += 1;
            cursor = block.next();
        }
        count
    }

    /// Whether the list of `class` is empty.
    pub fn is_empty(&self, class: usize) -> bool {
        self.heads[class].is_none()
    }
}

impl Default for FreeLists {
    fn default() -> Self {
        Self::new()
    }
}
