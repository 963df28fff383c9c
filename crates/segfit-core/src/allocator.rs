//! Core allocator state.
//!
//! Central allocation state that coordinates the size-class free lists,
//! the bump-pointer pool, and the large-allocation path. This is the only
//! type containers talk to: `allocate`/`deallocate` (plus `reallocate` and
//! `allocate_zeroed`) route every request by its byte size alone.
//!
//! Deallocation trusts the caller-supplied size completely; the allocator
//! stores no per-block metadata. Passing a size different from the one
//! given to the paired `allocate` silently corrupts an unrelated free
//! list; that is undefined behavior by contract, exactly as in the
//! original design.

use std::ptr::NonNull;

use segfit_membrane::{Block, MemorySource, SystemSource};

use crate::error::AllocError;
use crate::free_list::FreeLists;
use crate::large::{LargeAllocator, OomHandler};
use crate::pool::Pool;
use crate::size_class::{MAX_SMALL, class_of, class_size, round_up};

/// Blocks fetched from the pool per free-list refill.
pub const DEFAULT_BATCH: usize = 20;

/// Point-in-time snapshot of the allocator's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocMetrics {
    /// Cumulative bytes obtained from the source for the pool.
    pub heap_bytes: usize,
    /// Bytes still unconsumed in the current pool region.
    pub pool_remaining: usize,
    /// Live small blocks (handed out, not yet returned).
    pub small_active: usize,
    /// Live large blocks.
    pub large_active: usize,
    /// Bytes held by live large blocks.
    pub large_bytes: usize,
    /// Small requests served straight off a free list.
    pub freelist_hits: usize,
    /// Free-list refills from the pool.
    pub refills: usize,
    /// Pool remainders donated to free lists.
    pub fragments_donated: usize,
    /// Free-list blocks adopted as pool regions under memory pressure.
    pub scavenges: usize,
    /// Out-of-memory handler invocations.
    pub oom_handler_invocations: usize,
}

/// The segregated-fit allocator.
///
/// Ready as soon as it is constructed with all free lists empty and the
/// pool empty; the first allocation triggers the first pool grow. Generic
/// over its
/// [`MemorySource`] so tests can count or starve system requests;
/// production code uses [`Allocator::new`] and never names the parameter.
///
/// Dropping the allocator returns every pool region to the source. All
/// small blocks still outstanding become dangling at that point, and any
/// live large block is leaked (large blocks are untracked by design), so
/// clients must be torn down first.
pub struct Allocator<S: MemorySource = SystemSource> {
    source: S,
    pool: Pool,
    free_lists: FreeLists,
    large: LargeAllocator,
    small_active: usize,
    freelist_hits: usize,
    refills: usize,
}

impl Allocator<SystemSource> {
    /// Creates an allocator backed by the system allocator.
    pub fn new() -> Self {
        Self::with_source(SystemSource)
    }
}

impl<S: MemorySource> Allocator<S> {
    /// Creates an allocator backed by an arbitrary memory source.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            pool: Pool::new(),
            free_lists: FreeLists::new(),
            large: LargeAllocator::new(),
            small_active: 0,
            freelist_hits: 0,
            refills: 0,
        }
    }

    /// Allocates `size` bytes.
    ///
    /// Returns a pointer to at least `size` usable bytes, aligned to the
    /// size-class granularity for small requests. Zero-size requests are
    /// served as one byte. The caller owns the bytes until it passes the
    /// pointer, with the *same* `size`, to [`deallocate`](Self::deallocate).
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] only once every internal
    /// fallback (pool growth, free-list scavenging, the handler loop) is
    /// exhausted.
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let size = if size == 0 { 1 } else { size };

        if size > MAX_SMALL {
            return self.large.allocate(&mut self.source, size);
        }

        let class = class_of(size);
        if let Some(block) = self.free_lists.pop(class) {
            self.freelist_hits += 1;
            self.small_active += 1;
            return Ok(block.as_ptr());
        }

        let block = self.refill(class)?;
        self.small_active += 1;
        Ok(block.as_ptr())
    }

    /// Returns a block to the allocator.
    ///
    /// `size` MUST equal the value passed to the paired
    /// [`allocate`](Self::allocate) call; the allocator routes purely by
    /// it. A mismatch is undefined behavior (it corrupts an unrelated
    /// free list). O(1); never touches the pool.
    pub fn deallocate(&mut self, ptr: NonNull<u8>, size: usize) {
        let size = if size == 0 { 1 } else { size };

        if size > MAX_SMALL {
            self.large.deallocate(&mut self.source, ptr, size);
            return;
        }

        self.free_lists.push(class_of(size), Block::new(ptr));
        self.small_active -= 1;
    }

    /// Resizes an allocation, preserving the first
    /// `min(old_size, new_size)` bytes.
    ///
    /// `old_size` MUST equal the size the block was allocated with, under
    /// the same contract as [`deallocate`](Self::deallocate). Two large
    /// sizes resize through the source; two sizes that round to the same
    /// size class return the pointer unchanged; anything else moves the
    /// bytes to a fresh block.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] if a needed fresh block cannot
    /// be obtained; the original block is still valid in that case.
    pub fn reallocate(
        &mut self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let old_size = if old_size == 0 { 1 } else { old_size };
        let new_size = if new_size == 0 { 1 } else { new_size };

        if old_size > MAX_SMALL && new_size > MAX_SMALL {
            return self
                .large
                .reallocate(&mut self.source, ptr, old_size, new_size);
        }

        // Same class: the block already backs the new size.
        if old_size <= MAX_SMALL
            && new_size <= MAX_SMALL
            && round_up(old_size) == round_up(new_size)
        {
            return Ok(ptr);
        }

        let new_ptr = self.allocate(new_size)?;
        Block::new(ptr).copy_to(Block::new(new_ptr), old_size.min(new_size));
        self.deallocate(ptr, old_size);
        Ok(new_ptr)
    }

    /// Allocates `size` bytes with every byte set to zero.
    ///
    /// # Errors
    ///
    /// As for [`allocate`](Self::allocate).
    pub fn allocate_zeroed(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let size = if size == 0 { 1 } else { size };
        let ptr = self.allocate(size)?;
        Block::new(ptr).fill(size, 0);
        Ok(ptr)
    }

    /// Installs an out-of-memory handler, returning the previous one.
    ///
    /// The handler is consulted whenever the source refuses a request,
    /// on the large path and on pool growth alike. It is never cleared
    /// automatically.
    pub fn set_out_of_memory_handler(&mut self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.large.set_out_of_memory_handler(handler)
    }

    /// Snapshots the allocator's counters.
    pub fn metrics(&self) -> AllocMetrics {
        AllocMetrics {
            heap_bytes: self.pool.heap_size(),
            pool_remaining: self.pool.remaining(),
            small_active: self.small_active,
            large_active: self.large.active_count(),
            large_bytes: self.large.total_bytes(),
            freelist_hits: self.freelist_hits,
            refills: self.refills,
            fragments_donated: self.pool.donations(),
            scavenges: self.pool.scavenges(),
            oom_handler_invocations: self.large.handler_invocations(),
        }
    }

    /// Number of blocks currently parked on the free list of `class`.
    /// Diagnostic use: walks the list.
    pub fn free_list_len(&self, class: usize) -> usize {
        self.free_lists.len(class)
    }

    /// Refills the free list of `class` from the pool and returns one
    /// block to the caller.
    ///
    /// Asks for [`DEFAULT_BATCH`] blocks; memory pressure may yield fewer.
    /// A single-block yield bypasses the free list entirely; otherwise the
    /// surplus is threaded into the class's list.
    fn refill(&mut self, class: usize) -> Result<Block, AllocError> {
        self.refills += 1;
        let block_size = class_size(class);

        let (run, count) = match self.pool.try_take(block_size * DEFAULT_BATCH) {
            Some(run) => (run, DEFAULT_BATCH),
            None => self.pool.grow_and_retry(
                block_size,
                DEFAULT_BATCH,
                &mut self.free_lists,
                &mut self.large,
                &mut self.source,
            )?,
        };

        if count > 1 {
            self.free_lists
                .adopt_run(class, run.step(block_size), block_size, count - 1);
        }
        Ok(run)
    }
}

impl Default for Allocator<SystemSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MemorySource> Drop for Allocator<S> {
    fn drop(&mut self) {
        for (region, bytes) in self.pool.drain_regions() {
            self.source.release(region.as_ptr(), bytes);
        }
    }
}
