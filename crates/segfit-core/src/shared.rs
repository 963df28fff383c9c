//! Shared handle over a single allocator instance.
//!
//! The core allocator is single-threaded shared mutable state with no
//! internal synchronization. When several containers (or several threads)
//! need the same arena, the whole allocator goes behind one external lock:
//! this wrapper. Containers hold `&SharedAllocator` and go through the
//! same four operations; every call takes the lock for its full duration.
//!
//! The alternative for contended workloads is one allocator per execution
//! context; this wrapper is the simple option, not the fast one.

use std::ptr::NonNull;

use parking_lot::{Mutex, MutexGuard};
use segfit_membrane::{MemorySource, SystemSource};

use crate::allocator::{AllocMetrics, Allocator};
use crate::error::AllocError;
use crate::large::OomHandler;

/// An [`Allocator`] behind a [`parking_lot::Mutex`].
pub struct SharedAllocator<S: MemorySource = SystemSource> {
    inner: Mutex<Allocator<S>>,
}

impl SharedAllocator<SystemSource> {
    /// Creates a shared allocator backed by the system allocator.
    pub fn new() -> Self {
        Self::from_allocator(Allocator::new())
    }
}

impl<S: MemorySource> SharedAllocator<S> {
    /// Wraps an existing allocator.
    pub fn from_allocator(allocator: Allocator<S>) -> Self {
        Self {
            inner: Mutex::new(allocator),
        }
    }

    /// Locked [`Allocator::allocate`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::allocate`].
    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.inner.lock().allocate(size)
    }

    /// Locked [`Allocator::deallocate`]. Same size contract.
    pub fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.inner.lock().deallocate(ptr, size);
    }

    /// Locked [`Allocator::reallocate`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::reallocate`].
    pub fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        self.inner.lock().reallocate(ptr, old_size, new_size)
    }

    /// Locked [`Allocator::allocate_zeroed`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::allocate_zeroed`].
    pub fn allocate_zeroed(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.inner.lock().allocate_zeroed(size)
    }

    /// Locked [`Allocator::set_out_of_memory_handler`].
    ///
    /// The handler runs while the lock is held; it must not call back into
    /// this shared allocator.
    pub fn set_out_of_memory_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.inner.lock().set_out_of_memory_handler(handler)
    }

    /// Locked [`Allocator::metrics`] snapshot.
    pub fn metrics(&self) -> AllocMetrics {
        self.inner.lock().metrics()
    }

    /// Holds the lock across a batch of operations.
    pub fn lock(&self) -> MutexGuard<'_, Allocator<S>> {
        self.inner.lock()
    }
}

impl Default for SharedAllocator<SystemSource> {
    fn default() -> Self {
        Self::new()
    }
}
