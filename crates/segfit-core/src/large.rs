//! Large allocation handling (> [`MAX_SMALL`] bytes).
//!
//! Allocations above the small-object ceiling bypass the free lists
//! entirely: they are acquired from and released to the memory source
//! directly, with no bookkeeping per block. This module also owns the
//! out-of-memory retry protocol, the only path in the whole allocator
//! with a terminal failure mode.

use std::ptr::NonNull;

use segfit_membrane::MemorySource;

use crate::error::AllocError;
use crate::size_class::MAX_SMALL;

/// Installable out-of-memory handler.
///
/// Invoked when the memory source refuses a request. The handler is
/// expected to release memory it holds elsewhere (caches, ballast) back to
/// the system and return `true` to have the request retried; returning
/// `false` abandons the retry loop and the operation fails with
/// [`AllocError::OutOfMemory`].
pub type OomHandler = Box<dyn FnMut() -> bool + Send>;

/// Direct passthrough to the memory source for large blocks.
///
/// Holds the handler and the large-path counters; all memory it touches is
/// owned by the caller from `allocate` to `deallocate`.
pub struct LargeAllocator {
    oom_handler: Option<OomHandler>,
    active_count: usize,
    total_bytes: usize,
    handler_invocations: usize,
}

impl LargeAllocator {
    /// Creates a large allocator with no handler installed.
    pub fn new() -> Self {
        Self {
            oom_handler: None,
            active_count: 0,
            total_bytes: 0,
            handler_invocations: 0,
        }
    }

    /// Installs `handler` (or clears it with `None`), returning the
    /// previously installed handler.
    ///
    /// The handler must not call back into the allocator it is installed
    /// on (exclusive borrows make that impossible to begin with); it frees
    /// memory held *elsewhere*.
    pub fn set_out_of_memory_handler(&mut self, handler: Option<OomHandler>) -> Option<OomHandler> {
        std::mem::replace(&mut self.oom_handler, handler)
    }

    /// Allocates `size` bytes straight from the source.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] when the source refuses the
    /// request and the handler loop cannot create headroom.
    pub fn allocate<S: MemorySource>(
        &mut self,
        source: &mut S,
        size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(size > MAX_SMALL);
        let region = self.acquire_or_retry(source, size)?;
        self.active_count += 1;
        self.total_bytes += size;
        Ok(region)
    }

    /// Releases a large block straight to the source; no bookkeeping.
    ///
    /// `size` must equal the value passed to the paired `allocate` call.
    pub fn deallocate<S: MemorySource>(&mut self, source: &mut S, ptr: NonNull<u8>, size: usize) {
        debug_assert!(size > MAX_SMALL);
        source.release(ptr, size);
        self.active_count -= 1;
        self.total_bytes -= size;
    }

    /// Resizes a large block through the source, retrying via the handler
    /// loop on failure.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] when neither the source nor the
    /// handler loop can provide the new size. The original block is still
    /// valid in that case.
    pub fn reallocate<S: MemorySource>(
        &mut self,
        source: &mut S,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(old_size > MAX_SMALL && new_size > MAX_SMALL);
        if let Some(region) = source.resize(ptr, old_size, new_size) {
            self.total_bytes = self.total_bytes - old_size + new_size;
            return Ok(region);
        }
        loop {
            self.consult_handler(new_size)?;
            if let Some(region) = source.resize(ptr, old_size, new_size) {
                self.total_bytes = self.total_bytes - old_size + new_size;
                return Ok(region);
            }
        }
    }

    /// Acquires a fresh region, entering the handler retry loop on failure.
    ///
    /// Also serves as the pool's last-resort growth path.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] if no handler is installed when
    /// the source refuses, or if the handler declines to continue.
    pub(crate) fn acquire_or_retry<S: MemorySource>(
        &mut self,
        source: &mut S,
        bytes: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if let Some(region) = source.acquire(bytes) {
            return Ok(region);
        }
        loop {
            self.consult_handler(bytes)?;
            if let Some(region) = source.acquire(bytes) {
                return Ok(region);
            }
        }
    }

    /// Runs the handler once, or reports the fatal condition.
    fn consult_handler(&mut self, requested: usize) -> Result<(), AllocError> {
        let Some(handler) = self.oom_handler.as_mut() else {
            return Err(AllocError::OutOfMemory { requested });
        };
        self.handler_invocations += 1;
        if handler() {
            Ok(())
        } else {
            Err(AllocError::OutOfMemory { requested })
        }
    }

    /// Number of live large blocks.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Bytes currently held by live large blocks.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Times the handler has been invoked over this allocator's lifetime.
    pub fn handler_invocations(&self) -> usize {
        self.handler_invocations
    }
}

impl Default for LargeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segfit_membrane::SystemSource;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Source that refuses every request while `starved` is set.
    struct StarvableSource {
        inner: SystemSource,
        starved: Arc<AtomicBool>,
    }

    impl MemorySource for StarvableSource {
        fn acquire(&mut self, bytes: usize) -> Option<NonNull<u8>> {
            if self.starved.load(Ordering::Relaxed) {
                return None;
            }
            self.inner.acquire(bytes)
        }

        fn release(&mut self, region: NonNull<u8>, bytes: usize) {
            self.inner.release(region, bytes);
        }

        fn resize(
            &mut self,
            region: NonNull<u8>,
            old_bytes: usize,
            new_bytes: usize,
        ) -> Option<NonNull<u8>> {
            if self.starved.load(Ordering::Relaxed) {
                return None;
            }
            self.inner.resize(region, old_bytes, new_bytes)
        }
    }

    #[test]
    fn test_allocate_deallocate_roundtrip() {
        let mut source = SystemSource;
        let mut large = LargeAllocator::new();

        let ptr = large.allocate(&mut source, 4096).unwrap();
        assert_eq!(large.active_count(), 1);
        assert_eq!(large.total_bytes(), 4096);

        large.deallocate(&mut source, ptr, 4096);
        assert_eq!(large.active_count(), 0);
        assert_eq!(large.total_bytes(), 0);
    }

    #[test]
    fn test_no_handler_is_fatal() {
        let starved = Arc::new(AtomicBool::new(true));
        let mut source = StarvableSource {
            inner: SystemSource,
            starved,
        };
        let mut large = LargeAllocator::new();

        assert_eq!(
            large.allocate(&mut source, 1024),
            Err(AllocError::OutOfMemory { requested: 1024 })
        );
        assert_eq!(large.handler_invocations(), 0);
    }

    #[test]
    fn test_handler_creates_headroom() {
        let starved = Arc::new(AtomicBool::new(true));
        let mut source = StarvableSource {
            inner: SystemSource,
            starved: Arc::clone(&starved),
        };
        let mut large = LargeAllocator::new();

        // The handler "frees" memory by un-starving the source.
        let released = Arc::clone(&starved);
        large.set_out_of_memory_handler(Some(Box::new(move || {
            released.store(false, Ordering::Relaxed);
            true
        })));

        let ptr = large.allocate(&mut source, 2048).unwrap();
        assert_eq!(large.handler_invocations(), 1);
        large.deallocate(&mut source, ptr, 2048);
    }

    #[test]
    fn test_handler_declining_is_fatal() {
        let starved = Arc::new(AtomicBool::new(true));
        let mut source = StarvableSource {
            inner: SystemSource,
            starved,
        };
        let mut large = LargeAllocator::new();
        large.set_out_of_memory_handler(Some(Box::new(|| false)));

        assert!(large.allocate(&mut source, 1024).is_err());
        assert_eq!(large.handler_invocations(), 1);
    }

    #[test]
    fn test_set_handler_returns_previous() {
        let mut large = LargeAllocator::new();
        assert!(large.set_out_of_memory_handler(Some(Box::new(|| true))).is_none());
        assert!(large.set_out_of_memory_handler(None).is_some());
        assert!(large.set_out_of_memory_handler(None).is_none());
    }

    #[test]
    fn test_reallocate_adjusts_totals() {
        let mut source = SystemSource;
        let mut large = LargeAllocator::new();

        let ptr = large.allocate(&mut source, 1000).unwrap();
        let grown = large.reallocate(&mut source, ptr, 1000, 3000).unwrap();
        assert_eq!(large.total_bytes(), 3000);
        assert_eq!(large.active_count(), 1);

        large.deallocate(&mut source, grown, 3000);
        assert_eq!(large.total_bytes(), 0);
    }
}
