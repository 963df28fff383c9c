//! Size classes for small allocations.
//!
//! Requests of 1 to [`MAX_SMALL`] bytes are rounded up to a multiple of
//! [`ALIGN`] and served from the free list of the matching class. The
//! class for size `(i + 1) * ALIGN` is `i`.

use segfit_membrane::CHUNK_ALIGN;

/// Alignment and size-class granularity (bytes).
pub const ALIGN: usize = CHUNK_ALIGN;

/// Number of size class free lists.
pub const NUM_CLASSES: usize = 16;

/// Maximum size for small allocations (bytes). Above this, the request
/// bypasses the free lists and goes straight to the system allocator.
pub const MAX_SMALL: usize = ALIGN * NUM_CLASSES;

/// Rounds `bytes` up to the nearest multiple of [`ALIGN`].
#[must_use]
pub fn round_up(bytes: usize) -> usize {
    (bytes + ALIGN - 1) & !(ALIGN - 1)
}

/// Computes the size class index for a request of `bytes` bytes.
///
/// Defined only for `bytes` in `1..=MAX_SMALL`.
#[must_use]
pub fn class_of(bytes: usize) -> usize {
    debug_assert!(
        bytes >= 1 && bytes <= MAX_SMALL,
        "class_of is defined only for 1..={MAX_SMALL}, got {bytes}"
    );
    round_up(bytes) / ALIGN - 1
}

/// Returns the block size backing the given class index.
#[must_use]
pub fn class_size(index: usize) -> usize {
    debug_assert!(index < NUM_CLASSES);
    (index + 1) * ALIGN
}
