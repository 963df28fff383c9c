//! Allocation failure reporting.

use thiserror::Error;

/// The only error kind in the allocator.
///
/// Failures are absorbed and retried internally as far as possible (free
/// list refill, pool growth, scavenging across larger classes, the
/// out-of-memory handler loop); only when every fallback is exhausted does
/// an operation surface this error. The caller, not the allocator, chooses
/// whether that is fatal for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The system allocator refused `requested` bytes and no installed
    /// handler could create headroom.
    #[error("out of memory: {requested} bytes unavailable from the system allocator")]
    OutOfMemory {
        /// Size of the system request that failed.
        requested: usize,
    },
}
