//! # segfit-core
//!
//! The memory-management core beneath the container library: a
//! segregated-fit, pool-backed small-object allocator with a large-object
//! passthrough path.
//!
//! Requests up to [`size_class::MAX_SMALL`] bytes are served from per-class
//! free lists refilled in batches from a bump-pointer pool; anything larger
//! goes straight to the system allocator, guarded by an installable
//! out-of-memory handler. Containers consume the allocator through
//! [`Allocator::allocate`] and [`Allocator::deallocate`] (plus
//! [`reallocate`](Allocator::reallocate) and
//! [`allocate_zeroed`](Allocator::allocate_zeroed)) and construct their
//! objects in the returned storage themselves.
//!
//! No `unsafe` code is permitted in this crate; raw memory is reached only
//! through the `segfit-membrane` accessors.

pub mod allocator;
pub mod error;
pub mod free_list;
pub mod large;
pub mod pool;
pub mod shared;
pub mod size_class;

pub use allocator::{AllocMetrics, Allocator, DEFAULT_BATCH};
pub use error::AllocError;
pub use large::OomHandler;
pub use shared::SharedAllocator;
