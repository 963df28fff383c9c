//! Raw-memory membrane for segfit.
//!
//! Everything in the workspace that must touch untyped memory goes through
//! this crate; the policy crate (`segfit-core`) denies unsafe code entirely
//! and manipulates memory only via the handles and accessors defined here.
//!
//! # Architecture
//!
//! The membrane consists of:
//! - **Memory source** (`source`): the seam to the system allocator;
//!   acquire, release, and resize of raw byte regions
//! - **Blocks** (`block`): opaque handles to untyped byte spans, with the
//!   free-list link-word accessors and bulk byte operations

#![deny(unsafe_code)]

pub mod block;
pub mod source;

pub use block::Block;
pub use source::{CHUNK_ALIGN, MemorySource, SystemSource};
