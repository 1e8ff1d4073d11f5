//! # Memory Management
//!
//! Recycling pools for zero-allocation frame loops.
//!
//! ## Design Philosophy
//!
//! Buffers are allocated while the stream warms up. After that:
//! - No heap allocations per snapshot
//! - No heap allocations per frame
//! - Predictable, flat latency

mod pool;

pub use pool::{Pool, Recycle};
