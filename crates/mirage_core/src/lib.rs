//! # MIRAGE Core
//!
//! Shared building blocks for the MIRAGE snapshot interpolation engine:
//! - Double-precision transforms with quaternion rotations
//! - Recycling pools for zero-allocation frame loops
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - Buffers are recycled, never dropped per frame
//! 2. **Plain data** - Math types are `Pod` and bitwise copyable
//! 3. **Single writer** - Pools are owned by one thread, no locks
//!
//! ## Example
//!
//! ```rust
//! use mirage_core::{Quat, Transform, Vec3};
//!
//! let a = Transform::from_translation(Vec3::ZERO);
//! let b = Transform::new(Vec3::X, Quat::from_axis_angle(Vec3::Z, 0.5));
//! let mid = a.translation.lerp(b.translation, 0.5);
//! assert_eq!(mid, Vec3::new(0.5, 0.0, 0.0));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod math;
pub mod memory;

pub use math::{hermite, Quat, Transform, Vec3};
pub use memory::{Pool, Recycle};
