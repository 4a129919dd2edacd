//! Materialization of permuted and broadcast strided views.
//!
//! This crate provides the copy kernel that turns a lazily transformed
//! view (permuted, broadcast, reshaped) into a dense destination. It sits
//! between `strided-view` (data structures) and `strided-rearrange`
//! (pattern-driven layout changes).
//!
//! # Dependency graph
//!
//! ```text
//! strided-view -> strided-perm -> strided-rearrange
//! ```

pub mod copy;
pub mod fuse;

// Re-export primary API
#[cfg(feature = "parallel")]
pub use copy::{copy_into_par, PAR_THRESHOLD};
pub use copy::{copy_into, total_len};
pub use fuse::{compress_dims, fuse_dims, simplify_dims};
