//! Dynamic-rank strided view types and metadata operations.
//!
//! This crate provides strided multidimensional array views over flat
//! buffers, together with zero-copy metadata transformations. It is the
//! bottom layer of the rearrange stack:
//!
//! ```text
//! strided-view -> strided-perm -> strided-rearrange
//! ```
//!
//! # Core Types
//!
//! - [`StridedView`] / [`StridedViewMut`]: Dynamic-rank strided views over existing data
//! - [`StridedArray`]: Owned strided multidimensional array (row-major by default)
//!
//! # Metadata Transformations
//!
//! These operate only on dims/strides/offset and never access the underlying data:
//! - `permute`: Reorder dimensions
//! - `broadcast`: Expand size-1 dimensions (stride 0)
//! - `reshape`: Reinterpret a row-major contiguous view under new dimensions

pub mod view;

// ============================================================================
// View-based types
// ============================================================================
pub use view::{is_row_major, row_major_strides, StridedArray, StridedView, StridedViewMut};

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during strided array operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StridedError {
    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Array shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// Integer overflow while computing array offset or element count.
    #[error("offset overflow while computing pointer")]
    OffsetOverflow,

    /// Element count implied by the dimensions differs from the buffer or source.
    #[error("length mismatch: expected {expected} elements, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Operation requires a dense row-major layout.
    #[error("view is not row-major contiguous")]
    NotContiguous,
}

/// Result type for strided array operations.
pub type Result<T> = std::result::Result<T, StridedError>;
