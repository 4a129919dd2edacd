//! Dynamic-rank strided view types.
//!
//! - [`StridedView`]: Immutable dynamic-rank strided view
//! - [`StridedViewMut`]: Mutable dynamic-rank strided view
//! - [`StridedArray`]: Owned strided multidimensional array

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::{Result, StridedError};

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate that all accessed offsets stay within `[0, len)`.
fn validate_bounds(len: usize, dims: &[usize], strides: &[isize], offset: isize) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    // Empty array - no access needed
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(StridedError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 {
        return Err(StridedError::OffsetOverflow);
    }
    if max_offset as usize >= len {
        return Err(StridedError::OffsetOverflow);
    }
    Ok(())
}

/// Number of elements described by `dims`, checked for overflow.
fn checked_len(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(StridedError::OffsetOverflow)
}

/// Flat buffer position of a multi-index.
#[inline]
fn element_offset(dims: &[usize], strides: &[isize], offset: isize, indices: &[usize]) -> usize {
    assert_eq!(indices.len(), dims.len(), "wrong number of indices");
    let mut idx = offset;
    for (i, &index) in indices.iter().enumerate() {
        assert!(
            index < dims[i],
            "index {} out of bounds for dim {}",
            index,
            dims[i]
        );
        idx += index as isize * strides[i];
    }
    idx as usize
}

/// Compute row-major strides (C default: last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Check whether `strides` describe a dense row-major layout of `dims`.
///
/// Strides of size-1 dimensions are ignored, and any layout with a
/// zero-size dimension is trivially dense.
pub fn is_row_major(dims: &[usize], strides: &[isize]) -> bool {
    if dims.len() != strides.len() {
        return false;
    }
    if dims.iter().any(|&d| d == 0) {
        return true;
    }
    let mut expected = 1isize;
    for (&d, &s) in dims.iter().rev().zip(strides.iter().rev()) {
        if d <= 1 {
            continue;
        }
        if s != expected {
            return false;
        }
        expected = expected.saturating_mul(d as isize);
    }
    true
}

/// Validate `perm` as a permutation of `0..rank`.
fn check_permutation(perm: &[usize], rank: usize) -> Result<()> {
    if perm.len() != rank {
        return Err(StridedError::RankMismatch(perm.len(), rank));
    }
    let mut seen = vec![false; rank];
    for &p in perm {
        if p >= rank || seen[p] {
            return Err(StridedError::InvalidAxis { axis: p, rank });
        }
        seen[p] = true;
    }
    Ok(())
}

// ============================================================================
// StridedView
// ============================================================================

/// Dynamic-rank immutable strided view.
///
/// - Dynamic rank (dims/strides are heap-allocated and shared)
/// - Zero-copy transformations (permute, broadcast, reshape)
///
/// # Type Parameters
/// - `'a`: Lifetime of the underlying data
/// - `T`: Element type
pub struct StridedView<'a, T> {
    data: &'a [T],
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T> Clone for StridedView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T> std::fmt::Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedView")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> StridedView<'a, T> {
    /// Create a new immutable strided view from a borrowed slice.
    pub fn new(data: &'a [T], dims: &[usize], strides: &[isize], offset: isize) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    /// Create a row-major view over a flat buffer holding exactly `dims` elements.
    pub fn row_major(data: &'a [T], dims: &[usize]) -> Result<Self> {
        let expected = checked_len(dims)?;
        if data.len() != expected {
            return Err(StridedError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Self::new(data, dims, &row_major_strides(dims), 0)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// True if the view walks its buffer densely in row-major order.
    #[inline]
    pub fn is_row_major_contiguous(&self) -> bool {
        is_row_major(&self.dims, &self.strides)
    }

    /// Permute dimensions.
    pub fn permute(&self, perm: &[usize]) -> Result<StridedView<'a, T>> {
        check_permutation(perm, self.dims.len())?;
        let new_dims: Vec<usize> = perm.iter().map(|&p| self.dims[p]).collect();
        let new_strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(new_dims),
            strides: Arc::from(new_strides),
            offset: self.offset,
        })
    }

    /// Broadcast this view to a target shape.
    ///
    /// Size-1 dimensions are expanded (stride set to 0) to match target.
    pub fn broadcast(&self, target_dims: &[usize]) -> Result<StridedView<'a, T>> {
        if self.dims.len() != target_dims.len() {
            return Err(StridedError::RankMismatch(
                self.dims.len(),
                target_dims.len(),
            ));
        }
        let mut new_strides = Vec::with_capacity(self.dims.len());
        for i in 0..self.dims.len() {
            if self.dims[i] == target_dims[i] {
                new_strides.push(self.strides[i]);
            } else if self.dims[i] == 1 {
                new_strides.push(0);
            } else {
                return Err(StridedError::ShapeMismatch(
                    self.dims.to_vec(),
                    target_dims.to_vec(),
                ));
            }
        }
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(target_dims),
            strides: Arc::from(new_strides),
            offset: self.offset,
        })
    }

    /// Reinterpret a row-major contiguous view under new dimensions.
    ///
    /// The element count must be unchanged. Views with permuted or broadcast
    /// strides are rejected with [`StridedError::NotContiguous`].
    pub fn reshape(&self, dims: &[usize]) -> Result<StridedView<'a, T>> {
        if !self.is_row_major_contiguous() {
            return Err(StridedError::NotContiguous);
        }
        let expected = self.len();
        let actual = checked_len(dims)?;
        if actual != expected {
            return Err(StridedError::LengthMismatch { expected, actual });
        }
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: self.offset,
        })
    }
}

impl<T: Copy> StridedView<'_, T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.data[element_offset(&self.dims, &self.strides, self.offset, indices)]
    }
}

// ============================================================================
// StridedViewMut
// ============================================================================

/// Dynamic-rank mutable strided view.
pub struct StridedViewMut<'a, T> {
    data: &'a mut [T],
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T> std::fmt::Debug for StridedViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedViewMut")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> StridedViewMut<'a, T> {
    /// Create a new mutable strided view.
    pub fn new(
        data: &'a mut [T],
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// True if the view walks its buffer densely in row-major order.
    #[inline]
    pub fn is_row_major_contiguous(&self) -> bool {
        is_row_major(&self.dims, &self.strides)
    }

    /// The whole underlying buffer, including elements outside the view.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Reborrow as an immutable view.
    pub fn as_view(&self) -> StridedView<'_, T> {
        StridedView {
            data: &*self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Copy> StridedViewMut<'_, T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.data[element_offset(&self.dims, &self.strides, self.offset, indices)]
    }

    /// Set an element by multi-dimensional index.
    pub fn set(&mut self, indices: &[usize], value: T) {
        let idx = element_offset(&self.dims, &self.strides, self.offset, indices);
        self.data[idx] = value;
    }
}

// ============================================================================
// StridedArray
// ============================================================================

/// Owned strided multidimensional array.
///
/// Arrays built by this crate are row-major with zero offset; arbitrary
/// layouts can be assembled with [`StridedArray::from_parts`].
pub struct StridedArray<T> {
    data: Vec<T>,
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T> std::fmt::Debug for StridedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedArray")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T: Clone> Clone for StridedArray<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Clone + Default> StridedArray<T> {
    /// Create a row-major (C default) array filled with Default values.
    pub fn row_major(dims: &[usize]) -> Self {
        let total: usize = dims.iter().product();
        Self {
            data: vec![T::default(); total],
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        }
    }
}

impl<T> StridedArray<T> {
    /// Create a row-major array with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order.
    pub fn from_fn_row_major(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = dims.iter().product();
        let rank = dims.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        }
    }

    /// Wrap a flat row-major buffer holding exactly `dims` elements.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        let expected = checked_len(dims)?;
        if data.len() != expected {
            return Err(StridedError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        })
    }

    /// Create from raw parts.
    pub fn from_parts(
        data: Vec<T>,
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// True if the array is dense, row-major and starts at offset 0.
    #[inline]
    pub fn is_row_major_contiguous(&self) -> bool {
        self.offset == 0
            && self.data.len() == self.len()
            && is_row_major(&self.dims, &self.strides)
    }

    /// Create an immutable view over this array.
    pub fn view(&self) -> StridedView<'_, T> {
        StridedView {
            data: &self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Create a mutable view over this array.
    pub fn view_mut(&mut self) -> StridedViewMut<'_, T> {
        StridedViewMut {
            data: &mut self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Reinterpret a row-major contiguous array under new dimensions.
    pub fn reshape(self, dims: &[usize]) -> Result<Self> {
        if !self.is_row_major_contiguous() {
            return Err(StridedError::NotContiguous);
        }
        let expected = self.len();
        let actual = checked_len(dims)?;
        if actual != expected {
            return Err(StridedError::LengthMismatch { expected, actual });
        }
        Ok(Self {
            data: self.data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        })
    }

    /// Consume the array and return its buffer in memory order.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Copy> StridedArray<T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.data[element_offset(&self.dims, &self.strides, self.offset, indices)]
    }

    /// Set an element by multi-dimensional index.
    pub fn set(&mut self, indices: &[usize], value: T) {
        let idx = element_offset(&self.dims, &self.strides, self.offset, indices);
        self.data[idx] = value;
    }
}

impl<T> Index<&[usize]> for StridedArray<T> {
    type Output = T;

    fn index(&self, indices: &[usize]) -> &T {
        &self.data[element_offset(&self.dims, &self.strides, self.offset, indices)]
    }
}

impl<T> IndexMut<&[usize]> for StridedArray<T> {
    fn index_mut(&mut self, indices: &[usize]) -> &mut T {
        let idx = element_offset(&self.dims, &self.strides, self.offset, indices);
        &mut self.data[idx]
    }
}

// ============================================================================
// Tests
// ============================================================================
