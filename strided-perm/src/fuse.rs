//! Dimension fusion for row-major iteration.
//!
//! Merging dimensions that are contiguous in every participating array
//! reduces loop depth and lengthens the innermost run handed to the
//! copy kernel.

/// Fuse contiguous dimensions across multiple arrays.
///
/// Row-major: dimension `i` (outer) can be merged into `i+1` (inner) when
/// `strides[k][i] == dims[i+1] * strides[k][i+1]` for every array `k`.
/// A merged outer dimension is left with size 1; use [`compress_dims`]
/// to strip it.
pub fn fuse_dims(dims: &[usize], all_strides: &[&[isize]]) -> Vec<usize> {
    let n = dims.len();
    if n <= 1 || all_strides.is_empty() {
        return dims.to_vec();
    }

    let mut result = dims.to_vec();

    // Outer to inner, so a run of mergeable dims accumulates into the innermost one.
    for i in 0..n - 1 {
        let can_merge = all_strides
            .iter()
            .all(|strides| strides[i] == dims[i + 1] as isize * strides[i + 1]);

        if can_merge {
            result[i + 1] *= result[i];
            result[i] = 1;
        }
    }

    result
}

/// Remove size-1 dimensions from dims and all corresponding strides.
///
/// Size-1 dimensions contribute nothing to iteration but increase loop
/// depth, and their strides are arbitrary, which would block fusion.
///
/// If ALL dimensions are 1 (scalar-like), a single dimension of size 1
/// is preserved so the kernel has something to iterate over.
pub fn compress_dims(dims: &[usize], all_strides: &[Vec<isize>]) -> (Vec<usize>, Vec<Vec<isize>>) {
    let kept: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] != 1).collect();

    if kept.is_empty() {
        if dims.is_empty() {
            return (vec![], all_strides.to_vec());
        }
        let new_strides = all_strides.iter().map(|s| vec![s[0]]).collect();
        return (vec![1], new_strides);
    }

    let new_dims: Vec<usize> = kept.iter().map(|&i| dims[i]).collect();
    let new_strides: Vec<Vec<isize>> = all_strides
        .iter()
        .map(|s| kept.iter().map(|&i| s[i]).collect())
        .collect();

    (new_dims, new_strides)
}

/// Compress, fuse, and compress again.
///
/// Returns the simplified dims and one stride vector per input array,
/// describing the same set of element visits in the same row-major order.
pub fn simplify_dims(dims: &[usize], all_strides: &[&[isize]]) -> (Vec<usize>, Vec<Vec<isize>>) {
    let owned: Vec<Vec<isize>> = all_strides.iter().map(|s| s.to_vec()).collect();
    let (dims, strides) = compress_dims(dims, &owned);
    let refs: Vec<&[isize]> = strides.iter().map(|s| s.as_slice()).collect();
    let fused = fuse_dims(&dims, &refs);
    compress_dims(&fused, &strides)
}
