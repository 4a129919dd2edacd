//! Copy/permutation operations on strided views.

use crate::fuse::simplify_dims;
use strided_view::{Result, StridedError, StridedView, StridedViewMut};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Total number of elements.
#[inline]
pub fn total_len(dims: &[usize]) -> usize {
    dims.iter().product()
}

fn ensure_same_shape(dst_dims: &[usize], src_dims: &[usize]) -> Result<()> {
    if dst_dims.len() != src_dims.len() {
        return Err(StridedError::RankMismatch(dst_dims.len(), src_dims.len()));
    }
    if dst_dims != src_dims {
        return Err(StridedError::ShapeMismatch(
            dst_dims.to_vec(),
            src_dims.to_vec(),
        ));
    }
    Ok(())
}

/// Copy elements from source to destination: `dest[i] = src[i]`.
///
/// The source may carry any strides, including permuted and zero
/// (broadcast) strides. Elements are visited in row-major order of the
/// shared shape.
pub fn copy_into<T: Copy>(dest: &mut StridedViewMut<T>, src: &StridedView<T>) -> Result<()> {
    ensure_same_shape(dest.dims(), src.dims())?;
    if dest.is_empty() {
        return Ok(());
    }

    // Fast path: both contiguous
    if dest.is_row_major_contiguous() && src.is_row_major_contiguous() {
        let len = total_len(src.dims());
        let d = dest.offset() as usize;
        let s = src.offset() as usize;
        dest.data_mut()[d..d + len].copy_from_slice(&src.data()[s..s + len]);
        return Ok(());
    }

    let dst_strides = dest.strides().to_vec();
    let (dims, strides) = simplify_dims(src.dims(), &[dst_strides.as_slice(), src.strides()]);
    let dst_offset = dest.offset();
    strided_copy(
        dest.data_mut(),
        dst_offset,
        &strides[0],
        src.data(),
        src.offset(),
        &strides[1],
        &dims,
    );
    Ok(())
}

/// Minimum element count before [`copy_into_par`] fans out.
#[cfg(feature = "parallel")]
pub const PAR_THRESHOLD: usize = 1 << 15;

/// Parallel variant of [`copy_into`].
///
/// Splits the outermost dimension of a row-major contiguous destination
/// across the rayon pool. Every destination element is written once from
/// the same source element as in the sequential path, so the result is
/// identical. Small or non-contiguous destinations fall back to
/// [`copy_into`].
#[cfg(feature = "parallel")]
pub fn copy_into_par<T: Copy + Send + Sync>(
    dest: &mut StridedViewMut<T>,
    src: &StridedView<T>,
) -> Result<()> {
    ensure_same_shape(dest.dims(), src.dims())?;
    if !dest.is_row_major_contiguous() || total_len(src.dims()) < PAR_THRESHOLD {
        return copy_into(dest, src);
    }

    let dst_strides = dest.strides().to_vec();
    let (dims, strides) = simplify_dims(src.dims(), &[dst_strides.as_slice(), src.strides()]);
    if dims.len() < 2 {
        return copy_into(dest, src);
    }

    // A dense row-major destination stays dense after simplification.
    let chunk = strides[0][0] as usize;
    let src_outer = strides[1][0];
    let src_offset = src.offset();
    let src_data = src.data();
    let len = total_len(&dims);
    let d = dest.offset() as usize;
    dest.data_mut()[d..d + len]
        .par_chunks_mut(chunk)
        .enumerate()
        .for_each(|(i, block)| {
            strided_copy(
                block,
                0,
                &strides[0][1..],
                src_data,
                src_offset + i as isize * src_outer,
                &strides[1][1..],
                &dims[1..],
            );
        });
    Ok(())
}

/// Odometer copy over `dims`, last dimension innermost.
///
/// Offsets and strides are in elements. Callers guarantee every visited
/// offset is in bounds for its buffer.
fn strided_copy<T: Copy>(
    dst: &mut [T],
    dst_offset: isize,
    dst_strides: &[isize],
    src: &[T],
    src_offset: isize,
    src_strides: &[isize],
    dims: &[usize],
) {
    let rank = dims.len();
    if rank == 0 {
        dst[dst_offset as usize] = src[src_offset as usize];
        return;
    }
    if dims.iter().any(|&d| d == 0) {
        return;
    }

    let inner = rank - 1;
    let n = dims[inner];
    let ds = dst_strides[inner];
    let ss = src_strides[inner];
    let outer_total = total_len(&dims[..inner]);

    let mut idx = vec![0usize; inner];
    let mut d_off = dst_offset;
    let mut s_off = src_offset;
    for _ in 0..outer_total {
        let d = d_off as usize;
        let s = s_off as usize;
        if ds == 1 && ss == 1 {
            dst[d..d + n].copy_from_slice(&src[s..s + n]);
        } else if ds == 1 && ss == 0 {
            dst[d..d + n].fill(src[s]);
        } else {
            let mut dp = d_off;
            let mut sp = s_off;
            for _ in 0..n {
                dst[dp as usize] = src[sp as usize];
                dp += ds;
                sp += ss;
            }
        }

        for k in (0..inner).rev() {
            idx[k] += 1;
            d_off += dst_strides[k];
            s_off += src_strides[k];
            if idx[k] < dims[k] {
                break;
            }
            d_off -= dst_strides[k] * dims[k] as isize;
            s_off -= src_strides[k] * dims[k] as isize;
            idx[k] = 0;
        }
    }
}
