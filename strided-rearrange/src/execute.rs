//! Permutation planning and buffer execution.

use std::collections::HashMap;

use log::{debug, trace};
use strided_perm::copy_into;
use strided_view::{StridedArray, StridedView};

use crate::error::{RearrangeError, ShapeError};
use crate::layout::{IntermediateLayout, RepeatOp};
use crate::parse::{terms, AxisSpec, Term};
use crate::resolve::AxisId;
use crate::{SVec, MAX_RANK};

/// Element types a rearrangement can move.
#[cfg(not(feature = "parallel"))]
pub trait Element: Copy + Default {}
#[cfg(not(feature = "parallel"))]
impl<T: Copy + Default> Element for T {}

/// Element types a rearrangement can move.
#[cfg(feature = "parallel")]
pub trait Element: Copy + Default + Send + Sync {}
#[cfg(feature = "parallel")]
impl<T: Copy + Default + Send + Sync> Element for T {}

/// Product of `dims`, failing on overflow.
pub(crate) fn checked_product(dims: &[usize], what: &'static str) -> crate::Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| ShapeError::SizeOverflow(what).into())
}

/// A fully resolved rearrangement of one input shape.
///
/// Holds everything needed to move data; building it never touches a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RearrangePlan {
    pub input_shape: SVec<usize>,
    pub layout: IntermediateLayout,
    pub repeats: SVec<RepeatOp>,
    /// Layout sizes after every repeat is applied.
    pub expanded: SVec<usize>,
    /// Source layout position of each permuted axis, in output order.
    pub permutation: SVec<usize>,
    pub output_shape: SVec<usize>,
}

impl RearrangePlan {
    /// Derive permutation and output shape from a built layout.
    pub(crate) fn new(
        output: &[AxisSpec],
        shape: &[usize],
        layout: IntermediateLayout,
        repeats: SVec<RepeatOp>,
        ellipsis_dims: usize,
    ) -> crate::Result<Self> {
        let mut expanded = layout.sizes.clone();
        for op in &repeats {
            expanded[op.position] = op.length;
        }
        checked_product(&expanded, "output size")?;

        let (permutation, output_shape) =
            build_permutation(output, &layout, &expanded, ellipsis_dims)?;
        if output_shape.len() > MAX_RANK {
            return Err(ShapeError::RankExceedsMaximum {
                rank: output_shape.len(),
                max: MAX_RANK,
            }
            .into());
        }
        debug!(
            "permutation {:?}, output shape {:?}",
            permutation, output_shape
        );

        Ok(Self {
            input_shape: shape.iter().copied().collect(),
            layout,
            repeats,
            expanded,
            permutation,
            output_shape,
        })
    }

    /// Number of elements in the output.
    pub fn output_len(&self) -> usize {
        self.output_shape.iter().product()
    }

    /// Run the plan against a row-major buffer of `input_shape`.
    pub fn execute<T: Element>(&self, buffer: &[T], parallel: bool) -> crate::Result<StridedArray<T>> {
        let expected = checked_product(&self.input_shape, "input size")?;
        if buffer.len() != expected {
            return Err(ShapeError::BufferLength {
                shape: self.input_shape.to_vec(),
                expected,
                actual: buffer.len(),
            }
            .into());
        }

        let view = StridedView::row_major(buffer, &self.input_shape)?;
        let view = view.reshape(&self.layout.sizes)?;
        trace!("reshaped to {:?}", view.dims());
        let view = if self.repeats.is_empty() {
            view
        } else {
            view.broadcast(&self.expanded)?
        };
        trace!("broadcast to {:?} strides {:?}", view.dims(), view.strides());
        let view = view.permute(&self.permutation)?;
        trace!("permuted to {:?} strides {:?}", view.dims(), view.strides());

        let mut out = StridedArray::<T>::row_major(view.dims());
        materialize(&mut out, &view, parallel)?;
        Ok(out.reshape(&self.output_shape)?)
    }
}

#[cfg(feature = "parallel")]
fn materialize<T: Element>(
    out: &mut StridedArray<T>,
    src: &StridedView<T>,
    parallel: bool,
) -> crate::Result<()> {
    if parallel {
        strided_perm::copy_into_par(&mut out.view_mut(), src)?;
    } else {
        copy_into(&mut out.view_mut(), src)?;
    }
    Ok(())
}

#[cfg(not(feature = "parallel"))]
fn materialize<T: Element>(
    out: &mut StridedArray<T>,
    src: &StridedView<T>,
    _parallel: bool,
) -> crate::Result<()> {
    copy_into(&mut out.view_mut(), src)?;
    Ok(())
}

/// Map each output entry to its source position in the intermediate layout.
///
/// Grouped output entries become consecutive permutation entries whose
/// sizes multiply into one output dimension. Layout axes the output never
/// names are appended last and must have size 1.
pub fn build_permutation(
    output: &[AxisSpec],
    layout: &IntermediateLayout,
    expanded: &[usize],
    ellipsis_dims: usize,
) -> crate::Result<(SVec<usize>, SVec<usize>)> {
    let index: HashMap<&AxisId, usize> = layout
        .axes
        .iter()
        .enumerate()
        .map(|(i, axis)| (axis, i))
        .collect();
    let lookup = |axis: AxisId| -> crate::Result<usize> {
        index.get(&axis).copied().ok_or_else(|| {
            RearrangeError::Internal(format!(
                "output axis '{}' has no source in the intermediate layout",
                axis
            ))
        })
    };

    let mut perm = SVec::new();
    let mut shape = SVec::new();
    for (_, term) in terms(output) {
        match term {
            Term::Ellipsis => {
                for i in 0..ellipsis_dims {
                    let p = lookup(AxisId::Batch(i))?;
                    perm.push(p);
                    shape.push(expanded[p]);
                }
            }
            Term::Singleton => shape.push(1),
            Term::Axis(name) => {
                let p = lookup(AxisId::Named(name.to_string()))?;
                perm.push(p);
                shape.push(expanded[p]);
            }
            Term::Group(members) => {
                let mut merged: usize = 1;
                for member in members.iter().filter(|m| !m.is_singleton()) {
                    let p = lookup(AxisId::Named(member.name.clone()))?;
                    perm.push(p);
                    merged = merged
                        .checked_mul(expanded[p])
                        .ok_or(ShapeError::SizeOverflow("output shape"))?;
                }
                shape.push(merged);
            }
        }
    }

    for (i, axis) in layout.axes.iter().enumerate() {
        if perm.contains(&i) {
            continue;
        }
        if expanded[i] != 1 {
            return Err(ShapeError::DroppedAxis {
                axis: axis.to_string(),
                size: expanded[i],
            }
            .into());
        }
        perm.push(i);
    }

    Ok((perm, shape))
}
