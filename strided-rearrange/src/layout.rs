//! Intermediate layout: the input with every group split into its members.

use log::debug;

use crate::error::ShapeError;
use crate::parse::{terms, AxisSpec, Term};
use crate::resolve::{AxisId, Resolution};
use crate::validate::is_broadcast_pair;
use crate::{SVec, MAX_RANK};

/// Flattened (axis, size) sequence before broadcast and permutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntermediateLayout {
    pub axes: SVec<AxisId>,
    pub sizes: SVec<usize>,
}

impl IntermediateLayout {
    fn push(&mut self, axis: AxisId, size: usize) {
        self.axes.push(axis);
        self.sizes.push(size);
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

/// Broadcast of the size-1 axis at `position` to `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatOp {
    pub position: usize,
    pub length: usize,
}

/// Sizes of a group's members, given the dimension the group occupies.
///
/// At most one member may be unknown; its size is the exact quotient of the
/// group dimension by the product of the others.
pub fn split_group(
    members: &[AxisSpec],
    group_size: usize,
    resolution: &Resolution,
) -> crate::Result<SVec<usize>> {
    let group_names = || members.iter().map(|m| m.name.clone()).collect::<Vec<_>>();

    let known: SVec<Option<usize>> = members
        .iter()
        .map(|m| {
            if m.is_singleton() {
                Some(1)
            } else {
                resolution.sizes.get_named(&m.name)
            }
        })
        .collect();

    let mut known_product: usize = 1;
    for size in known.iter().flatten() {
        known_product = known_product
            .checked_mul(*size)
            .ok_or(ShapeError::SizeOverflow("group size"))?;
    }

    let unknown: SVec<usize> = (0..members.len()).filter(|&i| known[i].is_none()).collect();
    match unknown.as_slice() {
        [] => {
            if known_product != group_size {
                return Err(ShapeError::GroupSizeMismatch {
                    group: group_names(),
                    known: known_product,
                    actual: group_size,
                }
                .into());
            }
            Ok(known.iter().map(|s| s.unwrap_or(1)).collect())
        }
        &[missing] => {
            if group_size % known_product != 0 {
                return Err(ShapeError::NonDivisibleGroup {
                    axis: members[missing].name.clone(),
                    known: known_product,
                    actual: group_size,
                }
                .into());
            }
            let derived = group_size / known_product;
            Ok(known.iter().map(|s| s.unwrap_or(derived)).collect())
        }
        _ => Err(ShapeError::TooManyUnknownSizes(group_names()).into()),
    }
}

/// Expand the input side into the intermediate layout and its broadcasts.
///
/// Derived group member sizes are bound into `resolution.sizes`.
pub fn build_layout(
    input: &[AxisSpec],
    output: &[AxisSpec],
    shape: &[usize],
    resolution: &mut Resolution,
) -> crate::Result<(IntermediateLayout, SVec<RepeatOp>)> {
    let mut layout = IntermediateLayout::default();
    let mut repeats = SVec::new();
    let mut pos = 0;

    for (start, term) in terms(input) {
        match term {
            Term::Ellipsis => {
                for i in 0..resolution.ellipsis_dims {
                    layout.push(AxisId::Batch(i), shape[pos]);
                    pos += 1;
                }
            }
            Term::Singleton => {
                if is_broadcast_pair(input, output, start) {
                    let name = &output[start].name;
                    let length = resolution
                        .sizes
                        .get_named(name)
                        .ok_or_else(|| ShapeError::MissingBroadcastLength(name.clone()))?;
                    repeats.push(RepeatOp {
                        position: layout.len(),
                        length,
                    });
                    layout.push(AxisId::Named(name.clone()), 1);
                } else {
                    layout.push(AxisId::Singleton(start), 1);
                }
                pos += 1;
            }
            Term::Axis(name) => {
                layout.push(AxisId::Named(name.to_string()), shape[pos]);
                pos += 1;
            }
            Term::Group(members) => {
                let sizes = split_group(members, shape[pos], resolution)?;
                for (k, (member, &size)) in members.iter().zip(sizes.iter()).enumerate() {
                    if member.is_singleton() {
                        layout.push(AxisId::Singleton(start + k), 1);
                    } else {
                        resolution
                            .sizes
                            .bind(AxisId::Named(member.name.clone()), size)?;
                        layout.push(AxisId::Named(member.name.clone()), size);
                    }
                }
                pos += 1;
            }
        }
    }

    if layout.len() > MAX_RANK {
        return Err(ShapeError::RankExceedsMaximum {
            rank: layout.len(),
            max: MAX_RANK,
        }
        .into());
    }

    debug!(
        "intermediate layout {:?} with repeats {:?}",
        layout
            .axes
            .iter()
            .zip(layout.sizes.iter())
            .map(|(a, s)| format!("{}={}", a, s))
            .collect::<Vec<_>>(),
        repeats
    );
    Ok((layout, repeats))
}
