//! Binding of axis names to concrete sizes.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::ShapeError;
use crate::parse::{terms, AxisSpec, Term};
use crate::MAX_RANK;

/// Identity of one elementary axis of the intermediate layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AxisId {
    /// An axis named in the pattern.
    Named(String),
    /// The `i`-th dimension absorbed by the ellipsis.
    Batch(usize),
    /// An input `1` at spec entry `i` that is squeezed rather than broadcast.
    Singleton(usize),
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisId::Named(name) => f.write_str(name),
            AxisId::Batch(i) => write!(f, "batch_{}", i),
            AxisId::Singleton(i) => write!(f, "singleton_{}", i),
        }
    }
}

/// Sizes bound to axes during one call. A bound size never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSizeMap {
    sizes: HashMap<AxisId, usize>,
}

impl AxisSizeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the map with caller-supplied lengths, which must be positive.
    pub fn with_lengths(axis_lengths: &HashMap<String, usize>) -> crate::Result<Self> {
        let mut map = Self::new();
        for (name, &len) in axis_lengths {
            if len == 0 {
                return Err(ShapeError::InvalidAxisLength(name.clone()).into());
            }
            map.sizes.insert(AxisId::Named(name.clone()), len);
        }
        Ok(map)
    }

    pub fn get(&self, axis: &AxisId) -> Option<usize> {
        self.sizes.get(axis).copied()
    }

    pub fn get_named(&self, name: &str) -> Option<usize> {
        self.get(&AxisId::Named(name.to_string()))
    }

    /// Bind `axis` to `size`; rebinding to a different size is an error.
    pub fn bind(&mut self, axis: AxisId, size: usize) -> crate::Result<()> {
        match self.sizes.get(&axis) {
            Some(&bound) if bound != size => Err(ShapeError::AxisLengthConflict {
                axis: axis.to_string(),
                supplied: bound,
                actual: size,
            }
            .into()),
            Some(_) => Ok(()),
            None => {
                self.sizes.insert(axis, size);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Output of [`resolve_shapes`].
#[derive(Debug, Clone)]
pub struct Resolution {
    pub sizes: AxisSizeMap,
    /// Number of input dimensions absorbed by the ellipsis (0 without one).
    pub ellipsis_dims: usize,
}

/// Reject input shapes above [`MAX_RANK`], whatever the pattern says.
pub fn check_rank(shape: &[usize]) -> crate::Result<()> {
    if shape.len() > MAX_RANK {
        return Err(ShapeError::RankExceedsMaximum {
            rank: shape.len(),
            max: MAX_RANK,
        }
        .into());
    }
    Ok(())
}

/// Walk the input side against `shape`, binding plain and batch axes.
///
/// Group members are left unbound; the layout builder derives them from the
/// group's dimension.
pub fn resolve_shapes(
    input: &[AxisSpec],
    shape: &[usize],
    axis_lengths: &HashMap<String, usize>,
) -> crate::Result<Resolution> {
    check_rank(shape)?;
    let rank = shape.len();

    let mut sizes = AxisSizeMap::with_lengths(axis_lengths)?;
    let terms = terms(input);
    let has_ellipsis = terms.iter().any(|(_, t)| matches!(t, Term::Ellipsis));
    let required = terms.len() - usize::from(has_ellipsis);

    let ellipsis_dims = if has_ellipsis {
        rank.checked_sub(required)
            .ok_or(ShapeError::RankMismatch { rank, required })?
    } else if rank < required {
        return Err(ShapeError::TooFewDimensions { rank, required }.into());
    } else if rank > required {
        return Err(ShapeError::TooManyDimensions { rank, required }.into());
    } else {
        0
    };

    let mut pos = 0;
    for (_, term) in terms {
        match term {
            Term::Ellipsis => {
                for i in 0..ellipsis_dims {
                    sizes.bind(AxisId::Batch(i), shape[pos])?;
                    pos += 1;
                }
            }
            Term::Singleton => {
                if shape[pos] != 1 {
                    return Err(ShapeError::ExpectedSingleton {
                        position: pos,
                        size: shape[pos],
                    }
                    .into());
                }
                pos += 1;
            }
            Term::Axis(name) => {
                sizes.bind(AxisId::Named(name.to_string()), shape[pos])?;
                pos += 1;
            }
            Term::Group(_) => pos += 1,
        }
    }

    debug!(
        "resolved shape {:?}: {} bound axes, ellipsis absorbs {}",
        shape,
        sizes.len(),
        ellipsis_dims
    );
    Ok(Resolution {
        sizes,
        ellipsis_dims,
    })
}
