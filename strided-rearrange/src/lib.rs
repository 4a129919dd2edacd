//! einops-style `rearrange` over dense row-major buffers.
//!
//! A rearrangement is described by two pattern sides, for example
//! `"b (h w) c"` and `"b h w c"`. The engine parses both sides, checks them
//! against each other, binds every axis to a size using the input shape and
//! caller-supplied lengths, and then moves the data through zero-copy views:
//! reshape to the intermediate layout, broadcast of `1` axes, permutation to
//! output order, and a single materializing copy.
//!
//! # Quick start
//!
//! ```
//! use std::collections::HashMap;
//! use strided_rearrange::rearrange;
//!
//! let x: Vec<f64> = (0..24).map(|v| v as f64).collect();
//! let lengths = HashMap::from([("h".to_string(), 2)]);
//! let (out, shape) = rearrange(&x, &[6, 4], "(h w) c", "h w c", &lengths).unwrap();
//! assert_eq!(shape, vec![2, 3, 4]);
//! assert_eq!(out, x);
//! ```

use std::collections::HashMap;

use log::debug;
use smallvec::SmallVec;
use strided_view::{StridedArray, StridedError};

/// Error types for rearrange operations.
pub mod error;
/// Buffer execution of a resolved plan.
pub mod execute;
/// Intermediate layout and broadcast bookkeeping.
pub mod layout;
/// Pattern tokenizer and spec builder.
pub mod parse;
/// Axis size binding.
pub mod resolve;
/// Cross-side pattern checks.
pub mod validate;

pub use error::{ErrorKind, ParseError, RearrangeError, Result, ShapeError, Side, ValidationError};
pub use execute::{Element, RearrangePlan};
pub use layout::{IntermediateLayout, RepeatOp};
pub use parse::{parse_pattern, parse_side, AxisSpec};
pub use resolve::{AxisId, AxisSizeMap};

/// Largest rank of any input, intermediate or output layout.
pub const MAX_RANK: usize = 10;

/// Rank-bounded inline vector.
pub type SVec<T> = SmallVec<[T; MAX_RANK]>;

/// Execution options of a [`Rearrange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RearrangeOptions {
    /// Split the final copy across the rayon pool. Needs the `parallel`
    /// feature; ignored otherwise. Results are identical either way.
    pub parallel: bool,
}

/// A parsed and validated pair of pattern sides, reusable across shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rearrange {
    input: Vec<AxisSpec>,
    output: Vec<AxisSpec>,
    options: RearrangeOptions,
}

impl Rearrange {
    /// Parse and validate the two sides of a rearrangement.
    pub fn new(input_pattern: &str, output_pattern: &str) -> Result<Self> {
        Self::from_specs(parse_side(input_pattern)?, parse_side(output_pattern)?)
    }

    /// Parse and validate a combined `"input -> output"` pattern.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let (input, output) = parse_pattern(pattern)?;
        Self::from_specs(input, output)
    }

    fn from_specs(input: Vec<AxisSpec>, output: Vec<AxisSpec>) -> Result<Self> {
        validate::validate(&input, &output)?;
        debug!("rearrange input spec {:?}", input);
        debug!("rearrange output spec {:?}", output);
        Ok(Self {
            input,
            output,
            options: RearrangeOptions::default(),
        })
    }

    /// Replace the execution options.
    pub fn with_options(mut self, options: RearrangeOptions) -> Self {
        self.options = options;
        self
    }

    /// Current execution options.
    pub fn options(&self) -> RearrangeOptions {
        self.options
    }

    /// Resolve sizes and layouts for one input shape without touching data.
    pub fn plan(&self, shape: &[usize], axis_lengths: &HashMap<String, usize>) -> Result<RearrangePlan> {
        resolve::check_rank(shape)?;
        let mut resolution = resolve::resolve_shapes(&self.input, shape, axis_lengths)?;
        let (layout, repeats) =
            layout::build_layout(&self.input, &self.output, shape, &mut resolution)?;
        RearrangePlan::new(
            &self.output,
            shape,
            layout,
            repeats,
            resolution.ellipsis_dims,
        )
    }

    /// Plan and execute against a row-major buffer of `shape`.
    pub fn apply<T: Element>(
        &self,
        buffer: &[T],
        shape: &[usize],
        axis_lengths: &HashMap<String, usize>,
    ) -> Result<(Vec<T>, Vec<usize>)> {
        let out = self.apply_array(buffer, shape, axis_lengths)?;
        let dims = out.dims().to_vec();
        Ok((out.into_vec(), dims))
    }

    fn apply_array<T: Element>(
        &self,
        buffer: &[T],
        shape: &[usize],
        axis_lengths: &HashMap<String, usize>,
    ) -> Result<StridedArray<T>> {
        let plan = self.plan(shape, axis_lengths)?;
        plan.execute(buffer, self.options.parallel)
    }
}

/// Rearrange a row-major buffer from `input_pattern` to `output_pattern`.
///
/// Returns the new buffer and its shape. `axis_lengths` supplies sizes that
/// the input shape cannot determine: broadcast targets of input `1` axes and
/// group members.
pub fn rearrange<T: Element>(
    buffer: &[T],
    shape: &[usize],
    input_pattern: &str,
    output_pattern: &str,
    axis_lengths: &HashMap<String, usize>,
) -> Result<(Vec<T>, Vec<usize>)> {
    resolve::check_rank(shape)?;
    Rearrange::new(input_pattern, output_pattern)?.apply(buffer, shape, axis_lengths)
}

/// [`rearrange`] with a combined `"input -> output"` pattern.
pub fn rearrange_pattern<T: Element>(
    buffer: &[T],
    shape: &[usize],
    pattern: &str,
    axis_lengths: &HashMap<String, usize>,
) -> Result<(Vec<T>, Vec<usize>)> {
    resolve::check_rank(shape)?;
    Rearrange::from_pattern(pattern)?.apply(buffer, shape, axis_lengths)
}

/// [`rearrange`] for an owned array, which must be dense row-major.
pub fn rearrange_array<T: Element>(
    array: &StridedArray<T>,
    input_pattern: &str,
    output_pattern: &str,
    axis_lengths: &HashMap<String, usize>,
) -> Result<StridedArray<T>> {
    if !array.is_row_major_contiguous() {
        return Err(StridedError::NotContiguous.into());
    }
    resolve::check_rank(array.dims())?;
    Rearrange::new(input_pattern, output_pattern)?.apply_array(
        array.data(),
        array.dims(),
        axis_lengths,
    )
}
