//! Cross-side consistency checks that need no runtime shape.

use std::collections::HashSet;

use crate::error::{Side, ValidationError};
use crate::parse::AxisSpec;

fn named_axes<'a>(spec: &'a [AxisSpec], side: Side) -> crate::Result<Vec<&'a str>> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for entry in spec.iter().filter(|a| a.is_named()) {
        if !seen.insert(entry.name.as_str()) {
            return Err(ValidationError::DuplicateAxis {
                axis: entry.name.clone(),
                side,
            }
            .into());
        }
        names.push(entry.name.as_str());
    }
    Ok(names)
}

/// True if output entry `pos` is broadcast from an input `1` at the same position.
pub(crate) fn is_broadcast_pair(input: &[AxisSpec], output: &[AxisSpec], pos: usize) -> bool {
    match (input.get(pos), output.get(pos)) {
        (Some(i), Some(o)) => {
            i.is_singleton()
                && !i.is_group()
                && o.is_named()
                && !input.iter().any(|a| a.name == o.name)
        }
        _ => false,
    }
}

/// Check that the two sides can describe one rearrangement.
///
/// Output axes absent from the input are allowed only when the input holds a
/// literal `1` somewhere, and each such axis must sit at the position of an
/// input `1` so it has a slot to broadcast from.
pub fn validate(input: &[AxisSpec], output: &[AxisSpec]) -> crate::Result<()> {
    let in_ellipsis = input.iter().any(|a| a.is_ellipsis);
    let out_ellipsis = output.iter().any(|a| a.is_ellipsis);
    if in_ellipsis != out_ellipsis {
        return Err(ValidationError::EllipsisAsymmetry {
            input: in_ellipsis,
            output: out_ellipsis,
        }
        .into());
    }

    let input_axes = named_axes(input, Side::Input)?;
    let output_axes = named_axes(output, Side::Output)?;

    let missing: Vec<&str> = output_axes
        .iter()
        .copied()
        .filter(|name| !input_axes.contains(name))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    if !input.iter().any(|a| a.is_singleton()) {
        return Err(ValidationError::UnresolvableOutputAxes(
            missing.iter().map(|s| s.to_string()).collect(),
        )
        .into());
    }

    for name in missing {
        let paired = output
            .iter()
            .enumerate()
            .any(|(pos, o)| o.name == name && is_broadcast_pair(input, output, pos));
        if !paired {
            return Err(ValidationError::UnpairedBroadcastAxis(name.to_string()).into());
        }
    }
    Ok(())
}
