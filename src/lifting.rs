//! Generic scalar to collection lifting.
//!
//! These functions know nothing about types. They take the per-element
//! operation as a closure and implement the collection rules around it:
//! ordering, index tagging, fail-fast casting and the length/nil checks.

use proptest::collection::vec;
use proptest::prelude::*;
use tracing::{debug, trace};

use crate::constraint::Constraints;
use crate::error::{Failure, Reason};
use crate::value::Value;

/// Casts each element in order and stops at the first failure, whose reasons
/// are all tagged with the failing element's index.
pub fn cast_each<F>(values: Vec<Value>, mut cast: F) -> Result<Vec<Value>, Failure>
where
    F: FnMut(Value) -> Result<Value, Failure>,
{
    let mut cast_values = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match cast(value) {
            Ok(v) => cast_values.push(v),
            Err(failure) => {
                debug!(index, %failure, "array cast halted");
                return Err(failure.at_index(index));
            }
        }
    }
    Ok(cast_values)
}

/// Dumps each element in order. Dumping works on values that were already
/// cast, so a failure is reported bare, without an index.
pub fn dump_each<F>(values: Vec<Value>, mut dump: F) -> Result<Vec<Value>, Failure>
where
    F: FnMut(Value) -> Result<Value, Failure>,
{
    let mut dumped = Vec::with_capacity(values.len());
    for value in values {
        match dump(value) {
            Ok(v) => dumped.push(v),
            Err(_) => return Err(Failure::Invalid),
        }
    }
    Ok(dumped)
}

/// One reason per violated length bound.
pub fn length_violations(len: usize, constraints: &Constraints) -> Vec<Reason> {
    let mut reasons = Vec::new();
    if let Some(min) = constraints.usize("min_length") {
        if len < min {
            reasons.push(Reason::new("must have %{min} or more items").with_var("min", min));
        }
    }
    if let Some(max) = constraints.usize("max_length") {
        if len > max {
            reasons.push(Reason::new("must have %{max} or fewer items").with_var("max", max));
        }
    }
    reasons
}

/// Applies array constraints to `values`.
///
/// Length bounds are checked first and, when violated, are the only reasons
/// reported. Element checks then run over every element and collect all
/// violations. `Ok(None)` means the collection is valid as given.
pub fn apply_constraints<F>(
    values: &[Value],
    constraints: &Constraints,
    mut apply: F,
) -> Result<Option<Vec<Value>>, Failure>
where
    F: FnMut(&Value, &Constraints) -> Result<Value, Failure>,
{
    let length_reasons = length_violations(values.len(), constraints);
    if !length_reasons.is_empty() {
        debug!(len = values.len(), "array length out of bounds");
        return Err(Failure::from_reasons(length_reasons));
    }

    let nil_items = constraints.flag("nil_items?", false);
    let items = constraints.items();
    if items.is_empty() && nil_items {
        trace!("no element constraints, skipping element checks");
        return Ok(None);
    }

    let mut applied = Vec::with_capacity(values.len());
    let mut reasons = Vec::new();
    for (index, value) in values.iter().enumerate() {
        if value.is_nil() {
            if !nil_items {
                reasons.push(Reason::new("no nil values").at_index(index));
            }
            applied.push(Value::Nil);
            continue;
        }
        match apply(value, items) {
            Ok(v) => applied.push(v),
            Err(failure) => reasons.extend(failure.at_index(index).flatten()),
        }
    }
    if reasons.is_empty() {
        Ok(Some(applied))
    } else {
        Err(Failure::from_reasons(reasons))
    }
}

/// Positional equality. Paired nils are equal without asking `eq`.
pub fn equal<F>(left: &[Value], right: &[Value], mut eq: F) -> bool
where
    F: FnMut(&Value, &Value) -> bool,
{
    left.len() == right.len()
        && left.iter().zip(right).all(|pair| match pair {
            (Value::Nil, Value::Nil) => true,
            (Value::Nil, _) | (_, Value::Nil) => false,
            (l, r) => eq(l, r),
        })
}

/// Lifts an element strategy into an array strategy honoring the length
/// bounds and `nil_items?`.
pub fn generate_array(
    element: BoxedStrategy<Value>,
    constraints: &Constraints,
) -> BoxedStrategy<Value> {
    let min = constraints.usize("min_length").unwrap_or(0);
    let max = constraints.usize("max_length").unwrap_or(min + 8).max(min);
    let element = if constraints.flag("nil_items?", false) {
        prop_oneof![4 => element, 1 => Just(Value::Nil)].boxed()
    } else {
        element
    };
    vec(element, min..=max).prop_map(Value::Array).boxed()
}
