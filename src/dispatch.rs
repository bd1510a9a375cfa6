//! Routing of every operation over a resolved type.
//!
//! Scalars go to the type itself, wrapped in the nil and empty-string rules.
//! Arrays of a scalar go to the element type's `_array` method, which is the
//! generic lifting unless the type overrides it. Arrays of arrays are lifted
//! here, recursing per element.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::strategy::BoxedStrategy;
use tracing::trace;

use crate::constraint::{self, Constraint, ConstraintSchema, Constraints};
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::error::{Failure, RescoreError, Result};
use crate::lifting;
use crate::value::Value;

/// A type reference bound to its implementation.
#[derive(Debug, Clone)]
pub enum ResolvedType {
    Scalar(Arc<dyn ResourceType>),
    Array(Box<ResolvedType>),
    /// A backend type that does not implement the contract. Values pass
    /// through untouched and are always valid.
    Native(String),
}

// ------------- Scalar rules -------------

pub(crate) fn scalar_cast_input<T: ResourceType + ?Sized>(
    ty: &T,
    value: Value,
    constraints: &Constraints,
) -> CastResult {
    if value.is_nil() {
        return Ok(Value::Nil);
    }
    let empty_string = matches!(&value, Value::String(s) if s.is_empty());
    match ty.cast_input(value, constraints) {
        Err(Failure::Invalid) if empty_string => Ok(Value::Nil),
        result => result,
    }
}

pub(crate) fn scalar_cast_stored<T: ResourceType + ?Sized>(
    ty: &T,
    value: Value,
    constraints: &Constraints,
) -> CastResult {
    if value.is_nil() {
        return Ok(Value::Nil);
    }
    ty.cast_stored(value, constraints)
}

pub(crate) fn scalar_dump_to_native<T: ResourceType + ?Sized>(
    ty: &T,
    value: Value,
    constraints: &Constraints,
) -> CastResult {
    if value.is_nil() {
        return Ok(Value::Nil);
    }
    ty.dump_to_native(value, constraints)
}

pub(crate) fn scalar_dump_to_embedded<T: ResourceType + ?Sized>(
    ty: &T,
    value: Value,
    constraints: &Constraints,
) -> CastResult {
    if value.is_nil() {
        return Ok(Value::Nil);
    }
    ty.dump_to_embedded(value, constraints)
}

pub(crate) fn scalar_apply_constraints<T: ResourceType + ?Sized>(
    ty: &T,
    value: &Value,
    constraints: &Constraints,
) -> CastResult {
    constraint::apply_scalar(ty, value, constraints)
}

// ------------- Array input normalization -------------

/// Keys that are all non-negative integers sort numerically, others as text.
fn ordered_values(map: BTreeMap<String, Value>) -> Vec<Value> {
    let mut pairs: Vec<(String, Value)> = map.into_iter().collect();
    let numeric: Option<Vec<u64>> = pairs.iter().map(|(k, _)| k.parse().ok()).collect();
    if let Some(keys) = numeric {
        let mut keyed: Vec<(u64, Value)> =
            keys.into_iter().zip(pairs.into_iter().map(|(_, v)| v)).collect();
        keyed.sort_by_key(|(k, _)| *k);
        return keyed.into_iter().map(|(_, v)| v).collect();
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.into_iter().map(|(_, v)| v).collect()
}

/// The elements of a value presented where an array is expected, or `None`
/// when the shape cannot be an array.
fn array_input(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Nil => Some(Vec::new()),
        Value::String(s) if s.is_empty() => Some(Vec::new()),
        Value::Array(items) => Some(items),
        Value::Map(map) => Some(ordered_values(map)),
        _ => None,
    }
}

fn items_of(value: &Value) -> &[Value] {
    value.as_array().unwrap_or(&[])
}

// ------------- Operations -------------

impl ResolvedType {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Name for messages: the scalar name, `{array, inner}` or the native name.
    pub fn name(&self) -> String {
        match self {
            Self::Scalar(ty) => ty.name().to_owned(),
            Self::Array(inner) => format!("{{array, {}}}", inner.name()),
            Self::Native(name) => format!("native:{}", name),
        }
    }

    pub fn cast_input(&self, value: Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => scalar_cast_input(ty.as_ref(), value, constraints),
            Self::Native(_) => Ok(value),
            Self::Array(inner) => {
                let items = array_input(value).ok_or(Failure::Invalid)?;
                let cast = match inner.as_ref() {
                    Self::Scalar(ty) => {
                        trace!(ty = ty.name(), len = items.len(), "cast_input_array");
                        ty.cast_input_array(items, constraints)?
                    }
                    other => {
                        let item_constraints = constraints.items();
                        lifting::cast_each(items, |v| other.cast_input(v, item_constraints))?
                    }
                };
                Ok(Value::Array(cast))
            }
        }
    }

    pub fn cast_stored(&self, value: Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => scalar_cast_stored(ty.as_ref(), value, constraints),
            Self::Native(_) => Ok(value),
            Self::Array(inner) => {
                let items = match value {
                    Value::Nil => return Ok(Value::Nil),
                    Value::Array(items) => items,
                    _ => return Err(Failure::Invalid),
                };
                let cast = match inner.as_ref() {
                    Self::Scalar(ty) => ty.cast_stored_array(items, constraints)?,
                    other => {
                        let item_constraints = constraints.items();
                        lifting::cast_each(items, |v| other.cast_stored(v, item_constraints))?
                    }
                };
                Ok(Value::Array(cast))
            }
        }
    }

    pub fn dump_to_native(&self, value: Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => scalar_dump_to_native(ty.as_ref(), value, constraints),
            Self::Native(_) => Ok(value),
            Self::Array(inner) => {
                let items = match value {
                    Value::Nil => return Ok(Value::Nil),
                    Value::Array(items) => items,
                    _ => return Err(Failure::Invalid),
                };
                let dumped = match inner.as_ref() {
                    Self::Scalar(ty) => ty.dump_to_native_array(items, constraints)?,
                    other => {
                        let item_constraints = constraints.items();
                        lifting::dump_each(items, |v| other.dump_to_native(v, item_constraints))?
                    }
                };
                Ok(Value::Array(dumped))
            }
        }
    }

    pub fn dump_to_embedded(&self, value: Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => scalar_dump_to_embedded(ty.as_ref(), value, constraints),
            Self::Native(_) => Ok(value),
            Self::Array(inner) => {
                let items = match value {
                    Value::Nil => return Ok(Value::Nil),
                    Value::Array(items) => items,
                    _ => return Err(Failure::Invalid),
                };
                let dumped = match inner.as_ref() {
                    Self::Scalar(ty) => ty.dump_to_embedded_array(items, constraints)?,
                    other => {
                        let item_constraints = constraints.items();
                        lifting::dump_each(items, |v| other.dump_to_embedded(v, item_constraints))?
                    }
                };
                Ok(Value::Array(dumped))
            }
        }
    }

    pub fn apply_constraints(&self, value: &Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => scalar_apply_constraints(ty.as_ref(), value, constraints),
            Self::Native(_) => Ok(value.clone()),
            Self::Array(inner) => {
                let items = match value {
                    Value::Nil => return Ok(Value::Nil),
                    Value::Array(items) => items,
                    _ => return Err(Failure::Invalid),
                };
                let applied = match inner.as_ref() {
                    Self::Scalar(ty) => ty.apply_constraints_array(items, constraints)?,
                    other => lifting::apply_constraints(items, constraints, |v, item_constraints| {
                        other.apply_constraints(v, item_constraints)
                    })?,
                };
                Ok(applied.map_or_else(|| value.clone(), Value::Array))
            }
        }
    }

    pub fn equal(&self, left: &Value, right: &Value) -> bool {
        match (self, left, right) {
            (_, Value::Nil, Value::Nil) => true,
            (_, Value::Nil, _) | (_, _, Value::Nil) => false,
            (Self::Scalar(ty), l, r) => ty.equal(l, r),
            (Self::Native(_), l, r) => l == r,
            (Self::Array(inner), Value::Array(l), Value::Array(r)) => {
                lifting::equal(l, r, |a, b| inner.equal(a, b))
            }
            (Self::Array(_), _, _) => false,
        }
    }

    pub fn handle_change(&self, old: &Value, new: Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => ty.handle_change(old, new, constraints),
            Self::Array(inner) => match (inner.as_ref(), new) {
                (Self::Scalar(ty), Value::Array(items)) => Ok(Value::Array(
                    ty.handle_change_array(items_of(old), items, constraints)?,
                )),
                (_, new) => Ok(new),
            },
            Self::Native(_) => Ok(new),
        }
    }

    pub fn prepare_change(&self, old: &Value, new: Value, constraints: &Constraints) -> CastResult {
        match self {
            Self::Scalar(ty) => ty.prepare_change(old, new, constraints),
            Self::Array(inner) => match (inner.as_ref(), new) {
                (Self::Scalar(ty), Value::Array(items)) => Ok(Value::Array(
                    ty.prepare_change_array(items_of(old), items, constraints)?,
                )),
                (_, new) => Ok(new),
            },
            Self::Native(_) => Ok(new),
        }
    }

    pub fn storage_type(&self, constraints: &Constraints) -> StorageType {
        match self {
            Self::Scalar(ty) => ty.storage_type(constraints),
            Self::Array(inner) => {
                StorageType::Array(Box::new(inner.storage_type(constraints.items())))
            }
            Self::Native(name) => StorageType::Native(name.clone()),
        }
    }

    pub fn describe(&self, constraints: &Constraints) -> String {
        match self {
            Self::Scalar(ty) => ty.describe(constraints).unwrap_or_else(|| ty.name().to_owned()),
            Self::Array(inner) => {
                let mut description = format!("list of {}", inner.describe(constraints.items()));
                let lengths = (constraints.usize("min_length"), constraints.usize("max_length"));
                let bounds = match lengths {
                    (Some(min), Some(max)) => format!(" ({} to {} items)", min, max),
                    (Some(min), None) => format!(" (at least {} items)", min),
                    (None, Some(max)) => format!(" (at most {} items)", max),
                    (None, None) => String::new(),
                };
                description.push_str(&bounds);
                description
            }
            Self::Native(name) => name.clone(),
        }
    }

    pub fn constraints(&self) -> ConstraintSchema {
        match self {
            Self::Scalar(ty) => ty.constraints(),
            Self::Array(inner) => match inner.as_ref() {
                Self::Scalar(ty) => ty.array_constraints(),
                _ => ConstraintSchema::array(),
            },
            Self::Native(_) => ConstraintSchema::new(),
        }
    }

    pub fn embedded(&self) -> bool {
        match self {
            Self::Scalar(ty) => ty.embedded(),
            Self::Array(inner) => inner.embedded(),
            Self::Native(_) => false,
        }
    }

    pub fn cast_in_query(&self, constraints: &Constraints) -> bool {
        match self {
            Self::Scalar(ty) => ty.cast_in_query(constraints),
            Self::Array(inner) => inner.cast_in_query(constraints.items()),
            Self::Native(_) => true,
        }
    }

    /// # Panics
    ///
    /// When the type, or an element type, has no generator. Asking for
    /// generated values of such a type is a bug in the test, not a runtime
    /// condition.
    pub fn generator(&self, constraints: &Constraints) -> BoxedStrategy<Value> {
        self.try_generator(constraints)
            .unwrap_or_else(|| panic!("type {} does not implement a generator", self.name()))
    }

    /// `None` when the type, or an element type, has no generator.
    pub fn try_generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        match self {
            Self::Scalar(ty) => ty.generator(constraints),
            Self::Array(inner) => Some(lifting::generate_array(
                inner.try_generator(constraints.items())?,
                constraints,
            )),
            Self::Native(_) => None,
        }
    }

    /// Validates `constraints` against this type's schema, filling defaults
    /// and recursing into `items`. Arrays default `nil_items?` to false; a
    /// registry or builder supplies its own default instead.
    pub fn init_constraints(&self, constraints: &Constraints) -> Result<Constraints> {
        self.init_constraints_with(constraints, false)
    }

    pub(crate) fn init_constraints_with(
        &self,
        constraints: &Constraints,
        default_nil_items: bool,
    ) -> Result<Constraints> {
        let mut validated = self.constraints().validate(constraints)?;
        if let Self::Array(inner) = self {
            if !constraints.contains("nil_items?") {
                validated.insert("nil_items?", Constraint::Value(Value::Bool(default_nil_items)));
            }
            let bounds = (validated.usize("min_length"), validated.usize("max_length"));
            if let (Some(min), Some(max)) = bounds {
                if min > max {
                    return Err(RescoreError::constraint(
                        "min_length",
                        format!("must not exceed max_length ({} > {})", min, max),
                    ));
                }
            }
            // an absent `items` stays absent, the element fast path depends on it
            if let Some(items) = constraints.nested("items") {
                let items = inner.init_constraints_with(items, default_nil_items)?;
                validated.insert("items", Constraint::Nested(items));
            }
        }
        Ok(validated)
    }
}
