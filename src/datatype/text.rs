// used for string constraints and generators
use std::borrow::Cow;

use proptest::prelude::*;
use proptest::string::string_regex;

use crate::constraint::{self, ConstraintKind, ConstraintSchema, Constraints};
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::error::{Failure, Reason};
use crate::value::Value;

fn text_schema() -> ConstraintSchema {
    ConstraintSchema::new()
        .option_with_default("trim?", ConstraintKind::Boolean, true)
        .option_with_default("allow_empty?", ConstraintKind::Boolean, false)
        .option("min_length", ConstraintKind::NonNegInteger)
        .option("max_length", ConstraintKind::NonNegInteger)
        .option("match", ConstraintKind::Regex)
}

fn cast_text(value: Value, constraints: &Constraints) -> CastResult {
    match value {
        Value::String(s) if s.is_empty() && !constraints.flag("allow_empty?", false) => {
            Ok(Value::Nil)
        }
        Value::String(s) => Ok(Value::String(s)),
        _ => Err(Failure::Invalid),
    }
}

fn apply_text(
    value: &Value,
    constraints: &Constraints,
    casing: Option<&str>,
) -> Result<Option<Value>, Failure> {
    let original = value.as_str().ok_or(Failure::Invalid)?;
    let mut text = if constraints.flag("trim?", true) {
        Cow::Borrowed(original.trim())
    } else {
        Cow::Borrowed(original)
    };
    if text.is_empty() && !constraints.flag("allow_empty?", false) {
        return Ok(Some(Value::Nil));
    }
    match casing {
        Some("upper") => text = Cow::Owned(text.to_uppercase()),
        Some("lower") => text = Cow::Owned(text.to_lowercase()),
        _ => (),
    }

    let mut reasons = Vec::new();
    let length = text.chars().count();
    if let Some(min) = constraints.usize("min_length") {
        if length < min {
            reasons.push(
                Reason::new("length must be greater than or equal to %{min}").with_var("min", min),
            );
        }
    }
    if let Some(max) = constraints.usize("max_length") {
        if length > max {
            reasons.push(
                Reason::new("length must be less than or equal to %{max}").with_var("max", max),
            );
        }
    }
    if let Some(pattern) = constraints.str("match") {
        let reason = match constraint::regex(pattern) {
            Some(re) if re.is_match(&text) => None,
            Some(_) => Some("must match the pattern %{regex}"),
            None => Some("invalid pattern %{regex}"),
        };
        if let Some(message) = reason {
            reasons.push(Reason::new(message).with_var("regex", pattern));
        }
    }

    if !reasons.is_empty() {
        return Err(Failure::from_reasons(reasons));
    }
    if text == original {
        Ok(None)
    } else {
        Ok(Some(Value::String(text.into_owned())))
    }
}

fn describe_text(name: &str, constraints: &Constraints) -> String {
    match (constraints.usize("min_length"), constraints.usize("max_length")) {
        (Some(min), Some(max)) => format!("{} of {} to {} characters", name, min, max),
        (Some(min), None) => format!("{} of at least {} characters", name, min),
        (None, Some(max)) => format!("{} of at most {} characters", name, max),
        (None, None) => name.to_owned(),
    }
}

/// Strings the type accepts unchanged. Without `match` the alphabet is never
/// padded or empty, so only a pattern can produce values the filter drops.
fn generate_text(constraints: &Constraints, casing: Option<&str>) -> Option<BoxedStrategy<Value>> {
    let raw = match constraints.str("match") {
        Some(pattern) => string_regex(pattern).ok()?,
        None => {
            let min = constraints.usize("min_length").unwrap_or(1).max(1);
            let max = constraints.usize("max_length").unwrap_or(min + 16).max(min);
            string_regex(&format!("[a-zA-Z0-9]{{{},{}}}", min, max)).ok()?
        }
    };
    let casing = casing.map(str::to_owned);
    let recased = casing.clone();
    let constraints = constraints.clone();
    Some(
        raw.prop_map(move |s| match recased.as_deref() {
            Some("upper") => s.to_uppercase(),
            Some("lower") => s.to_lowercase(),
            _ => s,
        })
        .prop_map(Value::String)
        .prop_filter("outside the string constraints", move |v| {
            matches!(apply_text(v, &constraints, casing.as_deref()), Ok(None))
        })
        .boxed(),
    )
}

// ------------- String -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl ResourceType for StringType {
    fn name(&self) -> &str {
        "String"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Text
    }
    fn cast_input(&self, value: Value, constraints: &Constraints) -> CastResult {
        cast_text(value, constraints)
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::String(_)))
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::String(_)))
    }
    fn apply_constraints(
        &self,
        value: &Value,
        constraints: &Constraints,
    ) -> Result<Option<Value>, Failure> {
        apply_text(value, constraints, None)
    }
    fn describe(&self, constraints: &Constraints) -> Option<String> {
        Some(describe_text("string", constraints))
    }
    fn constraints(&self) -> ConstraintSchema {
        text_schema()
    }
    fn generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        generate_text(constraints, None)
    }
}

// ------------- CiString -------------

/// A string compared without regard to case.
#[derive(Debug, Clone, Copy, Default)]
pub struct CiStringType;

impl ResourceType for CiStringType {
    fn name(&self) -> &str {
        "CiString"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::CiText
    }
    fn cast_input(&self, value: Value, constraints: &Constraints) -> CastResult {
        cast_text(value, constraints)
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::String(_)))
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::String(_)))
    }
    fn apply_constraints(
        &self,
        value: &Value,
        constraints: &Constraints,
    ) -> Result<Option<Value>, Failure> {
        apply_text(value, constraints, constraints.str("casing"))
    }
    fn equal(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::String(l), Value::String(r)) => l.to_lowercase() == r.to_lowercase(),
            _ => left == right,
        }
    }
    fn describe(&self, constraints: &Constraints) -> Option<String> {
        Some(describe_text("case insensitive string", constraints))
    }
    fn constraints(&self) -> ConstraintSchema {
        text_schema().option("casing", ConstraintKind::OneOf(&["upper", "lower"]))
    }
    fn generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        generate_text(constraints, constraints.str("casing"))
    }
}
