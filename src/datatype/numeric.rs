// used when parsing numbers out of strings
use std::str::FromStr;

// used for decimal numbers
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use proptest::prelude::*;

use crate::constraint::{ConstraintKind, ConstraintSchema, Constraints};
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::error::{Failure, Reason};
use crate::value::Value;

// ------------- Integer -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl ResourceType for IntegerType {
    fn name(&self) -> &str {
        "Integer"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Integer
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Integer(_) => Ok(value),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Value::Integer(f as i64))
            }
            Value::Decimal(d) if d.is_integer() => {
                d.to_i64().map(Value::Integer).ok_or(Failure::Invalid)
            }
            Value::String(s) => {
                s.trim().parse().map(Value::Integer).map_err(|_| Failure::Invalid)
            }
            _ => Err(Failure::Invalid),
        }
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Integer(_)))
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Integer(_)))
    }
    fn apply_constraints(
        &self,
        value: &Value,
        constraints: &Constraints,
    ) -> Result<Option<Value>, Failure> {
        let i = value.as_i64().ok_or(Failure::Invalid)?;
        let mut reasons = Vec::new();
        if let Some(min) = constraints.i64("min") {
            if i < min {
                reasons.push(
                    Reason::new("must be more than or equal to %{min}").with_var("min", min),
                );
            }
        }
        if let Some(max) = constraints.i64("max") {
            if i > max {
                reasons.push(
                    Reason::new("must be less than or equal to %{max}").with_var("max", max),
                );
            }
        }
        if reasons.is_empty() {
            Ok(None)
        } else {
            Err(Failure::from_reasons(reasons))
        }
    }
    fn describe(&self, constraints: &Constraints) -> Option<String> {
        Some(match (constraints.i64("min"), constraints.i64("max")) {
            (Some(min), Some(max)) => format!("integer between {} and {}", min, max),
            (Some(min), None) => format!("integer of at least {}", min),
            (None, Some(max)) => format!("integer of at most {}", max),
            (None, None) => String::from("integer"),
        })
    }
    fn constraints(&self) -> ConstraintSchema {
        ConstraintSchema::new()
            .option("min", ConstraintKind::Integer)
            .option("max", ConstraintKind::Integer)
    }
    fn generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        let min = constraints.i64("min").unwrap_or(i64::MIN);
        let max = constraints.i64("max").unwrap_or(i64::MAX).max(min);
        Some((min..=max).prop_map(Value::Integer).boxed())
    }
}

// ------------- Float -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl ResourceType for FloatType {
    fn name(&self) -> &str {
        "Float"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Float
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        let f = match value {
            Value::Float(f) => f,
            Value::Integer(i) => i as f64,
            Value::Decimal(d) => d.to_f64().ok_or(Failure::Invalid)?,
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| Failure::Invalid)?,
            _ => return Err(Failure::Invalid),
        };
        if f.is_finite() {
            Ok(Value::Float(f))
        } else {
            Err(Failure::Invalid)
        }
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Float(_) => Ok(value),
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            _ => Err(Failure::Invalid),
        }
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Float(_)))
    }
    fn apply_constraints(
        &self,
        value: &Value,
        constraints: &Constraints,
    ) -> Result<Option<Value>, Failure> {
        let f = value.as_f64().ok_or(Failure::Invalid)?;
        let mut reasons = Vec::new();
        if let Some(min) = constraints.f64("min") {
            if f < min {
                reasons.push(
                    Reason::new("must be greater than or equal to %{min}").with_var("min", min),
                );
            }
        }
        if let Some(max) = constraints.f64("max") {
            if f > max {
                reasons.push(
                    Reason::new("must be less than or equal to %{max}").with_var("max", max),
                );
            }
        }
        if let Some(bound) = constraints.f64("greater_than") {
            if f <= bound {
                reasons.push(
                    Reason::new("must be greater than %{greater_than}")
                        .with_var("greater_than", bound),
                );
            }
        }
        if let Some(bound) = constraints.f64("less_than") {
            if f >= bound {
                reasons.push(
                    Reason::new("must be less than %{less_than}").with_var("less_than", bound),
                );
            }
        }
        if reasons.is_empty() {
            Ok(None)
        } else {
            Err(Failure::from_reasons(reasons))
        }
    }
    fn constraints(&self) -> ConstraintSchema {
        ConstraintSchema::new()
            .option("min", ConstraintKind::Number)
            .option("max", ConstraintKind::Number)
            .option("greater_than", ConstraintKind::Number)
            .option("less_than", ConstraintKind::Number)
    }
    fn generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        let low = constraints
            .f64("min")
            .or_else(|| constraints.f64("greater_than").map(|g| g + 1.0))
            .unwrap_or(-1.0e9);
        let high = constraints
            .f64("max")
            .or_else(|| constraints.f64("less_than").map(|l| l - 1.0))
            .unwrap_or(1.0e9)
            .max(low);
        Some((low..=high).prop_map(Value::Float).boxed())
    }
}

// ------------- Decimal -------------

/// Arbitrary precision decimal. Stored natively as a decimal, embedded as a
/// string so that no precision is lost in documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType;

fn to_decimal(value: Value) -> Result<BigDecimal, Failure> {
    match value {
        Value::Decimal(d) => Ok(d),
        Value::Integer(i) => Ok(BigDecimal::from(i)),
        Value::Float(f) if f.is_finite() => {
            BigDecimal::from_str(&f.to_string()).map_err(|_| Failure::Invalid)
        }
        Value::String(s) => BigDecimal::from_str(s.trim()).map_err(|_| Failure::Invalid),
        _ => Err(Failure::Invalid),
    }
}

impl ResourceType for DecimalType {
    fn name(&self) -> &str {
        "Decimal"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Decimal
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        to_decimal(value).map(Value::Decimal)
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        to_decimal(value).map(Value::Decimal)
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Decimal(_)))
    }
    fn dump_to_embedded(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Decimal(d) => Ok(Value::String(d.to_string())),
            _ => Err(Failure::Invalid),
        }
    }
    // BigDecimal equality ignores trailing zeros
    fn equal(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Decimal(l), Value::Decimal(r)) => l == r,
            _ => left == right,
        }
    }
    fn apply_constraints(
        &self,
        value: &Value,
        constraints: &Constraints,
    ) -> Result<Option<Value>, Failure> {
        let Value::Decimal(d) = value else {
            return Err(Failure::Invalid);
        };
        let rounded = constraints
            .usize("scale")
            .map(|scale| d.with_scale_round(scale as i64, RoundingMode::HalfUp));
        let d = rounded.as_ref().unwrap_or(d);

        let mut reasons = Vec::new();
        if let Some(min) = constraints.decimal("min") {
            if *d < min {
                reasons.push(
                    Reason::new("must be more than or equal to %{min}").with_var("min", min),
                );
            }
        }
        if let Some(max) = constraints.decimal("max") {
            if *d > max {
                reasons.push(
                    Reason::new("must be less than or equal to %{max}").with_var("max", max),
                );
            }
        }
        if let Some(precision) = constraints.usize("precision") {
            if d.digits() > precision as u64 {
                reasons.push(
                    Reason::new("must have no more than %{precision} significant digits")
                        .with_var("precision", precision),
                );
            }
        }
        if !reasons.is_empty() {
            return Err(Failure::from_reasons(reasons));
        }
        Ok(rounded.filter(|r| r.to_string() != value.to_string()).map(Value::Decimal))
    }
    fn constraints(&self) -> ConstraintSchema {
        ConstraintSchema::new()
            .option("min", ConstraintKind::Decimal)
            .option("max", ConstraintKind::Decimal)
            .option("precision", ConstraintKind::NonNegInteger)
            .option("scale", ConstraintKind::NonNegInteger)
    }
    fn generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        let places = match constraints.usize("scale") {
            Some(scale) => {
                let scale = scale.min(MAX_GENERATED_PLACES) as u32;
                scale..=scale
            }
            None => 0..=4,
        };
        let min = constraints.decimal("min");
        let max = constraints.decimal("max");
        // the largest unscaled value with at most `precision` digits
        let digits_limit = constraints
            .usize("precision")
            .and_then(|p| u32::try_from(p).ok())
            .and_then(|p| 10i64.checked_pow(p))
            .map(|l| l - 1)
            .unwrap_or(i64::MAX);
        Some(
            places
                .prop_flat_map(move |places| {
                    let low = unit_bound(min.clone(), places, RoundingMode::Ceiling)
                        .unwrap_or(i64::from(i32::MIN))
                        .max(-digits_limit);
                    let high = unit_bound(max.clone(), places, RoundingMode::Floor)
                        .unwrap_or(i64::from(i32::MAX))
                        .min(digits_limit)
                        .max(low);
                    (low..=high).prop_map(move |units| {
                        Value::Decimal(BigDecimal::new(BigInt::from(units), i64::from(places)))
                    })
                })
                .boxed(),
        )
    }
}

const MAX_GENERATED_PLACES: usize = 18;

/// `bound` in units of `10^-places`, rounded inwards and saturated to `i64`.
fn unit_bound(bound: Option<BigDecimal>, places: u32, mode: RoundingMode) -> Option<i64> {
    let scaled = (bound? * BigDecimal::from(10i64.pow(places))).with_scale_round(0, mode);
    let saturated = if scaled > BigDecimal::from(0) { i64::MAX } else { i64::MIN };
    Some(scaled.to_i64().unwrap_or(saturated))
}
