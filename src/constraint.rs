//! Constraint sets, the schemas types declare for them, and the scalar
//! evaluation rule.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use bigdecimal::BigDecimal;
use lazy_static::lazy_static;
use regex::Regex;

use crate::contract::ResourceType;
use crate::error::{Failure, RescoreError, Result};
use crate::registry::OtherHasher;
use crate::value::Value;

static NO_CONSTRAINTS: Constraints = Constraints::new();

lazy_static! {
    // compiled `match` patterns, filled when constraints are validated
    static ref PATTERNS: RwLock<HashMap<String, Regex, OtherHasher>> =
        RwLock::new(HashMap::default());
}

/// The compiled form of `pattern`, compiling it only the first time it is
/// seen. `None` when the pattern is not a valid regular expression.
pub fn regex(pattern: &str) -> Option<Regex> {
    let cached = PATTERNS.read().ok().and_then(|patterns| patterns.get(pattern).cloned());
    if cached.is_some() {
        return cached;
    }
    let compiled = Regex::new(pattern).ok()?;
    if let Ok(mut patterns) = PATTERNS.write() {
        patterns.insert(pattern.to_owned(), compiled.clone());
    }
    Some(compiled)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Value(Value),
    Nested(Constraints),
}

/// Ordered constraint name to constraint value mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    entries: Vec<(String, Constraint)>,
}

impl Constraints {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
    pub fn empty() -> &'static Constraints {
        &NO_CONSTRAINTS
    }
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, Constraint::Value(value.into()));
        self
    }
    pub fn with_nested(mut self, name: &str, nested: Constraints) -> Self {
        self.insert(name, Constraint::Nested(nested));
        self
    }
    /// Replaces in place so the original position is kept.
    pub fn insert(&mut self, name: &str, constraint: Constraint) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = constraint,
            None => self.entries.push((name.to_owned(), constraint)),
        }
    }
    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, c)| c)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(Constraint::Value(v)) if !v.is_nil() => Some(v),
            _ => None,
        }
    }
    pub fn nested(&self, name: &str) -> Option<&Constraints> {
        match self.get(name) {
            Some(Constraint::Nested(c)) => Some(c),
            _ => None,
        }
    }
    /// Constraints for the elements of an array, empty when none were given.
    pub fn items(&self) -> &Constraints {
        self.nested("items").unwrap_or(&NO_CONSTRAINTS)
    }
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.bool(name).unwrap_or(default)
    }
    pub fn i64(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }
    pub fn usize(&self, name: &str) -> Option<usize> {
        self.i64(name).and_then(|i| usize::try_from(i).ok())
    }
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_f64)
    }
    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }
    pub fn decimal(&self, name: &str) -> Option<BigDecimal> {
        self.value(name).and_then(decimal_of)
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c))
    }
}

fn decimal_of(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Decimal(d) => Some(d.clone()),
        Value::Integer(i) => Some(BigDecimal::from(*i)),
        Value::Float(f) => f.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ------------- Schemas -------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    Boolean,
    Integer,
    NonNegInteger,
    Number,
    Decimal,
    String,
    Regex,
    OneOf(&'static [&'static str]),
    Nested,
}

impl ConstraintKind {
    fn accepts(&self, constraint: &Constraint) -> bool {
        let value = match constraint {
            Constraint::Nested(_) => return matches!(self, Self::Nested),
            Constraint::Value(Value::Nil) => return true,
            Constraint::Value(v) => v,
        };
        match self {
            Self::Boolean => matches!(value, Value::Bool(_)),
            Self::Integer => matches!(value, Value::Integer(_)),
            Self::NonNegInteger => matches!(value, Value::Integer(i) if *i >= 0),
            Self::Number => matches!(value, Value::Integer(_) | Value::Float(_)),
            Self::Decimal => decimal_of(value).is_some(),
            Self::String => matches!(value, Value::String(_)),
            Self::Regex => matches!(value, Value::String(s) if regex(s).is_some()),
            Self::OneOf(options) => {
                matches!(value, Value::String(s) if options.contains(&s.as_str()))
            }
            Self::Nested => false,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "a boolean"),
            Self::Integer => write!(f, "an integer"),
            Self::NonNegInteger => write!(f, "a non-negative integer"),
            Self::Number => write!(f, "a number"),
            Self::Decimal => write!(f, "a decimal"),
            Self::String => write!(f, "a string"),
            Self::Regex => write!(f, "a valid regular expression"),
            Self::OneOf(options) => write!(f, "one of {}", options.join(", ")),
            Self::Nested => write!(f, "a nested constraint set"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintSpec {
    pub name: &'static str,
    pub kind: ConstraintKind,
    pub default: Option<Value>,
}

/// The constraint keys a type recognizes.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSchema {
    specs: Vec<ConstraintSpec>,
}

impl ConstraintSchema {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// `min_length`, `max_length`, `nil_items?` and `items`.
    pub fn array() -> Self {
        Self::new()
            .option("min_length", ConstraintKind::NonNegInteger)
            .option("max_length", ConstraintKind::NonNegInteger)
            .option_with_default("nil_items?", ConstraintKind::Boolean, false)
            .option("items", ConstraintKind::Nested)
    }

    pub fn option(mut self, name: &'static str, kind: ConstraintKind) -> Self {
        self.specs.retain(|s| s.name != name);
        self.specs.push(ConstraintSpec {
            name,
            kind,
            default: None,
        });
        self
    }

    pub fn option_with_default(
        mut self,
        name: &'static str,
        kind: ConstraintKind,
        default: impl Into<Value>,
    ) -> Self {
        self.specs.retain(|s| s.name != name);
        self.specs.push(ConstraintSpec {
            name,
            kind,
            default: Some(default.into()),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConstraintSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstraintSpec> {
        self.specs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Checks every given constraint against the schema and fills in defaults.
    /// The content of nested sets is left to the caller, which knows the
    /// element type they apply to.
    pub fn validate(&self, constraints: &Constraints) -> Result<Constraints> {
        let mut validated = Constraints::new();
        for (name, constraint) in constraints.iter() {
            let spec = self
                .get(name)
                .ok_or_else(|| RescoreError::constraint(name, "unknown constraint"))?;
            if !spec.kind.accepts(constraint) {
                return Err(RescoreError::constraint(
                    name,
                    format!("expected {}", spec.kind),
                ));
            }
            validated.insert(name, constraint.clone());
        }
        for spec in &self.specs {
            if let (Some(default), false) = (&spec.default, validated.contains(spec.name)) {
                validated.insert(spec.name, Constraint::Value(default.clone()));
            }
        }
        Ok(validated)
    }
}

// ------------- Evaluation -------------

/// Applies a scalar type's constraints, turning "accepted unchanged" into the
/// original value. `Nil` is valid regardless of constraints.
pub fn apply_scalar<T: ResourceType + ?Sized>(
    ty: &T,
    value: &Value,
    constraints: &Constraints,
) -> std::result::Result<Value, Failure> {
    if value.is_nil() {
        return Ok(Value::Nil);
    }
    match ty.apply_constraints(value, constraints)? {
        Some(rewritten) => Ok(rewritten),
        None => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_cached(pattern: &str) -> bool {
        PATTERNS.read().map(|p| p.contains_key(pattern)).unwrap_or(false)
    }

    #[test]
    fn validating_a_pattern_compiles_it_once() {
        let schema = ConstraintSchema::new().option("match", ConstraintKind::Regex);
        let pattern = "^validated-[0-9]+$";
        assert!(!is_cached(pattern));
        schema.validate(&Constraints::new().with("match", pattern)).unwrap();
        assert!(is_cached(pattern));
        assert!(regex(pattern).unwrap().is_match("validated-42"));
    }

    #[test]
    fn invalid_patterns_are_not_cached() {
        assert!(regex("(unclosed").is_none());
        assert!(!is_cached("(unclosed"));
    }
}
