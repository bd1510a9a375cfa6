//! Records embedded in a parent value, built from other resolved types.
//!
//! An embedded type is a map of named attributes. Casting runs every
//! attribute through its own type and constraints and reports every failing
//! attribute at once, each reason carrying a `field` variable. Arrays of an
//! embedded type with a primary key merge changes by key and reject
//! duplicate keys.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tracing::trace;

use crate::constraint::Constraints;
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::dispatch::{self, ResolvedType};
use crate::error::{Failure, Reason, Result};
use crate::lifting;
use crate::registry::RegistryBuilder;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    ty: ResolvedType,
    constraints: Constraints,
    allow_nil: bool,
    default: Option<Value>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: ResolvedType) -> Self {
        Self {
            name: name.into(),
            ty,
            constraints: Constraints::new(),
            allow_nil: true,
            default: None,
        }
    }
    /// Validates `constraints` against the attribute type and keeps them with
    /// defaults filled in, taking the `nil_items?` default from `builder`.
    pub fn with_constraints(
        mut self,
        constraints: &Constraints,
        builder: &RegistryBuilder,
    ) -> Result<Self> {
        self.constraints = builder.init_constraints(&self.ty, constraints)?;
        Ok(self)
    }
    pub fn required(mut self) -> Self {
        self.allow_nil = false;
        self
    }
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn ty(&self) -> &ResolvedType {
        &self.ty
    }
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }
    pub fn allow_nil(&self) -> bool {
        self.allow_nil
    }
}

fn in_field(failure: Failure, field: &str) -> impl Iterator<Item = Reason> + '_ {
    failure.flatten().into_iter().map(move |r| r.with_var("field", field))
}

#[derive(Debug, Clone)]
pub struct EmbeddedType {
    name: String,
    attributes: Vec<Attribute>,
    primary_key: Option<String>,
}

impl EmbeddedType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            primary_key: None,
        }
    }
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.retain(|a| a.name != attribute.name);
        self.attributes.push(attribute);
        self
    }
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn key_of<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        let key = self.primary_key.as_deref()?;
        value.as_map()?.get(key).filter(|v| !v.is_nil())
    }

    fn key_attribute(&self) -> Option<&Attribute> {
        let key = self.primary_key.as_deref()?;
        self.attributes.iter().find(|a| a.name == key)
    }

    fn same_key(&self, left: &Value, right: &Value) -> bool {
        match self.key_attribute() {
            Some(attribute) => attribute.ty.equal(left, right),
            None => left == right,
        }
    }

    /// Runs `op` over every attribute, collecting all failures.
    fn each_attribute<F>(&self, value: Value, mut op: F) -> CastResult
    where
        F: FnMut(&Attribute, Value) -> CastResult,
    {
        let Value::Map(mut fields) = value else {
            return Err(Failure::Invalid);
        };
        let mut out = BTreeMap::new();
        let mut reasons = Vec::new();
        for attribute in &self.attributes {
            let raw = fields.remove(&attribute.name).unwrap_or(Value::Nil);
            match op(attribute, raw) {
                Ok(v) => {
                    out.insert(attribute.name.clone(), v);
                }
                Err(failure) => reasons.extend(in_field(failure, &attribute.name)),
            }
        }
        if !fields.is_empty() {
            trace!(ty = %self.name, dropped = fields.len(), "unknown fields dropped");
        }
        if reasons.is_empty() {
            Ok(Value::Map(out))
        } else {
            Err(Failure::from_reasons(reasons))
        }
    }
}

impl ResourceType for EmbeddedType {
    fn name(&self) -> &str {
        &self.name
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Map
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        self.each_attribute(value, |attribute, raw| {
            let raw = match (raw, &attribute.default) {
                (Value::Nil, Some(default)) => default.clone(),
                (raw, _) => raw,
            };
            let cast = attribute.ty.cast_input(raw, &attribute.constraints)?;
            let cast = attribute.ty.apply_constraints(&cast, &attribute.constraints)?;
            if cast.is_nil() && !attribute.allow_nil {
                return Err(Failure::reason("is required"));
            }
            Ok(cast)
        })
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        self.each_attribute(value, |attribute, raw| {
            attribute.ty.cast_stored(raw, &attribute.constraints)
        })
    }
    // the parent stores the record as a document, so attributes dump to their embedded form
    fn dump_to_native(&self, value: Value, constraints: &Constraints) -> CastResult {
        self.dump_to_embedded(value, constraints)
    }
    fn dump_to_embedded(&self, value: Value, _constraints: &Constraints) -> CastResult {
        self.each_attribute(value, |attribute, v| {
            attribute.ty.dump_to_embedded(v, &attribute.constraints)
        })
        .map_err(|_| Failure::Invalid)
    }
    fn equal(&self, left: &Value, right: &Value) -> bool {
        match (left.as_map(), right.as_map()) {
            (Some(l), Some(r)) => self.attributes.iter().all(|attribute| {
                let nil = Value::Nil;
                attribute.ty.equal(
                    l.get(&attribute.name).unwrap_or(&nil),
                    r.get(&attribute.name).unwrap_or(&nil),
                )
            }),
            _ => left == right,
        }
    }
    fn describe(&self, _constraints: &Constraints) -> Option<String> {
        let names: Vec<&str> = self.attributes.iter().map(|a| a.name.as_str()).collect();
        Some(format!("{} with fields {}", self.name, names.join(", ")))
    }
    fn embedded(&self) -> bool {
        true
    }
    fn cast_in_query(&self, _constraints: &Constraints) -> bool {
        false
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        let strategies = self
            .attributes
            .iter()
            .map(|a| a.ty.try_generator(&a.constraints))
            .collect::<Option<Vec<_>>>()?;
        let names: Vec<String> = self.attributes.iter().map(|a| a.name.clone()).collect();
        let values = strategies
            .into_iter()
            .fold(Just(Vec::new()).boxed(), |acc: BoxedStrategy<Vec<Value>>, next| {
                (acc, next)
                    .prop_map(|(mut values, value)| {
                        values.push(value);
                        values
                    })
                    .boxed()
            });
        Some(
            values
                .prop_map(move |values| Value::Map(names.iter().cloned().zip(values).collect()))
                .boxed(),
        )
    }

    /// New records replace old ones with the same key field by field, so a
    /// partial update keeps the attributes it does not mention.
    fn prepare_change_array(
        &self,
        old: &[Value],
        new: Vec<Value>,
        _constraints: &Constraints,
    ) -> std::result::Result<Vec<Value>, Failure> {
        if self.primary_key.is_none() {
            return Ok(new);
        }
        Ok(new
            .into_iter()
            .map(|record| {
                let previous = self.key_of(&record).and_then(|key| {
                    old.iter()
                        .find(|o| self.key_of(o).is_some_and(|k| self.same_key(k, key)))
                });
                match (previous, record) {
                    (Some(Value::Map(previous)), Value::Map(changes)) => {
                        let mut merged = previous.clone();
                        merged.extend(changes);
                        Value::Map(merged)
                    }
                    (_, record) => record,
                }
            })
            .collect())
    }

    fn apply_constraints_array(
        &self,
        values: &[Value],
        constraints: &Constraints,
    ) -> std::result::Result<Option<Vec<Value>>, Failure> {
        let applied = lifting::apply_constraints(values, constraints, |v, items| {
            dispatch::scalar_apply_constraints(self, v, items)
        })?;
        if self.primary_key.is_none() {
            return Ok(applied);
        }
        let checked = applied.as_deref().unwrap_or(values);
        let mut reasons = Vec::new();
        for (index, record) in checked.iter().enumerate() {
            let Some(key) = self.key_of(record) else {
                continue;
            };
            let duplicate = checked[..index]
                .iter()
                .any(|earlier| self.key_of(earlier).is_some_and(|k| self.same_key(k, key)));
            if duplicate {
                reasons.push(
                    Reason::new("duplicate primary key %{value}")
                        .with_var("value", key.clone())
                        .at_index(index),
                );
            }
        }
        if reasons.is_empty() {
            Ok(applied)
        } else {
            Err(Failure::from_reasons(reasons))
        }
    }
}
