use std::collections::BTreeMap;

// used for binary transport in documents
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use uuid::Uuid;

use crate::constraint::Constraints;
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::error::Failure;
use crate::value::Value;

// ------------- Boolean -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl ResourceType for BooleanType {
    fn name(&self) -> &str {
        "Boolean"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Boolean
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Bool(_) => Ok(value),
            Value::Integer(1) => Ok(Value::Bool(true)),
            Value::Integer(0) => Ok(Value::Bool(false)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(Failure::Invalid),
            },
            _ => Err(Failure::Invalid),
        }
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Bool(_)))
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Bool(_)))
    }
    fn describe(&self, _constraints: &Constraints) -> Option<String> {
        Some(String::from("boolean"))
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        Some(any::<bool>().prop_map(Value::Bool).boxed())
    }
}

// ------------- Uuid -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidType;

fn to_uuid(value: Value) -> Result<Uuid, Failure> {
    match value {
        Value::Uuid(u) => Ok(u),
        Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| Failure::Invalid),
        Value::Binary(bytes) => Uuid::from_slice(&bytes).map_err(|_| Failure::Invalid),
        _ => Err(Failure::Invalid),
    }
}

impl ResourceType for UuidType {
    fn name(&self) -> &str {
        "Uuid"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Uuid
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        to_uuid(value).map(Value::Uuid)
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        to_uuid(value).map(Value::Uuid)
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Uuid(_)))
    }
    fn dump_to_embedded(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Uuid(u) => Ok(Value::String(u.hyphenated().to_string())),
            _ => Err(Failure::Invalid),
        }
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        Some(any::<u128>().prop_map(|n| Value::Uuid(Uuid::from_u128(n))).boxed())
    }
}

// ------------- Binary -------------

/// Raw bytes. Input may be base64 text, documents carry base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryType;

impl ResourceType for BinaryType {
    fn name(&self) -> &str {
        "Binary"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Binary
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Binary(_) => Ok(value),
            Value::String(s) => {
                STANDARD.decode(s.trim()).map(Value::Binary).map_err(|_| Failure::Invalid)
            }
            _ => Err(Failure::Invalid),
        }
    }
    fn cast_stored(&self, value: Value, constraints: &Constraints) -> CastResult {
        self.cast_input(value, constraints)
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Binary(_)))
    }
    fn dump_to_embedded(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Binary(bytes) => Ok(Value::String(STANDARD.encode(bytes))),
            _ => Err(Failure::Invalid),
        }
    }
    fn cast_in_query(&self, _constraints: &Constraints) -> bool {
        false
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        Some(vec(any::<u8>(), 0..32).prop_map(Value::Binary).boxed())
    }
}

// ------------- Map -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct MapType;

impl ResourceType for MapType {
    fn name(&self) -> &str {
        "Map"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Map
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Map(_)))
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Map(_)))
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Map(_)))
    }
    fn describe(&self, _constraints: &Constraints) -> Option<String> {
        Some(String::from("map"))
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        Some(
            btree_map("[a-z]{1,8}", simple_value(), 0..6)
                .prop_map(|m: BTreeMap<String, Value>| Value::Map(m))
                .boxed(),
        )
    }
}

// ------------- Term -------------

/// Any value at all, stored as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermType;

impl ResourceType for TermType {
    fn name(&self) -> &str {
        "Term"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Any
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        Ok(value)
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        Ok(value)
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        Ok(value)
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        Some(simple_value())
    }
}

fn simple_value() -> BoxedStrategy<Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z0-9 ]{1,12}".prop_map(Value::String),
    ]
    .boxed()
}
