//! The contract every concrete type implements.
//!
//! Only the storage type and the three conversions are required. Everything
//! else has a default, and the `_array` methods default to the generic
//! element-wise lifting in [`crate::lifting`], so a type only overrides them
//! when it needs collection-wide semantics (an embedded type comparing old and
//! new collections, for example).

use std::fmt;

use proptest::strategy::BoxedStrategy;

use crate::constraint::{ConstraintSchema, Constraints};
use crate::dispatch;
use crate::error::Failure;
use crate::lifting;
use crate::value::Value;

/// The backend-native primitive a type stores as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageType {
    Text,
    CiText,
    Integer,
    Float,
    Decimal,
    Boolean,
    Uuid,
    Date,
    UtcDatetime,
    UtcDatetimeUsec,
    Binary,
    Map,
    Any,
    Array(Box<StorageType>),
    Native(String),
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::CiText => write!(f, "citext"),
            Self::Integer => write!(f, "bigint"),
            Self::Float => write!(f, "float"),
            Self::Decimal => write!(f, "decimal"),
            Self::Boolean => write!(f, "boolean"),
            Self::Uuid => write!(f, "uuid"),
            Self::Date => write!(f, "date"),
            Self::UtcDatetime => write!(f, "utc_datetime"),
            Self::UtcDatetimeUsec => write!(f, "utc_datetime_usec"),
            Self::Binary => write!(f, "binary"),
            Self::Map => write!(f, "map"),
            Self::Any => write!(f, "any"),
            Self::Array(inner) => write!(f, "{{array, {}}}", inner),
            Self::Native(name) => write!(f, "{}", name),
        }
    }
}

pub type CastResult = Result<Value, Failure>;

pub trait ResourceType: Send + Sync + fmt::Debug {
    // required
    fn name(&self) -> &str;
    fn storage_type(&self, constraints: &Constraints) -> StorageType;
    /// Untrusted input to canonical form. `Nil` never reaches this method.
    fn cast_input(&self, value: Value, constraints: &Constraints) -> CastResult;
    /// A value loaded from storage to canonical form. `Nil` never reaches this method.
    fn cast_stored(&self, value: Value, constraints: &Constraints) -> CastResult;
    /// Canonical form to what the storage backend accepts.
    fn dump_to_native(&self, value: Value, constraints: &Constraints) -> CastResult;

    // provided
    fn dump_to_embedded(&self, value: Value, constraints: &Constraints) -> CastResult {
        self.dump_to_native(value, constraints)
    }

    /// `Ok(None)` accepts the value unchanged, `Ok(Some(v))` replaces it.
    fn apply_constraints(
        &self,
        _value: &Value,
        _constraints: &Constraints,
    ) -> Result<Option<Value>, Failure> {
        Ok(None)
    }

    fn equal(&self, left: &Value, right: &Value) -> bool {
        left == right
    }

    fn describe(&self, _constraints: &Constraints) -> Option<String> {
        None
    }

    fn embedded(&self) -> bool {
        false
    }

    fn cast_in_query(&self, _constraints: &Constraints) -> bool {
        true
    }

    fn constraints(&self) -> ConstraintSchema {
        ConstraintSchema::new()
    }

    fn array_constraints(&self) -> ConstraintSchema {
        ConstraintSchema::array()
    }

    fn handle_change(&self, _old: &Value, new: Value, _constraints: &Constraints) -> CastResult {
        Ok(new)
    }

    fn prepare_change(&self, _old: &Value, new: Value, _constraints: &Constraints) -> CastResult {
        Ok(new)
    }

    /// Strategy producing valid canonical values, for property tests.
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        None
    }

    // batch overrides, `constraints` are those of the whole array

    fn cast_input_array(
        &self,
        values: Vec<Value>,
        constraints: &Constraints,
    ) -> Result<Vec<Value>, Failure> {
        let items = constraints.items();
        lifting::cast_each(values, |v| dispatch::scalar_cast_input(self, v, items))
    }

    fn cast_stored_array(
        &self,
        values: Vec<Value>,
        constraints: &Constraints,
    ) -> Result<Vec<Value>, Failure> {
        let items = constraints.items();
        lifting::cast_each(values, |v| dispatch::scalar_cast_stored(self, v, items))
    }

    fn dump_to_native_array(
        &self,
        values: Vec<Value>,
        constraints: &Constraints,
    ) -> Result<Vec<Value>, Failure> {
        let items = constraints.items();
        lifting::dump_each(values, |v| dispatch::scalar_dump_to_native(self, v, items))
    }

    fn dump_to_embedded_array(
        &self,
        values: Vec<Value>,
        constraints: &Constraints,
    ) -> Result<Vec<Value>, Failure> {
        let items = constraints.items();
        lifting::dump_each(values, |v| dispatch::scalar_dump_to_embedded(self, v, items))
    }

    /// `Ok(None)` keeps the collection as given.
    fn apply_constraints_array(
        &self,
        values: &[Value],
        constraints: &Constraints,
    ) -> Result<Option<Vec<Value>>, Failure> {
        lifting::apply_constraints(values, constraints, |v, items| {
            dispatch::scalar_apply_constraints(self, v, items)
        })
    }

    fn handle_change_array(
        &self,
        _old: &[Value],
        new: Vec<Value>,
        _constraints: &Constraints,
    ) -> Result<Vec<Value>, Failure> {
        Ok(new)
    }

    fn prepare_change_array(
        &self,
        _old: &[Value],
        new: Vec<Value>,
        _constraints: &Constraints,
    ) -> Result<Vec<Value>, Failure> {
        Ok(new)
    }
}
