//! Builtin types.
//!
//! Each type is registered under its canonical name (`String`, `Integer`,
//! ...) and reachable through the short aliases in [`BUILTIN_ALIASES`].

use std::sync::Arc;

use crate::contract::ResourceType;
use crate::error::Failure;
use crate::value::Value;

pub mod embedded;
pub mod misc;
pub mod numeric;
pub mod temporal;
pub mod text;

pub use embedded::{Attribute, EmbeddedType};
pub use misc::{BinaryType, BooleanType, MapType, TermType, UuidType};
pub use numeric::{DecimalType, FloatType, IntegerType};
pub use temporal::{DateType, UtcDatetimeType};
pub use text::{CiStringType, StringType};

/// Short name to canonical name.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("string", "String"),
    ("ci_string", "CiString"),
    ("integer", "Integer"),
    ("float", "Float"),
    ("decimal", "Decimal"),
    ("boolean", "Boolean"),
    ("uuid", "Uuid"),
    ("date", "Date"),
    ("utc_datetime", "UtcDatetime"),
    ("binary", "Binary"),
    ("map", "Map"),
    ("term", "Term"),
];

pub fn builtin_types() -> Vec<Arc<dyn ResourceType>> {
    vec![
        Arc::new(StringType),
        Arc::new(CiStringType),
        Arc::new(IntegerType),
        Arc::new(FloatType),
        Arc::new(DecimalType),
        Arc::new(BooleanType),
        Arc::new(UuidType),
        Arc::new(DateType),
        Arc::new(UtcDatetimeType),
        Arc::new(BinaryType),
        Arc::new(MapType),
        Arc::new(TermType),
    ]
}

/// Accepts `Ok(v)` when `v` satisfies `check`, the bare failure otherwise.
pub(crate) fn expect(value: Value, check: fn(&Value) -> bool) -> Result<Value, Failure> {
    if check(&value) {
        Ok(value)
    } else {
        Err(Failure::Invalid)
    }
}
