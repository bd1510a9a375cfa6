//! Unresolved type references and their textual form.
//!
//! ```text
//! integer              a named type or alias
//! {array, integer}     an array of integers
//! {array, {array, t}}  arrays nest
//! native:jsonb         a backend type outside the contract
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{RescoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    Array(Box<TypeRef>),
    Native(String),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
    pub fn array_of(inner: TypeRef) -> Self {
        Self::Array(Box::new(inner))
    }
    pub fn native(name: impl Into<String>) -> Self {
        Self::Native(name.into())
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{}", name),
            Self::Array(inner) => write!(f, "{{array, {}}}", inner),
            Self::Native(name) => write!(f, "native:{}", name),
        }
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '?'))
}

impl FromStr for TypeRef {
    type Err = RescoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || RescoreError::InvalidTypeRef(s.to_owned());
        if let Some(body) = s.strip_prefix('{') {
            let body = body.strip_suffix('}').ok_or_else(invalid)?;
            let (marker, inner) = body.split_once(',').ok_or_else(invalid)?;
            if marker.trim() != "array" {
                return Err(invalid());
            }
            return Ok(Self::array_of(inner.parse()?));
        }
        if let Some(name) = s.strip_prefix("native:") {
            return if valid_name(name) {
                Ok(Self::native(name))
            } else {
                Err(invalid())
            };
        }
        if valid_name(s) {
            Ok(Self::named(s))
        } else {
            Err(invalid())
        }
    }
}
