//! Rescore – type coercion and validation for declarative resource frameworks.
//!
//! Rescore centers on the *type contract*: a small set of operations every
//! concrete type implements so that values can move between untrusted input,
//! canonical in-memory form and storage.
//! * [`contract::ResourceType`] is the contract. Only the storage type and the
//!   three conversions (`cast_input`, `cast_stored`, `dump_to_native`) are
//!   required; every other operation has a default.
//! * A [`typeref::TypeRef`] names a type: a registered name, an alias, an
//!   array of another reference (`{array, T}`) or a backend-native type.
//! * The [`registry::Registry`] resolves references to implementations and
//!   routes every operation, lifting scalar types over arrays of any depth.
//! * Validation outcomes are [`error::Failure`]s carrying structured
//!   [`error::Reason`]s: a message template plus ordered variables, with an
//!   `index` variable on reasons that came from an array element.
//!
//! ## Modules
//! * [`value`] – The dynamic [`value::Value`] every operation works on.
//! * [`contract`] – The [`contract::ResourceType`] trait and storage types.
//! * [`constraint`] – Constraint sets and the schemas types declare for them.
//! * [`lifting`] – Generic scalar to collection lifting.
//! * [`dispatch`] – Routing over a resolved type.
//! * [`registry`] – Type and alias keepers, the builder and the registry.
//! * [`datatype`] – The builtin types and embedded records.
//! * [`settings`] – Configuration and logging setup.
//!
//! ## Arrays
//! Any type can be used as an array element. Arrays of a scalar go through
//! the element type's `_array` methods, which default to the generic lifting:
//! casting stops at the first failing element, constraint checks report every
//! failing element, and length bounds are checked before anything else. A
//! type overrides the `_array` methods only when it needs collection-wide
//! behavior, as [`datatype::EmbeddedType`] does for primary keys.
//!
//! ## Quick Start
//! ```
//! use rescore::{Constraints, Registry, TypeRef, Value};
//! let registry = Registry::new();
//! let tags: TypeRef = "{array, string}".parse().unwrap();
//! let constraints = registry
//!     .init_constraints(&tags, &Constraints::new().with("max_length", 2))
//!     .unwrap();
//! let cast = registry
//!     .cast_input(&tags, Value::from(vec!["a", "b"]), &constraints)
//!     .unwrap();
//! assert!(registry.apply_constraints(&tags, &cast, &constraints).is_ok());
//! ```

pub mod constraint;
pub mod contract;
pub mod datatype;
pub mod dispatch;
pub mod error;
pub mod lifting;
pub mod registry;
pub mod settings;
pub mod typeref;
pub mod value;

pub use constraint::{Constraint, ConstraintKind, ConstraintSchema, Constraints};
pub use contract::{CastResult, ResourceType, StorageType};
pub use dispatch::ResolvedType;
pub use error::{Failure, Reason, RescoreError, Result};
pub use registry::{Registry, RegistryBuilder};
pub use settings::{Settings, init_logging};
pub use typeref::TypeRef;
pub use value::Value;
