//! The registry owns every known type and alias.
//!
//! It is built once, by the caller, and is immutable afterwards. Pass it by
//! reference (or in an `Arc`) to whatever needs to cast values; there is no
//! global table.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

use proptest::strategy::BoxedStrategy;
use seahash::SeaHasher;
use tracing::{debug, warn};

use crate::constraint::{ConstraintSchema, Constraints};
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::datatype;
use crate::dispatch::ResolvedType;
use crate::error::{Failure, Reason, RescoreError, Result};
use crate::settings::Settings;
use crate::typeref::TypeRef;
use crate::value::Value;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// aliases may point at other aliases, but not forever
const MAX_ALIAS_DEPTH: usize = 16;

// ------------- Keepers -------------

/// Owns the registered types, keyed by their canonical name.
#[derive(Debug, Default)]
pub struct TypeKeeper {
    kept: HashMap<String, Arc<dyn ResourceType>, OtherHasher>,
}
impl TypeKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
        }
    }
    /// Returns the kept type and whether a type of that name was kept before,
    /// in which case the earlier one stays.
    pub fn keep(&mut self, ty: Arc<dyn ResourceType>) -> (Arc<dyn ResourceType>, bool) {
        match self.kept.entry(ty.name().to_owned()) {
            Entry::Occupied(e) => (Arc::clone(e.get()), true),
            Entry::Vacant(e) => (Arc::clone(e.insert(ty)), false),
        }
    }
    pub fn get(&self, name: &str) -> Option<Arc<dyn ResourceType>> {
        self.kept.get(name).map(Arc::clone)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// Owns the alias name to type reference mapping.
#[derive(Debug, Default)]
pub struct AliasKeeper {
    kept: HashMap<String, TypeRef, OtherHasher>,
}
impl AliasKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
        }
    }
    /// A later alias of the same name replaces the earlier one.
    pub fn keep(&mut self, alias: String, target: TypeRef) -> bool {
        self.kept.insert(alias, target).is_some()
    }
    pub fn lookup(&self, alias: &str) -> Option<&TypeRef> {
        self.kept.get(alias)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Builder -------------

pub struct RegistryBuilder {
    type_keeper: TypeKeeper,
    alias_keeper: AliasKeeper,
    default_nil_items: bool,
}

impl RegistryBuilder {
    /// A builder with nothing registered.
    pub fn empty() -> Self {
        Self {
            type_keeper: TypeKeeper::new(),
            alias_keeper: AliasKeeper::new(),
            default_nil_items: false,
        }
    }

    /// A builder primed with the builtin types and their short aliases.
    pub fn with_builtins() -> Self {
        let mut builder = Self::empty();
        for ty in datatype::builtin_types() {
            builder.type_keeper.keep(ty);
        }
        for (alias, name) in datatype::BUILTIN_ALIASES {
            builder.alias_keeper.keep((*alias).to_owned(), TypeRef::named(*name));
        }
        builder
    }

    pub fn register(mut self, ty: Arc<dyn ResourceType>) -> Result<Self> {
        let name = ty.name().to_owned();
        let (_, previously_kept) = self.type_keeper.keep(ty);
        if previously_kept {
            return Err(RescoreError::DuplicateType(name));
        }
        debug!(%name, "registered type");
        Ok(self)
    }

    pub fn alias(mut self, alias: impl Into<String>, target: TypeRef) -> Self {
        let alias = alias.into();
        if self.alias_keeper.keep(alias.clone(), target) {
            debug!(%alias, "alias replaced");
        }
        self
    }

    pub fn default_nil_items(mut self, nil_items: bool) -> Self {
        self.default_nil_items = nil_items;
        self
    }

    /// Resolves against what has been registered so far, so that composite
    /// types (embedded records) can bind their attribute types before being
    /// registered themselves.
    pub fn resolve(&self, ty: &TypeRef) -> Result<ResolvedType> {
        resolve(&self.type_keeper, &self.alias_keeper, ty, 0)
    }

    /// Validates constraints for an already resolved type with this builder's
    /// `nil_items?` default, as embedded attributes need before registration.
    pub fn init_constraints(
        &self,
        ty: &ResolvedType,
        constraints: &Constraints,
    ) -> Result<Constraints> {
        ty.init_constraints_with(constraints, self.default_nil_items)
    }

    pub fn build(self) -> Registry {
        Registry {
            type_keeper: self.type_keeper,
            alias_keeper: self.alias_keeper,
            default_nil_items: self.default_nil_items,
        }
    }
}

fn resolve(
    types: &TypeKeeper,
    aliases: &AliasKeeper,
    ty: &TypeRef,
    depth: usize,
) -> Result<ResolvedType> {
    if depth > MAX_ALIAS_DEPTH {
        return Err(RescoreError::InvalidTypeRef(format!("alias cycle at {}", ty)));
    }
    match ty {
        TypeRef::Named(name) => {
            if let Some(kept) = types.get(name) {
                return Ok(ResolvedType::Scalar(kept));
            }
            match aliases.lookup(name) {
                Some(target) => resolve(types, aliases, target, depth + 1),
                None => Err(RescoreError::UnknownType(name.clone())),
            }
        }
        TypeRef::Array(inner) => {
            Ok(ResolvedType::Array(Box::new(resolve(types, aliases, inner, depth)?)))
        }
        TypeRef::Native(name) => Ok(ResolvedType::Native(name.clone())),
    }
}

// ------------- Registry -------------

pub struct Registry {
    type_keeper: TypeKeeper,
    alias_keeper: AliasKeeper,
    default_nil_items: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// The builtin types and aliases, nothing else.
    pub fn new() -> Self {
        RegistryBuilder::with_builtins().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::with_builtins()
    }

    /// Builtins plus the aliases and defaults named in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = Self::builder().default_nil_items(settings.default_nil_items);
        for (alias, target) in &settings.aliases {
            builder = builder.alias(alias.clone(), target.parse()?);
        }
        let registry = builder.build();
        // fail early on aliases that point nowhere
        for alias in settings.aliases.keys() {
            registry.resolve(&TypeRef::named(alias.clone()))?;
        }
        Ok(registry)
    }

    pub fn type_keeper(&self) -> &TypeKeeper {
        &self.type_keeper
    }

    pub fn alias_keeper(&self) -> &AliasKeeper {
        &self.alias_keeper
    }

    pub fn resolve(&self, ty: &TypeRef) -> Result<ResolvedType> {
        resolve(&self.type_keeper, &self.alias_keeper, ty, 0)
            .inspect_err(|e| warn!(%ty, error = %e, "unresolvable type"))
    }

    /// True when the reference resolves to an implementation.
    pub fn is_type(&self, ty: &TypeRef) -> bool {
        resolve(&self.type_keeper, &self.alias_keeper, ty, 0).is_ok()
    }

    fn resolve_for_cast(&self, ty: &TypeRef) -> std::result::Result<ResolvedType, Failure> {
        self.resolve(ty).map_err(|e| match e {
            RescoreError::UnknownType(name) => {
                Failure::Reason(Reason::new("unknown type %{type}").with_var("type", name))
            }
            other => Failure::Reason(Reason::new(other.to_string())),
        })
    }

    pub fn cast_input(&self, ty: &TypeRef, value: Value, constraints: &Constraints) -> CastResult {
        self.resolve_for_cast(ty)?.cast_input(value, constraints)
    }

    pub fn cast_stored(&self, ty: &TypeRef, value: Value, constraints: &Constraints) -> CastResult {
        self.resolve_for_cast(ty)?.cast_stored(value, constraints)
    }

    pub fn dump_to_native(
        &self,
        ty: &TypeRef,
        value: Value,
        constraints: &Constraints,
    ) -> CastResult {
        self.resolve_for_cast(ty)?.dump_to_native(value, constraints)
    }

    pub fn dump_to_embedded(
        &self,
        ty: &TypeRef,
        value: Value,
        constraints: &Constraints,
    ) -> CastResult {
        self.resolve_for_cast(ty)?.dump_to_embedded(value, constraints)
    }

    pub fn apply_constraints(
        &self,
        ty: &TypeRef,
        value: &Value,
        constraints: &Constraints,
    ) -> CastResult {
        self.resolve_for_cast(ty)?.apply_constraints(value, constraints)
    }

    pub fn handle_change(
        &self,
        ty: &TypeRef,
        old: &Value,
        new: Value,
        constraints: &Constraints,
    ) -> CastResult {
        self.resolve_for_cast(ty)?.handle_change(old, new, constraints)
    }

    pub fn prepare_change(
        &self,
        ty: &TypeRef,
        old: &Value,
        new: Value,
        constraints: &Constraints,
    ) -> CastResult {
        self.resolve_for_cast(ty)?.prepare_change(old, new, constraints)
    }

    pub fn equal(&self, ty: &TypeRef, left: &Value, right: &Value) -> Result<bool> {
        Ok(self.resolve(ty)?.equal(left, right))
    }

    pub fn storage_type(&self, ty: &TypeRef, constraints: &Constraints) -> Result<StorageType> {
        Ok(self.resolve(ty)?.storage_type(constraints))
    }

    pub fn describe(&self, ty: &TypeRef, constraints: &Constraints) -> Result<String> {
        Ok(self.resolve(ty)?.describe(constraints))
    }

    pub fn constraints(&self, ty: &TypeRef) -> Result<ConstraintSchema> {
        Ok(self.resolve(ty)?.constraints())
    }

    pub fn embedded(&self, ty: &TypeRef) -> Result<bool> {
        Ok(self.resolve(ty)?.embedded())
    }

    pub fn cast_in_query(&self, ty: &TypeRef, constraints: &Constraints) -> Result<bool> {
        Ok(self.resolve(ty)?.cast_in_query(constraints))
    }

    /// Validates declared constraints and fills in defaults, using this
    /// registry's `nil_items?` default for arrays.
    pub fn init_constraints(&self, ty: &TypeRef, constraints: &Constraints) -> Result<Constraints> {
        self.resolve(ty)?
            .init_constraints_with(constraints, self.default_nil_items)
    }

    /// # Panics
    ///
    /// When the reference does not resolve or the type has no generator.
    pub fn generator(&self, ty: &TypeRef, constraints: &Constraints) -> BoxedStrategy<Value> {
        match self.resolve(ty) {
            Ok(resolved) => resolved.generator(constraints),
            Err(e) => panic!("cannot generate values for {}: {}", ty, e),
        }
    }
}
