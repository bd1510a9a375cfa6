use proptest::collection::vec;
use proptest::prelude::*;
use rescore::{Constraints, Registry, TypeRef, Value};

fn generated(name: &str) -> BoxedStrategy<Value> {
    Registry::new().generator(&TypeRef::named(name), Constraints::empty())
}

fn scalar_value() -> BoxedStrategy<(&'static str, Value)> {
    prop_oneof![
        generated("string").prop_map(|v| ("string", v)),
        generated("integer").prop_map(|v| ("integer", v)),
        generated("float").prop_map(|v| ("float", v)),
        generated("decimal").prop_map(|v| ("decimal", v)),
        generated("boolean").prop_map(|v| ("boolean", v)),
        generated("uuid").prop_map(|v| ("uuid", v)),
        generated("date").prop_map(|v| ("date", v)),
        generated("utc_datetime").prop_map(|v| ("utc_datetime", v)),
        generated("binary").prop_map(|v| ("binary", v)),
    ]
    .boxed()
}

fn bounded_decimal() -> Constraints {
    Constraints::new()
        .with("min", 0)
        .with("max", 10)
        .with("precision", 4)
        .with("scale", 2)
}

fn short_word() -> Constraints {
    Constraints::new().with("match", "[a-z ]+").with("max_length", 3)
}

fn generated_under(name: &str, constraints: &Constraints) -> BoxedStrategy<Value> {
    let registry = Registry::new();
    let ty = TypeRef::named(name);
    let constraints = registry.init_constraints(&ty, constraints).unwrap();
    registry.generator(&ty, &constraints)
}

proptest! {
    #[test]
    fn singleton_array_matches_scalar_cast((name, v) in scalar_value()) {
        let registry = Registry::new();
        let scalar = TypeRef::named(name);
        let array = TypeRef::array_of(scalar.clone());
        let cast = registry.cast_input(&scalar, v.clone(), Constraints::empty()).unwrap();
        let lifted = registry
            .cast_input(&array, Value::Array(vec![v]), Constraints::empty())
            .unwrap();
        let items = lifted.as_array().unwrap();
        prop_assert_eq!(items.len(), 1);
        prop_assert!(registry.equal(&scalar, &items[0], &cast).unwrap());
    }

    #[test]
    fn cast_failure_is_tagged_with_first_bad_index(
        prefix in vec(any::<i64>(), 0..8),
        suffix in vec(any::<i64>(), 0..8),
    ) {
        let registry = Registry::new();
        let ty = TypeRef::array_of(TypeRef::named("integer"));
        let k = prefix.len();
        let mut values: Vec<Value> = prefix.into_iter().map(Value::Integer).collect();
        values.push(Value::from("x"));
        values.extend(suffix.into_iter().map(Value::Integer));
        values.push(Value::from("y"));
        let reasons = registry
            .cast_input(&ty, Value::Array(values), Constraints::empty())
            .unwrap_err()
            .flatten();
        prop_assert_eq!(reasons.len(), 1);
        prop_assert_eq!(reasons[0].index(), Some(k));
    }

    #[test]
    fn storage_round_trip((name, v) in scalar_value()) {
        let registry = Registry::new();
        let ty = TypeRef::named(name);
        let cast = registry.cast_input(&ty, v, Constraints::empty()).unwrap();
        let native = registry.dump_to_native(&ty, cast.clone(), Constraints::empty()).unwrap();
        let stored = registry.cast_stored(&ty, native, Constraints::empty()).unwrap();
        prop_assert!(registry.equal(&ty, &cast, &stored).unwrap());
    }

    #[test]
    fn embedded_round_trip((name, v) in scalar_value()) {
        let registry = Registry::new();
        let ty = TypeRef::named(name);
        let embedded = registry.dump_to_embedded(&ty, v.clone(), Constraints::empty()).unwrap();
        let stored = registry.cast_stored(&ty, embedded, Constraints::empty()).unwrap();
        prop_assert!(registry.equal(&ty, &v, &stored).unwrap());
    }

    #[test]
    fn length_violation_iff_out_of_bounds(
        items in vec(any::<i64>(), 0..12),
        m in 0usize..6,
        n in 0usize..12,
    ) {
        prop_assume!(m <= n);
        let registry = Registry::new();
        let ty = TypeRef::array_of(TypeRef::named("integer"));
        let constraints = registry
            .init_constraints(&ty, &Constraints::new().with("min_length", m).with("max_length", n))
            .unwrap();
        let len = items.len();
        let value = Value::from(items);
        let result = registry.apply_constraints(&ty, &value, &constraints);
        prop_assert_eq!(result.is_err(), len < m || len > n);
    }

    #[test]
    fn constraints_are_idempotent(value in Registry::new().generator(
        &"{array, string}".parse().unwrap(),
        &Constraints::new().with("max_length", 4),
    )) {
        let registry = Registry::new();
        let ty: TypeRef = "{array, string}".parse().unwrap();
        let constraints = Constraints::new()
            .with("max_length", 4)
            .with_nested("items", Constraints::new().with("casing", "upper"));
        let ci: TypeRef = "{array, ci_string}".parse().unwrap();
        let once = registry.apply_constraints(&ci, &value, &constraints).unwrap();
        let twice = registry.apply_constraints(&ci, &once, &constraints).unwrap();
        prop_assert_eq!(&once, &twice);
        let plain = registry
            .apply_constraints(&ty, &value, &Constraints::new().with("max_length", 4))
            .unwrap();
        prop_assert_eq!(plain, value);
    }

    #[test]
    fn generated_arrays_satisfy_their_constraints(value in Registry::new().generator(
        &"{array, integer}".parse().unwrap(),
        &Constraints::new()
            .with("min_length", 1)
            .with("max_length", 3)
            .with("nil_items?", true)
            .with_nested("items", Constraints::new().with("min", 0).with("max", 9)),
    )) {
        let registry = Registry::new();
        let ty: TypeRef = "{array, integer}".parse().unwrap();
        let constraints = Constraints::new()
            .with("min_length", 1)
            .with("max_length", 3)
            .with("nil_items?", true)
            .with_nested("items", Constraints::new().with("min", 0).with("max", 9));
        prop_assert!(registry.apply_constraints(&ty, &value, &constraints).is_ok());
    }

    #[test]
    fn generated_decimals_satisfy_their_constraints(
        value in generated_under("decimal", &bounded_decimal()),
    ) {
        let registry = Registry::new();
        let ty = TypeRef::named("decimal");
        let constraints = registry.init_constraints(&ty, &bounded_decimal()).unwrap();
        prop_assert_eq!(registry.apply_constraints(&ty, &value, &constraints), Ok(value.clone()));
    }

    #[test]
    fn generated_strings_satisfy_pattern_and_length(
        value in generated_under("string", &short_word()),
    ) {
        let registry = Registry::new();
        let ty = TypeRef::named("string");
        let constraints = registry.init_constraints(&ty, &short_word()).unwrap();
        prop_assert_eq!(registry.apply_constraints(&ty, &value, &constraints), Ok(value.clone()));
    }
}
