use rescore::lifting;
use rescore::{Constraints, Registry, Settings, TypeRef, Value};

fn integers() -> TypeRef {
    TypeRef::array_of(TypeRef::named("integer"))
}

#[test]
fn max_length_violation_cites_bound_only() {
    let registry = Registry::new();
    let constraints = registry
        .init_constraints(
            &integers(),
            &Constraints::new().with("min_length", 1).with("max_length", 2),
        )
        .unwrap();
    let cast = registry
        .cast_input(&integers(), Value::from(vec!["1", "2", "3"]), &constraints)
        .unwrap();
    let reasons = registry
        .apply_constraints(&integers(), &cast, &constraints)
        .unwrap_err()
        .flatten();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].message(), "must have %{max} or fewer items");
    assert_eq!(reasons[0].var("max"), Some(&Value::Integer(2)));
    assert_eq!(reasons[0].index(), None);
    assert_eq!(reasons[0].render(), "must have 2 or fewer items");
}

#[test]
fn length_violation_skips_element_checks() {
    let registry = Registry::new();
    let constraints = Constraints::new()
        .with("min_length", 3)
        .with_nested("items", Constraints::new().with("min", 100));
    let reasons = registry
        .apply_constraints(&integers(), &Value::from(vec![1i64, 2]), &constraints)
        .unwrap_err()
        .flatten();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].var("min"), Some(&Value::Integer(3)));
}

#[test]
fn every_failing_element_is_reported_with_its_index() {
    let registry = Registry::new();
    let constraints = Constraints::new().with_nested("items", Constraints::new().with("max", 5));
    let reasons = registry
        .apply_constraints(&integers(), &Value::from(vec![1i64, 10, 3, 20]), &constraints)
        .unwrap_err()
        .flatten();
    let indexes: Vec<_> = reasons.iter().map(|r| r.index()).collect();
    assert_eq!(indexes, vec![Some(1), Some(3)]);
    assert!(reasons.iter().all(|r| r.var("max") == Some(&Value::Integer(5))));
}

#[test]
fn disallowed_nils_are_each_tagged() {
    let registry = Registry::new();
    let constraints = Constraints::new()
        .with("nil_items?", false)
        .with_nested("items", Constraints::new().with("min", 0));
    let value = Value::Array(vec![Value::Integer(1), Value::Nil, Value::Integer(3), Value::Nil]);
    let reasons = registry
        .apply_constraints(&integers(), &value, &constraints)
        .unwrap_err()
        .flatten();
    assert_eq!(reasons.len(), 2);
    assert!(reasons.iter().all(|r| r.message() == "no nil values"));
    assert_eq!(reasons[0].index(), Some(1));
    assert_eq!(reasons[1].index(), Some(3));
}

#[test]
fn nil_elements_never_reach_the_element_check() {
    let value = vec![Value::Integer(1), Value::Nil, Value::Integer(3), Value::Nil];
    for nil_items in [false, true] {
        let constraints = Constraints::new()
            .with("nil_items?", nil_items)
            .with_nested("items", Constraints::new().with("min", 0));
        let mut checked = Vec::new();
        let result = lifting::apply_constraints(&value, &constraints, |v, _| {
            checked.push(v.clone());
            Ok(v.clone())
        });
        assert_eq!(checked, vec![Value::Integer(1), Value::Integer(3)]);
        match result {
            Ok(applied) => {
                assert!(nil_items);
                assert_eq!(applied, Some(value.clone()));
            }
            Err(failure) => {
                assert!(!nil_items);
                let reasons = failure.flatten();
                assert_eq!(reasons.len(), 2);
                assert!(reasons.iter().all(|r| r.message() == "no nil values"));
            }
        }
    }
}

#[test]
fn allowed_nils_pass_element_checks() {
    let registry = Registry::new();
    let constraints = Constraints::new()
        .with("nil_items?", true)
        .with_nested("items", Constraints::new().with("max", 5));
    let value = Value::Array(vec![Value::Integer(1), Value::Nil]);
    let applied = registry.apply_constraints(&integers(), &value, &constraints).unwrap();
    assert_eq!(applied, value);
}

#[test]
fn no_element_constraints_and_nils_allowed_skips_elements() {
    let registry = Registry::new();
    let constraints = Constraints::new().with("nil_items?", true);
    // an element the integer type would reject is never looked at
    let value = Value::Array(vec![Value::from("not an integer"), Value::Nil]);
    let applied = registry.apply_constraints(&integers(), &value, &constraints).unwrap();
    assert_eq!(applied, value);
}

#[test]
fn element_rewrites_are_kept_and_idempotent() {
    let registry = Registry::new();
    let ty: TypeRef = "{array, string}".parse().unwrap();
    let constraints = registry
        .init_constraints(
            &ty,
            &Constraints::new().with_nested("items", Constraints::new().with("max_length", 5)),
        )
        .unwrap();
    let value = Value::from(vec!["  a ", "b"]);
    let once = registry.apply_constraints(&ty, &value, &constraints).unwrap();
    assert_eq!(once, Value::from(vec!["a", "b"]));
    let twice = registry.apply_constraints(&ty, &once, &constraints).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn nil_array_is_valid() {
    let registry = Registry::new();
    let constraints = Constraints::new().with("min_length", 1);
    let applied = registry.apply_constraints(&integers(), &Value::Nil, &constraints).unwrap();
    assert_eq!(applied, Value::Nil);
}

#[test]
fn init_constraints_fills_nil_items_default() {
    let registry = Registry::new();
    let constraints = registry.init_constraints(&integers(), &Constraints::new()).unwrap();
    assert_eq!(constraints.bool("nil_items?"), Some(false));
    assert!(!constraints.contains("items"));

    let settings = Settings::from_toml("default_nil_items = true").unwrap();
    let registry = Registry::from_settings(&settings).unwrap();
    let constraints = registry.init_constraints(&integers(), &Constraints::new()).unwrap();
    assert_eq!(constraints.bool("nil_items?"), Some(true));

    // an explicit setting wins over the registry default
    let constraints = registry
        .init_constraints(&integers(), &Constraints::new().with("nil_items?", false))
        .unwrap();
    assert_eq!(constraints.bool("nil_items?"), Some(false));
}

#[test]
fn init_constraints_rejects_inverted_bounds() {
    let registry = Registry::new();
    let result = registry.init_constraints(
        &integers(),
        &Constraints::new().with("min_length", 3).with("max_length", 1),
    );
    assert!(result.is_err());
}
