use std::sync::Arc;

use rescore::datatype::{Attribute, EmbeddedType};
use rescore::{Constraints, Registry, StorageType, TypeRef, Value};

fn registry() -> Registry {
    let builder = Registry::builder();
    let string = builder.resolve(&TypeRef::named("string")).unwrap();
    let integer = builder.resolve(&TypeRef::named("integer")).unwrap();
    let uuid = builder.resolve(&TypeRef::named("uuid")).unwrap();
    let address = EmbeddedType::new("Address")
        .attribute(Attribute::new("id", integer).required())
        .attribute(Attribute::new("street", string.clone()).required())
        .attribute(
            Attribute::new("zip", string.clone())
                .with_constraints(&Constraints::new().with("max_length", 5), &builder)
                .unwrap(),
        )
        .attribute(Attribute::new("country", string).with_default("US"))
        .attribute(Attribute::new("ref", uuid))
        .primary_key("id");
    builder.register(Arc::new(address)).unwrap().build()
}

fn address() -> TypeRef {
    TypeRef::named("Address")
}

fn addresses() -> TypeRef {
    TypeRef::array_of(address())
}

#[test]
fn cast_fills_defaults_and_drops_unknown_fields() {
    let registry = registry();
    let input = Value::map([
        ("id", Value::from("7")),
        ("street", Value::from("  Main St ")),
        ("zip", Value::from("12345")),
        ("color", Value::from("blue")),
    ]);
    let cast = registry.cast_input(&address(), input, Constraints::empty()).unwrap();
    let map = cast.as_map().unwrap();
    assert_eq!(map.get("id"), Some(&Value::Integer(7)));
    assert_eq!(map.get("street"), Some(&Value::from("Main St")));
    assert_eq!(map.get("country"), Some(&Value::from("US")));
    assert_eq!(map.get("ref"), Some(&Value::Nil));
    assert!(!map.contains_key("color"));
}

#[test]
fn every_failing_field_is_reported() {
    let registry = registry();
    let input = Value::map([("id", Value::Integer(1)), ("zip", Value::from("1234567"))]);
    let reasons = registry
        .cast_input(&address(), input, Constraints::empty())
        .unwrap_err()
        .flatten();
    assert_eq!(reasons.len(), 2);
    assert_eq!(reasons[0].message(), "is required");
    assert_eq!(reasons[0].var("field"), Some(&Value::from("street")));
    assert_eq!(reasons[1].var("field"), Some(&Value::from("zip")));
    assert_eq!(reasons[1].var("max"), Some(&Value::Integer(5)));
}

#[test]
fn non_map_input_is_invalid() {
    let registry = registry();
    assert!(registry.cast_input(&address(), Value::from("x"), Constraints::empty()).is_err());
}

#[test]
fn array_element_failures_carry_field_and_index() {
    let registry = registry();
    let input = Value::Array(vec![
        Value::map([("id", Value::Integer(1)), ("street", Value::from("a"))]),
        Value::map([("id", Value::Integer(2))]),
    ]);
    let reasons = registry
        .cast_input(&addresses(), input, Constraints::empty())
        .unwrap_err()
        .flatten();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].index(), Some(1));
    assert_eq!(reasons[0].var("field"), Some(&Value::from("street")));
}

#[test]
fn duplicate_primary_keys_are_rejected() {
    let registry = registry();
    let constraints = registry.init_constraints(&addresses(), &Constraints::new()).unwrap();
    let input = Value::Array(vec![
        Value::map([("id", Value::Integer(1)), ("street", Value::from("a"))]),
        Value::map([("id", Value::Integer(2)), ("street", Value::from("b"))]),
        Value::map([("id", Value::Integer(1)), ("street", Value::from("c"))]),
    ]);
    let cast = registry.cast_input(&addresses(), input, &constraints).unwrap();
    let reasons = registry
        .apply_constraints(&addresses(), &cast, &constraints)
        .unwrap_err()
        .flatten();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].message(), "duplicate primary key %{value}");
    assert_eq!(reasons[0].var("value"), Some(&Value::Integer(1)));
    assert_eq!(reasons[0].index(), Some(2));
}

#[test]
fn prepare_change_merges_records_by_key() {
    let registry = registry();
    let old = Value::Array(vec![Value::map([
        ("id", Value::Integer(1)),
        ("street", Value::from("a")),
        ("zip", Value::from("111")),
    ])]);
    let new = Value::Array(vec![
        Value::map([("id", Value::Integer(1)), ("street", Value::from("b"))]),
        Value::map([("id", Value::Integer(9)), ("street", Value::from("z"))]),
    ]);
    let prepared = registry
        .prepare_change(&addresses(), &old, new, Constraints::empty())
        .unwrap();
    let records = prepared.as_array().unwrap();
    let first = records[0].as_map().unwrap();
    assert_eq!(first.get("street"), Some(&Value::from("b")));
    assert_eq!(first.get("zip"), Some(&Value::from("111")));
    assert!(!records[1].as_map().unwrap().contains_key("zip"));
}

#[test]
fn handle_change_keeps_the_new_value() {
    let registry = registry();
    let new = Value::Array(vec![Value::map([("id", Value::Integer(3))])]);
    let handled = registry
        .handle_change(&addresses(), &Value::Nil, new.clone(), Constraints::empty())
        .unwrap();
    assert_eq!(handled, new);
}

#[test]
fn dumps_attributes_in_embedded_form() {
    let registry = registry();
    let reference = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    let input = Value::map([
        ("id", Value::Integer(1)),
        ("street", Value::from("a")),
        ("ref", Value::from(reference)),
    ]);
    let cast = registry.cast_input(&address(), input, Constraints::empty()).unwrap();
    assert!(matches!(cast.as_map().unwrap().get("ref"), Some(Value::Uuid(_))));
    let dumped = registry.dump_to_native(&address(), cast.clone(), Constraints::empty()).unwrap();
    assert_eq!(dumped.as_map().unwrap().get("ref"), Some(&Value::from(reference)));
    let stored = registry.cast_stored(&address(), dumped, Constraints::empty()).unwrap();
    assert!(registry.equal(&address(), &cast, &stored).unwrap());
}

#[test]
fn embedded_metadata() {
    let registry = registry();
    assert!(registry.embedded(&address()).unwrap());
    assert!(registry.embedded(&addresses()).unwrap());
    assert!(!registry.cast_in_query(&address(), Constraints::empty()).unwrap());
    assert_eq!(registry.storage_type(&address(), Constraints::empty()).unwrap(), StorageType::Map);
    assert_eq!(
        registry.describe(&address(), Constraints::empty()).unwrap(),
        "Address with fields id, street, zip, country, ref"
    );
}

#[test]
fn array_attributes_take_the_builder_nil_default() {
    let builder = Registry::builder().default_nil_items(true);
    let scores = builder.resolve(&"{array, integer}".parse().unwrap()).unwrap();
    let attribute = Attribute::new("scores", scores)
        .with_constraints(&Constraints::new(), &builder)
        .unwrap();
    assert_eq!(attribute.constraints().bool("nil_items?"), Some(true));

    let registry = builder
        .register(Arc::new(EmbeddedType::new("Scorecard").attribute(attribute)))
        .unwrap()
        .build();
    let input = Value::map([("scores", Value::Array(vec![Value::Integer(1), Value::Nil]))]);
    let cast = registry
        .cast_input(&TypeRef::named("Scorecard"), input, Constraints::empty())
        .unwrap();
    let scores = cast.as_map().unwrap().get("scores").unwrap();
    assert_eq!(scores, &Value::Array(vec![Value::Integer(1), Value::Nil]));
}
