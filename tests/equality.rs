use rescore::{Constraints, Registry, StorageType, TypeRef, Value};

fn array_of(name: &str) -> TypeRef {
    TypeRef::array_of(TypeRef::named(name))
}

#[test]
fn empty_arrays_are_equal() {
    let registry = Registry::new();
    let empty = Value::Array(vec![]);
    assert!(registry.equal(&array_of("integer"), &empty, &empty).unwrap());
}

#[test]
fn nil_element_is_not_equal_to_nothing() {
    let registry = Registry::new();
    let left = Value::Array(vec![Value::Nil]);
    let right = Value::Array(vec![]);
    assert!(!registry.equal(&array_of("integer"), &left, &right).unwrap());
}

#[test]
fn paired_nils_are_equal() {
    let registry = Registry::new();
    let nils = Value::Array(vec![Value::Nil, Value::Nil]);
    assert!(registry.equal(&array_of("integer"), &nils, &nils.clone()).unwrap());
}

#[test]
fn element_equality_is_the_element_types() {
    let registry = Registry::new();
    let left = Value::from(vec!["Alpha", "BETA"]);
    let right = Value::from(vec!["alpha", "beta"]);
    assert!(registry.equal(&array_of("ci_string"), &left, &right).unwrap());
    assert!(!registry.equal(&array_of("string"), &left, &right).unwrap());
}

#[test]
fn positions_matter() {
    let registry = Registry::new();
    let left = Value::from(vec![1i64, 2]);
    let right = Value::from(vec![2i64, 1]);
    assert!(!registry.equal(&array_of("integer"), &left, &right).unwrap());
}

#[test]
fn nested_arrays_compare_recursively() {
    let registry = Registry::new();
    let ty: TypeRef = "{array, {array, ci_string}}".parse().unwrap();
    let left = Value::Array(vec![Value::from(vec!["A"]), Value::Array(vec![])]);
    let right = Value::Array(vec![Value::from(vec!["a"]), Value::Array(vec![])]);
    assert!(registry.equal(&ty, &left, &right).unwrap());
}

#[test]
fn storage_type_wraps_the_element_storage() {
    let registry = Registry::new();
    let storage = registry.storage_type(&array_of("integer"), Constraints::empty()).unwrap();
    assert_eq!(storage, StorageType::Array(Box::new(StorageType::Integer)));
    assert_eq!(storage.to_string(), "{array, bigint}");
}

#[test]
fn describe_mentions_length_bounds() {
    let registry = Registry::new();
    let constraints = Constraints::new().with("min_length", 1).with("max_length", 2);
    let description = registry.describe(&array_of("integer"), &constraints).unwrap();
    assert_eq!(description, "list of integer (1 to 2 items)");
}
