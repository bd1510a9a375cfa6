use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rescore::{Constraints, Registry, TypeRef, Value};

fn numbers(n: usize) -> Value {
    Value::Array((0..n).map(|i| Value::String(i.to_string())).collect())
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let registry = Registry::new();
    let integers: TypeRef = "{array, integer}".parse().unwrap();

    let input = numbers(1_000);
    c.bench_function("cast 1k", |b| {
        b.iter(|| registry.cast_input(&integers, black_box(input.clone()), Constraints::empty()))
    });

    let cast = registry
        .cast_input(&integers, numbers(100_000), Constraints::empty())
        .unwrap();
    c.bench_function("cast 100k", |b| {
        b.iter(|| registry.cast_input(&integers, black_box(numbers(100_000)), Constraints::empty()))
    });

    // no element constraints and nils allowed, elements are never visited
    let skipping = Constraints::new().with("max_length", 1_000_000).with("nil_items?", true);
    c.bench_function("constraints 100k skipped", |b| {
        b.iter(|| registry.apply_constraints(&integers, black_box(&cast), &skipping))
    });

    let checking = Constraints::new()
        .with("max_length", 1_000_000)
        .with_nested("items", Constraints::new().with("min", 0));
    c.bench_function("constraints 100k checked", |b| {
        b.iter(|| registry.apply_constraints(&integers, black_box(&cast), &checking))
    });

    c.bench_function("equal 100k", |b| {
        b.iter(|| registry.equal(&integers, black_box(&cast), black_box(&cast)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
