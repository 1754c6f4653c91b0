//! Benchmarks for Confluence Select
//!
//! Measures greedy selection throughput under:
//! - No constraints (sort cost only)
//! - Partition capacities
//! - Partition plus a laminar family

use std::collections::BTreeMap;

use confluence_select::{select, ActionEvent, ConstraintSet, LaminarSet, SetScope};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn candidates(n: usize) -> Vec<ActionEvent> {
    (0..n)
        .map(|i| {
            // Spread weights with repeats so ties are exercised
            let weight = ((i * 7919) % 1000) as f64 / 10.0;
            ActionEvent::new(format!("e{:06}", i), weight, format!("g{}", i % 8))
        })
        .collect()
}

fn constraint_sets() -> Vec<(&'static str, ConstraintSet)> {
    let caps: BTreeMap<String, usize> = (0..8).map(|g| (format!("g{}", g), 4)).collect();
    let laminar = vec![
        LaminarSet::new("all", SetScope::All, 20),
        LaminarSet::over("low", ["g0", "g1", "g2", "g3"], 10),
        LaminarSet::over("g0", ["g0"], 2),
    ];

    vec![
        ("none", ConstraintSet::unconstrained()),
        (
            "partition",
            ConstraintSet::from_parts(caps.clone(), None, vec![]).unwrap(),
        ),
        (
            "partition_laminar",
            ConstraintSet::from_parts(caps, None, laminar).unwrap(),
        ),
    ]
}

/// Benchmark selection over increasing candidate counts
fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for (name, constraints) in constraint_sets() {
        for size in [100usize, 1_000, 10_000] {
            let input = candidates(size);
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &input, |b, input| {
                b.iter(|| select(black_box(input.clone()), &constraints))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
