//! Benchmarks for the four scheduling-entry policies' `pick`/`change`
//! hot paths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use edge_runtime::domain_types::{Endpoint, Weight};
use edge_runtime::scheduling::{SchedulingEntry, SchedulingKind};

fn endpoints(n: usize) -> Vec<Endpoint> {
    (0..n).map(|i| Endpoint::try_new(format!("10.0.0.{i}:9000")).unwrap()).collect()
}

fn bench_pick(c: &mut Criterion, kind: SchedulingKind, name: &str) {
    let mut group = c.benchmark_group(name);
    for &n in &[4usize, 16, 64] {
        let eps = endpoints(n);
        let mut entry = SchedulingEntry::new(kind);
        for (i, ep) in eps.iter().enumerate() {
            let weight = Weight::try_new((i + 1) as f64).unwrap();
            entry.change(ep.clone(), weight, i == 0).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| entry.pick().unwrap());
        });
    }
    group.finish();
}

fn bench_change(c: &mut Criterion, kind: SchedulingKind, name: &str) {
    let mut group = c.benchmark_group(format!("{name}_change"));
    for &n in &[4usize, 16, 64] {
        let eps = endpoints(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut entry = SchedulingEntry::new(kind);
                for (i, ep) in eps.iter().enumerate() {
                    let weight = Weight::try_new((i + 1) as f64).unwrap();
                    entry.change(ep.clone(), weight, i == 0).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn scheduling_entries(c: &mut Criterion) {
    bench_pick(c, SchedulingKind::Random, "random_pick");
    bench_pick(c, SchedulingKind::LeastImpedance, "least_impedance_pick");
    bench_pick(c, SchedulingKind::RoundRobin, "round_robin_pick");
    bench_pick(
        c,
        SchedulingKind::ProportionalFairness {
            alpha: edge_runtime::domain_types::Alpha::try_new(1.0).unwrap(),
            beta: edge_runtime::domain_types::Beta::try_new(1.0).unwrap(),
        },
        "proportional_fairness_pick",
    );
    bench_change(c, SchedulingKind::LeastImpedance, "least_impedance");
}

criterion_group!(benches, scheduling_entries);
criterion_main!(benches);
