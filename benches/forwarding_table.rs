//! Benchmarks for `ForwardingTable`'s mutex-guarded `change`/`pick` path
//! under growing function-name cardinality.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use edge_runtime::domain_types::{Endpoint, FunctionName};
use edge_runtime::forwarding_table::ForwardingTable;
use edge_runtime::scheduling::SchedulingKind;

fn populated(functions: usize, destinations_per_function: usize) -> ForwardingTable {
    let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
    for f in 0..functions {
        let function = FunctionName::try_new(format!("fn-{f}")).unwrap();
        for d in 0..destinations_per_function {
            let endpoint = Endpoint::try_new(format!("10.0.{f}.{d}:9000")).unwrap();
            table.change(function.clone(), endpoint, (d + 1) as f64, true).unwrap();
        }
    }
    table
}

fn pick_scales_with_function_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("forwarding_table_pick");
    for &n in &[10usize, 100, 1000] {
        let table = populated(n, 4);
        let target = FunctionName::try_new("fn-0").unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| table.pick(&target).unwrap());
        });
    }
    group.finish();
}

fn change_scales_with_function_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("forwarding_table_change");
    for &n in &[10usize, 100, 1000] {
        let table = populated(n, 4);
        let function = FunctionName::try_new("fn-0").unwrap();
        let endpoint = Endpoint::try_new("10.0.0.0:9000").unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| table.change(function.clone(), endpoint.clone(), 2.5, true).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, pick_scales_with_function_count, change_scales_with_function_count);
criterion_main!(benches);
