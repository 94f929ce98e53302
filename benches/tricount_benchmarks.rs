use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tricount::{extract_triangular_parts, Method, TriangleCounter};
use tricount_sparse::{CsrEngine, EngineCapabilities, SparseMatrix};

/// Erdos-Renyi graph with roughly `avg_degree` neighbors per node
fn random_graph(engine: &CsrEngine, n: usize, avg_degree: usize, seed: u64) -> SparseMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let edge_count = n * avg_degree / 2;
    let edges: Vec<(usize, usize)> = (0..edge_count)
        .map(|_| (rng.gen_range(0..n), rng.gen_range(0..n)))
        .collect();
    engine.symmetric_adjacency(n, &edges).unwrap()
}

/// Benchmark each formulation on the same graph
fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("tricount_methods");
    let engine = CsrEngine::new();
    let a = random_graph(&engine, 5_000, 16, 1);
    let counter = TriangleCounter::new(&engine);

    for method in Method::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(method), &method, |b, &method| {
            b.iter(|| {
                let ntri = counter.count(&a, method).unwrap();
                criterion::black_box(ntri);
            });
        });
    }
    group.finish();
}

/// Benchmark SandiaDot as the graph grows
fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tricount_scaling");
    let engine = CsrEngine::new();

    for size in [1_000, 10_000, 50_000].iter() {
        let a = random_graph(&engine, *size, 8, 2);
        let counter = TriangleCounter::new(&engine);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| criterion::black_box(counter.count(&a, Method::SandiaDot).unwrap()));
        });
    }
    group.finish();
}

/// Select versus tuple-rebuild decomposition
fn bench_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangular_decomposition");

    for (name, capabilities) in [
        ("select", EngineCapabilities::FULL),
        ("tuples", EngineCapabilities::BASIC),
    ] {
        let engine = CsrEngine::with_capabilities(capabilities);
        let a = random_graph(&engine, 20_000, 16, 3);
        group.bench_function(name, |b| {
            b.iter(|| {
                let parts = extract_triangular_parts(&engine, &a, true, true).unwrap();
                criterion::black_box(parts.lower.is_some());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_methods, bench_scaling, bench_decomposition);
criterion_main!(benches);
