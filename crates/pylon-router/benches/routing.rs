//! Routing benchmarks.
//!
//! Run with: `cargo bench -p pylon-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use pylon_router::Router;

fn build_router(num_routes: usize) -> Router<usize> {
    let mut router = Router::new();
    for i in 0..num_routes / 3 {
        router
            .insert(Method::GET, &format!("/api/v1/resource{i}"), i)
            .unwrap();
        router
            .insert(Method::GET, &format!("/api/v1/resource{i}/{{id}}"), i)
            .unwrap();
        router
            .insert(
                Method::GET,
                &format!("/api/v1/org/{{orgId}}/resource{i}/{{id: [0-9]+}}"),
                i,
            )
            .unwrap();
    }
    router
}

fn bench_literal(c: &mut Criterion) {
    let router = build_router(99);
    c.bench_function("literal_match", |b| {
        b.iter(|| black_box(router.resolve(&Method::GET, "/api/v1/resource20").is_ok()));
    });
}

fn bench_constrained(c: &mut Criterion) {
    let router = build_router(99);
    c.bench_function("constrained_match", |b| {
        b.iter(|| {
            black_box(
                router
                    .resolve(&Method::GET, "/api/v1/org/acme/resource7/12345")
                    .is_ok(),
            )
        });
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_count");
    for size in [30, 150, 600] {
        let router = build_router(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &router, |b, r| {
            b.iter(|| black_box(r.resolve(&Method::GET, "/api/v1/resource5/abc").is_ok()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_literal, bench_constrained, bench_scaling);
criterion_main!(benches);
