//! Allocator benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use segfit_core::Allocator;

fn bench_alloc_free_cycle(c: &mut Criterion) {
    let sizes: &[usize] = &[8, 16, 64, 128, 256, 4096];
    let mut group = c.benchmark_group("alloc_free_cycle");

    for &size in sizes {
        group.bench_with_input(BenchmarkId::new("segfit", size), &size, |b, &sz| {
            let mut allocator = Allocator::new();
            b.iter(|| {
                let ptr = allocator.allocate(sz).unwrap();
                allocator.deallocate(criterion::black_box(ptr), sz);
            });
        });

        group.bench_with_input(BenchmarkId::new("system", size), &size, |b, &sz| {
            b.iter(|| {
                let v = vec![0u8; sz];
                criterion::black_box(v);
            });
        });
    }
    group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_burst");

    group.bench_function("1000x64B", |b| {
        let mut allocator = Allocator::new();
        b.iter(|| {
            let ptrs: Vec<_> = (0..1000).map(|_| allocator.allocate(64).unwrap()).collect();
            for ptr in ptrs {
                allocator.deallocate(criterion::black_box(ptr), 64);
            }
        });
    });

    group.finish();
}

fn bench_realloc_ladder(c: &mut Criterion) {
    let mut group = c.benchmark_group("realloc_ladder");

    group.bench_function("8B_to_256B", |b| {
        let mut allocator = Allocator::new();
        b.iter(|| {
            let mut ptr = allocator.allocate(8).unwrap();
            let mut size = 8;
            while size < 256 {
                ptr = allocator.reallocate(ptr, size, size * 2).unwrap();
                size *= 2;
            }
            allocator.deallocate(criterion::black_box(ptr), size);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_alloc_free_cycle,
    bench_alloc_burst,
    bench_realloc_ladder
);
criterion_main!(benches);
