use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use workpool::pool::ThreadPool;

// Benchmark 1: fire-and-forget submission overhead
fn bench_spawn_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_overhead");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("spawn", size), &size, |b, &size| {
            let pool = ThreadPool::new();
            b.iter(|| {
                let done = Arc::new(AtomicUsize::new(0));
                for i in 0..size {
                    let done = done.clone();
                    pool.spawn(move || {
                        black_box(i);
                        done.fetch_add(1, Ordering::Release);
                    });
                }
                while done.load(Ordering::Acquire) < size {
                    std::hint::spin_loop();
                }
            });
        });
    }

    group.finish();
}

// Benchmark 2: bulk iteration with a trivial body
fn bench_split_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_throughput");

    for size in [1_000usize, 100_000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("split", size), &size, |b, &size| {
            let pool = ThreadPool::new();
            b.iter(|| {
                pool.split(0, size, |i| {
                    black_box(i);
                })
                .wait()
                .unwrap();
            });
        });
    }

    group.finish();
}

// Benchmark 3: bulk iteration with a CPU-bound body
fn bench_split_cpu_bound(c: &mut Criterion) {
    fn fib(n: u64) -> u64 {
        if n <= 1 {
            n
        } else {
            fib(n - 1) + fib(n - 2)
        }
    }

    let mut group = c.benchmark_group("split_cpu_bound");
    group.bench_function("fib_20_x64", |b| {
        let pool = ThreadPool::new();
        b.iter(|| {
            pool.split(0, 64, |_| {
                black_box(fib(20));
            })
            .wait()
            .unwrap();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_spawn_overhead,
    bench_split_throughput,
    bench_split_cpu_bound
);
criterion_main!(benches);
