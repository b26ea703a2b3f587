// Pool throughput benchmarks.
//
// Measures raw pool acquire/release overhead with a zero-cost resource
// (no I/O, instant create/dispose).

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use stockpile::{AcquirePolicy, Factory, Pool, PoolConfig};

// -- Minimal no-op factory for benchmarking pool overhead only --

struct NoOpFactory;

impl Factory for NoOpFactory {
    type Resource = u64;
    type Error = std::io::Error;

    async fn create(&self) -> std::io::Result<u64> {
        Ok(0)
    }

    async fn dispose(&self, _resource: u64) {}
}

fn build_pool(rt: &tokio::runtime::Runtime, size: usize) -> Pool<NoOpFactory> {
    rt.block_on(Pool::new(NoOpFactory, PoolConfig::new(size, size)))
        .expect("failed to create pool")
}

fn single_thread_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to build runtime");
    let pool = build_pool(&rt, 64);

    c.bench_function("single_thread_acquire_release", |b| {
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let guard = pool.acquire().await.unwrap();
                black_box(*guard);
                drop(guard);
            }
        });
    });
}

fn multi_thread_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("failed to build runtime");
    let pool = build_pool(&rt, 64);

    c.bench_function("multi_thread_acquire_release", |b| {
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let guard = pool.acquire().await.unwrap();
                black_box(*guard);
                drop(guard);
            }
        });
    });
}

fn concurrent_contention(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("failed to build runtime");

    // Small pool to create contention.
    let pool = build_pool(&rt, 4);

    c.bench_function("contended_acquire_release_4slots", |b| {
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let tasks: Vec<_> = (0..8)
                    .map(|_| {
                        let pool = pool.clone();
                        tokio::spawn(async move {
                            let guard = pool.acquire().await.unwrap();
                            tokio::task::yield_now().await;
                            drop(guard);
                        })
                    })
                    .collect();
                for task in tasks {
                    task.await.unwrap();
                }
            }
        });
    });
}

fn grow_cold_start(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to build runtime");

    c.bench_function("grow_fill_32", |b| {
        b.to_async(&rt).iter(|| async {
            let config = PoolConfig::new(0, 32).with_policy(AcquirePolicy::Grow);
            let pool = Pool::new(NoOpFactory, config).await.unwrap();
            let mut guards = Vec::with_capacity(32);
            for _ in 0..32 {
                guards.push(pool.acquire().await.unwrap());
            }
            drop(guards);
            pool.shutdown().await;
        });
    });
}

criterion_group!(
    benches,
    single_thread_throughput,
    multi_thread_throughput,
    concurrent_contention,
    grow_cold_start,
);
criterion_main!(benches);
