use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hitcounter::glyphs::{render_html, GlyphTable, MemoryAssets};
use hitcounter::{CounterStore, Style};

const NUM_THREADS: usize = 8;
const ITERATIONS_PER_THREAD: usize = 100_000;

fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_increment");

    group.bench_function(
        BenchmarkId::new(
            "CounterStore (one key)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let store = Arc::new(CounterStore::new());
                let mut handles = vec![];

                for _ in 0..NUM_THREADS {
                    let store_clone = Arc::clone(&store);
                    let handle = thread::spawn(move || {
                        for _ in 0..ITERATIONS_PER_THREAD {
                            store_clone.increment_and_get("/index.html");
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(store.get("/index.html"))
            })
        },
    );

    group.bench_function(
        BenchmarkId::new(
            "CounterStore (key per thread)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let store = Arc::new(CounterStore::new());
                let mut handles = vec![];

                for i in 0..NUM_THREADS {
                    let store_clone = Arc::clone(&store);
                    let key = format!("/page/{i}");
                    let handle = thread::spawn(move || {
                        for _ in 0..ITERATIONS_PER_THREAD {
                            store_clone.increment_and_get(&key);
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(store.len())
            })
        },
    );

    group.bench_function(
        BenchmarkId::new(
            "AtomicU64 (single)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let counter = Arc::new(AtomicU64::new(0));
                let mut handles = vec![];

                for _ in 0..NUM_THREADS {
                    let counter_clone = Arc::clone(&counter);
                    let handle = thread::spawn(move || {
                        for _ in 0..ITERATIONS_PER_THREAD {
                            counter_clone.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(counter.load(Ordering::Relaxed))
            })
        },
    );

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let counts: HashMap<String, u64> = (0..10_000).map(|i| (format!("/page/{i}"), i)).collect();
    let store = CounterStore::with_counts(counts);

    c.bench_function("snapshot 10k keys", |b| b.iter(|| black_box(store.snapshot())));
}

fn bench_render(c: &mut Criterion) {
    let assets = MemoryAssets::placeholder(Style::Green);
    let table = GlyphTable::build(&assets, Style::Green).unwrap();

    c.bench_function("render_html padded", |b| {
        b.iter(|| black_box(render_html(black_box(1337), 8, &table)))
    });
}

criterion_group!(benches, bench_increment, bench_snapshot, bench_render);
criterion_main!(benches);
