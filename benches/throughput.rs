use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chatplan::{AppResult, Chatplan, Message, Router};
use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

fn accept(_: &mut Message, _: &str, _: &str) -> AppResult {
    AppResult::Accepted
}

fn build_shared_router() -> (Arc<Router<Arc<Chatplan>>>, Message) {
    let n = 20;
    let mut builder = Chatplan::builder();
    builder = builder.context("default", move |mut c| {
        for i in 0..n {
            let expression = format!(r"^{i}0(\d+)$");
            c = c.extension(&format!("ext_{i}"), move |e| {
                e.condition(|c| {
                    c.field("to")
                        .expression(&expression)
                        .action("reply", "matched $1")
                })
            });
        }
        c.extension("catchall", |e| {
            e.condition(|c| c.field("to").expression(r"^(\d+)$").action("reply", "$1"))
        })
    });

    let router = Arc::new(Router::new(Arc::new(builder.compile().unwrap())));
    let msg = Message::new().with("to", "9123456").with("from", "1000");
    (router, msg)
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];
    let now = Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap();

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let (router, msg) = build_shared_router();

        group.bench_function(&format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let r = Arc::clone(&router);
                        let m = msg.clone();
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = r.send_at(&mut m.clone(), &mut accept, now);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
