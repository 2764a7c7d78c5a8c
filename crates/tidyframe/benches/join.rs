use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tidyframe::{AsofOptions, Column, Frame, JoinKind, JoinOptions, Summary};

fn bench_rows() -> usize {
    std::env::var("TIDYFRAME_JOIN_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| (10_000..=5_000_000).contains(&v))
        .unwrap_or(200_000)
}

fn fact(rows: usize, keys: usize) -> Frame {
    Frame::from_columns([
        ("key", Column::from_iter((0..rows).map(|i| (i % keys) as i64))),
        ("t", Column::from_iter((0..rows).map(|i| i as i64 * 10))),
        ("amount", Column::from_iter((0..rows).map(|i| (i % 100) as f64))),
    ])
    .unwrap()
}

fn dim(keys: usize) -> Frame {
    Frame::from_columns([
        ("key", Column::from_iter((0..keys).map(|k| k as i64))),
        ("bucket", Column::from_iter((0..keys).map(|k| format!("b{}", k % 10)))),
    ])
    .unwrap()
}

fn bench_join(c: &mut Criterion) {
    let rows = bench_rows();
    let keys = 10_000usize;
    let fact = fact(rows, keys);
    // Half the keys are missing from the dimension so left/outer joins take the unmatched path.
    let dim = dim(keys / 2);
    let quotes = Frame::from_columns([
        ("t", Column::from_iter((0..rows / 4).map(|i| i as i64 * 40 + 7))),
        ("px", Column::from_iter((0..rows / 4).map(|i| i as f64))),
    ])
    .unwrap();

    let mut group = c.benchmark_group("join");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(rows as u64));

    for kind in [JoinKind::Inner, JoinKind::Left, JoinKind::Outer] {
        group.bench_with_input(
            BenchmarkId::new(format!("{kind:?}").to_lowercase(), rows),
            &rows,
            |b, _| {
                b.iter(|| {
                    let out = fact
                        .join(&dim, "key", kind, &JoinOptions::default())
                        .unwrap();
                    black_box(out);
                })
            },
        );
    }

    group.bench_with_input(BenchmarkId::new("asof_backward", rows), &rows, |b, _| {
        b.iter(|| {
            let out = fact
                .asof_join(&quotes, "t", &AsofOptions::default().tolerance(40.0))
                .unwrap();
            black_box(out);
        })
    });

    group.bench_with_input(BenchmarkId::new("group_sum", rows), &rows, |b, _| {
        let summary = Summary::new().agg("total", |g| {
            Ok(tidyframe::stats::sum(&g.extract("amount")?, true)?)
        });
        b.iter(|| {
            let out = fact.group_by(&["key"]).unwrap().summarise(&summary).unwrap();
            black_box(out);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_join);
criterion_main!(benches);
