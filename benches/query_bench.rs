use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use fwtab::conf::{BuildConfig, QueryConfig};
use fwtab::testutil::build_generated_table;
use fwtab::{Filter, Op, Table, build_index, filter_rows};

const ROW_COUNTS: &[usize] = &[10_000, 100_000, 1_000_000];

fn bench_filter(c: &mut Criterion) {
    for &num_rows in ROW_COUNTS {
        let dir = TempDir::new().unwrap();
        let build = BuildConfig {
            workers: 4,
            ..BuildConfig::default()
        };
        let (_, path) = build_generated_table(dir.path(), "bench", num_rows, &build);
        let table = Table::open(&path).unwrap();
        let filter = Filter::float("score", Op::Ge, 90.0);

        let mut group = c.benchmark_group(format!("filter/rows_{}", num_rows));
        group.throughput(Throughput::Elements(num_rows as u64));
        if num_rows >= 1_000_000 {
            group.sample_size(10);
            group.measurement_time(Duration::from_secs(20));
        }

        for workers in [1, 4] {
            let config = QueryConfig {
                workers,
                use_indexes: false,
                ..QueryConfig::default()
            };
            group.bench_with_input(BenchmarkId::new("scan", workers), &workers, |b, _| {
                b.iter(|| filter_rows(black_box(&table), black_box(&filter), &config).unwrap())
            });
        }

        build_index(&table, "score").unwrap();
        let config = QueryConfig::default();
        group.bench_function("index", |b| {
            b.iter(|| filter_rows(black_box(&table), black_box(&filter), &config).unwrap())
        });
        group.finish();
    }
}

criterion_group!(benches, bench_filter);
criterion_main!(benches);
