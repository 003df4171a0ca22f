//! Performance benchmarks for OpsKit
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use opskit::monitor::LogSummary;
use opskit::quality::{lexer, structure, QualityChecker, QualityConfig};
use std::path::Path;
use tempfile::TempDir;

/// Python module with `functions` functions and one class
fn python_source(functions: usize) -> String {
    let mut source = String::from("import os\n\n\nclass Worker:\n    def run(self, items):\n        for item in items:\n            if item and os.path.exists(item):\n                yield item\n\n");
    for i in 0..functions {
        source.push_str(&format!(
            "\ndef handler_{i}(value, limit=10):\n    # branch on value\n    total = 0\n    for n in range(limit):\n        if n % 2 == 0 or value > n:\n            total += n\n        elif n == 3:\n            continue\n    return total\n\n"
        ));
    }
    source
}

fn create_project(dir: &Path, files: usize) {
    for i in 0..files {
        let pkg = dir.join(format!("pkg_{}", i % 10));
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join(format!("module_{}.py", i)), python_source(20)).unwrap();
    }
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    for functions in [10usize, 100, 1000] {
        let source = python_source(functions);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("functions", functions), &source, |b, source| {
            b.iter(|| {
                let lines = lexer::tokenize(black_box(source)).unwrap();
                black_box(structure::analyze(&lines).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_analyze_source(c: &mut Criterion) {
    let checker = QualityChecker::new(".", QualityConfig::default());
    let source = python_source(200);

    c.bench_function("analyze_source_200_functions", |b| {
        b.iter(|| black_box(checker.analyze_source("bench.py", &source)));
    });
}

fn bench_project_analysis(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    create_project(dir.path(), 100);

    c.bench_function("run_analysis_100_files", |b| {
        b.iter(|| {
            let checker = QualityChecker::new(dir.path(), QualityConfig::default());
            black_box(checker.run_analysis().unwrap())
        });
    });
}

fn bench_log_summary(c: &mut Criterion) {
    let mut log = String::new();
    for i in 0..100_000 {
        match i % 7 {
            0 => log.push_str("2024-05-01 ERROR request failed\n"),
            3 => log.push_str("2024-05-01 Warning: slow response\n"),
            _ => log.push_str("2024-05-01 INFO ok\n"),
        }
    }

    let mut group = c.benchmark_group("log_summary");
    group.throughput(Throughput::Bytes(log.len() as u64));
    group.bench_function("100k_lines", |b| {
        b.iter(|| black_box(LogSummary::from_content(&log)));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_analyze_source,
    bench_project_analysis,
    bench_log_summary
);

criterion_main!(benches);
