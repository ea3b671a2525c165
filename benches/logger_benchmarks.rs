//! Criterion benchmarks for rust_channel_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_channel_logger::prelude::*;
use rust_channel_logger::{LogOutcome, SourceLocation};
use std::sync::Arc;
use std::thread;

fn null_logger(level: LogLevel) -> Logger {
    Logger::builder("bench")
        .level(level)
        .sink(Arc::new(NullSink::new()))
        .build()
        .expect("Failed to build logger")
}

// ============================================================================
// Level Filtering Benchmarks
// ============================================================================

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Warn);

    group.bench_function("should_log_disabled", |b| {
        b.iter(|| black_box(logger.should_log(black_box(LogLevel::Debug))));
    });

    group.bench_function("filtered_log_call", |b| {
        b.iter(|| {
            let outcome = logger.log(black_box(LogLevel::Debug), black_box("filtered"));
            debug_assert_eq!(outcome, LogOutcome::Filtered);
            black_box(outcome)
        });
    });

    group.bench_function("filtered_macro_with_args", |b| {
        b.iter(|| black_box(rust_channel_logger::debug!(logger, "value {}", black_box(42))));
    });

    group.finish();
}

// ============================================================================
// Direct Mode Benchmarks
// ============================================================================

fn bench_direct_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_logging");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Trace);

    group.bench_function("null_sink_info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("null_sink_macro", |b| {
        b.iter(|| rust_channel_logger::info!(logger, "request {} took {}ms", black_box(7), 12));
    });

    group.finish();
}

// ============================================================================
// Async Dispatch Benchmarks
// ============================================================================

fn bench_async_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_logging");
    group.throughput(Throughput::Elements(1));

    for (label, policy) in [
        ("block", OverflowPolicy::Block),
        ("drop_newest", OverflowPolicy::DropNewest),
        ("drop_oldest", OverflowPolicy::DropOldest),
    ] {
        let logger = Logger::builder("bench")
            .sink(Arc::new(NullSink::new()))
            .async_mode(8192)
            .overflow_policy(policy)
            .on_overflow(Arc::new(|_| {}))
            .build()
            .expect("Failed to build logger");

        group.bench_function(label, |b| {
            b.iter(|| logger.info(black_box("Async message")));
        });
        logger.shutdown().expect("Failed to shut down");
    }

    group.finish();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");
    group.throughput(Throughput::Elements(4 * 1000));
    group.sample_size(20);

    group.bench_function("4_threads_async_block", |b| {
        let logger = Arc::new(
            Logger::builder("bench")
                .sink(Arc::new(NullSink::new()))
                .async_mode(8192)
                .build()
                .expect("Failed to build logger"),
        );

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let logger = Arc::clone(&logger);
                    thread::spawn(move || {
                        for i in 0..1000 {
                            logger.info(format!("message {}", i));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().expect("Thread panicked");
            }
            logger.flush().expect("Failed to flush");
        });
    });

    group.finish();
}

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let record = LogRecord::new(
        LogLevel::Info,
        Arc::from("bench"),
        "User logged in successfully".to_string(),
    )
    .with_location(SourceLocation::new("src/main.rs", 42, "bench"));

    let pattern = PatternFormatter::default();
    let json = JsonFormatter::new();
    let mut buffer = Vec::with_capacity(256);

    group.bench_function("pattern_default", |b| {
        b.iter(|| {
            buffer.clear();
            pattern.format(black_box(&record), &mut buffer);
            black_box(buffer.len())
        });
    });

    group.bench_function("json", |b| {
        b.iter(|| {
            buffer.clear();
            json.format(black_box(&record), &mut buffer);
            black_box(buffer.len())
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_level_filtering,
    bench_direct_logging,
    bench_async_logging,
    bench_concurrent_logging,
    bench_formatting
);

criterion_main!(benches);
