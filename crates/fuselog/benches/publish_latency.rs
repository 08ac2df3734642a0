// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer hot-path latency: one publish into a large ring drained by a
//! discarding sink.

use criterion::{criterion_group, criterion_main, Criterion};
use fuselog::{Config, Level, Logger, NullOutput, Opts};

fn bench_publish(c: &mut Criterion) {
    let logger = Logger::init(Config {
        queues_max: 2,
        default_lines_nr: 8192,
        level_min: Level::Oops,
        output: Box::new(NullOutput),
        ..Config::default()
    })
    .expect("init");
    logger.assign_write_queue(8192, Opts::NONE).expect("assign");

    let mut seq = 0u64;
    c.bench_function("publish", |b| {
        b.iter(|| {
            seq = seq.wrapping_add(1);
            logger
                .log(
                    Level::Info,
                    file!(),
                    module_path!(),
                    line!(),
                    format_args!("message #{seq}"),
                )
                .expect("publish");
        });
    });

    logger.free_write_queue().expect("free");
    logger.deinit().expect("deinit");
}

fn bench_publish_filtered(c: &mut Criterion) {
    let logger = Logger::init(Config {
        queues_max: 2,
        default_lines_nr: 64,
        level_min: Level::Error,
        output: Box::new(NullOutput),
        ..Config::default()
    })
    .expect("init");

    c.bench_function("publish_filtered_out", |b| {
        b.iter(|| {
            logger
                .log(
                    Level::Trace,
                    file!(),
                    module_path!(),
                    line!(),
                    format_args!("never published"),
                )
                .expect("filtered");
        });
    });

    logger.deinit().expect("deinit");
}

criterion_group!(benches, bench_publish, bench_publish_filtered);
criterion_main!(benches);
