// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end scenarios through the public API.

#![cfg(feature = "threaded")]

use fuselog::{spawn_writer, Config, Level, Logger, MemoryOutput, Opts, Output, THEME_BW};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sink that holds the reader until the gate opens. Used to build up
/// back-pressure deterministically.
struct GateOutput {
    open: Arc<AtomicBool>,
    inner: MemoryOutput,
}

impl Output for GateOutput {
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        while !self.open.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(1));
        }
        self.inner.write_line(line)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn message_of(line: &str) -> &str {
    line.rsplit(' ').next().unwrap_or("")
}

fn wait_idle(logger: &Logger) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !logger.reader_idle() {
        assert!(Instant::now() < deadline, "reader never went idle");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Scenario A: single writer, single queue of 4 slots, 10 records come
/// out in publication order and deinit drains everything.
#[test]
fn test_single_writer_in_order() {
    let output = MemoryOutput::new();
    let logger = Logger::init(Config {
        queues_max: 1,
        default_lines_nr: 4,
        level_min: Level::Oops,
        theme: &THEME_BW,
        output: Box::new(output.clone()),
        ..Config::default()
    })
    .expect("init");

    let handle = logger.handle();
    let writer = spawn_writer(&logger, "w0", 4, Opts::NONE, move || {
        for i in 0..10 {
            handle
                .log(
                    Level::Info,
                    file!(),
                    module_path!(),
                    line!(),
                    format_args!("m{i}"),
                )
                .expect("publish");
        }
    })
    .expect("spawn");
    writer.join().expect("join").expect("writer");

    logger.deinit().expect("deinit");

    let lines = output.collected();
    assert_eq!(lines.len(), 10);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(message_of(line), format!("m{i}"), "{line}");
    }
}

/// Scenario C: non-blocking writer against a paused reader. Emitted
/// records stay in publication order and nothing is unaccounted for.
#[test]
fn test_nonblock_drops_are_counted() {
    let open = Arc::new(AtomicBool::new(false));
    let output = MemoryOutput::new();
    let logger = Logger::init(Config {
        queues_max: 1,
        default_lines_nr: 2,
        level_min: Level::Oops,
        theme: &THEME_BW,
        output: Box::new(GateOutput {
            open: Arc::clone(&open),
            inner: output.clone(),
        }),
        ..Config::default()
    })
    .expect("init");

    logger
        .assign_write_queue(2, Opts::NONBLOCK)
        .expect("assign");
    let mut published = 0u64;
    for i in 0..100 {
        if logger
            .log(
                Level::Info,
                file!(),
                module_path!(),
                line!(),
                format_args!("m{i:03}"),
            )
            .is_ok()
        {
            published += 1;
        }
    }

    open.store(true, Ordering::Release);
    wait_idle(&logger);
    let lost = logger.lost_total();
    logger.free_write_queue().expect("free");
    logger.deinit().expect("deinit");

    let lines = output.collected();
    assert_eq!(lines.len() as u64, published);
    assert_eq!(lines.len() as u64 + lost, 100);

    // publication order survived the drops
    let mut prev = String::new();
    for line in &lines {
        let msg = message_of(line).to_string();
        assert!(msg > prev, "out of order: {prev} then {msg}");
        prev = msg;
    }
}

/// Scenario D: with PRINTLOST, exactly one summary record precedes the
/// next real record after a drop burst.
#[test]
fn test_printlost_emits_one_summary() {
    let open = Arc::new(AtomicBool::new(false));
    let output = MemoryOutput::new();
    let logger = Logger::init(Config {
        queues_max: 1,
        default_lines_nr: 2,
        level_min: Level::Oops,
        theme: &THEME_BW,
        output: Box::new(GateOutput {
            open: Arc::clone(&open),
            inner: output.clone(),
        }),
        ..Config::default()
    })
    .expect("init");

    logger
        .assign_write_queue(2, Opts::NONBLOCK | Opts::PRINTLOST)
        .expect("assign");
    for i in 0..50 {
        let _ = logger.log(
            Level::Info,
            file!(),
            module_path!(),
            line!(),
            format_args!("burst{i}"),
        );
    }
    let lost = logger.lost_total();
    assert!(lost > 0, "expected drops while the reader was gated");

    open.store(true, Ordering::Release);
    wait_idle(&logger);

    logger
        .log(
            Level::Info,
            file!(),
            module_path!(),
            line!(),
            format_args!("after"),
        )
        .expect("publish after recovery");
    logger.free_write_queue().expect("free");
    logger.deinit().expect("deinit");

    let lines = output.collected();
    let summaries: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.contains("Lost "))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(summaries.len(), 1, "{lines:?}");
    let summary_idx = summaries[0];
    assert!(lines[summary_idx].contains(&format!("Lost {lost} log line(s)")));
    assert!(lines[summary_idx].contains("OOPS!"));
    assert_eq!(message_of(&lines[summary_idx + 1]), "after");
}

/// Scenario E: a released queue is reused best-fit by the next binder
/// with no residual records.
#[test]
fn test_queue_reuse_best_fit() {
    let output = MemoryOutput::new();
    let logger = Logger::init(Config {
        queues_max: 4,
        default_lines_nr: 4,
        level_min: Level::Oops,
        theme: &THEME_BW,
        output: Box::new(output.clone()),
        ..Config::default()
    })
    .expect("init");

    // writer A: bind 4 lines, publish 3, release
    logger.assign_write_queue(4, Opts::NONE).expect("assign A");
    assert_eq!(logger.bound_queue_capacity(), Some(4));
    for i in 0..3 {
        logger
            .log(
                Level::Info,
                file!(),
                module_path!(),
                line!(),
                format_args!("a{i}"),
            )
            .expect("publish");
    }
    logger.free_write_queue().expect("free A");

    // writer B: asks for 2 lines, must get A's queue back
    logger.assign_write_queue(2, Opts::NONE).expect("assign B");
    assert_eq!(logger.bound_queue_capacity(), Some(4));
    assert_eq!(logger.queues_allocated(), 1);
    logger.free_write_queue().expect("free B");

    logger.deinit().expect("deinit");
    assert_eq!(output.collected().len(), 3, "no residual records");
}

/// Scenario F: writers keep publishing, then everything published is
/// emitted by the time deinit returns.
#[test]
fn test_deinit_drains_everything() {
    let output = MemoryOutput::new();
    let logger = Logger::init(Config {
        queues_max: 4,
        default_lines_nr: 8,
        level_min: Level::Oops,
        theme: &THEME_BW,
        output: Box::new(output.clone()),
        ..Config::default()
    })
    .expect("init");

    let stop = Arc::new(AtomicBool::new(false));
    let mut writers = Vec::new();
    for w in 0..3 {
        let handle = logger.handle();
        let stop = Arc::clone(&stop);
        let writer = spawn_writer(&logger, &format!("w{w}"), 0, Opts::NONE, move || {
            let mut published = 0u64;
            while !stop.load(Ordering::Acquire) {
                handle
                    .log(
                        Level::Info,
                        file!(),
                        module_path!(),
                        line!(),
                        format_args!("w{w} #{published}"),
                    )
                    .expect("publish");
                published += 1;
                if published % 64 == 0 {
                    thread::yield_now();
                }
            }
            published
        })
        .expect("spawn");
        writers.push(writer);
    }

    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::Release);
    let total: u64 = writers
        .into_iter()
        .map(|w| w.join().expect("join").expect("writer"))
        .sum();

    logger.deinit().expect("deinit");
    assert_eq!(output.collected().len() as u64, total);
}

/// The process-global logger and the level macros, exercised in one
/// test to keep the global state uncontended.
#[test]
fn test_global_logger_and_macros() {
    let output = MemoryOutput::new();
    fuselog::init(Config {
        queues_max: 2,
        default_lines_nr: 8,
        level_min: Level::Oops,
        theme: &THEME_BW,
        output: Box::new(output.clone()),
        ..Config::default()
    })
    .expect("init");

    // double init is rejected
    assert_eq!(
        fuselog::init(Config::default()),
        Err(fuselog::Error::InvalidArgument)
    );

    fuselog::info!("hello {}", 42);
    fuselog::okay!("done");

    fuselog::deinit().expect("deinit");
    assert_eq!(fuselog::deinit(), Err(fuselog::Error::ShutDown));

    // macros swallow ShutDown once the logger is gone
    fuselog::info!("goes nowhere");

    let lines = output.collected();
    assert_eq!(lines.len(), 2);
    assert_eq!(message_of(&lines[0]), "42");
    assert_eq!(message_of(&lines[1]), "done");
    assert!(lines[0].contains("test_global_logger_and_macros"), "{}", lines[0]);
}
