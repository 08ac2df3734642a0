// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! fuselog-stress - hammer the logger from many writer threads.
//!
//! Every thread publishes a burst of messages at random levels with
//! occasional artificial stalls, then the tool reports per-thread
//! counts, drops and throughput.

use clap::Parser;
use fuselog::{spawn_writer, Config, Level, Logger, Opts, THEME_BW, THEME_DEFAULT};
use std::time::{Duration, Instant};

/// fuselog stress/demo driver
#[derive(Parser, Debug)]
#[command(name = "fuselog-stress")]
#[command(about = "Stress fuselog with many writer threads")]
struct Args {
    /// Number of writer threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Messages published per thread
    #[arg(short = 'n', long, default_value = "10000")]
    messages: u64,

    /// Ring size per writer queue
    #[arg(short, long, default_value = "64")]
    lines: usize,

    /// Drop on full queue instead of blocking
    #[arg(long)]
    nonblock: bool,

    /// Report dropped lines once space frees up
    #[arg(long)]
    printlost: bool,

    /// Touch queue pages at allocation time
    #[arg(long)]
    prealloc: bool,

    /// One-in-N chance for a writer to stall before publishing
    #[arg(long, default_value = "500")]
    stall_chance: u64,

    /// Stall duration in microseconds
    #[arg(long, default_value = "100")]
    stall_us: u64,

    /// Disable colors
    #[arg(long)]
    bw: bool,
}

fn main() -> fuselog::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut opts = Opts::NONE;
    if args.nonblock {
        opts |= Opts::NONBLOCK;
    }
    if args.printlost {
        opts |= Opts::PRINTLOST;
    }
    if args.prealloc {
        opts |= Opts::PREALLOC;
    }

    let logger = Logger::init(Config {
        queues_max: args.threads + 1,
        default_lines_nr: args.lines,
        level_min: Level::Oops,
        opts,
        theme: if args.bw { &THEME_BW } else { &THEME_DEFAULT },
        ..Config::default()
    })?;

    let start = Instant::now();
    let mut writers = Vec::with_capacity(args.threads);
    for w in 0..args.threads {
        let handle = logger.handle();
        let messages = args.messages;
        let stall_chance = args.stall_chance.max(1);
        let stall = Duration::from_micros(args.stall_us);
        let writer = spawn_writer(&logger, &format!("w{w}"), args.lines, opts, move || {
            let mut printed = 0u64;
            let mut elapsed_ns = 0u64;
            for seq in 0..messages {
                if fastrand::u64(0..stall_chance) == 0 {
                    std::thread::sleep(stall);
                }
                let level = Level::from_index(fastrand::u8(0..Level::COUNT as u8))
                    .unwrap_or(Level::Info);
                let before = Instant::now();
                let published = handle
                    .log(
                        level,
                        file!(),
                        module_path!(),
                        line!(),
                        format_args!(
                            "Message #{seq:<5} (the previous publish took {elapsed_ns} ns)"
                        ),
                    )
                    .is_ok();
                elapsed_ns = before.elapsed().as_nanos() as u64;
                if published {
                    printed += 1;
                }
            }
            printed
        })
        .map_err(fuselog::Error::from)?;
        writers.push(writer);
    }

    let mut printed_total = 0u64;
    for (w, writer) in writers.into_iter().enumerate() {
        match writer.join() {
            Ok(Ok(printed)) => {
                eprintln!("w{w}: {printed}/{} published", args.messages);
                printed_total += printed;
            }
            Ok(Err(e)) => eprintln!("w{w}: failed to bind a queue: {e}"),
            Err(_) => eprintln!("w{w}: panicked"),
        }
    }

    let lost = logger.lost_total();
    logger.deinit()?;

    let elapsed = start.elapsed();
    let expected = args.messages * args.threads as u64;
    eprintln!(
        "{printed_total}/{expected} published, {lost} lost, {:.2}s total ({:.0} msg/s)",
        elapsed.as_secs_f64(),
        printed_total as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    );
    Ok(())
}
