//! Throughput evaluation binary for the indicator variants.
//!
//! For every thread count and every `(K, H)` shape in the run matrix,
//! spawns the threads, holds them on a start flag, and lets each loop
//! `arrive; depart; query` visits until the deadline. Per-thread visit
//! counts are averaged into visits/ms and written as a tab-separated
//! `.dat` file with one row per thread count and one column per shape.
//!
//! Run with:
//! ```bash
//! # Default: semi-contention variant, 10 seconds per cell
//! cargo run --release --bin throughput
//!
//! # Longer runs, another variant, custom output
//! cargo run --release --bin throughput -- --variant full --seconds 60 --output full.dat
//!
//! # With run progress on stderr
//! RUST_LOG=throughput=info cargo run --release --features tracing --bin throughput
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_precision_loss)]

use snzi::{ContentionStatus, FullContentionSnzi, NoContentionSnzi, SemiContentionSnzi};
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// The `(K, H)` shapes evaluated per thread count.
const SHAPES: &[(usize, u32)] = &[(2, 0), (2, 1), (2, 2), (4, 1)];

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Bare,
    Semi,
    Full,
}

impl Variant {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "bare" | "no-contention" => Some(Self::Bare),
            "semi" | "semi-contention" => Some(Self::Semi),
            "full" | "full-contention" => Some(Self::Full),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Bare => "bare",
            Self::Semi => "semi",
            Self::Full => "full",
        }
    }
}

#[derive(Debug)]
struct RunConfig {
    variant: Variant,
    seconds: u64,
    output: String,
    thread_counts: Vec<usize>,
}

impl RunConfig {
    fn from_args() -> Self {
        let mut config = Self {
            variant: Variant::Semi,
            seconds: 10,
            output: String::new(),
            thread_counts: (1..=num_cpus::get()).collect(),
        };

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--variant" => {
                    let name = args.next().expect("--variant needs a value");
                    config.variant =
                        Variant::parse(&name).expect("variant must be bare, semi, or full");
                }
                "--seconds" => {
                    config.seconds = args
                        .next()
                        .expect("--seconds needs a value")
                        .parse()
                        .expect("--seconds must be an integer");
                }
                "--output" => {
                    config.output = args.next().expect("--output needs a value");
                }
                "--max-threads" => {
                    let max: usize = args
                        .next()
                        .expect("--max-threads needs a value")
                        .parse()
                        .expect("--max-threads must be an integer");
                    config.thread_counts = (1..=max).collect();
                }
                other => panic!("unknown argument: {other}"),
            }
        }

        if config.output.is_empty() {
            config.output = format!("snzi-{}-contention.dat", config.variant.label());
        }
        config
    }
}

// =============================================================================
// Tracing (optional)
// =============================================================================

#[cfg(feature = "tracing")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("throughput=info")
        }))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(not(feature = "tracing"))]
fn init_tracing() {}

macro_rules! progress {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::info!($($arg)*);
        #[cfg(not(feature = "tracing"))]
        eprintln!($($arg)*);
    };
}

// =============================================================================
// Workload
// =============================================================================

/// Run one cell of the matrix: `threads` workers visiting the indicator
/// until the deadline. Returns the mean per-thread throughput in
/// visits/ms.
fn run_cell(variant: Variant, arity: usize, height: u32, threads: usize, seconds: u64) -> f64 {
    let start = Arc::new(AtomicBool::new(false));
    let duration = Duration::from_secs(seconds);

    let handles: Vec<thread::JoinHandle<u64>> = match variant {
        Variant::Bare => {
            let snzi = Arc::new(NoContentionSnzi::new(arity, height, threads).unwrap());
            (0..threads)
                .map(|tid| {
                    let snzi = Arc::clone(&snzi);
                    let start = Arc::clone(&start);
                    thread::spawn(move || {
                        wait_for_start(&start);
                        let deadline = Instant::now() + duration;
                        let mut visits: u64 = 0;
                        while Instant::now() < deadline {
                            snzi.arrive(tid);
                            snzi.depart(tid);
                            std::hint::black_box(snzi.query());
                            visits += 1;
                        }
                        visits
                    })
                })
                .collect()
        }
        Variant::Semi => {
            let snzi = Arc::new(SemiContentionSnzi::new(arity, height, threads).unwrap());
            (0..threads)
                .map(|tid| {
                    let snzi = Arc::clone(&snzi);
                    let start = Arc::clone(&start);
                    thread::spawn(move || {
                        wait_for_start(&start);
                        let deadline = Instant::now() + duration;
                        let mut visits: u64 = 0;
                        while Instant::now() < deadline {
                            snzi.arrive(tid);
                            snzi.depart(tid);
                            std::hint::black_box(snzi.query());
                            visits += 1;
                        }
                        visits
                    })
                })
                .collect()
        }
        Variant::Full => {
            let snzi = Arc::new(FullContentionSnzi::new(arity, height, threads).unwrap());
            (0..threads)
                .map(|tid| {
                    let snzi = Arc::clone(&snzi);
                    let start = Arc::clone(&start);
                    thread::spawn(move || {
                        wait_for_start(&start);
                        let deadline = Instant::now() + duration;
                        let mut status = ContentionStatus::new();
                        let mut visits: u64 = 0;
                        while Instant::now() < deadline {
                            snzi.arrive(tid, &mut status);
                            snzi.depart(tid, &mut status);
                            std::hint::black_box(snzi.query());
                            visits += 1;
                        }
                        visits
                    })
                })
                .collect()
        }
    };

    start.store(true, Ordering::Release);

    let total_ms = (seconds * 1000) as f64;
    let throughput_sum: f64 = handles
        .into_iter()
        .map(|handle| handle.join().unwrap() as f64 / total_ms)
        .sum();
    throughput_sum / threads as f64
}

fn wait_for_start(flag: &AtomicBool) {
    while !flag.load(Ordering::Acquire) {
        std::hint::spin_loop();
    }
}

// =============================================================================
// Output
// =============================================================================

/// One row per thread count, one column per shape, tab-separated.
fn write_dat(config: &RunConfig, data: &[Vec<f64>]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(&config.output)?);

    writeln!(
        out,
        "# Throughput of the {}-contention indicator, visits/ms per thread",
        config.variant.label()
    )?;
    write!(out, "# num_threads")?;
    for &(arity, height) in SHAPES {
        write!(out, "\t(K,H)=({arity},{height})")?;
    }
    writeln!(out)?;

    for (row, &threads) in data.iter().zip(&config.thread_counts) {
        write!(out, "{threads}")?;
        for throughput in row {
            write!(out, "\t{throughput}")?;
        }
        writeln!(out)?;
    }

    out.flush()
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    init_tracing();
    let config = RunConfig::from_args();

    progress!(
        "evaluating {} variant, {}s per cell, threads up to {}",
        config.variant.label(),
        config.seconds,
        config.thread_counts.last().copied().unwrap_or(0)
    );

    let mut data: Vec<Vec<f64>> = Vec::with_capacity(config.thread_counts.len());
    for &threads in &config.thread_counts {
        let mut row = Vec::with_capacity(SHAPES.len());
        for &(arity, height) in SHAPES {
            progress!("running (K,H)=({arity},{height}) with {threads} threads");
            row.push(run_cell(
                config.variant,
                arity,
                height,
                threads,
                config.seconds,
            ));
        }
        data.push(row);
    }

    write_dat(&config, &data).expect("failed to write data file");
    progress!("wrote {}", config.output);
}
