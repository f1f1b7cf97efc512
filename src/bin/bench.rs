//! logkv Benchmark Binary
//!
//! Runs a mixed read/write workload against a scratch log and prints a report.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use logkv::workload::{self, KeyPattern, Workload};
use logkv::IndexKind;
use tracing_subscriber::{fmt, EnvFilter};

/// logkv benchmark harness
#[derive(Parser, Debug)]
#[command(name = "logkv-bench")]
#[command(about = "Benchmark the logkv engine with hash or btree indexes")]
#[command(version)]
struct Args {
    /// Index kind: hash or btree
    #[arg(short, long, default_value = "hash")]
    index: IndexKind,

    /// Minimum degree of the btree index
    #[arg(long, default_value = "32")]
    degree: usize,

    /// Size of the key space
    #[arg(short = 'n', long, default_value = "10000")]
    num_keys: usize,

    /// Value size in bytes
    #[arg(short = 's', long, default_value = "100")]
    value_size: usize,

    /// Fraction of operations that are reads
    #[arg(short, long, default_value = "0.8")]
    read_ratio: f64,

    /// Workload duration in seconds
    #[arg(short, long, default_value = "30")]
    duration: u64,

    /// Key pattern: sequential or random
    #[arg(short, long, default_value = "random")]
    pattern: KeyPattern,

    /// Extra concurrent reader threads
    #[arg(long, default_value = "0")]
    readers: usize,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Data directory, kept after the run (a scratch directory is used and removed if omitted)
    #[arg(long)]
    dir: Option<PathBuf>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let workload = Workload {
        index_kind: args.index,
        btree_degree: args.degree,
        num_keys: args.num_keys,
        value_size: args.value_size,
        read_ratio: args.read_ratio,
        duration: Duration::from_secs(args.duration),
        key_pattern: args.pattern,
        readers: args.readers,
        seed: args.seed,
    };
    tracing::info!(?workload, "Running benchmark");

    // A scratch directory is removed when `scratch` drops
    let (dir, scratch) = match args.dir {
        Some(dir) => (dir, None),
        None => match workload::scratch_dir() {
            Ok(temp) => (temp.path().to_path_buf(), Some(temp)),
            Err(e) => {
                tracing::error!("Failed to create scratch directory: {}", e);
                std::process::exit(1);
            }
        },
    };

    let outcome = workload::run(&workload, &dir);
    drop(scratch);

    match outcome {
        Ok(report) => println!("\n{}", report),
        Err(e) => {
            tracing::error!("Benchmark failed: {}", e);
            std::process::exit(1);
        }
    }
}
