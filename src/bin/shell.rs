//! logkv Shell Binary
//!
//! Opens the log and runs the interactive command shell on stdin/stdout.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use logkv::shell::Shell;
use logkv::{Config, Engine, IndexKind};
use tracing_subscriber::{fmt, EnvFilter};

/// logkv shell
#[derive(Parser, Debug)]
#[command(name = "logkv")]
#[command(about = "Interactive shell for the logkv log-structured store")]
#[command(version)]
struct Args {
    /// Storage directory
    #[arg(short, long, env = "KVSTORE_DIR", default_value = "db")]
    dir: PathBuf,

    /// Log file name inside the storage directory
    #[arg(short, long, default_value = "store.db")]
    file: String,

    /// Index kind: hash or btree
    #[arg(short, long, env = "INDEX_TYPE", default_value = "hash")]
    index: IndexKind,

    /// Minimum degree of the btree index
    #[arg(long, default_value = "32")]
    degree: usize,

    /// Truncate dangling bytes after the last complete frame on open
    #[arg(long)]
    repair_torn_tail: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging (stderr, so shell output stays clean)
    let default_filter = if args.verbose { "info,logkv=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    tracing::info!("logkv v{}", logkv::VERSION);

    let config = Config::builder()
        .data_dir(&args.dir)
        .file_name(args.file)
        .index_kind(args.index)
        .btree_degree(args.degree)
        .repair_torn_tail(args.repair_torn_tail)
        .build();

    let engine = match Engine::open_with_config(&config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut shell = Shell::new(&engine, stdin.lock(), io::stdout().lock());
    if !interactive {
        shell = shell.quiet();
    }
    let outcome = shell.run();
    drop(shell);

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close storage: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = outcome {
        tracing::error!("Shell error: {}", e);
        std::process::exit(1);
    }
}
