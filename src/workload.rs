//! Benchmark workload
//!
//! Mixed read/write load against a fresh engine, reporting throughput,
//! latency percentiles, open time and replay time.
//!
//! ## Phases
//! 1. Open an empty log (startup time)
//! 2. Pre-populate 80% of the key space
//! 3. Mixed loop for `duration`, plus optional concurrent reader threads
//! 4. Close, reopen and time the replay

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use tracing::info;

use crate::config::{Config, IndexKind};
use crate::engine::Engine;
use crate::error::{KvError, Result};

/// How benchmark keys are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPattern {
    /// `key_000000`, `key_000001`, ...
    #[default]
    Sequential,

    /// Random numbers drawn from ten times the key count (duplicates allowed)
    Random,
}

impl FromStr for KeyPattern {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(KeyPattern::Sequential),
            "random" => Ok(KeyPattern::Random),
            other => Err(KvError::Config(format!("unknown key pattern: {}", other))),
        }
    }
}

/// Benchmark parameters
#[derive(Debug, Clone)]
pub struct Workload {
    pub index_kind: IndexKind,
    pub btree_degree: usize,
    pub num_keys: usize,
    pub value_size: usize,
    /// Fraction of loop operations that are reads, in `[0, 1]`
    pub read_ratio: f64,
    pub duration: Duration,
    pub key_pattern: KeyPattern,
    /// Extra threads issuing only reads while the main loop runs
    pub readers: usize,
    pub seed: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::Hash,
            btree_degree: Config::default().btree_degree,
            num_keys: 10_000,
            value_size: 100,
            read_ratio: 0.8,
            duration: Duration::from_secs(30),
            key_pattern: KeyPattern::Random,
            readers: 0,
            seed: 42,
        }
    }
}

/// Benchmark results
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub index_kind: IndexKind,
    pub reads: u64,
    pub writes: u64,
    pub elapsed: Duration,
    pub throughput_ops: f64,
    pub avg_read: Duration,
    pub avg_write: Duration,
    pub p95_read: Duration,
    pub p99_read: Duration,
    pub startup: Duration,
    pub recovery: Duration,
    pub keys_recovered: usize,
    /// Size of the log after the run, the store's whole on-disk footprint
    pub log_bytes: u64,
}

impl Report {
    pub fn operations(&self) -> u64 {
        self.reads + self.writes
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Index Type:      {}", self.index_kind)?;
        writeln!(
            f,
            "Operations:      {} ({} reads, {} writes) in {:?}",
            self.operations(),
            self.reads,
            self.writes,
            self.elapsed
        )?;
        writeln!(f, "Throughput:      {:.1} ops/sec", self.throughput_ops)?;
        writeln!(f, "Avg Read:        {:?}", self.avg_read)?;
        writeln!(f, "Avg Write:       {:?}", self.avg_write)?;
        writeln!(f, "P95 Read:        {:?}", self.p95_read)?;
        writeln!(f, "P99 Read:        {:?}", self.p99_read)?;
        writeln!(f, "Startup Time:    {:?}", self.startup)?;
        writeln!(
            f,
            "Recovery Time:   {:?} ({} keys)",
            self.recovery, self.keys_recovered
        )?;
        write!(f, "Log Size:        {:.2} MB", self.log_bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Run `workload` against a log created under `dir`
pub fn run(workload: &Workload, dir: &Path) -> Result<Report> {
    if workload.num_keys == 0 {
        return Err(KvError::Config("num_keys must be positive".to_string()));
    }
    if !(0.0..=1.0).contains(&workload.read_ratio) {
        return Err(KvError::Config(format!(
            "read_ratio must be within [0, 1], got {}",
            workload.read_ratio
        )));
    }

    let config = Config::builder()
        .data_dir(dir)
        .file_name("bench.db")
        .index_kind(workload.index_kind)
        .btree_degree(workload.btree_degree)
        .build();

    let mut rng = StdRng::seed_from_u64(workload.seed);
    let keys = generate_keys(&mut rng, workload.num_keys, workload.key_pattern);

    let started = Instant::now();
    let engine = Engine::open_with_config(&config)?;
    let startup = started.elapsed();

    let populated = (workload.num_keys * 4 / 5).max(1);
    info!(count = populated, "Pre-populating");
    for key in &keys[..populated] {
        engine.put(key, &random_value(&mut rng, workload.value_size))?;
    }

    info!(duration = ?workload.duration, readers = workload.readers, "Running workload");
    let stop = AtomicBool::new(false);
    let outcome = crossbeam::thread::scope(|scope| -> Result<(MixedRun, Vec<Vec<Duration>>)> {
        let handles: Vec<_> = (0..workload.readers)
            .map(|i| {
                let engine = &engine;
                let keys = &keys[..populated];
                let stop = &stop;
                let seed = workload.seed.wrapping_add(i as u64 + 1);
                scope.spawn(move |_| read_loop(engine, keys, stop, seed))
            })
            .collect();

        let mixed = mixed_loop(&engine, workload, &keys, populated, &mut rng);
        stop.store(true, Ordering::Relaxed);

        let mut reader_latencies = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(latencies) => reader_latencies.push(latencies?),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        mixed.map(|m| (m, reader_latencies))
    });

    let (mixed, reader_latencies) = match outcome {
        Ok(result) => result?,
        Err(panic) => std::panic::resume_unwind(panic),
    };
    let MixedRun {
        mut read_latencies,
        write_latencies,
        elapsed,
    } = mixed;
    for latencies in reader_latencies {
        read_latencies.extend(latencies);
    }

    engine.close()?;

    let started = Instant::now();
    let reopened = Engine::open_with_config(&config)?;
    let recovery = started.elapsed();
    let keys_recovered = reopened.len();
    let log_bytes = reopened.write_offset();
    reopened.close()?;

    let reads = read_latencies.len() as u64;
    let writes = write_latencies.len() as u64;
    let secs = elapsed.as_secs_f64();

    Ok(Report {
        index_kind: workload.index_kind,
        reads,
        writes,
        elapsed,
        throughput_ops: if secs > 0.0 { (reads + writes) as f64 / secs } else { 0.0 },
        avg_read: average(&read_latencies),
        avg_write: average(&write_latencies),
        p95_read: percentile(&read_latencies, 0.95),
        p99_read: percentile(&read_latencies, 0.99),
        startup,
        recovery,
        keys_recovered,
        log_bytes,
    })
}

struct MixedRun {
    read_latencies: Vec<Duration>,
    write_latencies: Vec<Duration>,
    elapsed: Duration,
}

fn mixed_loop(
    engine: &Engine,
    workload: &Workload,
    keys: &[Vec<u8>],
    populated: usize,
    rng: &mut StdRng,
) -> Result<MixedRun> {
    let mut read_latencies = Vec::new();
    let mut write_latencies = Vec::new();
    let start = Instant::now();

    while start.elapsed() < workload.duration {
        if rng.gen::<f64>() < workload.read_ratio {
            let key = &keys[rng.gen_range(0..populated)];
            let op = Instant::now();
            engine.get(key)?;
            read_latencies.push(op.elapsed());
        } else {
            let key = &keys[rng.gen_range(0..keys.len())];
            let value = random_value(rng, workload.value_size);
            let op = Instant::now();
            engine.put(key, &value)?;
            write_latencies.push(op.elapsed());
        }

        let done = read_latencies.len() + write_latencies.len();
        if done % 10_000 == 0 {
            let elapsed = start.elapsed();
            info!(
                ops = done,
                ops_per_sec = done as f64 / elapsed.as_secs_f64(),
                "Progress"
            );
        }
    }

    Ok(MixedRun {
        read_latencies,
        write_latencies,
        elapsed: start.elapsed(),
    })
}

fn read_loop(engine: &Engine, keys: &[Vec<u8>], stop: &AtomicBool, seed: u64) -> Result<Vec<Duration>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut latencies = Vec::new();

    while !stop.load(Ordering::Relaxed) {
        let key = &keys[rng.gen_range(0..keys.len())];
        let op = Instant::now();
        engine.get(key)?;
        latencies.push(op.elapsed());
    }
    Ok(latencies)
}

/// Fresh scratch directory for a run, removed when the returned guard drops
pub fn scratch_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("logkv-bench-").tempdir()?)
}

/// Keys for a run, formatted `key_{:06}`
pub fn generate_keys(rng: &mut StdRng, count: usize, pattern: KeyPattern) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let n = match pattern {
                KeyPattern::Sequential => i,
                KeyPattern::Random => rng.gen_range(0..count * 10),
            };
            format!("key_{:06}", n).into_bytes()
        })
        .collect()
}

fn random_value(rng: &mut StdRng, size: usize) -> Vec<u8> {
    rng.sample_iter(&Alphanumeric).take(size).collect()
}

/// Mean of `samples`, zero when empty
pub fn average(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    samples.iter().sum::<Duration>() / samples.len() as u32
}

/// Nearest-rank percentile: sorted index `ceil(p * n) - 1`, clamped
pub fn percentile(samples: &[Duration], p: f64) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    let rank = (p * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}
