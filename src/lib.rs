//! # logkv
//!
//! A single-file, log-structured key-value store with:
//! - An append-only log of length-prefixed frames
//! - A pluggable in-memory index (hash map or B-tree) from key to frame
//! - Recovery by replaying the log from byte 0 on every open
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Shell / Benchmark Harness                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ put / get / close
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Log Engine                              │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Log File   │          │    Index    │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                          ┌────────┴────────┐
//!                          ▼                 ▼
//!                   ┌────────────┐    ┌────────────┐
//!                   │ HashIndex  │    │ BTreeIndex │
//!                   └────────────┘    └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use logkv::{HashIndex, LogEngine};
//!
//! let engine = LogEngine::open("db", "store.db", HashIndex::new()).unwrap();
//! engine.put(b"a", b"1").unwrap();
//! assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
//! engine.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod logfile;
pub mod index;
pub mod engine;
pub mod shell;
pub mod workload;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, IndexKind};
pub use engine::{Engine, LogEngine, Scan};
pub use error::{KvError, Result};
pub use index::{BTreeIndex, HashIndex, Index, Location};
pub use logfile::{Entry, RecoveryReport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of logkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
