//! Configuration for logkv
//!
//! Centralized configuration with sensible defaults. The storage directory and
//! the index kind can also come from the environment (`KVSTORE_DIR`,
//! `INDEX_TYPE`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{KvError, Result};
use crate::index::{BTreeIndex, HashIndex, Index};

/// Environment variable naming the storage directory
pub const ENV_DATA_DIR: &str = "KVSTORE_DIR";

/// Environment variable selecting the index kind
pub const ENV_INDEX_TYPE: &str = "INDEX_TYPE";

/// Main configuration for a logkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the log file (created on open if missing)
    pub data_dir: PathBuf,

    /// Log file name inside `data_dir`
    pub file_name: String,

    /// Drop dangling bytes after the last complete frame on open
    ///
    /// Off by default. A damaged length mid-file reads as a torn tail, and
    /// repairing it discards every frame after it.
    pub repair_torn_tail: bool,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Which in-memory index backs the engine
    pub index_kind: IndexKind,

    /// Minimum degree of the ordered index (ignored by the hash index)
    pub btree_degree: usize,
}

/// In-memory index selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Unordered hash map, O(1) point lookups
    #[default]
    Hash,

    /// Balanced multi-way tree, ordered iteration and range scans
    BTree,
}

impl IndexKind {
    /// Build a fresh, empty index of this kind
    pub fn build(self, degree: usize) -> Box<dyn Index> {
        match self {
            IndexKind::Hash => Box::new(HashIndex::new()),
            IndexKind::BTree => Box::new(BTreeIndex::new(degree)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Hash => "hash",
            IndexKind::BTree => "btree",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(IndexKind::Hash),
            "btree" | "tree" => Ok(IndexKind::BTree),
            other => Err(KvError::Config(format!("unknown index type: {}", other))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("db"),
            file_name: "store.db".to_string(),
            repair_torn_tail: false,
            index_kind: IndexKind::Hash,
            btree_degree: 32,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Defaults overridden by `KVSTORE_DIR` and `INDEX_TYPE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup(ENV_INDEX_TYPE).filter(|k| !k.is_empty()) {
            config.index_kind = kind.parse()?;
        }

        Ok(config)
    }

    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.config.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the log file name
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Set the index kind
    pub fn index_kind(mut self, kind: IndexKind) -> Self {
        self.config.index_kind = kind;
        self
    }

    /// Set the minimum degree of the ordered index
    pub fn btree_degree(mut self, degree: usize) -> Self {
        self.config.btree_degree = degree;
        self
    }

    /// Enable or disable torn tail repair on open
    pub fn repair_torn_tail(mut self, repair: bool) -> Self {
        self.config.repair_torn_tail = repair;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
