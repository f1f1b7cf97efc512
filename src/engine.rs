//! Engine Module
//!
//! The log engine: one append-only file plus an in-memory index.
//!
//! ## Responsibilities
//! - Append every put as a frame and point the index at it
//! - Serve gets through the index and one positioned read
//! - Rebuild the index by replaying the log on open
//!
//! ## Known gaps
//! - Deletes are index-only. Nothing is written to the log, so the next open
//!   replays the old frame and the key comes back.
//! - A crash between an append and its index update leaves the log ahead of
//!   the index until the next open.

use std::fs::{self, File};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::{Index, Location};
use crate::logfile::{read_frame_at, Entry, LogWriter, Recovery, RecoveryReport};

/// Engine over a runtime-selected index
pub type Engine = LogEngine<Box<dyn Index>>;

/// The log-structured storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put): Serialized by the `writer` mutex
///   - One append in flight at a time, each with its own offset range
///   - The index is updated before the mutex is released, so index order
///     matches log order for a given key
///
/// - **Reads** (get): Never touch the `writer` mutex
///   - Index lookup under the index's own read lock
///   - Positioned read on the shared read-only handle (no seek state)
pub struct LogEngine<I: Index> {
    /// Full path of the log file
    path: PathBuf,

    /// Append handle and next write offset
    writer: Mutex<LogWriter>,

    /// Read-only handle for positioned reads
    reader: File,

    /// Key → location of the latest frame
    index: I,

    /// What the last open found in the log
    recovery: RecoveryReport,
}

impl Engine {
    /// Open with the index kind named in `config`
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let index = config.index_kind.build(config.btree_degree);
        Self::with_index(config, index)
    }

    /// Open `dir` with default config
    pub fn open_path(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(&Config::builder().data_dir(dir).build())
    }
}

impl<I: Index> LogEngine<I> {
    /// Open or create `dir/file_name` backed by `index`
    pub fn open(dir: impl AsRef<Path>, file_name: &str, index: I) -> Result<Self> {
        let config = Config::builder().data_dir(dir).file_name(file_name).build();
        Self::with_index(&config, index)
    }

    /// Open or create the log named by `config`, backed by `index`
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open the log for appending and for positioned reads
    /// 3. Replay every complete frame into `index`
    /// 4. Drop a torn tail if configured to
    ///
    /// Handles opened before a failing step are closed before returning.
    pub fn with_index(config: &Config, index: I) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let path = config.log_path();

        let mut writer = LogWriter::open(&path)?;
        let reader = File::open(&path)?;

        let recovery = if writer.offset() > 0 {
            Recovery::replay(&reader, &index)?
        } else {
            RecoveryReport::default()
        };

        if recovery.was_truncated {
            warn!(
                path = %path.display(),
                offset = recovery.bytes_consumed,
                torn_bytes = recovery.torn_bytes,
                "Log ends in a partial frame"
            );
            if config.repair_torn_tail {
                warn!(len = recovery.bytes_consumed, "Truncating log to last complete frame");
                writer.truncate(recovery.bytes_consumed)?;
            }
        }

        info!(
            path = %path.display(),
            index = index.name(),
            frames = recovery.frames_recovered,
            keys = index.len(),
            write_offset = writer.offset(),
            "Log engine opened"
        );

        Ok(Self {
            path,
            writer: Mutex::new(writer),
            reader,
            index,
            recovery,
        })
    }

    /// Append `key`/`value` and point the index at the new frame
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_entry(&Entry::new(key, value))
    }

    /// Append an entry and point the index at the new frame
    pub fn put_entry(&self, entry: &Entry) -> Result<()> {
        let frame = entry.serialize()?;

        let mut writer = self.writer.lock();
        let location = writer.append(&frame)?;
        self.index.put(&entry.key, location)?;
        drop(writer);

        debug!(offset = location.offset, size = location.size, "Appended frame");
        Ok(())
    }

    /// Latest value for `key`, or `None` if the index has no mapping
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.get_entry(key)?.map(|entry| entry.value))
    }

    /// Latest entry for `key`, read back from the log
    pub fn get_entry(&self, key: &[u8]) -> Result<Option<Entry>> {
        let Some(location) = self.index.get(key) else {
            return Ok(None);
        };
        debug!(offset = location.offset, size = location.size, "Read frame");
        self.read_at(location).map(Some)
    }

    /// Remove `key` from the index only
    ///
    /// No tombstone is logged: the key is gone for this session, but the next
    /// open replays its last frame and it reappears.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.index.delete(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.get(key).is_some()
    }

    /// Key-value pairs within the bounds, ascending by key
    ///
    /// Fails with `Unordered` when the index keeps no key order. Locations are
    /// captured up front; values are read lazily as the scan advances.
    pub fn scan(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Result<Scan<'_>> {
        let slots = self
            .index
            .range(start, end)
            .ok_or_else(|| KvError::Unordered(self.index.name()))?;
        Ok(Scan {
            reader: &self.reader,
            slots: slots.into_iter(),
        })
    }

    /// Force appended frames to disk
    pub fn sync(&self) -> Result<()> {
        self.writer.lock().sync()
    }

    /// Close the engine
    ///
    /// Syncs the append handle, closes the index and releases both file
    /// handles. The index is never persisted; the next open replays the log.
    pub fn close(self) -> Result<()> {
        let LogEngine {
            path,
            writer,
            reader,
            index,
            ..
        } = self;

        let mut writer = writer.into_inner();
        let synced = writer.sync();
        let closed = index.close();
        let offset = writer.offset();
        drop(writer);
        drop(reader);

        synced?;
        closed?;
        info!(path = %path.display(), offset, "Log engine closed");
        Ok(())
    }

    fn read_at(&self, location: Location) -> Result<Entry> {
        let bytes = read_frame_at(&self.reader, location)?;
        Entry::deserialize(&bytes)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The backing index
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Number of live keys in the index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Offset the next frame will be appended at
    pub fn write_offset(&self) -> u64 {
        self.writer.lock().offset()
    }

    /// What replay found when this engine was opened
    pub fn recovery(&self) -> RecoveryReport {
        self.recovery
    }
}

/// Lazy ordered scan produced by [`LogEngine::scan`]
pub struct Scan<'a> {
    reader: &'a File,
    slots: std::vec::IntoIter<(Vec<u8>, Location)>,
}

impl Iterator for Scan<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, location) = self.slots.next()?;
        let entry = read_frame_at(self.reader, location).and_then(|bytes| Entry::deserialize(&bytes));
        Some(entry.map(|entry| (key, entry.value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}
