//! Index Module
//!
//! In-memory maps from key to the location of its most recent frame.
//!
//! ## Responsibilities
//! - Last-write-wins mapping from key to [`Location`]
//! - Concurrent readers, exclusive writers (one RwLock per index)
//! - Never touches the log file; rebuilt from the log on every open
//!
//! ## Implementations
//! - [`HashIndex`]: unordered, O(1) expected point operations
//! - [`BTreeIndex`]: balanced multi-way tree, ordered iteration and ranges

mod btree;
mod hash;

use std::ops::Bound;
use std::sync::Arc;

use crate::error::Result;

pub use btree::{BTree, BTreeIndex, BTreeReadGuard, Range, MIN_DEGREE};
pub use hash::HashIndex;

/// Position of one frame inside the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// Reserved for multi-segment logs, always 0
    pub file_id: u64,

    /// Byte offset of the first header byte
    pub offset: u64,

    /// Exact frame length, header included
    pub size: u32,
}

impl Location {
    pub fn new(offset: u64, size: u32) -> Self {
        Self {
            file_id: 0,
            offset,
            size,
        }
    }

    /// First byte past this frame
    pub fn end(&self) -> u64 {
        self.offset + self.size as u64
    }
}

/// Capability set every index must provide
///
/// All methods take `&self`; implementations guard their state with their
/// own lock so a single writer can run alongside any number of readers.
pub trait Index: Send + Sync {
    /// Install or overwrite the mapping for `key`
    fn put(&self, key: &[u8], location: Location) -> Result<()>;

    /// Current location for `key`, if any
    fn get(&self, key: &[u8]) -> Option<Location>;

    /// Remove the mapping for `key`; a missing key is not an error
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Release held resources
    fn close(&self) -> Result<()>;

    /// Number of live keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Slots within the bounds in ascending key order
    ///
    /// `None` for indexes that keep no key order.
    fn range(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Option<Vec<(Vec<u8>, Location)>> {
        let _ = (start, end);
        None
    }
}

impl<T: Index + ?Sized> Index for Box<T> {
    fn put(&self, key: &[u8], location: Location) -> Result<()> {
        (**self).put(key, location)
    }

    fn get(&self, key: &[u8]) -> Option<Location> {
        (**self).get(key)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn range(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Option<Vec<(Vec<u8>, Location)>> {
        (**self).range(start, end)
    }
}

impl<T: Index + ?Sized> Index for Arc<T> {
    fn put(&self, key: &[u8], location: Location) -> Result<()> {
        (**self).put(key, location)
    }

    fn get(&self, key: &[u8]) -> Option<Location> {
        (**self).get(key)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn range(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Option<Vec<(Vec<u8>, Location)>> {
        (**self).range(start, end)
    }
}
