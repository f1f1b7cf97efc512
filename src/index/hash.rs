//! Hash index
//!
//! HashMap-based index with RwLock for concurrency.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::Result;

use super::{Index, Location};

/// Unordered key → location map
///
/// ## Concurrency:
/// - `map`: Protected by RwLock (many concurrent `get`s, exclusive `put`/`delete`)
#[derive(Debug, Default)]
pub struct HashIndex {
    map: RwLock<HashMap<Vec<u8>, Location>>,
}

impl HashIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the map for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }
}

impl Index for HashIndex {
    fn put(&self, key: &[u8], location: Location) -> Result<()> {
        self.map.write().insert(key.to_vec(), location);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Option<Location> {
        self.map.read().get(key).copied()
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}
