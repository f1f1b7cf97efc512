//! Ordered index
//!
//! A classic B-tree of minimum degree `t`: every node other than the root
//! holds between `t - 1` and `2t - 1` slots, and slots live in internal
//! nodes as well as leaves.
//!
//! ## Structure changes
//! - Insert splits full nodes on the way down; splitting a full root is the
//!   only way the tree grows taller
//! - Delete borrows from or merges with a sibling before descending into a
//!   minimal child; an emptied root hands over to its single child
//!
//! ## Concurrency
//! [`BTreeIndex`] wraps the whole tree in one RwLock, same granularity as
//! [`HashIndex`](super::HashIndex).

mod iter;
mod node;

use std::ops::Bound;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::Result;

use super::{Index, Location};
use node::Node;

pub use iter::Range;

/// Smallest allowed minimum degree
pub const MIN_DEGREE: usize = 2;

/// Unsynchronized B-tree keyed by raw bytes
#[derive(Debug)]
pub struct BTree {
    root: Box<Node>,
    degree: usize,
    len: usize,
}

impl BTree {
    /// Create an empty tree; degrees below [`MIN_DEGREE`] are raised to it
    pub fn new(degree: usize) -> Self {
        Self {
            root: Box::new(Node::new()),
            degree: degree.max(MIN_DEGREE),
            len: 0,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, 1 for a lone root
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &*self.root;
        while let Some(child) = node.children.first() {
            height += 1;
            node = child;
        }
        height
    }

    pub fn get(&self, key: &[u8]) -> Option<Location> {
        self.root.find(key)
    }

    /// Insert or overwrite, returning the previous location
    pub fn insert(&mut self, key: &[u8], location: Location) -> Option<Location> {
        if let Some(slot) = self.root.find_mut(key) {
            return Some(std::mem::replace(slot, location));
        }

        let t = self.degree;
        if self.root.entries.len() == 2 * t - 1 {
            let old_root = std::mem::replace(&mut self.root, Box::new(Node::new()));
            self.root.children.push(old_root);
            self.root.split_child(0, t);
        }
        self.root.insert_non_full(key.to_vec(), location, t);
        self.len += 1;
        None
    }

    /// Remove `key`, returning its location if it was present
    pub fn remove(&mut self, key: &[u8]) -> Option<Location> {
        let removed = self.root.remove(key, self.degree);

        if self.root.entries.is_empty() {
            if let Some(child) = self.root.children.pop() {
                self.root = child;
            }
        }

        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Slots with keys inside `(start, end)`, ascending
    pub fn range(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Range<'_> {
        Range::new(&self.root, start, end)
    }

    /// Every slot, ascending
    pub fn iter(&self) -> Range<'_> {
        self.range(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn first_key(&self) -> Option<&[u8]> {
        self.iter().next().map(|(k, _)| k)
    }

    pub fn last_key(&self) -> Option<&[u8]> {
        let mut node = &*self.root;
        while let Some(child) = node.children.last() {
            node = child;
        }
        node.entries.last().map(|(k, _)| k.as_slice())
    }

    /// Check occupancy, ordering, child counts and leaf depth
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut leaf_depth = None;
        let count = self.validate_node(&self.root, true, 0, &mut leaf_depth, None, None)?;
        if count != self.len {
            return Err(format!("len is {} but tree holds {} slots", self.len, count));
        }
        Ok(())
    }

    fn validate_node(
        &self,
        node: &Node,
        is_root: bool,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> std::result::Result<usize, String> {
        let t = self.degree;
        let n = node.entries.len();

        if n > 2 * t - 1 {
            return Err(format!("node at depth {} holds {} slots (max {})", depth, n, 2 * t - 1));
        }
        if !is_root && n < t - 1 {
            return Err(format!("node at depth {} holds {} slots (min {})", depth, n, t - 1));
        }

        for pair in node.entries.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(format!("keys out of order at depth {}", depth));
            }
        }
        if let (Some(lo), Some((first, _))) = (lower, node.entries.first()) {
            if first.as_slice() <= lo {
                return Err(format!("key below separator at depth {}", depth));
            }
        }
        if let (Some(hi), Some((last, _))) = (upper, node.entries.last()) {
            if last.as_slice() >= hi {
                return Err(format!("key above separator at depth {}", depth));
            }
        }

        if node.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(format!("leaves at depths {} and {}", d, depth));
                }
                Some(_) => {}
            }
            return Ok(n);
        }

        if node.children.len() != n + 1 {
            return Err(format!(
                "node at depth {} has {} slots but {} children",
                depth,
                n,
                node.children.len()
            ));
        }

        let mut count = n;
        for (i, child) in node.children.iter().enumerate() {
            let lo = if i == 0 { lower } else { Some(node.entries[i - 1].0.as_slice()) };
            let hi = if i == n { upper } else { Some(node.entries[i].0.as_slice()) };
            count += self.validate_node(child, false, depth + 1, leaf_depth, lo, hi)?;
        }
        Ok(count)
    }
}

/// Read guard over a [`BTreeIndex`]'s tree
pub type BTreeReadGuard<'a> = RwLockReadGuard<'a, BTree>;

/// Thread-safe ordered index
#[derive(Debug)]
pub struct BTreeIndex {
    tree: RwLock<BTree>,
}

impl BTreeIndex {
    pub fn new(degree: usize) -> Self {
        Self {
            tree: RwLock::new(BTree::new(degree)),
        }
    }

    /// Hold the read lock for ordered traversal
    ///
    /// Writers block until the guard is dropped.
    pub fn read(&self) -> BTreeReadGuard<'_> {
        self.tree.read()
    }

    /// Copy out the slots in a key range
    pub fn collect_range(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Vec<(Vec<u8>, Location)> {
        self.tree
            .read()
            .range(start, end)
            .map(|(k, loc)| (k.to_vec(), loc))
            .collect()
    }

    pub fn degree(&self) -> usize {
        self.tree.read().degree()
    }
}

impl Default for BTreeIndex {
    fn default() -> Self {
        Self::new(crate::config::Config::default().btree_degree)
    }
}

impl Index for BTreeIndex {
    fn put(&self, key: &[u8], location: Location) -> Result<()> {
        self.tree.write().insert(key, location);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Option<Location> {
        self.tree.read().get(key)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.tree.write().remove(key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.tree.read().len()
    }

    fn name(&self) -> &'static str {
        "btree"
    }

    fn range(&self, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Option<Vec<(Vec<u8>, Location)>> {
        Some(self.collect_range(start, end))
    }
}
