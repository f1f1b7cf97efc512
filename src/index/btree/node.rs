//! B-tree node and its structural operations
//!
//! Every node stores `(key, location)` pairs in ascending key order. An
//! internal node with `n` entries has `n + 1` children; a leaf has none.

use std::cmp::Ordering;
use std::mem;

use crate::index::Location;

pub(super) type Slot = (Vec<u8>, Location);

#[derive(Debug, Default)]
pub(super) struct Node {
    pub(super) entries: Vec<Slot>,
    pub(super) children: Vec<Box<Node>>,
}

impl Node {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// `Ok(i)` if `entries[i]` holds `key`, else `Err(i)` with `i` the child to descend
    pub(super) fn search(&self, key: &[u8]) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(probe, _)| probe.as_slice().cmp(key))
    }

    pub(super) fn find(&self, key: &[u8]) -> Option<Location> {
        let mut node = self;
        loop {
            match node.search(key) {
                Ok(i) => return Some(node.entries[i].1),
                Err(_) if node.is_leaf() => return None,
                Err(i) => node = &node.children[i],
            }
        }
    }

    pub(super) fn find_mut(&mut self, key: &[u8]) -> Option<&mut Location> {
        let mut node = self;
        loop {
            match node.search(key) {
                Ok(i) => return Some(&mut node.entries[i].1),
                Err(_) if node.is_leaf() => return None,
                Err(i) => node = &mut node.children[i],
            }
        }
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Split the full child `i` around its median, promoting the median here
    ///
    /// The child keeps `t - 1` entries and the new right sibling gets `t - 1`.
    pub(super) fn split_child(&mut self, i: usize, t: usize) {
        let child = &mut self.children[i];
        debug_assert_eq!(child.entries.len(), 2 * t - 1);

        let right_entries = child.entries.split_off(t);
        let right_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(t)
        };
        let Some(median) = child.entries.pop() else {
            return;
        };

        let right = Box::new(Node {
            entries: right_entries,
            children: right_children,
        });

        self.entries.insert(i, median);
        self.children.insert(i + 1, right);
    }

    /// Insert into a subtree whose root is known not to be full
    ///
    /// Full children are split on the way down, so the leaf that finally
    /// receives the slot always has room.
    pub(super) fn insert_non_full(&mut self, key: Vec<u8>, location: Location, t: usize) {
        let mut i = match self.search(&key) {
            Ok(i) => {
                self.entries[i].1 = location;
                return;
            }
            Err(i) => i,
        };

        if self.is_leaf() {
            self.entries.insert(i, (key, location));
            return;
        }

        if self.children[i].entries.len() == 2 * t - 1 {
            self.split_child(i, t);
            match key.as_slice().cmp(&self.entries[i].0) {
                Ordering::Equal => {
                    self.entries[i].1 = location;
                    return;
                }
                Ordering::Greater => i += 1,
                Ordering::Less => {}
            }
        }

        self.children[i].insert_non_full(key, location, t);
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Remove `key` from this subtree
    ///
    /// Callers guarantee this node has at least `t` entries (or is the root),
    /// so one entry can always be given up without going below `t - 1`.
    pub(super) fn remove(&mut self, key: &[u8], t: usize) -> Option<Location> {
        match self.search(key) {
            Ok(i) if self.is_leaf() => Some(self.entries.remove(i).1),
            Ok(i) => {
                if self.children[i].entries.len() >= t {
                    if let Some(pred) = self.children[i].pop_max(t) {
                        return Some(mem::replace(&mut self.entries[i], pred).1);
                    }
                }
                if self.children[i + 1].entries.len() >= t {
                    if let Some(succ) = self.children[i + 1].pop_min(t) {
                        return Some(mem::replace(&mut self.entries[i], succ).1);
                    }
                }
                // Both neighbours are minimal: fold the key down into a merged child
                self.merge_children(i);
                self.children[i].remove(key, t)
            }
            Err(_) if self.is_leaf() => None,
            Err(i) => {
                let i = self.fill_child(i, t);
                self.children[i].remove(key, t)
            }
        }
    }

    /// Remove and return the largest slot in this subtree
    fn pop_max(&mut self, t: usize) -> Option<Slot> {
        if self.is_leaf() {
            return self.entries.pop();
        }
        let last = self.children.len() - 1;
        let i = self.fill_child(last, t);
        self.children[i].pop_max(t)
    }

    /// Remove and return the smallest slot in this subtree
    fn pop_min(&mut self, t: usize) -> Option<Slot> {
        if self.is_leaf() {
            if self.entries.is_empty() {
                return None;
            }
            return Some(self.entries.remove(0));
        }
        let i = self.fill_child(0, t);
        self.children[i].pop_min(t)
    }

    /// Make sure child `i` has at least `t` entries before descending into it
    ///
    /// Borrows through a sibling when one can spare an entry, otherwise merges
    /// with a sibling. Returns the index of the child that now covers the
    /// original key range.
    fn fill_child(&mut self, i: usize, t: usize) -> usize {
        if self.children[i].entries.len() >= t {
            return i;
        }

        if i > 0 && self.children[i - 1].entries.len() >= t {
            self.borrow_from_left(i);
            return i;
        }

        if i + 1 < self.children.len() && self.children[i + 1].entries.len() >= t {
            self.borrow_from_right(i);
            return i;
        }

        if i + 1 < self.children.len() {
            self.merge_children(i);
            i
        } else {
            self.merge_children(i - 1);
            i - 1
        }
    }

    /// Rotate the left sibling's last slot through the separator into child `i`
    fn borrow_from_left(&mut self, i: usize) {
        let (head, tail) = self.children.split_at_mut(i);
        let left = &mut head[i - 1];
        let child = &mut tail[0];

        let Some(donor) = left.entries.pop() else {
            return;
        };
        let separator = mem::replace(&mut self.entries[i - 1], donor);
        child.entries.insert(0, separator);

        if let Some(grandchild) = left.children.pop() {
            child.children.insert(0, grandchild);
        }
    }

    /// Rotate the right sibling's first slot through the separator into child `i`
    fn borrow_from_right(&mut self, i: usize) {
        let (head, tail) = self.children.split_at_mut(i + 1);
        let child = &mut head[i];
        let right = &mut tail[0];

        if right.entries.is_empty() {
            return;
        }
        let donor = right.entries.remove(0);
        let separator = mem::replace(&mut self.entries[i], donor);
        child.entries.push(separator);

        if !right.is_leaf() {
            child.children.push(right.children.remove(0));
        }
    }

    /// Merge child `i + 1` and separator `i` into child `i`
    fn merge_children(&mut self, i: usize) {
        let right = *self.children.remove(i + 1);
        let separator = self.entries.remove(i);

        let left = &mut self.children[i];
        left.entries.push(separator);
        left.entries.extend(right.entries);
        left.children.extend(right.children);
    }
}
