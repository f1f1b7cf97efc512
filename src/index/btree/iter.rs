//! In-order range iterator over a [`BTree`](super::BTree)

use std::ops::Bound;

use crate::index::Location;

use super::node::Node;

/// Lazy ascending iterator over the slots of a tree within a key range
///
/// Holds a stack of `(node, next entry)` pairs, so memory is bounded by the
/// tree height. Creating a new `Range` restarts the traversal.
pub struct Range<'a> {
    stack: Vec<(&'a Node, usize)>,
    end: Bound<Vec<u8>>,
}

impl<'a> Range<'a> {
    pub(super) fn new(root: &'a Node, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Self {
        let mut range = Self {
            stack: Vec::new(),
            end: match end {
                Bound::Included(k) => Bound::Included(k.to_vec()),
                Bound::Excluded(k) => Bound::Excluded(k.to_vec()),
                Bound::Unbounded => Bound::Unbounded,
            },
        };
        range.seek(root, start);
        range
    }

    /// Push the path to the first slot not below `start`
    fn seek(&mut self, root: &'a Node, start: Bound<&[u8]>) {
        let mut node = root;
        loop {
            let i = match start {
                Bound::Unbounded => 0,
                Bound::Included(s) => node.entries.partition_point(|(k, _)| k.as_slice() < s),
                Bound::Excluded(s) => node.entries.partition_point(|(k, _)| k.as_slice() <= s),
            };
            self.stack.push((node, i));
            if node.is_leaf() {
                break;
            }
            node = &node.children[i];
        }
    }

    fn push_leftmost(&mut self, mut node: &'a Node) {
        loop {
            self.stack.push((node, 0));
            if node.is_leaf() {
                break;
            }
            node = &node.children[0];
        }
    }

    fn past_end(&self, key: &[u8]) -> bool {
        match &self.end {
            Bound::Unbounded => false,
            Bound::Included(e) => key > e.as_slice(),
            Bound::Excluded(e) => key >= e.as_slice(),
        }
    }
}

impl<'a> Iterator for Range<'a> {
    type Item = (&'a [u8], Location);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, i)) = self.stack.pop() {
            if i >= node.entries.len() {
                continue;
            }

            let (key, location) = &node.entries[i];
            if self.past_end(key) {
                self.stack.clear();
                return None;
            }

            self.stack.push((node, i + 1));
            if !node.is_leaf() {
                self.push_leftmost(&node.children[i + 1]);
            }
            return Some((key.as_slice(), *location));
        }
        None
    }
}
