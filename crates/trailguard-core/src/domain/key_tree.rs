//! Prefix tree of cache keys.
//!
//! [`KeyTree`] stores one value per [`CacheKey`] in a trie whose edges are
//! [`KeySegment`]s.  Prefix invalidation is then a walk down to the node
//! named by the prefix followed by a depth-first traversal of its subtree:
//!
//! ```text
//! (root)
//!  ├─ "projects"                      ← value for ["projects"]
//!  │    └─ "p1"
//!  │         ├─ "results"
//!  │         │    ├─ 1 ─ 50           ← value for ["projects","p1","results",1,50]
//!  │         │    └─ 2 ─ 50           ← value for ["projects","p1","results",2,50]
//!  │         └─ "sessions"            ← value for ["projects","p1","sessions"]
//!  └─ "batch-status"
//!       └─ "p1" ─ "t1"                ← value for ["batch-status","p1","t1"]
//! ```
//!
//! `descendants(["projects","p1"])` visits the three values under `"p1"` and
//! nothing under `"batch-status"`.  Children are kept in a `BTreeMap`, so the
//! traversal order is deterministic.
//!
//! Empty branches are pruned on removal, so the tree never holds more nodes
//! than the keys it stores require.

use std::collections::BTreeMap;

use crate::domain::key::{CacheKey, KeySegment};

#[derive(Debug)]
struct Node<V> {
    value: Option<V>,
    children: BTreeMap<KeySegment, Node<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            value: None,
            children: BTreeMap::new(),
        }
    }
}

impl<V> Node<V> {
    fn is_vacant(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn collect<'a>(&'a self, path: &mut Vec<KeySegment>, out: &mut Vec<(CacheKey, &'a V)>) {
        if let Some(value) = &self.value {
            out.push((CacheKey::from_segments(path.clone()), value));
        }
        for (segment, child) in &self.children {
            path.push(segment.clone());
            child.collect(path, out);
            path.pop();
        }
    }

    fn remove(&mut self, segments: &[KeySegment]) -> Option<V> {
        let Some((first, rest)) = segments.split_first() else {
            return self.value.take();
        };
        let child = self.children.get_mut(first)?;
        let removed = child.remove(rest);
        if child.is_vacant() {
            self.children.remove(first);
        }
        removed
    }

    fn retain<F>(&mut self, path: &mut Vec<KeySegment>, keep: &mut F) -> usize
    where
        F: FnMut(&CacheKey, &V) -> bool,
    {
        let mut removed = 0;
        if let Some(value) = &self.value {
            if !keep(&CacheKey::from_segments(path.clone()), value) {
                self.value = None;
                removed += 1;
            }
        }
        self.children.retain(|segment, child| {
            path.push(segment.clone());
            removed += child.retain(path, keep);
            path.pop();
            !child.is_vacant()
        });
        removed
    }
}

/// A map from [`CacheKey`] to `V` supporting prefix traversal.
#[derive(Debug)]
pub struct KeyTree<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for KeyTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeyTree<V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when no key is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: &CacheKey, value: V) -> Option<V> {
        let node = self.node_mut_or_create(key);
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Returns the value stored under exactly `key`.
    pub fn get(&self, key: &CacheKey) -> Option<&V> {
        self.node(key).and_then(|node| node.value.as_ref())
    }

    /// Returns the value under `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with<F>(&mut self, key: &CacheKey, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        if self.get(key).is_none() {
            self.len += 1;
        }
        self.node_mut_or_create(key).value.get_or_insert_with(make)
    }

    /// Removes and returns the value stored under exactly `key`.
    pub fn remove(&mut self, key: &CacheKey) -> Option<V> {
        let removed = self.root.remove(key.segments());
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Returns every stored `(key, value)` whose key starts with `prefix`,
    /// in depth-first order.  The empty prefix matches everything.
    pub fn descendants(&self, prefix: &CacheKey) -> Vec<(CacheKey, &V)> {
        let mut out = Vec::new();
        if let Some(node) = self.node(prefix) {
            let mut path = prefix.segments().to_vec();
            node.collect(&mut path, &mut out);
        }
        out
    }

    /// Returns every stored `(key, value)` pair.
    pub fn entries(&self) -> Vec<(CacheKey, &V)> {
        self.descendants(&CacheKey::from_segments(Vec::new()))
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// Returns the number of entries removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&CacheKey, &V) -> bool,
    {
        let mut path = Vec::new();
        let removed = self.root.retain(&mut path, &mut keep);
        self.len -= removed;
        removed
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }

    fn node(&self, key: &CacheKey) -> Option<&Node<V>> {
        key.segments()
            .iter()
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    fn node_mut_or_create(&mut self, key: &CacheKey) -> &mut Node<V> {
        key.segments().iter().fold(&mut self.root, |node, segment| {
            node.children.entry(segment.clone()).or_default()
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_key;

    fn populated() -> KeyTree<&'static str> {
        let mut tree = KeyTree::new();
        tree.insert(&cache_key!["projects"], "list");
        tree.insert(&cache_key!["projects", "p1", "results", 1u32, 50u32], "p1-page1");
        tree.insert(&cache_key!["projects", "p1", "results", 2u32, 50u32], "p1-page2");
        tree.insert(&cache_key!["projects", "p1", "sessions"], "p1-sessions");
        tree.insert(&cache_key!["projects", "p2", "results", 1u32, 50u32], "p2-page1");
        tree.insert(&cache_key!["batch-status", "p1", "t1"], "status");
        tree
    }

    fn values(found: Vec<(CacheKey, &&'static str)>) -> Vec<&'static str> {
        found.into_iter().map(|(_, v)| *v).collect()
    }

    #[test]
    fn test_insert_and_get_exact_key() {
        // Arrange
        let tree = populated();

        // Act / Assert
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.get(&cache_key!["projects", "p1", "sessions"]), Some(&"p1-sessions"));
        assert_eq!(tree.get(&cache_key!["projects", "p1"]), None, "interior nodes hold no value");
    }

    #[test]
    fn test_insert_replaces_existing_value_without_growing() {
        let mut tree = populated();
        let previous = tree.insert(&cache_key!["projects"], "list-v2");
        assert_eq!(previous, Some("list"));
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_root_prefix_reaches_every_descendant() {
        // Invalidating ["projects"] must also reach the nested results keys.
        let tree = populated();
        let found = values(tree.descendants(&cache_key!["projects"]));
        assert_eq!(found.len(), 5);
        assert!(found.contains(&"list"));
        assert!(found.contains(&"p1-page2"));
        assert!(found.contains(&"p2-page1"));
        assert!(!found.contains(&"status"));
    }

    #[test]
    fn test_results_prefix_is_scoped_to_one_project() {
        let tree = populated();
        let found = values(tree.descendants(&cache_key!["projects", "p1", "results"]));
        assert_eq!(found, vec!["p1-page1", "p1-page2"]);
    }

    #[test]
    fn test_full_key_prefix_matches_itself() {
        let tree = populated();
        let found = tree.descendants(&cache_key!["batch-status", "p1", "t1"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, cache_key!["batch-status", "p1", "t1"]);
    }

    #[test]
    fn test_unknown_or_overlong_prefix_matches_nothing() {
        let tree = populated();
        assert!(tree.descendants(&cache_key!["species"]).is_empty());
        assert!(tree
            .descendants(&cache_key!["batch-status", "p1", "t1", "extra"])
            .is_empty());
    }

    #[test]
    fn test_descendants_reconstruct_full_keys() {
        let tree = populated();
        let keys: Vec<CacheKey> = tree
            .descendants(&cache_key!["projects", "p2"])
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![cache_key!["projects", "p2", "results", 1u32, 50u32]]);
    }

    #[test]
    fn test_remove_prunes_empty_branches() {
        // Arrange
        let mut tree = populated();

        // Act
        let removed = tree.remove(&cache_key!["batch-status", "p1", "t1"]);

        // Assert
        assert_eq!(removed, Some("status"));
        assert_eq!(tree.len(), 5);
        assert!(tree.descendants(&cache_key!["batch-status"]).is_empty());
        assert!(tree.root.children.get(&KeySegment::from("batch-status")).is_none());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut tree = populated();
        assert_eq!(tree.remove(&cache_key!["projects", "p9"]), None);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_get_or_insert_with_only_builds_once() {
        let mut tree: KeyTree<u32> = KeyTree::new();
        let key = cache_key!["species"];
        *tree.get_or_insert_with(&key, || 1) += 1;
        *tree.get_or_insert_with(&key, || 100) += 1;
        assert_eq!(tree.get(&key), Some(&3));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_retain_removes_rejected_entries_and_counts_them() {
        let mut tree = populated();
        let removed = tree.retain(|key, _| !key.starts_with(&cache_key!["projects", "p1"]));
        assert_eq!(removed, 3);
        assert_eq!(tree.len(), 3);
        assert!(tree.descendants(&cache_key!["projects", "p1"]).is_empty());
    }

    #[test]
    fn test_clear_empties_tree() {
        let mut tree = populated();
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.entries().is_empty());
    }
}
