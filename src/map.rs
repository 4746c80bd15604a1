//! Persistent ordered map (treap).
//!
//! Variable stores are persistent ordered maps balanced by randomized
//! priorities: a binary search tree on keys that is simultaneously a max-heap
//! on priorities drawn from an injected [`PrioritySource`]. Every update
//! copies only the nodes along the edited path and shares the rest by
//! reference count, so published map values stay valid forever.
//!
//! Inserting a key that is already present is a no-op (first-write-wins), as
//! is removing an absent key. Each node carries the wrapping sum of its own
//! entry hash and its children's hashes, giving O(1) hash comparison before
//! equality falls back to ordered iteration; content-equal maps of different
//! insertion history or shape always compare equal.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::rng::PrioritySource;

type Link<K, V> = Option<Rc<Node<K, V>>>;

#[derive(Debug)]
struct Node<K, V> {
    /// Heap priority; strictly positive (0 is the empty-subtree sentinel).
    priority: u64,
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    hash: u64,
}

fn entry_hash<K: Hash, V: Hash>(key: &K, value: &V) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

fn link_hash<K, V>(link: &Link<K, V>) -> u64 {
    link.as_ref().map_or(0, |n| n.hash)
}

fn link_priority<K, V>(link: &Link<K, V>) -> u64 {
    link.as_ref().map_or(0, |n| n.priority)
}

fn link_len<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref()
        .map_or(0, |n| 1 + link_len(&n.left) + link_len(&n.right))
}

impl<K: Hash, V: Hash> Node<K, V> {
    fn link(priority: u64, key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Link<K, V> {
        let hash = link_hash(&left)
            .wrapping_add(link_hash(&right))
            .wrapping_add(entry_hash(&key, &value));
        Some(Rc::new(Node {
            priority,
            key,
            value,
            left,
            right,
            hash,
        }))
    }
}

/// Restores the heap property for a node whose children were just rebuilt.
///
/// At most one child can outrank the node (the one on the edited side), so a
/// single rotation suffices.
fn rebalance<K, V>(priority: u64, key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Link<K, V>
where
    K: Clone + Hash,
    V: Clone + Hash,
{
    match left {
        Some(l) if l.priority > priority => {
            // Rotate right: the left child comes up.
            let child = Node::link(priority, key, value, l.right.clone(), right);
            Node::link(l.priority, l.key.clone(), l.value.clone(), l.left.clone(), child)
        }
        left => match right {
            Some(r) if r.priority > priority => {
                // Rotate left: the right child comes up.
                let child = Node::link(priority, key, value, left, r.left.clone());
                Node::link(r.priority, r.key.clone(), r.value.clone(), child, r.right.clone())
            }
            right => Node::link(priority, key, value, left, right),
        },
    }
}

fn insert_link<K, V>(link: &Link<K, V>, priority: u64, key: K, value: V) -> Link<K, V>
where
    K: Ord + Clone + Hash,
    V: Clone + Hash,
{
    let Some(node) = link else {
        return Node::link(priority, key, value, None, None);
    };
    match key.cmp(&node.key) {
        std::cmp::Ordering::Less => {
            let left = insert_link(&node.left, priority, key, value);
            rebalance(
                node.priority,
                node.key.clone(),
                node.value.clone(),
                left,
                node.right.clone(),
            )
        }
        std::cmp::Ordering::Greater => {
            let right = insert_link(&node.right, priority, key, value);
            rebalance(
                node.priority,
                node.key.clone(),
                node.value.clone(),
                node.left.clone(),
                right,
            )
        }
        // First-write-wins: the existing binding is retained.
        std::cmp::Ordering::Equal => link.clone(),
    }
}

fn priority_less(p: u64, q: u64, priorities: &mut PrioritySource) -> bool {
    p < q || (p == q && priorities.coin_flip())
}

fn remove_link<K, V>(link: &Link<K, V>, key: &K, priorities: &mut PrioritySource) -> Link<K, V>
where
    K: Ord + Clone + Hash,
    V: Clone + Hash,
{
    let Some(node) = link else {
        return None;
    };
    match key.cmp(&node.key) {
        std::cmp::Ordering::Less => {
            let left = remove_link(&node.left, key, priorities);
            Node::link(
                node.priority,
                node.key.clone(),
                node.value.clone(),
                left,
                node.right.clone(),
            )
        }
        std::cmp::Ordering::Greater => {
            let right = remove_link(&node.right, key, priorities);
            Node::link(
                node.priority,
                node.key.clone(),
                node.value.clone(),
                node.left.clone(),
                right,
            )
        }
        std::cmp::Ordering::Equal => match (&node.left, &node.right) {
            (None, None) => None,
            (None, Some(_)) => node.right.clone(),
            (Some(_), None) => node.left.clone(),
            (Some(l), Some(r)) => {
                // Rotate the higher-priority child up to keep the heap
                // property, then chase the removed key down the other side.
                // Priority ties are broken by an unbiased coin flip.
                if priority_less(l.priority, r.priority, priorities) {
                    let moved = Node::link(
                        node.priority,
                        node.key.clone(),
                        node.value.clone(),
                        node.left.clone(),
                        r.left.clone(),
                    );
                    let left = remove_link(&moved, key, priorities);
                    Node::link(r.priority, r.key.clone(), r.value.clone(), left, r.right.clone())
                } else {
                    let moved = Node::link(
                        node.priority,
                        node.key.clone(),
                        node.value.clone(),
                        l.right.clone(),
                        node.right.clone(),
                    );
                    let right = remove_link(&moved, key, priorities);
                    Node::link(l.priority, l.key.clone(), l.value.clone(), l.left.clone(), right)
                }
            }
        },
    }
}

/// Immutable key-ordered map balanced by randomized priorities.
#[derive(Debug)]
pub struct Treap<K, V> {
    root: Link<K, V>,
}

impl<K, V> Treap<K, V> {
    /// The empty map.
    #[must_use]
    pub const fn empty() -> Self {
        Self { root: None }
    }

    /// True if no entries are held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        link_len(&self.root)
    }

    /// In-order (strictly increasing key) iterator; fresh on each call.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    fn root_hash(&self) -> u64 {
        link_hash(&self.root)
    }
}

impl<K: Ord, V> Treap<K, V> {
    /// Looks up the value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut link = &self.root;
        while let Some(node) = link {
            match key.cmp(&node.key) {
                std::cmp::Ordering::Less => link = &node.left,
                std::cmp::Ordering::Greater => link = &node.right,
                std::cmp::Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    /// True if `key` has a binding.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K, V> Treap<K, V>
where
    K: Ord + Clone + Hash,
    V: Clone + Hash,
{
    /// Inserts a binding, returning the extended map.
    ///
    /// If `key` is already bound the existing value is retained and the
    /// original map is returned unchanged (first-write-wins). A priority is
    /// drawn from `priorities` in either case, so the draw sequence depends
    /// only on the operation sequence.
    #[must_use]
    pub fn insert(&self, key: K, value: V, priorities: &mut PrioritySource) -> Self {
        let priority = priorities.next_priority();
        let out = Self {
            root: insert_link(&self.root, priority, key, value),
        };
        debug_assert!(out.check_invariants());
        out
    }

    /// Removes the binding for `key`, returning the shrunk map.
    ///
    /// Removing an absent key yields a map equal to the original.
    #[must_use]
    pub fn remove(&self, key: &K, priorities: &mut PrioritySource) -> Self {
        let out = Self {
            root: remove_link(&self.root, key, priorities),
        };
        debug_assert!(out.check_invariants());
        out
    }

    /// Verifies the search-tree and heap invariants; always true so callers
    /// can write `debug_assert!(map.check_invariants())`.
    fn check_invariants(&self) -> bool {
        fn check<K: Ord, V>(
            link: &Link<K, V>,
            min: Option<&K>,
            max: Option<&K>,
            high: u64,
        ) -> bool {
            let Some(node) = link else {
                return true;
            };
            node.priority > 0
                && node.priority <= high
                && min.map_or(true, |m| *m < node.key)
                && max.map_or(true, |m| node.key < *m)
                && check(&node.left, min, Some(&node.key), node.priority)
                && check(&node.right, Some(&node.key), max, node.priority)
        }
        check(&self.root, None, None, u64::MAX)
    }
}

impl<K, V> Clone for Treap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K, V> Default for Treap<K, V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for Treap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.root_hash() == other.root_hash() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for Treap<K, V> {}

impl<K, V> Hash for Treap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.root_hash());
    }
}

/// In-order iterator over a [`Treap`].
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut node: Option<&'a Node<K, V>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> IntoIterator for &'a Treap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
