//! Persistent FIFO queue.
//!
//! The queue backs the per-state event buffers of the stepping engine, so
//! every operation returns a new queue and never disturbs already-published
//! values; unchanged list segments are shared by reference count. The
//! representation is the classic two-list split: `push` prepends to `back`,
//! `pop` takes from `front`, and an exhausted `front` is rebuilt by reversing
//! `back` (amortized O(1) per operation, worst-case O(n) for one reversal).
//!
//! The queue keeps an incremental hash: the wrapping sum of the element
//! hashes. Sums are commutative, so `push` and `pop` maintain it in O(1),
//! and equality checks are gated on it before falling back to element-wise
//! comparison.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::EngineError;

type Link<T> = Option<Rc<Node<T>>>;

#[derive(Debug)]
struct Node<T> {
    data: T,
    next: Link<T>,
    /// Length of the list rooted here.
    size: usize,
}

impl<T> Node<T> {
    fn link(data: T, next: Link<T>) -> Link<T> {
        let size = 1 + link_size(&next);
        Some(Rc::new(Node { data, next, size }))
    }
}

fn link_size<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

fn reverse<T: Clone>(mut link: &Link<T>) -> Link<T> {
    let mut out = None;
    while let Some(node) = link {
        out = Node::link(node.data.clone(), out);
        link = &node.next;
    }
    out
}

fn element_hash<T: Hash>(x: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    x.hash(&mut hasher);
    hasher.finish()
}

/// Immutable FIFO queue with structural sharing and an incremental hash.
#[derive(Debug)]
pub struct Queue<T> {
    front: Link<T>,
    back: Link<T>,
    hash: u64,
}

impl<T> Queue<T> {
    /// The empty queue.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            front: None,
            back: None,
            hash: 0,
        }
    }

    /// Number of elements held.
    #[must_use]
    pub fn len(&self) -> usize {
        link_size(&self.front) + link_size(&self.back)
    }

    /// True if no elements are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.back.is_none()
    }

    /// Fresh front-to-back iterator.
    ///
    /// Each call restarts from the front; the queue itself is never consumed.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            front: self.front.as_deref(),
            back: &self.back,
            back_rev: None,
        }
    }
}

impl<T: Hash + Clone> Queue<T> {
    /// Appends `x` at the back, returning the extended queue.
    #[must_use]
    pub fn push(&self, x: T) -> Self {
        let hash = self.hash.wrapping_add(element_hash(&x));
        Self {
            front: self.front.clone(),
            back: Node::link(x, self.back.clone()),
            hash,
        }
    }

    /// Removes the front element, returning the shortened queue.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyContainer`] if the queue is empty. The stepping
    /// engine's depth precomputation makes this unreachable in correct
    /// operation.
    pub fn pop(&self) -> Result<Self, EngineError> {
        let (front, back) = if self.front.is_some() {
            (self.front.clone(), self.back.clone())
        } else {
            (reverse(&self.back), None)
        };
        let Some(head) = front else {
            return Err(EngineError::EmptyContainer { container: "queue" });
        };
        Ok(Self {
            front: head.next.clone(),
            back,
            hash: self.hash.wrapping_sub(element_hash(&head.data)),
        })
    }

    /// Borrows the front element.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyContainer`] if the queue is empty.
    pub fn front(&self) -> Result<&T, EngineError> {
        if let Some(node) = &self.front {
            return Ok(&node.data);
        }
        // Oldest element of `back` is at its tail.
        let mut link = &self.back;
        let mut last = None;
        while let Some(node) = link {
            last = Some(&node.data);
            link = &node.next;
        }
        last.ok_or(EngineError::EmptyContainer { container: "queue" })
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            front: self.front.clone(),
            back: self.back.clone(),
            hash: self.hash,
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialEq> PartialEq for Queue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Queue<T> {}

impl<T> Hash for Queue<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Front-to-back iterator over a [`Queue`].
///
/// The `back` list is materialized in reverse only once `front` is
/// exhausted.
#[derive(Debug)]
pub struct Iter<'a, T> {
    front: Option<&'a Node<T>>,
    back: &'a Link<T>,
    back_rev: Option<Vec<&'a T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if let Some(node) = self.front {
            self.front = node.next.as_deref();
            return Some(&node.data);
        }
        let rev = self.back_rev.get_or_insert_with(|| {
            let mut items = Vec::with_capacity(link_size(self.back));
            let mut link = self.back;
            while let Some(node) = link {
                items.push(&node.data);
                link = &node.next;
            }
            items
        });
        rev.pop()
    }
}

impl<'a, T> IntoIterator for &'a Queue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
