//! Variable-binding stores.
//!
//! Each monitor state carries a [`Store`]: a persistent ordered map from
//! property-variable index to bound [`Value`]. Bindings obey
//! first-write-wins: once a variable is bound, later binds for the same
//! variable are ignored, so a value observed early in a transition window
//! cannot be overwritten by a later step.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::map::Treap;
use crate::rng::PrioritySource;
use crate::value::Value;

/// One variable binding.
///
/// Bindings are compared structurally, variable index and value both; the
/// value may be [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    /// Property-variable index.
    pub variable: u32,
    /// Bound value.
    pub value: Value,
}

impl Binding {
    /// Creates a binding.
    #[must_use]
    pub const fn new(variable: u32, value: Value) -> Self {
        Self { variable, value }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.variable, self.value)
    }
}

/// Persistent map from variable index to bound value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    bindings: Treap<u32, Value>,
}

impl Store {
    /// The empty store.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bindings: Treap::empty(),
        }
    }

    /// Looks up the value bound to `variable`.
    #[must_use]
    pub fn get(&self, variable: u32) -> Option<&Value> {
        self.bindings.get(&variable)
    }

    /// Binds `variable` to `value`, returning the extended store.
    ///
    /// First-write-wins: if `variable` is already bound, the original store
    /// is returned unchanged.
    #[must_use]
    pub fn bind(&self, variable: u32, value: Value, priorities: &mut PrioritySource) -> Self {
        Self {
            bindings: self.bindings.insert(variable, value, priorities),
        }
    }

    /// Drops the binding for `variable`, returning the shrunk store.
    /// Unbinding an absent variable yields a store equal to the original.
    #[must_use]
    pub fn unbind(&self, variable: u32, priorities: &mut PrioritySource) -> Self {
        Self {
            bindings: self.bindings.remove(&variable, priorities),
        }
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if no variables are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in increasing variable order.
    pub fn iter(&self) -> impl Iterator<Item = Binding> + '_ {
        self.bindings
            .iter()
            .map(|(variable, value)| Binding::new(*variable, value.clone()))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::empty()
    }
}

impl Hash for Store {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bindings.hash(state);
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, binding) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{binding}")?;
        }
        write!(f, "}}")
    }
}
