//! Observation events emitted by the instrumented program.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Identifier for an event kind.
///
/// Kind ids are small non-negative integers assigned by the property
/// compiler; the argument arity of each kind is fixed by convention and not
/// enforced here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EventId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// One observation event: a kind id plus positional argument values.
///
/// Equality and hashing are structural over `(id, values)`. Two events built
/// from the same observation data compare equal, and states whose buffers
/// hold equal event sequences deduplicate against each other in the active
/// set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Kind id of this event.
    pub id: EventId,
    /// Positional argument values.
    pub values: Vec<Value>,
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub fn new(id: impl Into<EventId>, values: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// Creates an event with no arguments.
    #[must_use]
    pub fn nullary(id: impl Into<EventId>) -> Self {
        Self::new(id, Vec::new())
    }

    /// Returns the value at argument position `field`, if present.
    #[must_use]
    pub fn field(&self, field: usize) -> Option<&Value> {
        self.values.get(field)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}(", self.id)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}
