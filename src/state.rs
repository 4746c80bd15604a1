//! Monitor states.
//!
//! A [`MonitorState`] is one point in the automaton's non-deterministic
//! exploration: a vertex, a variable store, the buffered events not yet
//! consumed by a transition, and a backward history link. States are created
//! functionally and never mutated; a state retained through another state's
//! parent link stays valid after the active set has moved past it, which is
//! what makes witness-trace reconstruction possible without copying.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::EngineError;
use crate::event::Event;
use crate::queue::Queue;
use crate::store::Store;

/// Backward link from a state to the state it was derived from, together
/// with the window of events the deriving transition consumed.
#[derive(Debug, Clone)]
pub struct ParentLink {
    /// Predecessor state.
    pub state: Rc<MonitorState>,
    /// Events consumed to reach the child, oldest first.
    pub consumed: Queue<Event>,
}

/// One active point of the automaton exploration.
///
/// Identity — as used to deduplicate the active set — covers `(vertex,
/// store, events)` only. The parent link is pure history: two states that
/// differ only in how they were reached compare equal and merge, which keeps
/// convergent non-deterministic paths from multiplying.
#[derive(Debug, Clone)]
pub struct MonitorState {
    vertex: usize,
    store: Store,
    events: Queue<Event>,
    parent: Option<Rc<ParentLink>>,
    /// Chain depth from a start state.
    generation: usize,
}

impl MonitorState {
    /// A start state at `vertex`: empty store, empty buffer, no history.
    #[must_use]
    pub fn start(vertex: usize) -> Self {
        Self {
            vertex,
            store: Store::empty(),
            events: Queue::empty(),
            parent: None,
            generation: 0,
        }
    }

    /// A state produced by a fired transition, parented on `parent` with the
    /// window of events the transition consumed.
    #[must_use]
    pub fn derived(
        vertex: usize,
        store: Store,
        events: Queue<Event>,
        consumed: Queue<Event>,
        parent: &Rc<MonitorState>,
    ) -> Self {
        Self {
            vertex,
            store,
            events,
            generation: parent.generation + 1,
            parent: Some(Rc::new(ParentLink {
                state: Rc::clone(parent),
                consumed,
            })),
        }
    }

    /// This state with `event` appended to its buffer.
    #[must_use]
    pub fn with_event(&self, event: Event) -> Self {
        Self {
            events: self.events.push(event),
            ..self.clone()
        }
    }

    /// This state with its oldest buffered event dropped.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyContainer`] if the buffer is empty.
    pub fn drop_oldest(&self) -> Result<Self, EngineError> {
        Ok(Self {
            events: self.events.pop()?,
            ..self.clone()
        })
    }

    /// Current vertex.
    #[must_use]
    pub const fn vertex(&self) -> usize {
        self.vertex
    }

    /// Variable store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Buffered, not-yet-consumed events.
    #[must_use]
    pub const fn events(&self) -> &Queue<Event> {
        &self.events
    }

    /// History link, if this is not a start state.
    #[must_use]
    pub const fn parent(&self) -> Option<&Rc<ParentLink>> {
        self.parent.as_ref()
    }

    /// Chain depth from a start state.
    #[must_use]
    pub const fn generation(&self) -> usize {
        self.generation
    }

    /// The consumed-event windows from the start state to this state,
    /// oldest window first.
    #[must_use]
    pub fn witness_trace(&self) -> Vec<Vec<Event>> {
        let mut windows = Vec::with_capacity(self.generation);
        let mut link = self.parent.as_ref();
        while let Some(parent) = link {
            windows.push(parent.consumed.iter().cloned().collect());
            link = parent.state.parent.as_ref();
        }
        windows.reverse();
        windows
    }
}

impl PartialEq for MonitorState {
    fn eq(&self, other: &Self) -> bool {
        self.vertex == other.vertex && self.store == other.store && self.events == other.events
    }
}

impl Eq for MonitorState {}

impl Hash for MonitorState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vertex.hash(state);
        self.store.hash(state);
        self.events.hash(state);
    }
}
