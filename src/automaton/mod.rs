//! The property automaton.
//!
//! An [`Automaton`] is built once from an [`AutomatonDef`] produced by an
//! out-of-scope property compiler and is immutable afterwards. Construction
//! validates the description, derives the observability index (which event
//! kinds can possibly matter at which vertex) and the global maximum
//! transition depth used by the stepping engine to decide when a state's
//! event buffer is full enough to attempt matching.

/// Guard predicates and binding actions.
pub mod guard;
/// Multi-step transitions.
pub mod transition;

use std::collections::{BTreeSet, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AutomatonError, VigilError, VigilResult};
use crate::event::EventId;

pub use guard::{Action, Assignment, Guard};
pub use transition::{Transition, TransitionStep};

/// Compiler-produced description of a property automaton.
///
/// Vertices are implicit indices `0..error_messages.len()`. Observability
/// filter groups are shared: each vertex names a group by index, and many
/// vertices typically name the same group, which keeps the description small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatonDef {
    /// Vertices the monitor starts in.
    pub start_vertices: Vec<usize>,
    /// Per-vertex error message; `None` marks a non-error vertex.
    pub error_messages: Vec<Option<String>>,
    /// Per-vertex outgoing transitions.
    pub transitions: Vec<Vec<Transition>>,
    /// Per-vertex index into `filters`.
    pub vertex_filters: Vec<usize>,
    /// Shared filter groups: the event kinds observable at subscribing
    /// vertices.
    pub filters: Vec<BTreeSet<EventId>>,
}

impl AutomatonDef {
    /// Parses a description from JSON.
    ///
    /// # Errors
    ///
    /// [`VigilError::Malformed`] if the JSON does not describe an
    /// `AutomatonDef`; validation proper happens in [`Automaton::new`].
    pub fn from_json(json: &str) -> VigilResult<Self> {
        serde_json::from_str(json).map_err(|e| VigilError::malformed(e.to_string()))
    }

    /// Serializes this description to JSON.
    ///
    /// # Errors
    ///
    /// [`VigilError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> VigilResult<String> {
        serde_json::to_string(self).map_err(|e| VigilError::malformed(e.to_string()))
    }
}

/// Validated, immutable property automaton.
#[derive(Debug)]
pub struct Automaton {
    start_vertices: Vec<usize>,
    error_messages: Vec<Option<String>>,
    transitions: Vec<Vec<Transition>>,
    observable: HashSet<(usize, EventId)>,
    max_depth: usize,
}

impl Automaton {
    /// Validates `def` and derives the observability index and maximum
    /// transition depth.
    ///
    /// # Errors
    ///
    /// An [`AutomatonError`] naming the first violated construction
    /// invariant: list-length mismatches, out-of-range start vertices or
    /// targets, error start vertices, out-of-range filter references, empty
    /// step event sets, or duplicate assignment targets within one action.
    pub fn new(def: AutomatonDef) -> Result<Self, AutomatonError> {
        let AutomatonDef {
            start_vertices,
            error_messages,
            transitions,
            vertex_filters,
            filters,
        } = def;

        let vertex_count = transitions.len();
        if error_messages.len() != vertex_count {
            return Err(AutomatonError::MessageCountMismatch {
                messages: error_messages.len(),
                vertex_count,
            });
        }
        if vertex_filters.len() != vertex_count {
            return Err(AutomatonError::FilterCountMismatch {
                entries: vertex_filters.len(),
                vertex_count,
            });
        }
        for &vertex in &start_vertices {
            if vertex >= vertex_count {
                return Err(AutomatonError::StartVertexOutOfRange {
                    vertex,
                    vertex_count,
                });
            }
            if let Some(message) = &error_messages[vertex] {
                return Err(AutomatonError::StartVertexIsError {
                    vertex,
                    message: message.clone(),
                });
            }
        }
        for (source, outgoing) in transitions.iter().enumerate() {
            for transition in outgoing {
                if transition.target >= vertex_count {
                    return Err(AutomatonError::TargetOutOfRange {
                        source,
                        target: transition.target,
                        vertex_count,
                    });
                }
                for step in &transition.steps {
                    if step.event_ids.is_empty() {
                        return Err(AutomatonError::EmptyEventSet { source });
                    }
                    let mut seen = HashSet::new();
                    for assignment in step.action.assignments() {
                        if !seen.insert(assignment.variable) {
                            return Err(AutomatonError::DuplicateAssignment {
                                source,
                                variable: assignment.variable,
                            });
                        }
                    }
                }
            }
        }

        let mut observable = HashSet::new();
        for (vertex, &filter) in vertex_filters.iter().enumerate() {
            let Some(group) = filters.get(filter) else {
                return Err(AutomatonError::FilterOutOfRange {
                    vertex,
                    filter,
                    filter_count: filters.len(),
                });
            };
            for &event_id in group {
                observable.insert((vertex, event_id));
            }
        }

        let max_depth = transitions
            .iter()
            .flatten()
            .map(Transition::depth)
            .max()
            .unwrap_or(0);

        debug!(
            "automaton built: {vertex_count} vertices, {} start, max depth {max_depth}, \
             {} observable (vertex, event) pairs",
            start_vertices.len(),
            observable.len()
        );

        Ok(Self {
            start_vertices,
            error_messages,
            transitions,
            observable,
            max_depth,
        })
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.transitions.len()
    }

    /// Vertices the monitor starts in.
    #[must_use]
    pub fn start_vertices(&self) -> &[usize] {
        &self.start_vertices
    }

    /// Error message of `vertex`, or `None` for a non-error vertex.
    #[must_use]
    pub fn error_message(&self, vertex: usize) -> Option<&str> {
        self.error_messages.get(vertex)?.as_deref()
    }

    /// Outgoing transitions of `vertex`.
    #[must_use]
    pub fn outgoing(&self, vertex: usize) -> &[Transition] {
        self.transitions.get(vertex).map_or(&[], Vec::as_slice)
    }

    /// True if events of kind `event_id` can possibly matter at `vertex`.
    #[must_use]
    pub fn is_observable(&self, event_id: EventId, vertex: usize) -> bool {
        self.observable.contains(&(vertex, event_id))
    }

    /// Largest step count over all transitions in the whole automaton.
    ///
    /// This is a global bound, not a per-vertex one; the stepping engine
    /// compares buffered-event counts against it.
    #[must_use]
    pub fn maximum_transition_depth(&self) -> usize {
        self.max_depth
    }
}
