//! Error types for vigil.
//!
//! All errors are strongly typed using thiserror. Construction-time
//! validation failures and engine-invariant failures are kept in separate
//! enums because they have very different severity: the former are reported
//! to whoever built the automaton, the latter indicate a bug in the engine
//! itself and are treated as fatal at the `check` boundary.

use thiserror::Error;

/// Validation errors raised while constructing an [`Automaton`].
///
/// Display and Error are implemented by hand because several variants carry
/// a `usize` field named `source`, which the thiserror derive would insist
/// on treating as an error source.
///
/// [`Automaton`]: crate::Automaton
#[derive(Debug, PartialEq, Eq)]
pub enum AutomatonError {
    StartVertexOutOfRange {
        vertex: usize,
        vertex_count: usize,
    },

    StartVertexIsError {
        vertex: usize,
        message: String,
    },

    TargetOutOfRange {
        source: usize,
        target: usize,
        vertex_count: usize,
    },

    EmptyEventSet {
        source: usize,
    },

    DuplicateAssignment {
        source: usize,
        variable: u32,
    },

    FilterOutOfRange {
        vertex: usize,
        filter: usize,
        filter_count: usize,
    },

    MessageCountMismatch {
        messages: usize,
        vertex_count: usize,
    },

    FilterCountMismatch {
        entries: usize,
        vertex_count: usize,
    },
}

impl std::fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartVertexOutOfRange { vertex, vertex_count } => write!(
                f,
                "Start vertex {vertex} is out of range (vertex count: {vertex_count})"
            ),
            Self::StartVertexIsError { vertex, message } => {
                write!(f, "Start vertex {vertex} is an error vertex ({message:?})")
            }
            Self::TargetOutOfRange { source, target, vertex_count } => write!(
                f,
                "Transition from vertex {source} targets out-of-range vertex {target} (vertex count: {vertex_count})"
            ),
            Self::EmptyEventSet { source } => write!(
                f,
                "Transition from vertex {source} has a step with an empty event-id set"
            ),
            Self::DuplicateAssignment { source, variable } => write!(
                f,
                "Transition from vertex {source} assigns variable {variable} more than once in one action"
            ),
            Self::FilterOutOfRange { vertex, filter, filter_count } => write!(
                f,
                "Vertex {vertex} references filter group {filter} (filter count: {filter_count})"
            ),
            Self::MessageCountMismatch { messages, vertex_count } => write!(
                f,
                "Error-message list has {messages} entries for {vertex_count} vertices"
            ),
            Self::FilterCountMismatch { entries, vertex_count } => write!(
                f,
                "Filter-group index list has {entries} entries for {vertex_count} vertices"
            ),
        }
    }
}

impl std::error::Error for AutomatonError {}

/// Engine-invariant failures.
///
/// These indicate a bug in the monitor itself, never a fault of the
/// monitored program. The observability/depth precomputation is designed to
/// make the container variants unreachable in correct operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Empty container access: {container}")]
    EmptyContainer {
        container: &'static str,
    },

    #[error("Report channel disconnected: {channel}")]
    Disconnected {
        channel: &'static str,
    },

    #[error("Report receive timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for vigil.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VigilError {
    #[error("Automaton error: {0}")]
    Automaton(#[from] AutomatonError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Malformed automaton description: {message}")]
    Malformed {
        message: String,
    },
}

impl VigilError {
    /// Creates a malformed-description error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Returns true if this is a construction-time validation error.
    #[must_use]
    pub const fn is_automaton(&self) -> bool {
        matches!(self, Self::Automaton(_))
    }

    /// Returns true if this is an engine-invariant failure.
    #[must_use]
    pub const fn is_engine(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}

/// Result type alias for vigil operations.
pub type VigilResult<T> = Result<T, VigilError>;
