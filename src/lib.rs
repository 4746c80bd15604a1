//! # Vigil - runtime verification monitor
//!
//! Vigil consumes a live sequence of typed observation events and checks
//! them against a declaratively specified non-deterministic finite automaton
//! whose transitions span multiple consecutive events, carry guard
//! predicates, and maintain a variable-binding store. When a designated
//! error location is reached, the violation is reported through a non-fatal
//! diagnostic side-channel and monitoring continues.
//!
//! ## Core Concepts
//!
//! - **Event**: a kind id plus positional argument values, emitted by an
//!   instrumented program
//! - **Automaton**: vertices connected by multi-step guarded transitions,
//!   built once from a compiler-produced description
//! - **Monitor State**: one point of the non-deterministic exploration:
//!   vertex + variable store + buffered events + history
//! - **Checker**: advances the whole set of active monitor states on each
//!   incoming event
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vigil::{Automaton, AutomatonDef, Checker, CheckerConfig, Event, Value};
//!
//! // Deserialize the automaton produced by the property compiler.
//! let def = AutomatonDef::from_json(&program)?;
//! let checker = Checker::new(Automaton::new(def)?, CheckerConfig::default());
//! let reports = checker.subscribe();
//!
//! // Feed the observation trace.
//! checker.check(Event::new(1u32, vec![Value::Obj(handle)]));
//! while let Some(violation) = reports.try_recv() {
//!     eprintln!("{}", violation.message);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Persistent containers
pub mod map;
pub mod queue;
pub mod rng;

// Event and store data model
pub mod error;
pub mod event;
pub mod store;
pub mod value;

// Automaton and stepping engine
pub mod automaton;
pub mod checker;
pub mod export;
pub mod state;

// Re-export primary types at crate root for convenience
pub use automaton::{
    Action, Assignment, Automaton, AutomatonDef, Guard, Transition, TransitionStep,
};
pub use checker::{Checker, CheckerConfig, ReportStream, Violation};
pub use error::{AutomatonError, EngineError, VigilError, VigilResult};
pub use event::{Event, EventId};
pub use map::Treap;
pub use queue::Queue;
pub use rng::PrioritySource;
pub use state::{MonitorState, ParentLink};
pub use store::{Binding, Store};
pub use value::Value;
