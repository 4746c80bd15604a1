//! Multi-step transitions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId};
use crate::store::Store;

use super::guard::{Action, Guard};

/// One position within a transition window: the set of event kinds accepted
/// at this position, a guard, and an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStep {
    /// Event kinds accepted at this step.
    pub event_ids: BTreeSet<EventId>,
    /// Firing predicate; see [`Checker::check`] for its actual effect.
    ///
    /// [`Checker::check`]: crate::Checker::check
    pub guard: Guard,
    /// Bindings applied when this step matches.
    pub action: Action,
}

impl TransitionStep {
    /// Creates a step.
    #[must_use]
    pub fn new(event_ids: impl IntoIterator<Item = EventId>, guard: Guard, action: Action) -> Self {
        Self {
            event_ids: event_ids.into_iter().collect(),
            guard,
            action,
        }
    }

    /// True if `event` is of an accepted kind and the guard holds.
    #[must_use]
    pub fn matches(&self, event: &Event, store: &Store) -> bool {
        self.event_ids.contains(&event.id) && self.guard.evaluate(event, store)
    }
}

impl fmt::Display for TransitionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.event_ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "}}{}{}", self.guard, self.action)
    }
}

/// An ordered step sequence plus a target vertex.
///
/// The transition's *depth* is its step count: the number of consecutive
/// buffered events one attempt consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Steps, oldest buffered event first.
    pub steps: Vec<TransitionStep>,
    /// Target vertex.
    pub target: usize,
}

impl Transition {
    /// Creates a multi-step transition.
    #[must_use]
    pub fn new(steps: Vec<TransitionStep>, target: usize) -> Self {
        Self { steps, target }
    }

    /// Creates a single-step transition.
    #[must_use]
    pub fn single(step: TransitionStep, target: usize) -> Self {
        Self {
            steps: vec![step],
            target,
        }
    }

    /// Number of buffered events consumed by one attempt.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::PrioritySource;
    use crate::value::Value;

    fn step(ids: &[u32]) -> TransitionStep {
        TransitionStep::new(
            ids.iter().map(|&i| EventId(i)),
            Guard::True,
            Action::none(),
        )
    }

    #[test]
    fn test_step_matches_kind_and_guard() {
        let s = TransitionStep::new(
            [EventId(1), EventId(2)],
            Guard::ConstantEq {
                field: 0,
                literal: Value::Int(5),
            },
            Action::none(),
        );
        let store = Store::empty();
        assert!(s.matches(&Event::new(1u32, vec![Value::Int(5)]), &store));
        assert!(!s.matches(&Event::new(3u32, vec![Value::Int(5)]), &store));
        assert!(!s.matches(&Event::new(1u32, vec![Value::Int(6)]), &store));
    }

    #[test]
    fn test_step_matches_against_store() {
        let mut priorities = PrioritySource::from_seed(123);
        let store = Store::empty().bind(0, Value::Obj(9), &mut priorities);
        let s = TransitionStep::new(
            [EventId(1)],
            Guard::StoreEq {
                field: 0,
                variable: 0,
            },
            Action::none(),
        );
        assert!(s.matches(&Event::new(1u32, vec![Value::Obj(9)]), &store));
        assert!(!s.matches(&Event::new(1u32, vec![Value::Obj(8)]), &store));
    }

    #[test]
    fn test_depth() {
        let t = Transition::new(vec![step(&[1]), step(&[2])], 0);
        assert_eq!(t.depth(), 2);
        assert_eq!(Transition::single(step(&[1]), 0).depth(), 1);
    }

    #[test]
    fn test_step_display() {
        let s = step(&[1, 3]);
        assert_eq!(format!("{s}"), "{1, 3}*<>");
    }

    #[test]
    fn test_transition_serde_round_trip() {
        let t = Transition::new(vec![step(&[1]), step(&[2, 4])], 7);
        let json = serde_json::to_string(&t).unwrap();
        let back: Transition = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
