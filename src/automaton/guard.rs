//! Guard predicates and binding actions.
//!
//! Guards are pure, total boolean predicates over `(event, store)`; actions
//! turn event fields into store bindings. Both are plain data produced by the
//! property compiler, so they carry serde derives and `Display` renderings
//! used by the DOT export.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::rng::PrioritySource;
use crate::store::Store;
use crate::value::Value;

/// Boolean predicate over the current event and the variable store.
///
/// Evaluation is total: an out-of-range event field or an unbound store
/// variable makes the comparison guards evaluate to `false` rather than
/// fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Guard {
    /// Always true.
    True,

    /// Event field equals a literal; null-aware (a `Null` literal matches a
    /// `Null` field).
    ConstantEq {
        /// Event field index.
        field: usize,
        /// Literal to compare against.
        literal: Value,
    },

    /// Event field equals the value bound to a store variable.
    StoreEq {
        /// Event field index.
        field: usize,
        /// Store variable index.
        variable: u32,
    },

    /// Negation.
    Not {
        /// Negated guard.
        child: Box<Guard>,
    },

    /// Conjunction; the empty conjunction is true.
    All {
        /// Conjuncts.
        children: Vec<Guard>,
    },
}

impl Guard {
    /// Evaluates this guard against `event` and `store`.
    #[must_use]
    pub fn evaluate(&self, event: &Event, store: &Store) -> bool {
        match self {
            Self::True => true,
            Self::ConstantEq { field, literal } => {
                event.field(*field).map_or(false, |v| v == literal)
            }
            Self::StoreEq { field, variable } => match (event.field(*field), store.get(*variable)) {
                (Some(observed), Some(bound)) => observed == bound,
                _ => false,
            },
            Self::Not { child } => !child.evaluate(event, store),
            Self::All { children } => children.iter().all(|g| g.evaluate(event, store)),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "*"),
            Self::ConstantEq { field, literal } => write!(f, "{literal} == event[{field}]"),
            Self::StoreEq { field, variable } => {
                write!(f, "event[{field}] == store[{variable}]")
            }
            Self::Not { child } => write!(f, "not ({child})"),
            Self::All { children } => match children.as_slice() {
                [] => write!(f, "*"),
                [only] => write!(f, "{only}"),
                many => {
                    write!(f, "and (")?;
                    for (i, g) in many.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{g}")?;
                    }
                    write!(f, ")")
                }
            },
        }
    }
}

/// One `variable <- event-field` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Target store variable.
    pub variable: u32,
    /// Source event field index.
    pub field: usize,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.variable, self.field)
    }
}

/// A set of assignments applied when a transition step matches.
///
/// Assignments within one action target distinct variables; the automaton
/// validates this at construction. Application goes through the store's
/// first-write-wins rule, so a variable bound by an earlier step keeps its
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action {
    assignments: Vec<Assignment>,
}

impl Action {
    /// Creates an action from its assignments.
    #[must_use]
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    /// The action with no assignments.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// The assignments, in compiler order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Applies this action to `store`, reading fields from `event`.
    ///
    /// An out-of-range field binds `Null`; argument arity is a convention the
    /// engine does not enforce.
    #[must_use]
    pub fn apply(&self, event: &Event, store: &Store, priorities: &mut PrioritySource) -> Store {
        let mut store = store.clone();
        for assignment in &self.assignments {
            let value = event
                .field(assignment.field)
                .cloned()
                .unwrap_or(Value::Null);
            store = store.bind(assignment.variable, value, priorities);
        }
        store
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, a) in self.assignments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{a}")?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> PrioritySource {
        PrioritySource::from_seed(123)
    }

    #[test]
    fn test_true_guard() {
        let e = Event::nullary(0u32);
        assert!(Guard::True.evaluate(&e, &Store::empty()));
    }

    #[test]
    fn test_constant_eq() {
        let e = Event::new(0u32, vec![Value::Int(5), Value::Null]);
        let store = Store::empty();
        let hit = Guard::ConstantEq {
            field: 0,
            literal: Value::Int(5),
        };
        let miss = Guard::ConstantEq {
            field: 0,
            literal: Value::Int(6),
        };
        let null_hit = Guard::ConstantEq {
            field: 1,
            literal: Value::Null,
        };
        let out_of_range = Guard::ConstantEq {
            field: 9,
            literal: Value::Int(5),
        };
        assert!(hit.evaluate(&e, &store));
        assert!(!miss.evaluate(&e, &store));
        assert!(null_hit.evaluate(&e, &store));
        assert!(!out_of_range.evaluate(&e, &store));
    }

    #[test]
    fn test_store_eq() {
        let mut priorities = src();
        let e = Event::new(0u32, vec![Value::Obj(7)]);
        let bound = Store::empty().bind(2, Value::Obj(7), &mut priorities);
        let other = Store::empty().bind(2, Value::Obj(8), &mut priorities);
        let guard = Guard::StoreEq {
            field: 0,
            variable: 2,
        };
        assert!(guard.evaluate(&e, &bound));
        assert!(!guard.evaluate(&e, &other));
        // Unbound variable: total evaluation, no failure.
        assert!(!guard.evaluate(&e, &Store::empty()));
    }

    #[test]
    fn test_not_and_all() {
        let e = Event::new(0u32, vec![Value::Bool(true)]);
        let store = Store::empty();
        let hit = Guard::ConstantEq {
            field: 0,
            literal: Value::Bool(true),
        };
        let not = Guard::Not {
            child: Box::new(hit.clone()),
        };
        assert!(!not.evaluate(&e, &store));
        let empty_and = Guard::All { children: vec![] };
        assert!(empty_and.evaluate(&e, &store));
        let and = Guard::All {
            children: vec![hit, Guard::True],
        };
        assert!(and.evaluate(&e, &store));
    }

    #[test]
    fn test_guard_display() {
        assert_eq!(format!("{}", Guard::True), "*");
        assert_eq!(
            format!(
                "{}",
                Guard::ConstantEq {
                    field: 1,
                    literal: Value::Int(3)
                }
            ),
            "3 == event[1]"
        );
        assert_eq!(
            format!(
                "{}",
                Guard::StoreEq {
                    field: 0,
                    variable: 2
                }
            ),
            "event[0] == store[2]"
        );
        assert_eq!(
            format!(
                "{}",
                Guard::Not {
                    child: Box::new(Guard::True)
                }
            ),
            "not (*)"
        );
        assert_eq!(format!("{}", Guard::All { children: vec![] }), "*");
        assert_eq!(
            format!(
                "{}",
                Guard::All {
                    children: vec![Guard::True, Guard::True]
                }
            ),
            "and (*, *)"
        );
    }

    #[test]
    fn test_action_apply() {
        let mut priorities = src();
        let e = Event::new(1u32, vec![Value::Int(42), Value::Str("s".into())]);
        let action = Action::new(vec![
            Assignment {
                variable: 3,
                field: 0,
            },
            Assignment {
                variable: 4,
                field: 1,
            },
        ]);
        let store = action.apply(&e, &Store::empty(), &mut priorities);
        assert_eq!(store.get(3), Some(&Value::Int(42)));
        assert_eq!(store.get(4), Some(&Value::Str("s".into())));
    }

    #[test]
    fn test_action_respects_first_write() {
        let mut priorities = src();
        let seeded = Store::empty().bind(3, Value::Int(1), &mut priorities);
        let e = Event::new(1u32, vec![Value::Int(2)]);
        let action = Action::new(vec![Assignment {
            variable: 3,
            field: 0,
        }]);
        let out = action.apply(&e, &seeded, &mut priorities);
        assert_eq!(out.get(3), Some(&Value::Int(1)));
    }

    #[test]
    fn test_action_out_of_range_field_binds_null() {
        let mut priorities = src();
        let e = Event::nullary(1u32);
        let action = Action::new(vec![Assignment {
            variable: 0,
            field: 5,
        }]);
        let out = action.apply(&e, &Store::empty(), &mut priorities);
        assert_eq!(out.get(0), Some(&Value::Null));
    }

    #[test]
    fn test_action_display() {
        let action = Action::new(vec![
            Assignment {
                variable: 3,
                field: 0,
            },
            Assignment {
                variable: 2,
                field: 1,
            },
        ]);
        assert_eq!(format!("{action}"), "<3 <- 0, 2 <- 1>");
        assert_eq!(format!("{}", Action::none()), "<>");
    }

    #[test]
    fn test_guard_serde_round_trip() {
        let guard = Guard::All {
            children: vec![
                Guard::ConstantEq {
                    field: 0,
                    literal: Value::Null,
                },
                Guard::Not {
                    child: Box::new(Guard::StoreEq {
                        field: 1,
                        variable: 2,
                    }),
                },
            ],
        };
        let json = serde_json::to_string(&guard).unwrap();
        let back: Guard = serde_json::from_str(&json).unwrap();
        assert_eq!(guard, back);
    }
}
