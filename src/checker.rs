//! The stepping engine.
//!
//! A [`Checker`] owns the set of concurrently active [`MonitorState`]s and
//! advances all of them on each incoming event, replacing the set wholesale.
//! Transitions into error vertices are reported through a non-fatal
//! side-channel — subscriber streams and an optional synchronous callback —
//! and monitoring continues, since one property instance's violation must
//! not suppress detection of independent ones.
//!
//! Two behaviors of the stepping loop deserve calling out:
//!
//! 1. A failing per-step guard does not stop a transition from firing; it
//!    only withholds that step's action. This is a deliberate port of the
//!    system this engine reimplements and reads as a defect; it is kept
//!    literally.
//! 2. A state for which the incoming event is not observable at its vertex
//!    is dropped from the next active set (also a literal port). A state
//!    whose buffer is still below the automaton's *global* maximum
//!    transition depth, however, is carried forward with the event
//!    buffered, so multi-event windows can fill up.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, trace, warn};

use crate::automaton::Automaton;
use crate::error::{EngineError, VigilError, VigilResult};
use crate::event::Event;
use crate::queue::Queue;
use crate::rng::PrioritySource;
use crate::state::MonitorState;

/// Checker tuning knobs.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Seed for the treap priority source; fixed seeds give reproducible
    /// store shapes.
    pub priority_seed: u64,
    /// Per-subscriber report buffer capacity.
    pub report_capacity: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            priority_seed: 123,
            report_capacity: 1024,
        }
    }
}

/// A reported property violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Configured message of the reached error vertex.
    pub message: String,
    /// The error vertex.
    pub vertex: usize,
    /// Transition-chain depth of the violating state.
    pub generation: usize,
    /// Consumed-event windows from the start state to the error vertex,
    /// oldest window first.
    pub witness: Vec<Vec<Event>>,
}

/// Subscriber handle for violation reports.
///
/// Reports are delivered with non-blocking sends; a subscriber that falls
/// behind loses reports, counted by [`Checker::dropped_reports`].
#[derive(Debug)]
pub struct ReportStream {
    rx: Receiver<Violation>,
}

impl ReportStream {
    /// Receives the next report (blocking).
    ///
    /// # Errors
    ///
    /// [`EngineError::Disconnected`] once the checker is gone and the buffer
    /// is drained.
    pub fn recv(&self) -> VigilResult<Violation> {
        self.rx.recv().map_err(|_| {
            VigilError::Engine(EngineError::Disconnected { channel: "reports" })
        })
    }

    /// Receives the next report if one is already buffered.
    #[must_use]
    pub fn try_recv(&self) -> Option<Violation> {
        self.rx.try_recv().ok()
    }

    /// Receives the next report with a timeout.
    ///
    /// # Errors
    ///
    /// [`EngineError::Timeout`] or [`EngineError::Disconnected`].
    pub fn recv_timeout(&self, timeout: Duration) -> VigilResult<Violation> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => VigilError::Engine(EngineError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => {
                VigilError::Engine(EngineError::Disconnected { channel: "reports" })
            }
        })
    }
}

type ViolationHandler = Box<dyn Fn(&Violation)>;

/// Runtime verification monitor over one property automaton.
///
/// Synchronous and call-and-return: [`check`](Self::check) fully completes
/// before returning. The checker is explicitly non-reentrant (flag-guarded)
/// and not thread-safe; concurrent invocation must be prevented by the
/// caller.
pub struct Checker {
    automaton: Automaton,
    states: RefCell<HashSet<Rc<MonitorState>>>,
    /// Non-reentrancy token: set on entry to `check`, cleared on every exit
    /// path.
    in_check: Cell<bool>,
    priorities: RefCell<PrioritySource>,
    subscribers: RefCell<Vec<Sender<Violation>>>,
    handler: RefCell<Option<ViolationHandler>>,
    dropped_reports: Cell<u64>,
    config: CheckerConfig,
}

impl Checker {
    /// Creates a checker with one active start state per start vertex.
    #[must_use]
    pub fn new(automaton: Automaton, config: CheckerConfig) -> Self {
        let states = automaton
            .start_vertices()
            .iter()
            .map(|&vertex| Rc::new(MonitorState::start(vertex)))
            .collect();
        Self {
            priorities: RefCell::new(PrioritySource::from_seed(config.priority_seed)),
            automaton,
            states: RefCell::new(states),
            in_check: Cell::new(false),
            subscribers: RefCell::new(Vec::new()),
            handler: RefCell::new(None),
            dropped_reports: Cell::new(0),
            config,
        }
    }

    /// The monitored automaton.
    #[must_use]
    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    /// Subscribes a stream to violation reports.
    pub fn subscribe(&self) -> ReportStream {
        let (tx, rx) = bounded(self.config.report_capacity.max(1));
        self.subscribers.borrow_mut().push(tx);
        ReportStream { rx }
    }

    /// Installs a synchronous callback invoked on each violation, replacing
    /// any previous one.
    ///
    /// The callback runs inside `check`; calling `check` from it is a silent
    /// no-op (the non-reentrancy guard), and subscribing new streams from it
    /// is fine. It must not call `on_violation` itself: the handler slot
    /// stays borrowed while the callback runs.
    pub fn on_violation(&self, handler: impl Fn(&Violation) + 'static) {
        *self.handler.borrow_mut() = Some(Box::new(handler));
    }

    /// Snapshot of the active states.
    #[must_use]
    pub fn active_states(&self) -> Vec<Rc<MonitorState>> {
        self.states.borrow().iter().cloned().collect()
    }

    /// Number of active states.
    #[must_use]
    pub fn active_state_count(&self) -> usize {
        self.states.borrow().len()
    }

    /// Reports lost because a subscriber's buffer was full or closed.
    #[must_use]
    pub fn dropped_reports(&self) -> u64 {
        self.dropped_reports.get()
    }

    /// Advances every active state by one event.
    ///
    /// For each state: the event is buffered; the candidate is discarded if
    /// the event is not observable at its vertex, carried forward untouched
    /// while its buffer is below the global maximum transition depth, and
    /// otherwise matched: every outgoing transition
    /// of the vertex fires against the buffered window (see the module docs
    /// for the guard semantics), each firing contributing a state to the
    /// next active set and reporting a violation if its target is an error
    /// vertex. A vertex with no outgoing transitions sheds its oldest
    /// buffered event instead. The active set is then replaced wholesale.
    ///
    /// Called re-entrantly — from a violation callback — this is a silent
    /// no-op.
    ///
    /// # Panics
    ///
    /// If an engine invariant is broken (empty-buffer access that the depth
    /// precomputation should have made impossible). This is a bug in the
    /// engine, not a fault of the monitored program, and it fails fast.
    pub fn check(&self, event: Event) {
        if self.in_check.get() {
            trace!("re-entrant check ignored: {event}");
            return;
        }
        self.in_check.set(true);
        let outcome = self.step(event);
        self.in_check.set(false);
        if let Err(err) = outcome {
            panic!("monitor engine invariant violated: {err}");
        }
    }

    fn step(&self, event: Event) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("received {event}");
            for state in self.states.borrow().iter() {
                trace!(
                    "  active: vertex {}, {} buffered, {} bound, generation {}",
                    state.vertex(),
                    state.events().len(),
                    state.store().len(),
                    state.generation()
                );
            }
        }

        let current: Vec<Rc<MonitorState>> = self.states.borrow().iter().cloned().collect();
        let mut next: HashSet<Rc<MonitorState>> = HashSet::new();

        for state in current {
            let candidate = Rc::new(state.with_event(event.clone()));
            if !self.automaton.is_observable(event.id, candidate.vertex()) {
                trace!(
                    "vertex {}: kind {} not observable, state dropped",
                    candidate.vertex(),
                    event.id
                );
                continue;
            }
            if candidate.events().len() < self.automaton.maximum_transition_depth() {
                trace!(
                    "vertex {}: buffer {} below depth {}, waiting",
                    candidate.vertex(),
                    candidate.events().len(),
                    self.automaton.maximum_transition_depth()
                );
                next.insert(candidate);
                continue;
            }

            let outgoing = self.automaton.outgoing(candidate.vertex());
            for transition in outgoing {
                let mut store = candidate.store().clone();
                let mut events = candidate.events().clone();
                let mut consumed = Queue::empty();
                for step in &transition.steps {
                    let step_event = events.front()?.clone();
                    events = events.pop()?;
                    consumed = consumed.push(step_event.clone());
                    // A non-matching step withholds its action but does not
                    // abort the transition; see the module docs.
                    if step.matches(&step_event, &store) {
                        let mut priorities = self.priorities.borrow_mut();
                        store = step.action.apply(&step_event, &store, &mut priorities);
                    }
                }

                let fired = Rc::new(MonitorState::derived(
                    transition.target,
                    store,
                    events,
                    consumed,
                    &candidate,
                ));
                if let Some(message) = self.automaton.error_message(transition.target) {
                    self.report(&fired, message);
                }
                next.insert(fired);
            }

            if outgoing.is_empty() {
                // Nothing can ever match here; shed the oldest event so the
                // buffer stays bounded.
                next.insert(Rc::new(candidate.drop_oldest()?));
            }
        }

        *self.states.borrow_mut() = next;
        Ok(())
    }

    fn report(&self, state: &MonitorState, message: &str) {
        let violation = Violation {
            message: message.to_string(),
            vertex: state.vertex(),
            generation: state.generation(),
            witness: state.witness_trace(),
        };
        debug!(
            "violation at vertex {}: {} (generation {})",
            violation.vertex, violation.message, violation.generation
        );

        if let Some(handler) = self.handler.borrow().as_ref() {
            handler(&violation);
        }

        let subscribers: Vec<Sender<Violation>> = self.subscribers.borrow().clone();
        for tx in subscribers {
            match tx.try_send(violation.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                    self.dropped_reports.set(self.dropped_reports.get() + 1);
                    warn!("violation report dropped (subscriber full or gone)");
                }
            }
        }
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("automaton", &self.automaton)
            .field("active_states", &self.states.borrow().len())
            .field("in_check", &self.in_check.get())
            .field("dropped_reports", &self.dropped_reports.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::automaton::{Action, Assignment, AutomatonDef, Guard, Transition, TransitionStep};
    use crate::event::EventId;
    use crate::value::Value;

    fn ids(xs: &[u32]) -> BTreeSet<EventId> {
        xs.iter().map(|&i| EventId(i)).collect()
    }

    fn step(event_ids: &[u32], guard: Guard, action: Action) -> TransitionStep {
        TransitionStep::new(ids(event_ids), guard, action)
    }

    fn checker(def: AutomatonDef) -> Checker {
        Checker::new(Automaton::new(def).unwrap(), CheckerConfig::default())
    }

    /// Start vertex 0, one depth-1 transition on kind 1 to error vertex 1.
    fn error_def() -> AutomatonDef {
        AutomatonDef {
            start_vertices: vec![0],
            error_messages: vec![None, Some("M".to_string())],
            transitions: vec![vec![Transition::single(step(&[1], Guard::True, Action::none()), 1)], vec![]],
            vertex_filters: vec![0, 0],
            filters: vec![ids(&[1, 2])],
        }
    }

    #[test]
    fn test_starts_in_start_states() {
        let c = checker(error_def());
        assert_eq!(c.active_state_count(), 1);
        assert_eq!(c.active_states()[0].vertex(), 0);
    }

    #[test]
    fn test_error_transition_reports() {
        let c = checker(error_def());
        let reports = c.subscribe();
        c.check(Event::nullary(1u32));

        let violation = reports.try_recv().unwrap();
        assert_eq!(violation.message, "M");
        assert_eq!(violation.vertex, 1);
        assert_eq!(violation.generation, 1);
        assert_eq!(violation.witness, vec![vec![Event::nullary(1u32)]]);

        let states = c.active_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].vertex(), 1);
        assert_eq!(c.dropped_reports(), 0);
    }

    #[test]
    fn test_monitoring_continues_after_violation() {
        // Error vertex 1 loops back to itself on kind 2.
        let mut def = error_def();
        def.transitions[1] = vec![Transition::single(step(&[2], Guard::True, Action::none()), 1)];
        let c = checker(def);
        let reports = c.subscribe();
        c.check(Event::nullary(1u32));
        c.check(Event::nullary(2u32));
        assert!(reports.try_recv().is_some());
        assert!(reports.try_recv().is_some());
        assert_eq!(c.active_state_count(), 1);
    }

    #[test]
    fn test_guard_failure_does_not_abort_transition() {
        // The single step's guard can never hold, yet the transition fires.
        let guard = Guard::ConstantEq {
            field: 0,
            literal: Value::Int(99),
        };
        let action = Action::new(vec![Assignment {
            variable: 0,
            field: 0,
        }]);
        let mut def = error_def();
        def.transitions[0] = vec![Transition::single(step(&[1], guard, action), 1)];
        let c = checker(def);
        c.check(Event::new(1u32, vec![Value::Int(1)]));

        let states = c.active_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].vertex(), 1);
        // The withheld action left the store empty.
        assert!(states[0].store().is_empty());
    }

    #[test]
    fn test_action_binds_on_matching_step() {
        let action = Action::new(vec![Assignment {
            variable: 3,
            field: 0,
        }]);
        let mut def = error_def();
        def.transitions[0] = vec![Transition::single(step(&[1], Guard::True, action), 1)];
        let c = checker(def);
        c.check(Event::new(1u32, vec![Value::Int(42)]));
        let states = c.active_states();
        assert_eq!(states[0].store().get(3), Some(&Value::Int(42)));
    }

    #[test]
    fn test_unobservable_event_drops_state() {
        let c = checker(error_def());
        // Kind 7 is outside the filter group of vertex 0.
        c.check(Event::nullary(7u32));
        assert_eq!(c.active_state_count(), 0);
    }

    #[test]
    fn test_shallow_buffer_waits_for_window() {
        // A depth-2 transition raises the global maximum; the first event
        // is buffered and the state waits for the window to fill.
        let mut def = error_def();
        def.transitions[0].push(Transition::new(
            vec![
                step(&[1], Guard::True, Action::none()),
                step(&[2], Guard::True, Action::none()),
            ],
            0,
        ));
        let c = checker(def);
        c.check(Event::nullary(1u32));
        let states = c.active_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].vertex(), 0);
        assert_eq!(states[0].events().len(), 1);
    }

    #[test]
    fn test_vertex_without_transitions_sheds_oldest() {
        let def = AutomatonDef {
            start_vertices: vec![0],
            error_messages: vec![None],
            transitions: vec![vec![]],
            vertex_filters: vec![0],
            filters: vec![ids(&[1])],
        };
        let c = checker(def);
        for _ in 0..5 {
            c.check(Event::nullary(1u32));
            assert_eq!(c.active_state_count(), 1);
            // Buffer returns to its entry size each round; never grows.
            assert!(c.active_states()[0].events().is_empty());
        }
    }

    #[test]
    fn test_reentrant_check_is_noop() {
        let c = Rc::new(checker(error_def()));
        let inner = Rc::clone(&c);
        c.on_violation(move |_| {
            // Attempted re-entry from the report callback.
            inner.check(Event::nullary(2u32));
        });
        c.check(Event::nullary(1u32));
        let states = c.active_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].vertex(), 1);
        // The nested call changed nothing: one event consumed in total.
        assert_eq!(states[0].generation(), 1);
    }

    #[test]
    fn test_subscribe_from_callback_is_safe() {
        // Error vertex 1 loops back to itself on kind 2, so a second
        // violation follows the first.
        let mut def = error_def();
        def.transitions[1] = vec![Transition::single(step(&[2], Guard::True, Action::none()), 1)];
        let c = Rc::new(checker(def));
        let inner = Rc::clone(&c);
        let late: Rc<RefCell<Option<ReportStream>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&late);
        c.on_violation(move |_| {
            if slot.borrow().is_none() {
                *slot.borrow_mut() = Some(inner.subscribe());
            }
        });

        c.check(Event::nullary(1u32));
        c.check(Event::nullary(2u32));

        let stream = late.borrow_mut().take().unwrap();
        assert!(stream.try_recv().is_some());
    }

    #[test]
    fn test_convergent_paths_merge() {
        // Two identical transitions produce one deduplicated state.
        let mut def = error_def();
        let t = def.transitions[0][0].clone();
        def.transitions[0].push(t);
        let c = checker(def);
        c.check(Event::nullary(1u32));
        assert_eq!(c.active_state_count(), 1);
    }

    #[test]
    fn test_dropped_reports_counted() {
        let c = Checker::new(
            Automaton::new(error_def()).unwrap(),
            CheckerConfig {
                report_capacity: 1,
                ..CheckerConfig::default()
            },
        );
        // A subscriber that went away turns sends into drops.
        let reports = c.subscribe();
        drop(reports);
        c.check(Event::nullary(1u32));
        assert_eq!(c.dropped_reports(), 1);
    }
}
