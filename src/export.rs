//! Graphviz export for debugging.
//!
//! Renders an automaton as a DOT digraph: ordinary vertices as circles,
//! start vertices as double circles, error vertices as boxes carrying their
//! message, and one labeled edge per transition. The label concatenates each
//! step's event-id set, guard, and assignment list. Export-only; nothing
//! reads this format back in.

use std::fmt::Write as _;

use crate::automaton::Automaton;

impl Automaton {
    /// Renders this automaton as a Graphviz DOT digraph.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph Property {\n");

        for vertex in 0..self.vertex_count() {
            match self.error_message(vertex) {
                Some(message) => {
                    let _ = writeln!(
                        out,
                        "  S_{vertex} [label=\"{vertex} : {message}\", shape=box];"
                    );
                }
                None => {
                    let _ = writeln!(out, "  S_{vertex} [label=\"{vertex}\", shape=circle];");
                }
            }
        }

        for &vertex in self.start_vertices() {
            let _ = writeln!(out, "  S_{vertex} [shape=doublecircle];");
        }

        for vertex in 0..self.vertex_count() {
            for transition in self.outgoing(vertex) {
                let mut label = String::new();
                for (i, step) in transition.steps.iter().enumerate() {
                    if i > 0 {
                        label.push_str("; ");
                    }
                    let _ = write!(label, "{step}");
                }
                let _ = writeln!(
                    out,
                    "  S_{vertex} -> S_{} [label=\"{label}\"];",
                    transition.target
                );
            }
        }

        out.push_str("}\n");
        out
    }
}
