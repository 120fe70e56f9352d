//! Automaton lowering and edge indexing
//!
//! Inverts the minimal automaton into per-state incoming tables, checks the
//! accept-state invariants the circuit relies on, and resolves what each
//! negated edge actually matches.

use crate::{CompilerError, Dfa, Label, Result};
use std::collections::BTreeMap;
use zkregex_runtime::{AnchorTransition, ByteSet};

/// Minimal automaton in the shape the circuit compiler consumes
///
/// State 0 is the idle state: it is active exactly when no match attempt is in
/// progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredAutomaton {
    pub state_count: usize,
    pub accept_state: usize,
    /// `incoming[to][from]` is the label of the edge `from -> to`
    pub incoming: Vec<BTreeMap<usize, Label>>,
    /// Explicit bytes on all outgoing labels of each state
    pub exclusions: Vec<ByteSet>,
    /// Negated edges leaving the idle state
    pub anchors: Vec<AnchorTransition>,
    /// Bytes on which the idle state takes no transition
    pub idle_loop: ByteSet,
}

impl LoweredAutomaton {
    pub fn from_dfa(dfa: &Dfa) -> Result<Self> {
        let accepting = dfa.accept_states();
        let accept_state = match accepting.as_slice() {
            [single] => *single,
            [] => {
                return Err(CompilerError::StructuralInvariant(
                    "automaton has no accept state".to_string(),
                ))
            }
            many => {
                return Err(CompilerError::StructuralInvariant(format!(
                    "automaton has {} accept states {:?}, expected exactly one",
                    many.len(),
                    many
                )))
            }
        };
        if accept_state == 0 {
            return Err(CompilerError::StructuralInvariant(
                "accept state coincides with the idle state 0 (pattern matches the empty string)"
                    .to_string(),
            ));
        }

        let state_count = dfa.states.len();
        let mut incoming = vec![BTreeMap::new(); state_count];
        let mut exclusions = vec![ByteSet::EMPTY; state_count];
        for (from, state) in dfa.states.iter().enumerate() {
            for (label, to) in &state.edges {
                incoming[*to].insert(from, *label);
                exclusions[from] = exclusions[from].union(label.bytes());
            }
        }

        let mut lowered = LoweredAutomaton {
            state_count,
            accept_state,
            incoming,
            exclusions,
            anchors: Vec::new(),
            idle_loop: ByteSet::EMPTY,
        };

        let mut leaves_idle = ByteSet::EMPTY;
        for (label, target) in &dfa.states[0].edges {
            leaves_idle = leaves_idle.union(&lowered.matched_bytes(0, label));
            if label.is_negated() {
                lowered.anchors.push(AnchorTransition { target: *target });
            }
        }
        lowered.idle_loop = leaves_idle.complement();

        log::debug!(
            "lowered: {} states, accept {}, {} anchor edges",
            state_count,
            accept_state,
            lowered.anchors.len()
        );
        Ok(lowered)
    }

    /// Bytes the edge `from --label-->` consumes
    ///
    /// A negated label matches everything outside the exclusion set of `from`,
    /// so it rejects its own members and every byte a sibling edge takes.
    pub fn matched_bytes(&self, from: usize, label: &Label) -> ByteSet {
        if label.is_negated() {
            self.exclusions[from].complement()
        } else {
            *label.bytes()
        }
    }

    /// Predecessors of `to` in ascending order
    pub fn predecessors(&self, to: usize) -> impl Iterator<Item = (usize, &Label)> + '_ {
        self.incoming[to].iter().map(|(from, label)| (*from, label))
    }

    /// Two states, with the accept state entered only from the idle state and
    /// from itself
    ///
    /// This is a shape heuristic for "the pattern is one repeated unit"; other
    /// two-state automata with the same shape are classified the same way.
    pub fn is_single_repeat(&self) -> bool {
        self.state_count == 2
            && self.incoming[self.accept_state].keys().copied().eq([0, self.accept_state])
    }

    /// Edges whose label equals `label`, ordered by target then source
    pub fn edges_labelled(&self, label: &Label) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for to in 0..self.state_count {
            for (from, candidate) in self.predecessors(to) {
                if candidate == label {
                    edges.push((from, to));
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimal_dfa;

    fn lower(pattern: &str) -> Result<LoweredAutomaton> {
        LoweredAutomaton::from_dfa(&minimal_dfa(pattern)?)
    }

    #[test]
    fn test_incoming_tables() {
        let lowered = lower("a(b|c)*").unwrap();
        assert_eq!(lowered.state_count, 2);
        assert_eq!(lowered.accept_state, 1);
        let preds: Vec<usize> = lowered.predecessors(1).map(|(f, _)| f).collect();
        assert_eq!(preds, vec![0, 1]);
        assert!(lowered.incoming[0].is_empty());
    }

    #[test]
    fn test_accept_invariants() {
        assert!(matches!(lower("a*"), Err(CompilerError::StructuralInvariant(_))));
        assert!(matches!(lower("a|ab"), Err(CompilerError::StructuralInvariant(_))));
        assert!(lower("ab|b").is_ok());
    }

    #[test]
    fn test_negated_class_excludes_siblings() {
        let lowered = lower("a:[^a-z]+.").unwrap();
        let (from, label) = lowered.predecessors(1).find(|(f, _)| *f == 1).unwrap();
        let matched = lowered.matched_bytes(from, label);
        assert!(!matched.contains(b'q'));
        assert!(!matched.contains(b'.'));
        assert!(matched.contains(b'X'));
        assert!(matched.contains(0));
        assert_eq!(matched.len(), 256 - 26 - 1);
    }

    #[test]
    fn test_anchor_annotation() {
        let lowered = lower("[^aeiou]+").unwrap();
        assert_eq!(lowered.anchors, vec![AnchorTransition { target: 1 }]);
        let vowels: ByteSet = b"aeiou".iter().copied().collect();
        assert_eq!(lowered.idle_loop, vowels);
    }

    #[test]
    fn test_plain_pattern_has_no_anchor() {
        let lowered = lower("abc").unwrap();
        assert!(lowered.anchors.is_empty());
        assert_eq!(lowered.idle_loop, ByteSet::singleton(b'a').complement());
    }

    #[test]
    fn test_single_repeat_heuristic() {
        assert!(lower("[^aeiou]+").unwrap().is_single_repeat());
        assert!(lower("[a-z]+").unwrap().is_single_repeat());
        assert!(!lower("ab").unwrap().is_single_repeat());
        assert!(!lower("a").unwrap().is_single_repeat());
    }

    #[test]
    fn test_edges_labelled() {
        let lowered = lower("1=(a|b) (2=(b|c)+ )+d").unwrap();
        assert_eq!(lowered.edges_labelled(&Label::parse_key("=").unwrap()), vec![(1, 2), (5, 6)]);
        assert_eq!(lowered.edges_labelled(&Label::parse_key("2").unwrap()), vec![(4, 5), (8, 5)]);
        assert!(lowered.edges_labelled(&Label::parse_key("a,c").unwrap()).is_empty());
    }
}
