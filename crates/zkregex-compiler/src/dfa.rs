//! Subset construction
//!
//! Converts an NFA into a DFA whose states are epsilon-closures of NFA states.
//! Closures are discovered breadth first and named in bijective base 26
//! (`A`..`Z`, `AA`, `AB`, ...) in discovery order, so the same pattern always
//! yields the same names.

use crate::{Label, Nfa, Role, Symbol};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Name of the `index`-th discovered state: `A`, ..., `Z`, `AA`, ...
///
/// # Examples
///
/// ```
/// use zkregex_compiler::alpha_id;
///
/// assert_eq!(alpha_id(0), "A");
/// assert_eq!(alpha_id(25), "Z");
/// assert_eq!(alpha_id(26), "AA");
/// assert_eq!(alpha_id(52), "BA");
/// ```
pub fn alpha_id(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A set of NFA states reachable from each other through epsilon edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    /// Member NFA states, ascending
    pub members: Vec<usize>,
    pub accept: bool,
    /// Non-epsilon symbols leaving the closure, ascending
    pub alphabet: Vec<Symbol>,
}

impl Closure {
    /// Canonical comma-joined id set
    pub fn key(&self) -> String {
        self.members.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(",")
    }
}

/// Stack-based traversal along epsilon edges only
pub fn epsilon_closure(nfa: &Nfa, seeds: impl IntoIterator<Item = usize>) -> Closure {
    let mut visited = BTreeSet::new();
    let mut stack: Vec<usize> = Vec::new();
    for seed in seeds {
        if visited.insert(seed) {
            stack.push(seed);
        }
    }
    while let Some(state) = stack.pop() {
        for edge in &nfa.states[state].edges {
            if edge.symbol.is_none() && visited.insert(edge.target) {
                stack.push(edge.target);
            }
        }
    }

    let alphabet: BTreeSet<Symbol> = visited
        .iter()
        .flat_map(|s| nfa.states[*s].edges.iter().filter_map(|e| e.symbol))
        .collect();
    let accept = visited.iter().any(|s| nfa.role(*s) == Role::Accept);

    Closure { members: visited.into_iter().collect(), accept, alphabet: alphabet.into_iter().collect() }
}

/// One step along edges labelled `symbol`, followed by the epsilon-closure
pub fn closed_move(nfa: &Nfa, closure: &Closure, symbol: Symbol) -> Closure {
    let targets = closure.members.iter().flat_map(|s| {
        nfa.states[*s].edges.iter().filter(|e| e.symbol == Some(symbol)).map(|e| e.target)
    });
    epsilon_closure(nfa, targets)
}

/// Deterministic automaton state
///
/// `members` are the states of the automaton this one was built from: NFA
/// states for a subset DFA, DFA states for a minimized one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaState {
    pub name: String,
    pub members: Vec<usize>,
    pub accept: bool,
    /// Outgoing edges sorted by label; at most one edge per target
    pub edges: Vec<(Label, usize)>,
}

impl DfaState {
    pub fn target(&self, label: &Label) -> Option<usize> {
        self.edges.iter().find(|(l, _)| l == label).map(|(_, t)| *t)
    }
}

/// Deterministic automaton; state 0 is the start state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    pub states: Vec<DfaState>,
}

impl Dfa {
    /// Breadth-first subset construction
    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        let start = epsilon_closure(nfa, [nfa.start]);
        let mut index: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut closures = vec![start.clone()];
        let mut edges: Vec<Vec<(Label, usize)>> = Vec::new();
        index.insert(start.members, 0);

        let mut queue = VecDeque::from([0usize]);
        while let Some(current) = queue.pop_front() {
            let closure = closures[current].clone();
            let mut out = Vec::with_capacity(closure.alphabet.len());
            for symbol in &closure.alphabet {
                let next = closed_move(nfa, &closure, *symbol);
                let target = match index.get(&next.members) {
                    Some(existing) => *existing,
                    None => {
                        let id = closures.len();
                        index.insert(next.members.clone(), id);
                        closures.push(next);
                        queue.push_back(id);
                        id
                    }
                };
                out.push((Label::symbol(*symbol), target));
            }
            edges.push(out);
        }

        let states: Vec<DfaState> = closures
            .into_iter()
            .zip(edges)
            .enumerate()
            .map(|(i, (closure, edges))| DfaState {
                name: alpha_id(i),
                members: closure.members,
                accept: closure.accept,
                edges,
            })
            .collect();

        log::debug!("dfa: {} states from {} nfa states", states.len(), nfa.states.len());
        Dfa { states }
    }

    pub fn accept_states(&self) -> Vec<usize> {
        (0..self.states.len()).filter(|i| self.states[*i].accept).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.states.iter().map(|s| s.edges.len()).sum()
    }

    /// Runs the automaton over `input` from the start state
    ///
    /// Negation markers are treated as ordinary symbols here, so this is the
    /// language of the marked pattern, not of the compiled circuit.
    pub fn accepts(&self, input: &[Symbol]) -> bool {
        let mut state = 0;
        for symbol in input {
            let next = self.states[state]
                .edges
                .iter()
                .find(|(label, _)| label.symbols().any(|s| s == *symbol));
            match next {
                Some((_, target)) => state = *target,
                None => return false,
            }
        }
        self.states[state].accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn dfa(pattern: &[u8]) -> Dfa {
        Dfa::from_nfa(&Nfa::from_ast(&parse(pattern).unwrap()))
    }

    fn bytes(text: &[u8]) -> Vec<Symbol> {
        text.iter().map(|b| Symbol::Byte(*b)).collect()
    }

    #[test]
    fn test_alpha_ids_roll_over() {
        assert_eq!(alpha_id(701), "ZZ");
        assert_eq!(alpha_id(702), "AAA");
    }

    #[test]
    fn test_names_follow_discovery_order() {
        let dfa = dfa(b"ab|b");
        let names: Vec<&str> = dfa.states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        // `a` is explored before `b` from the start closure
        assert_eq!(dfa.states[0].edges[0].0, Label::symbol(Symbol::Byte(b'a')));
        assert_eq!(dfa.states[0].edges[0].1, 1);
    }

    #[test]
    fn test_closure_key_is_sorted() {
        let nfa = Nfa::from_ast(&parse(b"a*").unwrap());
        let closure = epsilon_closure(&nfa, [nfa.start]);
        let mut sorted = closure.members.clone();
        sorted.sort_unstable();
        assert_eq!(closure.members, sorted);
        assert!(closure.accept);
        assert_eq!(closure.key().split(',').count(), closure.members.len());
    }

    #[test]
    fn test_language_preserved() {
        let dfa = dfa(b"1=(a|b) (2=(b|c)+ )+d");
        assert!(dfa.accepts(&bytes(b"1=a 2=b d")));
        assert!(dfa.accepts(&bytes(b"1=b 2=bbccccc d")));
        assert!(!dfa.accepts(&bytes(b"1=a 2=bd")));
        assert!(!dfa.accepts(&bytes(b"2=bc")));
    }

    #[test]
    fn test_deterministic_edges() {
        let dfa = dfa(b"(a|b)*abb(a|b)*");
        for state in &dfa.states {
            let labels: BTreeSet<Label> = state.edges.iter().map(|(l, _)| *l).collect();
            assert_eq!(labels.len(), state.edges.len());
        }
    }
}
