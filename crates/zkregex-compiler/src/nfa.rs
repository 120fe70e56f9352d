//! Thompson construction
//!
//! States live in an arena and edges name their target by index, so the
//! cycles introduced by `*` need no shared ownership.

use crate::{AstKind, AstNode, Symbol};

/// Role of an automaton state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Start,
    Normal,
    Accept,
}

/// Outgoing edge; `symbol == None` is an epsilon edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfaEdge {
    pub symbol: Option<Symbol>,
    pub target: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfaState {
    pub edges: Vec<NfaEdge>,
}

/// Nondeterministic automaton with a single start and a single accept state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    pub states: Vec<NfaState>,
    pub start: usize,
    pub accept: usize,
}

impl Nfa {
    /// Lowers an AST with the four classical construction rules
    pub fn from_ast(ast: &AstNode) -> Nfa {
        let mut nfa = Nfa { states: Vec::new(), start: 0, accept: 0 };
        nfa.start = nfa.add_state();
        nfa.accept = nfa.add_state();
        nfa.build(ast, nfa.start, nfa.accept);
        log::debug!("nfa: {} states from {} ast nodes", nfa.states.len(), ast.size());
        nfa
    }

    pub fn role(&self, state: usize) -> Role {
        if state == self.start {
            Role::Start
        } else if state == self.accept {
            Role::Accept
        } else {
            Role::Normal
        }
    }

    fn add_state(&mut self) -> usize {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    fn connect(&mut self, from: usize, symbol: Option<Symbol>, target: usize) {
        self.states[from].edges.push(NfaEdge { symbol, target });
    }

    fn build(&mut self, node: &AstNode, start: usize, end: usize) {
        match &node.kind {
            AstKind::Empty => self.connect(start, None, end),
            AstKind::Text(symbol) => self.connect(start, Some(*symbol), end),
            AstKind::Cat(parts) => {
                let mut from = start;
                for (i, part) in parts.iter().enumerate() {
                    let to = if i + 1 == parts.len() { end } else { self.add_state() };
                    self.build(part, from, to);
                    from = to;
                }
            }
            AstKind::Or(alternatives) => {
                for alternative in alternatives {
                    let sub_start = self.add_state();
                    let sub_end = self.add_state();
                    self.connect(start, None, sub_start);
                    self.build(alternative, sub_start, sub_end);
                    self.connect(sub_end, None, end);
                }
            }
            AstKind::Star(inner) => {
                let sub_start = self.add_state();
                let sub_end = self.add_state();
                self.connect(start, None, sub_start);
                self.connect(start, None, end);
                self.build(inner, sub_start, sub_end);
                self.connect(sub_end, None, sub_start);
                self.connect(sub_end, None, end);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn nfa(pattern: &[u8]) -> Nfa {
        Nfa::from_ast(&parse(pattern).unwrap())
    }

    #[test]
    fn test_text_is_single_edge() {
        let nfa = nfa(b"a");
        assert_eq!(nfa.states.len(), 2);
        assert_eq!(
            nfa.states[nfa.start].edges,
            vec![NfaEdge { symbol: Some(Symbol::Byte(b'a')), target: nfa.accept }]
        );
        assert_eq!(nfa.role(nfa.accept), Role::Accept);
    }

    #[test]
    fn test_cat_chains_through_intermediate() {
        let nfa = nfa(b"ab");
        assert_eq!(nfa.states.len(), 3);
        let mid = nfa.states[nfa.start].edges[0].target;
        assert_eq!(nfa.role(mid), Role::Normal);
        assert_eq!(nfa.states[mid].edges[0].target, nfa.accept);
    }

    #[test]
    fn test_star_edges() {
        let nfa = nfa(b"a*");
        let start_edges = &nfa.states[nfa.start].edges;
        assert_eq!(start_edges.len(), 2);
        assert!(start_edges.iter().all(|e| e.symbol.is_none()));
        assert!(start_edges.iter().any(|e| e.target == nfa.accept));

        let sub_start = start_edges[0].target;
        let sub_end = nfa.states[sub_start].edges[0].target;
        let back: Vec<usize> = nfa.states[sub_end].edges.iter().map(|e| e.target).collect();
        assert_eq!(back, vec![sub_start, nfa.accept]);
    }

    #[test]
    fn test_or_fans_out_and_in() {
        let nfa = nfa(b"a|b|c");
        assert_eq!(nfa.states[nfa.start].edges.len(), 3);
        let into_accept = nfa
            .states
            .iter()
            .flat_map(|s| s.edges.iter())
            .filter(|e| e.target == nfa.accept && e.symbol.is_none())
            .count();
        assert_eq!(into_accept, 3);
    }
}
