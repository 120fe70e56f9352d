//! Substring reveal
//!
//! A reveal discloses the input bytes consumed by a chosen set of edges, but
//! only inside a run that goes on to reach the accept state. The step runs
//! backward over the input and carries "a match completes at or after this
//! position" from one byte to the previous one:
//!
//! ```text
//! carry[N]     = 1
//! reach[b]     = state[b + 1][accept] OR carry[b + 1]
//! carry[b]     = state_changed[b] AND reach[b]
//! on_edge[b]   = OR over (f, t) of state[b][f] AND state[b + 1][t]
//! reveal[b]    = input[b] * (on_edge[b] AND carry[b])
//! ```

use super::CodegenContext;
use crate::{minimal_dfa, CompilerError, Label, LoweredAutomaton, Result};
use std::collections::BTreeSet;
use zkregex_runtime::{Op, Operand, RevealProgram};

/// Builds the backward step revealing bytes consumed on `edges`
pub fn compile_reveal(
    automaton: &LoweredAutomaton,
    name: &str,
    edges: &[(usize, usize)],
) -> Result<RevealProgram> {
    if edges.is_empty() {
        return Err(CompilerError::InvalidReveal(format!("reveal '{}' has no edges", name)));
    }
    for (from, to) in edges {
        if *from >= automaton.state_count || *to >= automaton.state_count {
            return Err(CompilerError::InvalidReveal(format!(
                "reveal '{}' edge ({}, {}) is outside the {}-state automaton",
                name, from, to, automaton.state_count
            )));
        }
    }

    let mut ctx = CodegenContext::new();
    let reach = ctx.any(vec![Operand::NextState(automaton.accept_state), Operand::Carry]);
    let carry = ctx.all(vec![Operand::Changed, reach]);
    ctx.store(Op::StoreCarry(carry));

    let mut taken = Vec::with_capacity(edges.len());
    for (from, to) in edges {
        taken.push(ctx.all(vec![Operand::State(*from), Operand::NextState(*to)]));
    }
    let on_edge = ctx.any(taken);
    let mask = ctx.all(vec![on_edge, carry]);
    ctx.store(Op::Reveal(mask));

    Ok(RevealProgram { name: name.to_string(), edges: edges.to_vec(), step: ctx.into_ops() })
}

/// Edges of `automaton` whose labels occur in the sub-pattern `sub`
///
/// `sub` must appear verbatim in `pattern`. Its own minimal automaton supplies
/// the labels to look for; the result lists the edges of each label in order
/// of first appearance, each label's edges ordered by target then source.
///
/// Labels are matched independently, so a sub-pattern whose labels also occur
/// elsewhere in the pattern reveals those occurrences too.
pub fn substring_edges(
    pattern: &str,
    sub: &str,
    automaton: &LoweredAutomaton,
) -> Result<Vec<(usize, usize)>> {
    if sub.is_empty() || !pattern.contains(sub) {
        return Err(CompilerError::SubPatternNotFound(sub.to_string()));
    }

    let sub_dfa = minimal_dfa(sub)?;
    let mut labels: Vec<Label> = Vec::new();
    for state in &sub_dfa.states {
        for (label, _) in &state.edges {
            if !labels.contains(label) {
                labels.push(*label);
            }
        }
    }

    let mut edges = Vec::new();
    for label in &labels {
        for edge in automaton.edges_labelled(label) {
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }
    if edges.is_empty() {
        return Err(CompilerError::SubPatternNotFound(sub.to_string()));
    }

    let origins: BTreeSet<usize> = edges.iter().map(|(from, _)| *from).collect();
    if labels.len() == 1 && origins.len() > 1 {
        log::warn!(
            "sub-pattern {:?} labels edges from {} different states; every occurrence will be revealed",
            sub,
            origins.len()
        );
    }
    log::debug!("sub-pattern {:?}: {} labels, edges {:?}", sub, labels.len(), edges);

    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(pattern: &str) -> LoweredAutomaton {
        LoweredAutomaton::from_dfa(&minimal_dfa(pattern).unwrap()).unwrap()
    }

    #[test]
    fn test_reveal_step_layout() {
        let automaton = lower("ab");
        let program = compile_reveal(&automaton, "b", &[(1, 2)]).unwrap();
        assert_eq!(
            program.step,
            vec![
                Op::Or(vec![Operand::NextState(2), Operand::Carry]),
                Op::And(vec![Operand::Changed, Operand::Node(0)]),
                Op::StoreCarry(Operand::Node(1)),
                Op::And(vec![Operand::State(1), Operand::NextState(2)]),
                Op::And(vec![Operand::Node(3), Operand::Node(1)]),
                Op::Reveal(Operand::Node(4)),
            ]
        );
    }

    #[test]
    fn test_reveal_rejects_bad_edges() {
        let automaton = lower("ab");
        assert!(matches!(
            compile_reveal(&automaton, "x", &[]),
            Err(CompilerError::InvalidReveal(_))
        ));
        assert!(matches!(
            compile_reveal(&automaton, "x", &[(0, 9)]),
            Err(CompilerError::InvalidReveal(_))
        ));
    }

    #[test]
    fn test_multi_label_sub_pattern_order() {
        let automaton = lower("(mina|MINA)+");
        assert_eq!(
            substring_edges("(mina|MINA)+", "mina", &automaton).unwrap(),
            vec![(0, 2), (7, 2), (2, 4), (4, 6), (6, 7)]
        );
    }

    #[test]
    fn test_sub_pattern_must_occur() {
        let pattern = "1=(a|b) (2=(b|c)+ )+d";
        let automaton = lower(pattern);
        assert!(matches!(
            substring_edges(pattern, "(a|c)", &automaton),
            Err(CompilerError::SubPatternNotFound(_))
        ));
        assert!(matches!(
            substring_edges(pattern, "", &automaton),
            Err(CompilerError::SubPatternNotFound(_))
        ));
    }
}
