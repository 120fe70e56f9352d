//! Backend-agnostic circuit program
//!
//! A compiled pattern is a fixed list of primitive operations executed once per
//! input byte. Every byte position runs the same list, so a renderer can unroll
//! it into any constraint system without data-dependent branching.

use crate::{ByteSet, Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of an operation inside a step; the operation's result is node `id`
pub type NodeId = usize;

/// A value an operation can read at byte position `t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// `state[t][i]`
    State(usize),
    /// `state[t + 1][i]`, only readable from reveal steps
    NextState(usize),
    /// `state_changed[t]`, only readable from reveal steps
    Changed,
    /// Value stored by `StoreCarry` at position `t + 1`, only readable from reveal steps
    Carry,
    /// Result of an earlier operation in the same step
    Node(NodeId),
    Const(bool),
}

/// Primitive operation
///
/// Comparisons test the byte consumed at position `t`; no operand names it. Boolean operations take any number of operands;
/// renderers fold them pairwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    IsEqual { code: u8 },
    AtLeast { bound: u8 },
    AtMost { bound: u8 },
    And(Vec<Operand>),
    Or(Vec<Operand>),
    Not(Operand),
    StoreState { state: usize, value: Operand },
    StoreChanged(Operand),
    StoreCarry(Operand),
    /// Emits `input * mask` as the revealed byte at this position
    Reveal(Operand),
}

impl Op {
    /// Whether other operations may reference this one as a `Node`
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Op::IsEqual { .. }
                | Op::AtLeast { .. }
                | Op::AtMost { .. }
                | Op::And(_)
                | Op::Or(_)
                | Op::Not(_)
        )
    }

    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Op::IsEqual { .. } | Op::AtLeast { .. } | Op::AtMost { .. } => Vec::new(),
            Op::And(ops) | Op::Or(ops) => ops.clone(),
            Op::Not(op)
            | Op::StoreState { value: op, .. }
            | Op::StoreChanged(op)
            | Op::StoreCarry(op)
            | Op::Reveal(op) => vec![*op],
        }
    }
}

/// How per-position accept signals are aggregated into the public verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// Sum of `state[t][accept]` over `t` in `0..=N`
    Count,
    /// OR of `state[t][accept]` over `t` in `0..=N`
    Exists,
    /// AND of `state[t][accept]` over `t` in `1..=N`
    Universal,
}

/// Transition program executed forward over the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitProgram {
    pub state_count: usize,
    pub accept_state: usize,
    pub acceptance: Acceptance,
    /// Operations computing `state[t + 1]` from `state[t]` and `input[t]`
    pub step: Vec<Op>,
    pub reveals: Vec<RevealProgram>,
}

/// Masked disclosure of the bytes matched by one sub-pattern
///
/// The step runs backward from the last byte; `Carry` reads the value the
/// previous iteration stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealProgram {
    pub name: String,
    pub edges: Vec<(usize, usize)>,
    pub step: Vec<Op>,
}

/// Which operands a step may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Transition,
    Reveal,
}

impl CircuitProgram {
    /// Checks operand references and store discipline of every step
    ///
    /// The transition step must store each state exactly once and
    /// `state_changed` exactly once; a reveal step must store its carry and its
    /// reveal exactly once.
    pub fn validate(&self) -> Result<()> {
        if self.state_count < 2 {
            return Err(RuntimeError::malformed(format!(
                "expected at least 2 states, got {}",
                self.state_count
            )));
        }
        if self.accept_state == 0 || self.accept_state >= self.state_count {
            return Err(RuntimeError::malformed(format!(
                "accept state {} out of range 1..{}",
                self.accept_state, self.state_count
            )));
        }

        self.check_step(&self.step, StepKind::Transition, "transition")?;

        let mut stored = vec![0usize; self.state_count];
        let mut changed = 0;
        for op in &self.step {
            match op {
                Op::StoreState { state, .. } => stored[*state] += 1,
                Op::StoreChanged(_) => changed += 1,
                Op::StoreCarry(_) | Op::Reveal(_) => {
                    return Err(RuntimeError::malformed("reveal store in transition step"));
                }
                _ => {}
            }
        }
        if let Some(state) = stored.iter().position(|count| *count != 1) {
            return Err(RuntimeError::malformed(format!(
                "state {} stored {} times in transition step",
                state, stored[state]
            )));
        }
        if changed != 1 {
            return Err(RuntimeError::malformed("state_changed must be stored exactly once"));
        }

        for reveal in &self.reveals {
            self.check_step(&reveal.step, StepKind::Reveal, &reveal.name)?;
            let carries = reveal.step.iter().filter(|op| matches!(op, Op::StoreCarry(_))).count();
            let outputs = reveal.step.iter().filter(|op| matches!(op, Op::Reveal(_))).count();
            if carries != 1 || outputs != 1 {
                return Err(RuntimeError::malformed(format!(
                    "reveal '{}' must store one carry and one reveal",
                    reveal.name
                )));
            }
            if reveal.step.iter().any(|op| matches!(op, Op::StoreState { .. } | Op::StoreChanged(_)))
            {
                return Err(RuntimeError::malformed(format!(
                    "reveal '{}' writes transition state",
                    reveal.name
                )));
            }
            for (from, to) in &reveal.edges {
                if *from >= self.state_count || *to >= self.state_count {
                    return Err(RuntimeError::malformed(format!(
                        "reveal '{}' edge ({}, {}) out of range",
                        reveal.name, from, to
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_step(&self, step: &[Op], kind: StepKind, name: &str) -> Result<()> {
        for (id, op) in step.iter().enumerate() {
            if let Op::StoreState { state, .. } = op {
                if *state >= self.state_count {
                    return Err(RuntimeError::malformed(format!(
                        "{}: node {} stores unknown state {}",
                        name, id, state
                    )));
                }
            }
            for operand in op.operands() {
                let allowed = match operand {
                    Operand::Const(_) => true,
                    Operand::State(i) => i < self.state_count,
                    Operand::NextState(i) => kind == StepKind::Reveal && i < self.state_count,
                    Operand::Changed | Operand::Carry => kind == StepKind::Reveal,
                    Operand::Node(target) => target < id && step[target].is_value(),
                };
                if !allowed {
                    return Err(RuntimeError::malformed(format!(
                        "{}: node {} cannot read {:?}",
                        name, id, operand
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Role of a state in the exported automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Accept,
    Normal,
}

/// Serializable form of one minimal-automaton state
///
/// Keys of `transition` are comma-joined label symbols; values are target
/// state indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTransition {
    #[serde(rename = "type")]
    pub kind: StateKind,
    pub transition: BTreeMap<String, usize>,
}

/// A negated-class edge leaving the idle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTransition {
    pub target: usize,
}

/// Facts about a compiled program that renderers size themselves from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub state_count: usize,
    pub accept_state: usize,
    /// Inclusive byte ranges tested with a pair of inequalities
    pub ranges: Vec<(u8, u8)>,
    /// Byte codes tested with an equality
    pub equalities: Vec<u8>,
    pub step_ops: usize,
    pub anchors: Vec<AnchorTransition>,
    /// Bytes on which the idle state stays idle
    pub idle_loop: ByteSet,
}

/// Output of a compilation: the program plus everything needed to inspect it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub pattern: String,
    pub program: CircuitProgram,
    pub graph: Vec<GraphTransition>,
    pub metadata: ArtifactMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_byte_program() -> CircuitProgram {
        CircuitProgram {
            state_count: 2,
            accept_state: 1,
            acceptance: Acceptance::Exists,
            step: vec![
                Op::IsEqual { code: b'a' },
                Op::And(vec![Operand::State(0), Operand::Node(0)]),
                Op::StoreState { state: 1, value: Operand::Node(1) },
                Op::StoreChanged(Operand::Node(1)),
                Op::Not(Operand::Node(1)),
                Op::StoreState { state: 0, value: Operand::Node(4) },
            ],
            reveals: Vec::new(),
        }
    }

    #[test]
    fn test_valid_program() {
        assert!(single_byte_program().validate().is_ok());
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut program = single_byte_program();
        program.step[1] = Op::And(vec![Operand::State(0), Operand::Node(3)]);
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_store_is_not_a_value() {
        let mut program = single_byte_program();
        program.step[4] = Op::Not(Operand::Node(2));
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_transition_step_cannot_read_carry() {
        let mut program = single_byte_program();
        program.step[1] = Op::And(vec![Operand::Carry, Operand::Node(0)]);
        assert!(matches!(program.validate(), Err(RuntimeError::MalformedProgram(_))));
    }

    #[test]
    fn test_missing_state_store() {
        let mut program = single_byte_program();
        program.step.pop();
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_accept_state_cannot_be_idle() {
        let mut program = single_byte_program();
        program.accept_state = 0;
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_operand_serialization() {
        let json = serde_json::to_string(&Op::StoreState { state: 3, value: Operand::Node(7) })
            .unwrap();
        assert_eq!(json, r#"{"store_state":{"state":3,"value":{"node":7}}}"#);
    }
}
