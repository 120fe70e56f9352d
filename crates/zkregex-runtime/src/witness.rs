//! Native evaluation of a circuit program
//!
//! Executes the exact operation list a renderer would lay out, producing the
//! full `state[t][i]` trace and the public outputs. Back-ends use this to fill
//! their witnesses and to derive the expected instance values.

use crate::{Acceptance, CircuitProgram, Op, Operand, Result, RuntimeError};
use serde::{Deserialize, Serialize};

/// Public verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Match(bool),
    Count(u64),
}

impl Verdict {
    /// Numeric value exposed as the first public output
    pub fn as_u64(&self) -> u64 {
        match self {
            Verdict::Match(matched) => *matched as u64,
            Verdict::Count(count) => *count,
        }
    }
}

/// Input bytes with everything outside the matched sub-pattern zeroed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealVector {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Full trace of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `states[t][i]` for `t` in `0..=N`
    pub states: Vec<Vec<bool>>,
    /// `changed[t]` for `t` in `0..N`
    pub changed: Vec<bool>,
    pub verdict: Verdict,
    pub reveals: Vec<RevealVector>,
}

impl Evaluation {
    /// Verdict followed by every reveal vector, in instance order
    pub fn public_outputs(&self) -> Vec<u64> {
        let mut outputs = vec![self.verdict.as_u64()];
        for reveal in &self.reveals {
            outputs.extend(reveal.bytes.iter().map(|b| *b as u64));
        }
        outputs
    }
}

/// Values visible to one execution of a step
struct Frame<'a> {
    input: u8,
    state: &'a [bool],
    next: &'a [bool],
    changed: bool,
    carry: bool,
}

impl Frame<'_> {
    fn read(&self, operand: Operand, nodes: &[bool]) -> bool {
        match operand {
            Operand::State(i) => self.state[i],
            Operand::NextState(i) => self.next[i],
            Operand::Changed => self.changed,
            Operand::Carry => self.carry,
            Operand::Node(id) => nodes[id],
            Operand::Const(value) => value,
        }
    }
}

/// Outputs of one step execution besides its node values
#[derive(Default)]
struct Stores {
    next: Vec<bool>,
    changed: bool,
    carry: bool,
    reveal: u8,
}

fn run_step(step: &[Op], frame: &Frame<'_>, state_count: usize) -> Stores {
    let mut nodes = vec![false; step.len()];
    let mut stores = Stores { next: vec![false; state_count], ..Stores::default() };

    for (id, op) in step.iter().enumerate() {
        let read = |operand: &Operand| frame.read(*operand, &nodes);
        let value = match op {
            Op::IsEqual { code } => frame.input == *code,
            Op::AtLeast { bound } => frame.input >= *bound,
            Op::AtMost { bound } => frame.input <= *bound,
            Op::And(operands) => operands.iter().all(read),
            Op::Or(operands) => operands.iter().any(read),
            Op::Not(operand) => !read(operand),
            Op::StoreState { state, value } => {
                stores.next[*state] = read(value);
                false
            }
            Op::StoreChanged(value) => {
                stores.changed = read(value);
                false
            }
            Op::StoreCarry(value) => {
                stores.carry = read(value);
                false
            }
            Op::Reveal(mask) => {
                if read(mask) {
                    stores.reveal = frame.input;
                }
                false
            }
        };
        nodes[id] = value;
    }

    stores
}

/// Runs `program` over `input`
///
/// # Examples
///
/// ```
/// use zkregex_runtime::{evaluate, Acceptance, CircuitProgram, Op, Operand, Verdict};
///
/// // Single-byte pattern `a`
/// let program = CircuitProgram {
///     state_count: 2,
///     accept_state: 1,
///     acceptance: Acceptance::Count,
///     step: vec![
///         Op::IsEqual { code: b'a' },
///         Op::And(vec![Operand::State(0), Operand::Node(0)]),
///         Op::StoreState { state: 1, value: Operand::Node(1) },
///         Op::StoreChanged(Operand::Node(1)),
///         Op::Not(Operand::Node(1)),
///         Op::StoreState { state: 0, value: Operand::Node(4) },
///     ],
///     reveals: vec![],
/// };
///
/// let evaluation = evaluate(&program, b"banana").unwrap();
/// assert_eq!(evaluation.verdict, Verdict::Count(3));
/// ```
pub fn evaluate(program: &CircuitProgram, input: &[u8]) -> Result<Evaluation> {
    program.validate()?;

    let n = program.state_count;
    let mut initial = vec![false; n];
    initial[0] = true;

    let mut states = Vec::with_capacity(input.len() + 1);
    let mut changed = Vec::with_capacity(input.len());
    states.push(initial);

    let empty: Vec<bool> = Vec::new();
    for byte in input {
        let current = &states[states.len() - 1];
        let frame =
            Frame { input: *byte, state: current, next: &empty, changed: false, carry: false };
        let stores = run_step(&program.step, &frame, n);
        changed.push(stores.changed);
        states.push(stores.next);
    }

    let accept = program.accept_state;
    let verdict = match program.acceptance {
        Acceptance::Count => Verdict::Count(states.iter().filter(|s| s[accept]).count() as u64),
        Acceptance::Exists => Verdict::Match(states.iter().any(|s| s[accept])),
        Acceptance::Universal => Verdict::Match(states.iter().skip(1).all(|s| s[accept])),
    };

    let mut reveals = Vec::with_capacity(program.reveals.len());
    for reveal in &program.reveals {
        let mut bytes = vec![0u8; input.len()];
        let mut carry = true;
        for t in (0..input.len()).rev() {
            let frame = Frame {
                input: input[t],
                state: &states[t],
                next: &states[t + 1],
                changed: changed[t],
                carry,
            };
            let stores = run_step(&reveal.step, &frame, n);
            carry = stores.carry;
            bytes[t] = stores.reveal;
        }
        reveals.push(RevealVector { name: reveal.name.clone(), bytes });
    }

    log::debug!(
        "evaluated {} bytes over {} states: {:?}",
        input.len(),
        n,
        verdict
    );

    Ok(Evaluation { states, changed, verdict, reveals })
}

/// Copies `input` into a zero-padded buffer of `len` bytes
///
/// Zero is the padding sentinel, so it may not appear in `input`.
pub fn pad_input(input: &[u8], len: usize) -> Result<Vec<u8>> {
    if input.len() > len {
        return Err(RuntimeError::invalid_input(format!(
            "input of {} bytes exceeds padded length {}",
            input.len(),
            len
        )));
    }
    if let Some(pos) = input.iter().position(|b| *b == 0) {
        return Err(RuntimeError::invalid_input(format!(
            "zero byte at offset {} collides with the padding sentinel",
            pos
        )));
    }
    let mut padded = input.to_vec();
    padded.resize(len, 0);
    Ok(padded)
}
