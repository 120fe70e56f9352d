//! Circuit program generation
//!
//! Lowers a [`LoweredAutomaton`] into the per-byte operation list. All
//! comparison and combination results are shared through the memo tables of
//! one [`CodegenContext`], so a byte range tested on several edges is computed
//! once per position.

pub mod reveal;

use crate::LoweredAutomaton;
use std::collections::{BTreeMap, HashMap};
use zkregex_runtime::{ByteSet, Op, Operand};

/// Contiguous runs at least this long are tested with two inequalities
pub const RANGE_THRESHOLD: usize = 16;

/// Memo hit counters, reported in debug logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub equality_hits: usize,
    pub range_hits: usize,
    pub or_hits: usize,
}

/// Owns the operation list being built and every memo table scoped to it
#[derive(Debug, Default)]
pub struct CodegenContext {
    ops: Vec<Op>,
    equalities: BTreeMap<u8, Operand>,
    ranges: BTreeMap<(u8, u8), Operand>,
    ors: HashMap<Vec<Operand>, Operand>,
    stats: MemoStats,
}

impl CodegenContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: Op) -> Operand {
        self.ops.push(op);
        Operand::Node(self.ops.len() - 1)
    }

    /// Appends a store; stores produce no referenceable value
    pub fn store(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// `input == code`
    pub fn equal(&mut self, code: u8) -> Operand {
        if let Some(node) = self.equalities.get(&code) {
            self.stats.equality_hits += 1;
            return *node;
        }
        let node = self.push(Op::IsEqual { code });
        self.equalities.insert(code, node);
        node
    }

    /// `min <= input <= max`
    pub fn range(&mut self, min: u8, max: u8) -> Operand {
        if let Some(node) = self.ranges.get(&(min, max)) {
            self.stats.range_hits += 1;
            return *node;
        }
        let lower = self.push(Op::AtLeast { bound: min });
        let upper = self.push(Op::AtMost { bound: max });
        let node = self.push(Op::And(vec![lower, upper]));
        self.ranges.insert((min, max), node);
        node
    }

    /// OR of `operands`, memoized by the sorted operand set
    ///
    /// Constants fold away; an empty OR is `false`.
    pub fn any(&mut self, operands: Vec<Operand>) -> Operand {
        let mut signature: Vec<Operand> = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Operand::Const(true) => return Operand::Const(true),
                Operand::Const(false) => {}
                other => signature.push(other),
            }
        }
        signature.sort_unstable();
        signature.dedup();

        match signature.len() {
            0 => Operand::Const(false),
            1 => signature[0],
            _ => {
                if let Some(node) = self.ors.get(&signature) {
                    self.stats.or_hits += 1;
                    return *node;
                }
                let node = self.push(Op::Or(signature.clone()));
                self.ors.insert(signature, node);
                node
            }
        }
    }

    /// AND of `operands`; constants fold away and an empty AND is `true`
    pub fn all(&mut self, operands: Vec<Operand>) -> Operand {
        let mut kept: Vec<Operand> = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Operand::Const(false) => return Operand::Const(false),
                Operand::Const(true) => {}
                other if !kept.contains(&other) => kept.push(other),
                _ => {}
            }
        }
        match kept.len() {
            0 => Operand::Const(true),
            1 => kept[0],
            _ => self.push(Op::And(kept)),
        }
    }

    pub fn not(&mut self, operand: Operand) -> Operand {
        match operand {
            Operand::Const(value) => Operand::Const(!value),
            other => self.push(Op::Not(other)),
        }
    }

    /// Membership test of the current input byte in `set`
    ///
    /// Runs of at least [`RANGE_THRESHOLD`] codes become range tests, the
    /// remaining codes equality tests.
    pub fn byte_test(&mut self, set: &ByteSet) -> Operand {
        let mut parts = Vec::new();
        for (lo, hi) in set.runs() {
            if (hi - lo) as usize + 1 >= RANGE_THRESHOLD {
                parts.push(self.range(lo, hi));
            } else {
                for code in lo..=hi {
                    parts.push(self.equal(code));
                }
            }
        }
        self.any(parts)
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }

    /// Ranges and equality codes emitted so far
    pub fn comparisons(&self) -> (Vec<(u8, u8)>, Vec<u8>) {
        (self.ranges.keys().copied().collect(), self.equalities.keys().copied().collect())
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}

/// Transition step and the comparisons it uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCode {
    pub step: Vec<Op>,
    pub ranges: Vec<(u8, u8)>,
    pub equalities: Vec<u8>,
}

/// Emits the step computing `state[t + 1]` from `state[t]` and `input[t]`
///
/// For each state `i > 0`, every incoming edge contributes
/// `state[t][from] AND matches(input)`; the contributions are ORed into
/// `state[t + 1][i]`. `state_changed[t]` is the OR over all `i > 0` and the
/// idle state is its negation.
pub fn compile_transitions(automaton: &LoweredAutomaton) -> TransitionCode {
    let mut ctx = CodegenContext::new();
    let mut next = Vec::with_capacity(automaton.state_count.saturating_sub(1));

    for to in 1..automaton.state_count {
        let mut fired = Vec::new();
        for (from, label) in automaton.predecessors(to) {
            let test = if label.is_negated() {
                let excluded = ctx.byte_test(&automaton.exclusions[from]);
                ctx.not(excluded)
            } else {
                ctx.byte_test(label.bytes())
            };
            fired.push(ctx.all(vec![Operand::State(from), test]));
        }
        let value = ctx.any(fired);
        ctx.store(Op::StoreState { state: to, value });
        next.push(value);
    }

    let changed = ctx.any(next);
    ctx.store(Op::StoreChanged(changed));
    let idle = ctx.not(changed);
    ctx.store(Op::StoreState { state: 0, value: idle });

    let stats = ctx.stats();
    let (ranges, equalities) = ctx.comparisons();
    let step = ctx.into_ops();
    log::debug!(
        "codegen: {} ops, {} ranges, {} equalities, memo hits {:?}",
        step.len(),
        ranges.len(),
        equalities.len(),
        stats
    );

    TransitionCode { step, ranges, equalities }
}
