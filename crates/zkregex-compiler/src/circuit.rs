//! halo2 back-end
//!
//! Unrolls a [`CircuitProgram`] over a fixed-length byte input into a single
//! halo2 region. Every operation of the step program becomes at most one row
//! of a small custom gate:
//!
//! | gate     | constraint                                        |
//! |----------|---------------------------------------------------|
//! | is_equal | `c = 1 - (a - k) * b`, `(a - k) * c = 0`          |
//! | at_least | `b = a - k + 256 * (1 - c)`, `b` in byte table     |
//! | at_most  | `b = k - a + 256 * (1 - c)`, `b` in byte table     |
//! | and      | `c = a * b`                                       |
//! | or       | `c = a + b - a * b`                               |
//! | not      | `c = 1 - a`                                       |
//! | add      | `c = a + b`                                       |
//!
//! `k` is a per-row fixed value. Input bytes are range-checked through the
//! same byte table. Row 0 of the instance column holds the verdict, followed by
//! each reveal vector in program order.
//!
//! # Examples
//!
//! ```rust
//! use halo2_proofs::dev::MockProver;
//! use halo2curves::pasta::Fp;
//! use zkregex_compiler::{compile, CircuitConfig, CompileOptions, RegexCircuit};
//!
//! let artifact = compile("ab", &CompileOptions::default()).unwrap();
//! let sizing = CircuitConfig::for_artifact(&artifact, 4);
//! let circuit = RegexCircuit::<Fp>::new(artifact.program.clone(), 4)
//!     .with_input(b"xab\0")
//!     .unwrap();
//!
//! let public = circuit.public_inputs().unwrap();
//! let prover = MockProver::run(sizing.k, &circuit, vec![public]).unwrap();
//! prover.verify().unwrap();
//! ```

use crate::{CompilerError, Result};
use ff::PrimeField;
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Region, SimpleFloorPlanner, Value},
    plonk::{
        Advice, Circuit, Column, ConstraintSystem, Error as Halo2Error, Expression, Fixed,
        Instance, Selector, TableColumn,
    },
    poly::Rotation,
};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use zkregex_runtime::{
    evaluate, Acceptance, CircuitProgram, CompiledArtifact, Op, Operand, Renderer,
};

type Cell<F> = AssignedCell<F, F>;

/// Size of a rendered circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// The circuit has `2^k` rows
    pub k: u32,
    /// Number of input bytes, padding included
    pub input_len: usize,
}

impl CircuitConfig {
    /// The byte table alone needs 256 usable rows
    pub const MIN_K: u32 = 9;

    /// Rows reserved for blinding factors and the constants
    const SLACK_ROWS: usize = 16;

    /// Smallest configuration fitting `program` over `input_len` bytes
    pub fn for_program(program: &CircuitProgram, input_len: usize) -> Self {
        let rows = Self::required_rows(program, input_len) + Self::SLACK_ROWS;
        let mut k = Self::MIN_K;
        while (1usize << k) < rows {
            k += 1;
        }
        Self { k, input_len }
    }

    pub fn for_artifact(artifact: &CompiledArtifact, input_len: usize) -> Self {
        Self::for_program(&artifact.program, input_len)
    }

    /// Rows of the main region
    pub fn required_rows(program: &CircuitProgram, input_len: usize) -> usize {
        let per_byte = 1
            + step_rows(&program.step)
            + program.reveals.iter().map(|r| step_rows(&r.step)).sum::<usize>();
        // two constant cells, then one fold row per position for acceptance
        2 + input_len * per_byte + input_len
    }
}

fn step_rows(step: &[Op]) -> usize {
    step.iter()
        .map(|op| match op {
            Op::IsEqual { .. } | Op::AtLeast { .. } | Op::AtMost { .. } | Op::Not(_) => 1,
            Op::And(operands) | Op::Or(operands) => operands.len().saturating_sub(1),
            Op::Reveal(_) => 1,
            Op::StoreState { .. } | Op::StoreChanged(_) | Op::StoreCarry(_) => 0,
        })
        .sum()
}

#[derive(Clone, Debug)]
pub struct RegexChipConfig {
    a: Column<Advice>,
    b: Column<Advice>,
    c: Column<Advice>,
    k: Column<Fixed>,
    instance: Column<Instance>,
    bytes: TableColumn,
    q_range: Selector,
    q_eq: Selector,
    q_ge: Selector,
    q_le: Selector,
    q_and: Selector,
    q_or: Selector,
    q_not: Selector,
    q_add: Selector,
}

/// A compiled program laid out over `input_len` private input bytes
#[derive(Clone, Debug)]
pub struct RegexCircuit<F: PrimeField> {
    pub program: CircuitProgram,
    pub input_len: usize,
    /// Private input; `None` while generating keys
    input: Option<Vec<u8>>,
    _marker: PhantomData<F>,
}

impl<F: PrimeField> RegexCircuit<F> {
    pub fn new(program: CircuitProgram, input_len: usize) -> Self {
        Self { program, input_len, input: None, _marker: PhantomData }
    }

    /// Sets the private input, which must already be padded to `input_len`
    pub fn with_input(mut self, input: &[u8]) -> Result<Self> {
        if input.len() != self.input_len {
            return Err(CompilerError::Circuit(format!(
                "Expected {} input bytes but got {}",
                self.input_len,
                input.len()
            )));
        }
        self.input = Some(input.to_vec());
        Ok(self)
    }

    pub fn input(&self) -> Option<&[u8]> {
        self.input.as_deref()
    }

    /// Number of public instance cells: the verdict plus every reveal vector
    pub fn num_public_inputs(&self) -> usize {
        1 + self.program.reveals.len() * self.input_len
    }

    /// Expected instance column, computed by evaluating the program natively
    pub fn public_inputs(&self) -> Result<Vec<F>> {
        let input = self.input.as_deref().ok_or_else(|| {
            CompilerError::Circuit("public inputs need a known private input".to_string())
        })?;
        let evaluation = evaluate(&self.program, input)?;
        Ok(evaluation.public_outputs().into_iter().map(F::from).collect())
    }

    fn input_values(&self) -> Vec<Value<u8>> {
        match &self.input {
            Some(bytes) => bytes.iter().map(|b| Value::known(*b)).collect(),
            None => vec![Value::unknown(); self.input_len],
        }
    }
}

impl<F: PrimeField> Circuit<F> for RegexCircuit<F> {
    type Config = RegexChipConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::new(self.program.clone(), self.input_len)
    }

    fn configure(meta: &mut ConstraintSystem<F>) -> Self::Config {
        let a = meta.advice_column();
        let b = meta.advice_column();
        let c = meta.advice_column();
        for column in [a, b, c] {
            meta.enable_equality(column);
        }
        let k = meta.fixed_column();
        let constants = meta.fixed_column();
        meta.enable_constant(constants);
        let instance = meta.instance_column();
        meta.enable_equality(instance);
        let bytes = meta.lookup_table_column();

        let config = RegexChipConfig {
            a,
            b,
            c,
            k,
            instance,
            bytes,
            q_range: meta.complex_selector(),
            q_eq: meta.selector(),
            q_ge: meta.selector(),
            q_le: meta.selector(),
            q_and: meta.selector(),
            q_or: meta.selector(),
            q_not: meta.selector(),
            q_add: meta.selector(),
        };

        meta.lookup(|meta| {
            let q = meta.query_selector(config.q_range);
            let value = meta.query_advice(b, Rotation::cur());
            vec![(q * value, bytes)]
        });

        let one = || Expression::Constant(F::ONE);
        let wrap = || Expression::Constant(F::from(256));

        meta.create_gate("is_equal", |meta| {
            let q = meta.query_selector(config.q_eq);
            let lhs = meta.query_advice(a, Rotation::cur());
            let inv = meta.query_advice(b, Rotation::cur());
            let out = meta.query_advice(c, Rotation::cur());
            let code = meta.query_fixed(k);
            let diff = lhs - code;
            vec![
                q.clone() * (out.clone() - (one() - diff.clone() * inv)),
                q * diff * out,
            ]
        });

        meta.create_gate("at_least", |meta| {
            let q = meta.query_selector(config.q_ge);
            let lhs = meta.query_advice(a, Rotation::cur());
            let gap = meta.query_advice(b, Rotation::cur());
            let bit = meta.query_advice(c, Rotation::cur());
            let bound = meta.query_fixed(k);
            vec![
                q.clone() * bit.clone() * (one() - bit.clone()),
                q * (gap - (lhs - bound + wrap() * (one() - bit))),
            ]
        });

        meta.create_gate("at_most", |meta| {
            let q = meta.query_selector(config.q_le);
            let lhs = meta.query_advice(a, Rotation::cur());
            let gap = meta.query_advice(b, Rotation::cur());
            let bit = meta.query_advice(c, Rotation::cur());
            let bound = meta.query_fixed(k);
            vec![
                q.clone() * bit.clone() * (one() - bit.clone()),
                q * (gap - (bound - lhs + wrap() * (one() - bit))),
            ]
        });

        meta.create_gate("and", |meta| {
            let q = meta.query_selector(config.q_and);
            let lhs = meta.query_advice(a, Rotation::cur());
            let rhs = meta.query_advice(b, Rotation::cur());
            let out = meta.query_advice(c, Rotation::cur());
            vec![q * (out - lhs * rhs)]
        });

        meta.create_gate("or", |meta| {
            let q = meta.query_selector(config.q_or);
            let lhs = meta.query_advice(a, Rotation::cur());
            let rhs = meta.query_advice(b, Rotation::cur());
            let out = meta.query_advice(c, Rotation::cur());
            vec![q * (out - (lhs.clone() + rhs.clone() - lhs * rhs))]
        });

        meta.create_gate("not", |meta| {
            let q = meta.query_selector(config.q_not);
            let value = meta.query_advice(a, Rotation::cur());
            let out = meta.query_advice(c, Rotation::cur());
            vec![q * (out - (one() - value))]
        });

        meta.create_gate("add", |meta| {
            let q = meta.query_selector(config.q_add);
            let lhs = meta.query_advice(a, Rotation::cur());
            let rhs = meta.query_advice(b, Rotation::cur());
            let out = meta.query_advice(c, Rotation::cur());
            vec![q * (out - (lhs + rhs))]
        });

        config
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<F>,
    ) -> std::result::Result<(), Halo2Error> {
        self.program.validate().map_err(|_| Halo2Error::Synthesis)?;

        layouter.assign_table(
            || "byte_table",
            |mut table| {
                for byte in 0..256usize {
                    table.assign_cell(
                        || format!("byte_{}", byte),
                        config.bytes,
                        byte,
                        || Value::known(F::from(byte as u64)),
                    )?;
                }
                Ok(())
            },
        )?;

        let input = self.input_values();
        let program = &self.program;

        let (verdict, revealed) = layouter.assign_region(
            || "regex",
            |mut region| {
                let mut layout = Layout::new(&config, &mut region)?;
                let n = program.state_count;

                let mut states: Vec<Vec<Cell<F>>> =
                    vec![(0..n).map(|i| layout.constant(i == 0)).collect()];
                let mut changed: Vec<Cell<F>> = Vec::with_capacity(input.len());
                let mut inputs: Vec<Cell<F>> = Vec::with_capacity(input.len());

                for (t, byte) in input.iter().enumerate() {
                    let cell = layout.input(*byte)?;
                    let stores = {
                        let frame = Frame {
                            input: &cell,
                            byte: *byte,
                            state: &states[t],
                            next: &[],
                            changed: None,
                            carry: None,
                        };
                        layout.run_step(&program.step, &frame, n)?
                    };
                    let next = stores.next.into_iter().collect::<Option<Vec<_>>>();
                    states.push(next.ok_or(Halo2Error::Synthesis)?);
                    changed.push(stores.changed.ok_or(Halo2Error::Synthesis)?);
                    inputs.push(cell);
                }

                let verdict = layout.accept(program.acceptance, program.accept_state, &states)?;

                let mut revealed = Vec::with_capacity(program.reveals.len() * input.len());
                for reveal in &program.reveals {
                    let mut bytes: Vec<Option<Cell<F>>> = vec![None; input.len()];
                    let mut carry = layout.constant(true);
                    for t in (0..input.len()).rev() {
                        let frame = Frame {
                            input: &inputs[t],
                            byte: input[t],
                            state: &states[t],
                            next: &states[t + 1],
                            changed: Some(&changed[t]),
                            carry: Some(&carry),
                        };
                        let stores = layout.run_step(&reveal.step, &frame, n)?;
                        bytes[t] = stores.reveal;
                        carry = stores.carry.ok_or(Halo2Error::Synthesis)?;
                    }
                    for cell in bytes {
                        revealed.push(cell.ok_or(Halo2Error::Synthesis)?);
                    }
                }

                Ok((verdict, revealed))
            },
        )?;

        layouter.constrain_instance(verdict.cell(), config.instance, 0)?;
        for (offset, cell) in revealed.iter().enumerate() {
            layouter.constrain_instance(cell.cell(), config.instance, 1 + offset)?;
        }

        Ok(())
    }
}

/// Cells one step execution may read
struct Frame<'c, F: PrimeField> {
    input: &'c Cell<F>,
    byte: Value<u8>,
    state: &'c [Cell<F>],
    next: &'c [Cell<F>],
    changed: Option<&'c Cell<F>>,
    carry: Option<&'c Cell<F>>,
}

struct StepCells<F: PrimeField> {
    next: Vec<Option<Cell<F>>>,
    changed: Option<Cell<F>>,
    carry: Option<Cell<F>>,
    reveal: Option<Cell<F>>,
}

#[derive(Clone, Copy)]
enum Comparison {
    Equal,
    AtLeast,
    AtMost,
}

fn and<F: PrimeField>(a: F, b: F) -> F {
    a * b
}

fn or<F: PrimeField>(a: F, b: F) -> F {
    a + b - a * b
}

fn add<F: PrimeField>(a: F, b: F) -> F {
    a + b
}

fn bit<F: PrimeField>(value: bool) -> F {
    if value {
        F::ONE
    } else {
        F::ZERO
    }
}

/// Row allocator for the main region
struct Layout<'a, 'r, F: PrimeField> {
    config: &'a RegexChipConfig,
    region: &'a mut Region<'r, F>,
    offset: usize,
    zero: Cell<F>,
    one: Cell<F>,
}

impl<'a, 'r, F: PrimeField> Layout<'a, 'r, F> {
    fn new(
        config: &'a RegexChipConfig,
        region: &'a mut Region<'r, F>,
    ) -> std::result::Result<Self, Halo2Error> {
        let zero = region.assign_advice_from_constant(|| "zero", config.c, 0, F::ZERO)?;
        let one = region.assign_advice_from_constant(|| "one", config.c, 1, F::ONE)?;
        Ok(Self { config, region, offset: 2, zero, one })
    }

    fn next_row(&mut self) -> usize {
        let row = self.offset;
        self.offset += 1;
        row
    }

    fn constant(&self, value: bool) -> Cell<F> {
        if value {
            self.one.clone()
        } else {
            self.zero.clone()
        }
    }

    fn input(&mut self, byte: Value<u8>) -> std::result::Result<Cell<F>, Halo2Error> {
        let row = self.next_row();
        self.config.q_range.enable(self.region, row)?;
        self.region.assign_advice(|| "input", self.config.b, row, || {
            byte.map(|b| F::from(b as u64))
        })
    }

    fn compare(
        &mut self,
        frame: &Frame<'_, F>,
        comparison: Comparison,
        bound: u8,
    ) -> std::result::Result<Cell<F>, Halo2Error> {
        let row = self.next_row();
        let k = F::from(bound as u64);
        let (selector, aux, out) = match comparison {
            Comparison::Equal => (
                self.config.q_eq,
                frame.byte.map(|b| (F::from(b as u64) - k).invert().unwrap_or(F::ZERO)),
                frame.byte.map(|b| bit::<F>(b == bound)),
            ),
            Comparison::AtLeast => (
                self.config.q_ge,
                frame.byte.map(|b| {
                    if b >= bound {
                        F::from((b - bound) as u64)
                    } else {
                        F::from(256 + b as u64 - bound as u64)
                    }
                }),
                frame.byte.map(|b| bit::<F>(b >= bound)),
            ),
            Comparison::AtMost => (
                self.config.q_le,
                frame.byte.map(|b| {
                    if b <= bound {
                        F::from((bound - b) as u64)
                    } else {
                        F::from(256 + bound as u64 - b as u64)
                    }
                }),
                frame.byte.map(|b| bit::<F>(b <= bound)),
            ),
        };

        selector.enable(self.region, row)?;
        if !matches!(comparison, Comparison::Equal) {
            self.config.q_range.enable(self.region, row)?;
        }
        frame.input.copy_advice(|| "input", self.region, self.config.a, row)?;
        self.region.assign_fixed(|| "k", self.config.k, row, || Value::known(k))?;
        self.region.assign_advice(|| "aux", self.config.b, row, || aux)?;
        self.region.assign_advice(|| "out", self.config.c, row, || out)
    }

    fn binary(
        &mut self,
        selector: Selector,
        lhs: &Cell<F>,
        rhs: &Cell<F>,
        f: fn(F, F) -> F,
    ) -> std::result::Result<Cell<F>, Halo2Error> {
        let row = self.next_row();
        selector.enable(self.region, row)?;
        lhs.copy_advice(|| "lhs", self.region, self.config.a, row)?;
        rhs.copy_advice(|| "rhs", self.region, self.config.b, row)?;
        let value = lhs.value().zip(rhs.value()).map(|(l, r)| f(*l, *r));
        self.region.assign_advice(|| "out", self.config.c, row, || value)
    }

    fn not(&mut self, cell: &Cell<F>) -> std::result::Result<Cell<F>, Halo2Error> {
        let row = self.next_row();
        self.config.q_not.enable(self.region, row)?;
        cell.copy_advice(|| "value", self.region, self.config.a, row)?;
        let value = cell.value().map(|v| F::ONE - *v);
        self.region.assign_advice(|| "out", self.config.c, row, || value)
    }

    /// Pairwise fold; an empty fold is the constant `empty`
    fn fold(
        &mut self,
        selector: Selector,
        cells: Vec<Cell<F>>,
        empty: bool,
        f: fn(F, F) -> F,
    ) -> std::result::Result<Cell<F>, Halo2Error> {
        let mut iter = cells.into_iter();
        let mut acc = match iter.next() {
            Some(first) => first,
            None => return Ok(self.constant(empty)),
        };
        for cell in iter {
            acc = self.binary(selector, &acc, &cell, f)?;
        }
        Ok(acc)
    }

    fn operand(
        &mut self,
        operand: Operand,
        frame: &Frame<'_, F>,
        nodes: &[Option<Cell<F>>],
    ) -> std::result::Result<Cell<F>, Halo2Error> {
        let cell = match operand {
            Operand::State(i) => frame.state.get(i).cloned(),
            Operand::NextState(i) => frame.next.get(i).cloned(),
            Operand::Changed => frame.changed.cloned(),
            Operand::Carry => frame.carry.cloned(),
            Operand::Node(id) => nodes.get(id).cloned().flatten(),
            Operand::Const(value) => Some(self.constant(value)),
        };
        cell.ok_or(Halo2Error::Synthesis)
    }

    fn operands(
        &mut self,
        operands: &[Operand],
        frame: &Frame<'_, F>,
        nodes: &[Option<Cell<F>>],
    ) -> std::result::Result<Vec<Cell<F>>, Halo2Error> {
        operands.iter().map(|operand| self.operand(*operand, frame, nodes)).collect()
    }

    fn run_step(
        &mut self,
        step: &[Op],
        frame: &Frame<'_, F>,
        state_count: usize,
    ) -> std::result::Result<StepCells<F>, Halo2Error> {
        let mut nodes: Vec<Option<Cell<F>>> = Vec::with_capacity(step.len());
        let mut stores =
            StepCells { next: vec![None; state_count], changed: None, carry: None, reveal: None };

        for op in step {
            let value = match op {
                Op::IsEqual { code } => Some(self.compare(frame, Comparison::Equal, *code)?),
                Op::AtLeast { bound } => Some(self.compare(frame, Comparison::AtLeast, *bound)?),
                Op::AtMost { bound } => Some(self.compare(frame, Comparison::AtMost, *bound)?),
                Op::And(operands) => {
                    let cells = self.operands(operands, frame, &nodes)?;
                    Some(self.fold(self.config.q_and, cells, true, and)?)
                }
                Op::Or(operands) => {
                    let cells = self.operands(operands, frame, &nodes)?;
                    Some(self.fold(self.config.q_or, cells, false, or)?)
                }
                Op::Not(operand) => {
                    let cell = self.operand(*operand, frame, &nodes)?;
                    Some(self.not(&cell)?)
                }
                Op::StoreState { state, value } => {
                    let cell = self.operand(*value, frame, &nodes)?;
                    let slot = stores.next.get_mut(*state).ok_or(Halo2Error::Synthesis)?;
                    *slot = Some(cell);
                    None
                }
                Op::StoreChanged(value) => {
                    stores.changed = Some(self.operand(*value, frame, &nodes)?);
                    None
                }
                Op::StoreCarry(value) => {
                    stores.carry = Some(self.operand(*value, frame, &nodes)?);
                    None
                }
                Op::Reveal(mask) => {
                    let mask = self.operand(*mask, frame, &nodes)?;
                    stores.reveal = Some(self.binary(self.config.q_and, frame.input, &mask, and)?);
                    None
                }
            };
            nodes.push(value);
        }

        Ok(stores)
    }

    fn accept(
        &mut self,
        acceptance: Acceptance,
        accept_state: usize,
        states: &[Vec<Cell<F>>],
    ) -> std::result::Result<Cell<F>, Halo2Error> {
        let column = states
            .iter()
            .map(|s| s.get(accept_state).cloned().ok_or(Halo2Error::Synthesis))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        match acceptance {
            Acceptance::Count => self.fold(self.config.q_add, column, false, add),
            Acceptance::Exists => self.fold(self.config.q_or, column, false, or),
            Acceptance::Universal => {
                self.fold(self.config.q_and, column.into_iter().skip(1).collect(), true, and)
            }
        }
    }
}

/// Renders artifacts as [`RegexCircuit`]s over a fixed input length
#[derive(Debug, Clone)]
pub struct Halo2Renderer<F> {
    pub input_len: usize,
    _marker: PhantomData<F>,
}

impl<F> Halo2Renderer<F> {
    pub fn new(input_len: usize) -> Self {
        Self { input_len, _marker: PhantomData }
    }
}

impl<F: PrimeField> Renderer for Halo2Renderer<F> {
    type Output = RegexCircuit<F>;

    fn render(&self, artifact: &CompiledArtifact) -> zkregex_runtime::Result<RegexCircuit<F>> {
        artifact.program.validate()?;
        Ok(RegexCircuit::new(artifact.program.clone(), self.input_len))
    }
}
