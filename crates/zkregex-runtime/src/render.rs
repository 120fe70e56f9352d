//! Renderer contract and the plain-text listing renderer

use crate::{Acceptance, CompiledArtifact, Op, Operand, Result, RuntimeError};
use std::fmt::Write;

/// Turns a compiled artifact into a back-end specific form
///
/// The input of every rendered circuit is a fixed-length array of byte signals
/// with `0` reserved as the trailing padding sentinel.
pub trait Renderer {
    type Output;

    fn render(&self, artifact: &CompiledArtifact) -> Result<Self::Output>;
}

/// Human-readable pseudo-circuit listing
///
/// # Examples
///
/// ```
/// use zkregex_runtime::{ListingRenderer, Renderer};
/// # use zkregex_runtime::*;
/// # let artifact = CompiledArtifact {
/// #     pattern: "a".into(),
/// #     program: CircuitProgram {
/// #         state_count: 2,
/// #         accept_state: 1,
/// #         acceptance: Acceptance::Exists,
/// #         step: vec![
/// #             Op::IsEqual { code: b'a' },
/// #             Op::And(vec![Operand::State(0), Operand::Node(0)]),
/// #             Op::StoreState { state: 1, value: Operand::Node(1) },
/// #             Op::StoreChanged(Operand::Node(1)),
/// #             Op::Not(Operand::Node(1)),
/// #             Op::StoreState { state: 0, value: Operand::Node(4) },
/// #         ],
/// #         reveals: vec![],
/// #     },
/// #     graph: vec![],
/// #     metadata: ArtifactMetadata {
/// #         state_count: 2,
/// #         accept_state: 1,
/// #         ranges: vec![],
/// #         equalities: vec![b'a'],
/// #         step_ops: 6,
/// #         anchors: vec![],
/// #         idle_loop: ByteSet::singleton(b'a').complement(),
/// #     },
/// # };
/// let listing = ListingRenderer::default().render(&artifact).unwrap();
/// assert!(listing.contains("n0 = input == 97"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ListingRenderer {
    /// Prefix each op with a `#`-comment showing printable byte codes
    pub annotate_bytes: bool,
}

impl Renderer for ListingRenderer {
    type Output = String;

    fn render(&self, artifact: &CompiledArtifact) -> Result<String> {
        artifact.program.validate()?;
        self.write_listing(artifact).map_err(|e| RuntimeError::other(e.to_string()))
    }
}

impl ListingRenderer {
    fn write_listing(
        &self,
        artifact: &CompiledArtifact,
    ) -> std::result::Result<String, std::fmt::Error> {
        let program = &artifact.program;
        let meta = &artifact.metadata;
        let mut out = String::new();

        writeln!(out, "; pattern: {}", artifact.pattern)?;
        writeln!(out, "; states: {}, accept: {}", program.state_count, program.accept_state)?;
        let ranges: Vec<String> = meta.ranges.iter().map(|(lo, hi)| format!("{}..={}", lo, hi)).collect();
        writeln!(out, "; ranges: [{}]", ranges.join(", "))?;
        for anchor in &meta.anchors {
            writeln!(out, "; anchor: 0 -> {} (idle on {:?})", anchor.target, meta.idle_loop)?;
        }

        writeln!(out, "step t:")?;
        for (id, op) in program.step.iter().enumerate() {
            writeln!(out, "  {}", self.line(id, op))?;
        }

        let signal = match program.acceptance {
            Acceptance::Count => format!("count = sum(t in 0..=N) s[t][{}]", program.accept_state),
            Acceptance::Exists => format!("match = or(t in 0..=N) s[t][{}]", program.accept_state),
            Acceptance::Universal => {
                format!("match = and(t in 1..=N) s[t][{}]", program.accept_state)
            }
        };
        writeln!(out, "accept: {}", signal)?;

        for reveal in &program.reveals {
            let edges: Vec<String> = reveal.edges.iter().map(|(f, t)| format!("{}->{}", f, t)).collect();
            writeln!(out, "reveal {:?} [{}] t from N-1 down to 0:", reveal.name, edges.join(", "))?;
            for (id, op) in reveal.step.iter().enumerate() {
                writeln!(out, "  {}", self.line(id, op))?;
            }
        }

        Ok(out)
    }

    fn line(&self, id: usize, op: &Op) -> String {
        let body = match op {
            Op::IsEqual { code } => format!("n{} = input == {}", id, code),
            Op::AtLeast { bound } => format!("n{} = input >= {}", id, bound),
            Op::AtMost { bound } => format!("n{} = input <= {}", id, bound),
            Op::And(ops) => format!("n{} = and({})", id, join(ops)),
            Op::Or(ops) => format!("n{} = or({})", id, join(ops)),
            Op::Not(op) => format!("n{} = not({})", id, operand(op)),
            Op::StoreState { state, value } => format!("s[t+1][{}] = {}", state, operand(value)),
            Op::StoreChanged(value) => format!("changed[t] = {}", operand(value)),
            Op::StoreCarry(value) => format!("carry[t] = {}", operand(value)),
            Op::Reveal(mask) => format!("reveal[t] = input * {}", operand(mask)),
        };
        match (self.annotate_bytes, op) {
            (true, Op::IsEqual { code }) if code.is_ascii_graphic() => {
                format!("{:<40} # '{}'", body, *code as char)
            }
            _ => body,
        }
    }
}

fn operand(operand: &Operand) -> String {
    match operand {
        Operand::State(i) => format!("s[t][{}]", i),
        Operand::NextState(i) => format!("s[t+1][{}]", i),
        Operand::Changed => "changed[t]".to_string(),
        Operand::Carry => "carry[t+1]".to_string(),
        Operand::Node(id) => format!("n{}", id),
        Operand::Const(value) => value.to_string(),
    }
}

fn join(operands: &[Operand]) -> String {
    operands.iter().map(operand).collect::<Vec<_>>().join(", ")
}
