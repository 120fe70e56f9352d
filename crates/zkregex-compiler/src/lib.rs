//! zkregex Compiler
//!
//! Compiles regular expressions into branch-free circuit programs that check,
//! in zero knowledge, whether a private byte string matches, and optionally
//! disclose only the bytes matched by chosen sub-patterns.
//!
//! The pipeline runs `preprocess -> parse -> NFA -> DFA -> minimize -> lower
//! -> codegen`; [`compile`] drives all of it. [`circuit`] lays a compiled
//! program out as a halo2 circuit.

pub mod ast;
pub mod circuit;
pub mod codegen;
pub mod dfa;
pub mod error;
pub mod graph;
pub mod label;
pub mod lower;
pub mod minimize;
pub mod nfa;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod preprocess;

pub use ast::{AstKind, AstNode, Span};
pub use circuit::{CircuitConfig, Halo2Renderer, RegexChipConfig, RegexCircuit};
pub use codegen::{compile_transitions, CodegenContext, MemoStats, TransitionCode};
pub use dfa::{alpha_id, closed_move, epsilon_closure, Closure, Dfa, DfaState};
pub use error::{CompilerError, ParseError, Result};
pub use graph::{from_graph, to_json, to_json_string};
pub use label::{Label, Symbol};
pub use lower::LoweredAutomaton;
pub use minimize::minimize;
pub use nfa::{Nfa, NfaEdge, NfaState, Role};
pub use options::{AcceptMode, CompileOptions, RevealRequest};
pub use parser::parse;
pub use pipeline::{compile, compile_automaton, minimal_dfa};
pub use preprocess::{preprocess, Dialect};

// Re-export runtime types for convenience
pub use zkregex_runtime::{
    evaluate, pad_input, Acceptance, CircuitProgram, CompiledArtifact, Evaluation,
    GraphTransition, Verdict,
};
