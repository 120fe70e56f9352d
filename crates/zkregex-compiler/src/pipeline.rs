//! End-to-end compilation
//!
//! `pattern -> dialect -> AST -> NFA -> DFA -> minimal DFA -> lowered automaton
//! -> circuit program`

use crate::codegen::{
    compile_transitions,
    reveal::{compile_reveal, substring_edges},
};
use crate::{
    minimize, to_json, AcceptMode, CompileOptions, CompilerError, Dfa, Dialect,
    LoweredAutomaton, Nfa, Result, RevealRequest,
};
use std::collections::BTreeSet;
use zkregex_runtime::{
    Acceptance, ArtifactMetadata, CircuitProgram, CompiledArtifact, RevealProgram,
};

/// Minimal DFA of `pattern`
pub fn minimal_dfa(pattern: &str) -> Result<Dfa> {
    let ast = Dialect::expand(pattern)?.parse()?;
    let nfa = Nfa::from_ast(&ast);
    let dfa = Dfa::from_nfa(&nfa);
    Ok(minimize(&dfa))
}

/// Compiles `pattern` into a circuit program
///
/// # Examples
///
/// ```
/// use zkregex_compiler::{compile, AcceptMode, CompileOptions};
/// use zkregex_runtime::{evaluate, Verdict};
///
/// let artifact = compile("(mina|MINA)+", &CompileOptions::new(AcceptMode::Count)).unwrap();
/// let evaluation = evaluate(&artifact.program, b"MINAminaMINA").unwrap();
/// assert_eq!(evaluation.verdict, Verdict::Count(3));
/// ```
pub fn compile(pattern: &str, options: &CompileOptions) -> Result<CompiledArtifact> {
    let dfa = minimal_dfa(pattern)?;
    compile_automaton(pattern, &dfa, options)
}

/// Compiles an already minimized automaton
///
/// `pattern` is only consulted to resolve substring reveals, so an automaton
/// reloaded with [`crate::from_graph`] can be compiled with its source text.
pub fn compile_automaton(
    pattern: &str,
    dfa: &Dfa,
    options: &CompileOptions,
) -> Result<CompiledArtifact> {
    let lowered = LoweredAutomaton::from_dfa(dfa)?;
    let acceptance = resolve_acceptance(options.acceptance, &lowered)?;

    let transitions = compile_transitions(&lowered);

    let mut names = BTreeSet::new();
    let mut reveals: Vec<RevealProgram> = Vec::with_capacity(options.reveals.len());
    for request in &options.reveals {
        let name = request.name();
        if !names.insert(name.to_string()) {
            return Err(CompilerError::InvalidReveal(format!("duplicate reveal name '{}'", name)));
        }
        let edges = match request {
            RevealRequest::Substring { pattern: sub, .. } => substring_edges(pattern, sub, &lowered)?,
            RevealRequest::Edges { edges, .. } => edges.clone(),
        };
        reveals.push(compile_reveal(&lowered, name, &edges)?);
    }

    let program = CircuitProgram {
        state_count: lowered.state_count,
        accept_state: lowered.accept_state,
        acceptance,
        step: transitions.step,
        reveals,
    };
    program.validate()?;

    let metadata = ArtifactMetadata {
        state_count: lowered.state_count,
        accept_state: lowered.accept_state,
        ranges: transitions.ranges,
        equalities: transitions.equalities,
        step_ops: program.step.len(),
        anchors: lowered.anchors.clone(),
        idle_loop: lowered.idle_loop,
    };

    log::info!(
        "compiled {:?}: {} states, {} ops per byte, {:?} acceptance, {} reveals",
        pattern,
        program.state_count,
        program.step.len(),
        program.acceptance,
        program.reveals.len()
    );

    Ok(CompiledArtifact { pattern: pattern.to_string(), program, graph: to_json(dfa), metadata })
}

fn resolve_acceptance(requested: AcceptMode, automaton: &LoweredAutomaton) -> Result<Acceptance> {
    match requested {
        AcceptMode::Exists if automaton.is_single_repeat() => {
            log::warn!("single repeated unit detected; exists acceptance compiled as universal");
            Ok(Acceptance::Universal)
        }
        AcceptMode::Universal if !automaton.is_single_repeat() => {
            Err(CompilerError::StructuralInvariant(
                "universal acceptance requires a single repeated unit (two states, accept \
                 entered only from itself and the idle state)"
                    .to_string(),
            ))
        }
        mode => Ok(mode.acceptance()),
    }
}
