//! zkregex Runtime
//!
//! Backend-agnostic representation of compiled regex circuits. This crate holds
//! the operation list produced by `zkregex-compiler`, a native evaluator used for
//! witness generation, and the renderer contract back-ends implement.

pub mod byteset;
pub mod error;
pub mod program;
pub mod render;
pub mod witness;

pub use byteset::ByteSet;
pub use error::{Result, RuntimeError};
pub use program::{
    Acceptance, AnchorTransition, ArtifactMetadata, CircuitProgram, CompiledArtifact,
    GraphTransition, NodeId, Op, Operand, RevealProgram, StateKind,
};
pub use render::{ListingRenderer, Renderer};
pub use witness::{evaluate, pad_input, Evaluation, RevealVector, Verdict};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::malformed("dangling node");
        assert_eq!(err.to_string(), "Malformed program: dangling node");
        let err = RuntimeError::invalid_input("too long");
        assert_eq!(err.to_string(), "Invalid input: too long");
    }

    #[test]
    fn test_graph_transition_json_shape() {
        let state = GraphTransition {
            kind: StateKind::Accept,
            transition: [("a,b".to_string(), 1)].into_iter().collect(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "accept");
        assert_eq!(json["transition"]["a,b"], 1);
    }

    #[test]
    fn test_byteset_serializes_as_members() {
        let set: ByteSet = b"ca".iter().copied().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[97,99]");
        let back: ByteSet = serde_json::from_str("[99,97]").unwrap();
        assert_eq!(back, set);
    }
}
