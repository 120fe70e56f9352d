//! Serializable automaton export
//!
//! A minimal DFA is exported as one [`GraphTransition`] per state, in state
//! order. The exported form can be cached and reloaded with [`from_graph`].

use crate::{CompilerError, Dfa, DfaState, Label, Result};
use std::collections::BTreeMap;
use zkregex_runtime::{GraphTransition, StateKind};

/// Exports `dfa` as a list of `{type, transition}` records
pub fn to_json(dfa: &Dfa) -> Vec<GraphTransition> {
    dfa.states
        .iter()
        .map(|state| GraphTransition {
            kind: if state.accept { StateKind::Accept } else { StateKind::Normal },
            transition: state.edges.iter().map(|(label, target)| (label.key(), *target)).collect(),
        })
        .collect()
}

/// Serializes the export with `serde_json`
pub fn to_json_string(dfa: &Dfa) -> Result<String> {
    serde_json::to_string_pretty(&to_json(dfa))
        .map_err(|e| CompilerError::InvalidGraph(e.to_string()))
}

/// Rebuilds an automaton from its exported form
///
/// State names become their decimal index. Edges to the same target are
/// merged, so a graph written by hand with split labels loads in canonical form.
pub fn from_graph(graph: &[GraphTransition]) -> Result<Dfa> {
    if graph.is_empty() {
        return Err(CompilerError::InvalidGraph("graph has no states".to_string()));
    }

    let mut states = Vec::with_capacity(graph.len());
    for (index, record) in graph.iter().enumerate() {
        let mut merged: BTreeMap<usize, Label> = BTreeMap::new();
        let mut seen = Label::default();
        for (key, target) in &record.transition {
            if *target >= graph.len() {
                return Err(CompilerError::InvalidGraph(format!(
                    "state {} has an edge to unknown state {}",
                    index, target
                )));
            }
            let label = Label::parse_key(key)?;
            if !seen.bytes().intersection(label.bytes()).is_empty()
                || (seen.is_negated() && label.is_negated())
            {
                return Err(CompilerError::InvalidGraph(format!(
                    "state {} is not deterministic on {:?}",
                    index, key
                )));
            }
            seen = seen.union(&label);
            let entry = merged.entry(*target).or_default();
            *entry = entry.union(&label);
        }

        let mut edges: Vec<(Label, usize)> =
            merged.into_iter().map(|(target, label)| (label, target)).collect();
        edges.sort();
        states.push(DfaState {
            name: index.to_string(),
            members: vec![index],
            accept: record.kind == StateKind::Accept,
            edges,
        });
    }

    Ok(Dfa { states })
}

impl Dfa {
    /// See [`from_graph`]
    pub fn from_graph(graph: &[GraphTransition]) -> Result<Dfa> {
        from_graph(graph)
    }
}
