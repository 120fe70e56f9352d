//! Hopcroft partition refinement
//!
//! Blocks start as {accepting} / {non-accepting} and are split against
//! splitter blocks popped from a work queue. Only blocks that contain a
//! predecessor of the splitter are examined, so each refinement round costs
//! time proportional to the incoming edges of the splitter.
//!
//! The rebuilt automaton orders its states by the comma-joined names of their
//! members, with the block holding the start state swapped to index 0.

use crate::{Dfa, DfaState, Label};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Returns the minimal DFA equivalent to `dfa`
///
/// States unreachable from the start state are dropped.
///
/// # Examples
///
/// ```
/// use zkregex_compiler::{minimal_dfa, Label};
///
/// let min = minimal_dfa("a(b|c)*").unwrap();
/// assert_eq!(min.states.len(), 2);
/// assert_eq!(min.states[1].name, "B,C,D");
/// assert_eq!(min.states[1].edges, vec![(Label::parse_key("b,c").unwrap(), 1)]);
/// ```
pub fn minimize(dfa: &Dfa) -> Dfa {
    let reachable = reachable_states(dfa);

    let alphabet: Vec<Label> = reachable
        .iter()
        .flat_map(|s| dfa.states[*s].edges.iter().map(|(label, _)| *label))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let label_index: BTreeMap<Label, usize> =
        alphabet.iter().enumerate().map(|(i, l)| (*l, i)).collect();

    // reverse[label][target] = predecessors
    let mut reverse: Vec<BTreeMap<usize, Vec<usize>>> = vec![BTreeMap::new(); alphabet.len()];
    for from in &reachable {
        for (label, target) in &dfa.states[*from].edges {
            reverse[label_index[label]].entry(*target).or_default().push(*from);
        }
    }

    let (accepting, rejecting): (Vec<usize>, Vec<usize>) =
        reachable.iter().partition(|s| dfa.states[**s].accept);
    let mut blocks: Vec<Vec<usize>> = Vec::new();
    let mut block_of = vec![usize::MAX; dfa.states.len()];
    for group in [accepting, rejecting] {
        if !group.is_empty() {
            for state in &group {
                block_of[*state] = blocks.len();
            }
            blocks.push(group);
        }
    }

    let mut queue: VecDeque<usize> = (0..blocks.len()).collect();
    let mut queued = vec![true; blocks.len()];
    let mut marked = vec![false; dfa.states.len()];
    let mut splits = 0usize;

    while let Some(splitter_id) = queue.pop_front() {
        queued[splitter_id] = false;
        let splitter = blocks[splitter_id].clone();

        for predecessors_of in &reverse {
            let mut touched: Vec<usize> = Vec::new();
            for target in &splitter {
                for pred in predecessors_of.get(target).into_iter().flatten() {
                    if !marked[*pred] {
                        marked[*pred] = true;
                        touched.push(*pred);
                    }
                }
            }
            if touched.is_empty() {
                continue;
            }

            let affected: BTreeSet<usize> = touched.iter().map(|s| block_of[*s]).collect();
            for block in affected {
                let (inside, outside): (Vec<usize>, Vec<usize>) =
                    blocks[block].iter().partition(|s| marked[**s]);
                if outside.is_empty() {
                    continue;
                }

                let new_block = blocks.len();
                for state in &outside {
                    block_of[*state] = new_block;
                }
                let smaller = if inside.len() <= outside.len() { block } else { new_block };
                blocks[block] = inside;
                blocks.push(outside);
                queued.push(false);
                splits += 1;

                if queued[block] {
                    // The queued entry now names only one half
                    queue.push_back(new_block);
                    queued[new_block] = true;
                } else if !queued[smaller] {
                    queue.push_back(smaller);
                    queued[smaller] = true;
                }
            }

            for state in touched {
                marked[state] = false;
            }
        }
    }

    log::debug!(
        "minimize: {} reachable states into {} blocks after {} splits",
        reachable.len(),
        blocks.len(),
        splits
    );

    rebuild(dfa, blocks)
}

fn reachable_states(dfa: &Dfa) -> Vec<usize> {
    let mut seen = vec![false; dfa.states.len()];
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    if !dfa.states.is_empty() {
        seen[0] = true;
        queue.push_back(0);
    }
    while let Some(state) = queue.pop_front() {
        order.push(state);
        for (_, target) in &dfa.states[state].edges {
            if !seen[*target] {
                seen[*target] = true;
                queue.push_back(*target);
            }
        }
    }
    order.sort_unstable();
    order
}

fn rebuild(dfa: &Dfa, blocks: Vec<Vec<usize>>) -> Dfa {
    let mut keyed: Vec<(String, Vec<usize>)> = blocks
        .into_iter()
        .map(|mut members| {
            members.sort_by(|a, b| dfa.states[*a].name.cmp(&dfa.states[*b].name));
            let key = members
                .iter()
                .map(|m| dfa.states[*m].name.as_str())
                .collect::<Vec<_>>()
                .join(",");
            (key, members)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some(start) = keyed.iter().position(|(_, members)| members.contains(&0)) {
        keyed.swap(0, start);
    }

    let mut new_index = vec![usize::MAX; dfa.states.len()];
    for (i, (_, members)) in keyed.iter().enumerate() {
        for member in members {
            new_index[*member] = i;
        }
    }

    let states = keyed
        .into_iter()
        .map(|(name, members)| {
            let mut merged: BTreeMap<usize, Label> = BTreeMap::new();
            for member in &members {
                for (label, target) in &dfa.states[*member].edges {
                    let entry = merged.entry(new_index[*target]).or_default();
                    *entry = entry.union(label);
                }
            }
            let mut edges: Vec<(Label, usize)> =
                merged.into_iter().map(|(target, label)| (label, target)).collect();
            edges.sort();
            let accept = members.first().is_some_and(|m| dfa.states[*m].accept);
            DfaState { name, members, accept, edges }
        })
        .collect();

    Dfa { states }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{minimal_dfa, parse, Nfa};

    fn subset(pattern: &str) -> Dfa {
        let dialect = crate::preprocess(pattern).unwrap();
        Dfa::from_nfa(&Nfa::from_ast(&parse(&dialect).unwrap()))
    }

    fn shape(dfa: &Dfa) -> Vec<(bool, Vec<(String, usize)>)> {
        dfa.states
            .iter()
            .map(|s| (s.accept, s.edges.iter().map(|(l, t)| (l.key(), *t)).collect()))
            .collect()
    }

    #[test]
    fn test_star_collapses_to_single_state() {
        let min = minimal_dfa("(a|b)*").unwrap();
        assert_eq!(min.states.len(), 1);
        assert_eq!(min.states[0].name, "A,B,C");
        assert_eq!(shape(&min), vec![(true, vec![("a,b".to_string(), 0)])]);
    }

    #[test]
    fn test_plus_keeps_entry_state() {
        let min = minimal_dfa("(a|b)+").unwrap();
        let names: Vec<&str> = min.states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B,C,D,E"]);
        assert_eq!(shape(&min)[1], (true, vec![("a,b".to_string(), 1)]));
    }

    #[test]
    fn test_two_accepting_blocks() {
        let min = minimal_dfa("(a|b)*(c|d)*").unwrap();
        let names: Vec<&str> = min.states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A,B,C", "D,E"]);
        assert_eq!(
            shape(&min)[0],
            (true, vec![("a,b".to_string(), 0), ("c,d".to_string(), 1)])
        );
    }

    #[test]
    fn test_merged_accept_targets() {
        let min = minimal_dfa("ab|b").unwrap();
        let names: Vec<&str> = min.states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C,D"]);
        assert_eq!(
            shape(&min),
            vec![
                (false, vec![("a".to_string(), 1), ("b".to_string(), 2)]),
                (false, vec![("b".to_string(), 2)]),
                (true, vec![]),
            ]
        );
    }

    #[test]
    fn test_never_grows() {
        for pattern in ["a(b|c)*", "(a|b)*abb(a|b)*", "(mina|MINA)+", "[a-z]+@[a-z]+", "x?y?z?"] {
            let dfa = subset(pattern);
            assert!(minimize(&dfa).states.len() <= dfa.states.len(), "{}", pattern);
        }
    }

    #[test]
    fn test_idempotent_up_to_renaming() {
        for pattern in ["1=(a|b) (2=(b|c)+ )+d", "(mina|MINA)+", "a:[^a-z]+.", "(a|b)*abb(a|b)*"] {
            let once = minimal_dfa(pattern).unwrap();
            let twice = minimize(&once);
            assert_eq!(shape(&once), shape(&twice), "{}", pattern);
        }
    }

    #[test]
    fn test_unreachable_states_dropped() {
        let mut dfa = subset("ab");
        dfa.states.push(DfaState {
            name: "Z".to_string(),
            members: vec![],
            accept: true,
            edges: vec![],
        });
        let min = minimize(&dfa);
        assert_eq!(min.states.len(), 3);
    }
}
