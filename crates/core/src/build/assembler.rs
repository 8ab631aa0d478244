//! Tree assembly: attach children, reject cycles, pick the root(s).

use std::collections::{HashMap, VecDeque};

use flame_tree_protocol::BuildDiagnostics;

use super::accumulator::{Accumulated, InputShape};
use crate::error::MalformedInput;
use crate::model::{CallGraph, CallTree, NodeIdx, NodeKey};

/// Wire the accumulated edges into the node arena and resolve the roots.
///
/// Path-identified input keeps every outermost frame that nobody else
/// lists as a child; several such roots are allowed and later wrapped by
/// the materializer. A node listed under more than one parent is kept
/// under each of them and counted in `shared_children`.
///
/// Link-identified input must have exactly one parentless record and each
/// node at most one parent. Nodes that cannot be reached from the root are
/// discarded and counted in `unreachable_records`.
///
/// Cycles are always rejected; no edge is ever dropped to break one.
pub fn assemble(acc: Accumulated) -> Result<(CallTree, BuildDiagnostics), MalformedInput> {
    let Accumulated {
        shape,
        mut graph,
        edges,
        roots,
        mut diagnostics,
        ..
    } = acc;

    let mut parents: HashMap<NodeIdx, Vec<NodeKey>> = HashMap::new();
    for (parent_key, child_keys) in &edges {
        let Some(parent) = graph.lookup(parent_key.as_str()) else {
            // Link records under an unknown parent stay detached and are
            // counted as unreachable below.
            tracing::warn!(parent = %parent_key, children = child_keys.len(), "parent not found");
            continue;
        };
        for child_key in child_keys {
            let Some(child) = graph.lookup(child_key.as_str()) else {
                diagnostics.dangling_children += 1;
                tracing::warn!(parent = %parent_key, child = %child_key, "skipping dangling child");
                continue;
            };
            graph.node_mut(parent).children.push(child);
            parents.entry(child).or_default().push(parent_key.clone());
        }
    }

    for idx in graph.indices_by_key() {
        let Some(claims) = parents.get(&idx) else {
            continue;
        };
        let key = &graph.node(idx).key;
        match shape {
            InputShape::LinkIdentified => {
                if let [first, second, ..] = claims.as_slice() {
                    return Err(MalformedInput::ConflictingParent {
                        key: key.clone(),
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
                if roots.contains(key) {
                    return Err(MalformedInput::RootHasParent {
                        key: key.clone(),
                        parent: claims[0].clone(),
                    });
                }
            }
            InputShape::PathIdentified => {
                if claims.len() > 1 {
                    diagnostics.shared_children += 1;
                    tracing::warn!(
                        key = %key,
                        parents = claims.len(),
                        "frame id reached through several parents; subtree will be repeated"
                    );
                }
            }
        }
    }

    if let Some((key, parent)) = find_cycle(&graph) {
        return Err(MalformedInput::Cycle {
            key: graph.node(key).key.clone(),
            parent: graph.node(parent).key.clone(),
        });
    }

    let root_indices: Vec<NodeIdx> = roots
        .iter()
        .filter_map(|key| graph.lookup(key.as_str()))
        .collect();

    let roots = match shape {
        InputShape::PathIdentified => root_indices
            .into_iter()
            .filter(|idx| !parents.contains_key(idx))
            .collect(),
        InputShape::LinkIdentified => {
            if graph.is_empty() {
                Vec::new()
            } else {
                let root = match root_indices.as_slice() {
                    [] => return Err(MalformedInput::NoRoot),
                    [root] => *root,
                    _ => {
                        return Err(MalformedInput::MultipleRoots {
                            keys: root_indices
                                .iter()
                                .map(|&idx| graph.node(idx).key.clone())
                                .collect(),
                        });
                    }
                };
                let reached = count_reachable(&graph, root);
                let unreachable = (graph.len() - reached) as u64;
                if unreachable > 0 {
                    diagnostics.unreachable_records += unreachable;
                    tracing::warn!(unreachable, "discarding records not connected to the root");
                }
                vec![root]
            }
        }
    };

    tracing::debug!(nodes = graph.len(), roots = roots.len(), "tree assembled");
    Ok((CallTree { graph, roots }, diagnostics))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// First edge `(parent -> child)` that closes a cycle, as `(child, parent)`.
///
/// Iterative depth-first search with an explicit stack, started from every
/// node in key order so the reported edge does not depend on input order.
fn find_cycle(graph: &CallGraph) -> Option<(NodeIdx, NodeIdx)> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut stack: Vec<(NodeIdx, usize)> = Vec::new();

    for start in graph.indices_by_key() {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }
        marks[start.index()] = Mark::OnPath;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            match graph.node(node).children.get(cursor) {
                Some(&child) => {
                    top.1 += 1;
                    match marks[child.index()] {
                        Mark::OnPath => return Some((child, node)),
                        Mark::Unvisited => {
                            marks[child.index()] = Mark::OnPath;
                            stack.push((child, 0));
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    None
}

fn count_reachable(graph: &CallGraph, root: NodeIdx) -> usize {
    let mut seen = vec![false; graph.len()];
    let mut queue = VecDeque::from([root]);
    seen[root.index()] = true;
    let mut count = 0;
    while let Some(idx) = queue.pop_front() {
        count += 1;
        for &child in &graph.node(idx).children {
            if !seen[child.index()] {
                seen[child.index()] = true;
                queue.push_back(child);
            }
        }
    }
    count
}
