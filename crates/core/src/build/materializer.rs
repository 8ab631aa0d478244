//! Materialization: assembled call tree to nested [`FlameNode`]s.
//!
//! Siblings are ordered by descending value, ties broken by ascending key,
//! so identical input always serializes identically. Leaves carry an empty
//! `children` list, which the wire format omits.
//!
//! Both the size check and the output walk use explicit stacks; stack depth
//! in the input never turns into call depth here.

use std::cmp::Reverse;

use flame_tree_protocol::{FlameNode, SharedStr};

use crate::error::MalformedInput;
use crate::model::{CallGraph, CallTree, MergedNode, NodeIdx};

/// Produce the single-rooted output tree.
///
/// - no roots (empty input): a synthetic root with value 0 and no children;
/// - one root: that node;
/// - several roots: a synthetic root named `aggregate_name` whose value and
///   sample count are the sums over its children.
///
/// A node attached under several parents is written out once under each.
/// Run [`check_expansion`] first to bound the resulting size.
pub fn materialize(tree: &CallTree, aggregate_name: &str) -> FlameNode {
    match tree.roots.as_slice() {
        [] => FlameNode::leaf(aggregate_name, 0),
        [root] => materialize_node(&tree.graph, *root),
        roots => {
            let children: Vec<FlameNode> = ordered(&tree.graph, roots)
                .into_iter()
                .map(|idx| materialize_node(&tree.graph, idx))
                .collect();
            FlameNode {
                name: SharedStr::from(aggregate_name),
                value: children.iter().fold(0u64, |acc, c| acc.saturating_add(c.value)),
                samples: children
                    .iter()
                    .fold(0u64, |acc, c| acc.saturating_add(c.samples)),
                children,
            }
        }
    }
}

/// A node whose children are still being written out.
struct Pending<'a> {
    node: &'a MergedNode,
    rest: std::vec::IntoIter<NodeIdx>,
    done: Vec<FlameNode>,
}

impl<'a> Pending<'a> {
    fn new(graph: &'a CallGraph, idx: NodeIdx) -> Self {
        let node = graph.node(idx);
        Self {
            node,
            rest: ordered(graph, &node.children).into_iter(),
            done: Vec::with_capacity(node.children.len()),
        }
    }

    fn finish(self) -> FlameNode {
        FlameNode {
            name: self.node.label.clone(),
            value: self.node.metric_total,
            samples: self.node.sample_occurrences,
            children: self.done,
        }
    }
}

fn materialize_node(graph: &CallGraph, root: NodeIdx) -> FlameNode {
    let mut ancestors: Vec<Pending<'_>> = Vec::new();
    let mut current = Pending::new(graph, root);
    loop {
        if let Some(child) = current.rest.next() {
            ancestors.push(std::mem::replace(&mut current, Pending::new(graph, child)));
            continue;
        }
        let node = current.finish();
        match ancestors.pop() {
            Some(mut parent) => {
                parent.done.push(node);
                current = parent;
            }
            None => return node,
        }
    }
}

/// `nodes` sorted heaviest first, then by key.
pub fn ordered(graph: &CallGraph, nodes: &[NodeIdx]) -> Vec<NodeIdx> {
    let mut sorted = nodes.to_vec();
    sorted.sort_by_key(|&idx| {
        let node = graph.node(idx);
        (Reverse(node.metric_total), node.key.clone())
    });
    sorted
}

/// Number of output nodes each arena node expands to, shared subtrees
/// counted once per parent. Saturates instead of overflowing.
///
/// The graph must be acyclic, which [`assemble`](super::assemble) guarantees.
pub fn expanded_sizes(graph: &CallGraph) -> Vec<u64> {
    // 0 marks "not computed yet"; every finished size is at least 1.
    let mut sizes = vec![0u64; graph.len()];
    let mut stack: Vec<(NodeIdx, bool)> = Vec::new();
    for (start, _) in graph.iter() {
        if sizes[start.index()] != 0 {
            continue;
        }
        stack.push((start, false));
        while let Some((idx, children_done)) = stack.pop() {
            let node = graph.node(idx);
            if children_done {
                sizes[idx.index()] = node
                    .children
                    .iter()
                    .fold(1u64, |acc, c| acc.saturating_add(sizes[c.index()]));
                continue;
            }
            if sizes[idx.index()] != 0 {
                continue;
            }
            stack.push((idx, true));
            stack.extend(
                node.children
                    .iter()
                    .filter(|c| sizes[c.index()] == 0)
                    .map(|&c| (c, false)),
            );
        }
    }
    sizes
}

/// Reject trees whose shared subtrees would expand past `limit` output
/// nodes. The limit never falls below one node per key plus the synthetic
/// root, so input without shared children always passes.
///
/// Returns the number of nodes [`materialize`] will produce.
pub fn check_expansion(tree: &CallTree, limit: usize) -> Result<u64, MalformedInput> {
    let graph = &tree.graph;
    let sizes = expanded_sizes(graph);
    let mut total = tree
        .roots
        .iter()
        .fold(0u64, |acc, r| acc.saturating_add(sizes[r.index()]));
    if tree.roots.len() != 1 {
        total = total.saturating_add(1);
    }

    let limit = limit.max(graph.len() + 1) as u64;
    if total <= limit {
        return Ok(total);
    }

    let mut parents = vec![0usize; graph.len()];
    for (_, node) in graph.iter() {
        for child in &node.children {
            parents[child.index()] += 1;
        }
    }
    // Blame the shared node that adds the most repeated output.
    let culprit = graph
        .indices_by_key()
        .into_iter()
        .filter(|idx| parents[idx.index()] > 1)
        .max_by_key(|idx| {
            let extra = sizes[idx.index()].saturating_mul(parents[idx.index()] as u64 - 1);
            (extra, Reverse(graph.node(*idx).key.clone()))
        });
    let Some(idx) = culprit else {
        return Ok(total);
    };
    tracing::warn!(
        key = %graph.node(idx).key,
        parents = parents[idx.index()],
        nodes = total,
        limit,
        "shared frame ids expand the tree past the output limit"
    );
    Err(MalformedInput::SharedExpansion {
        key: graph.node(idx).key.clone(),
        parents: parents[idx.index()],
        nodes: total,
    })
}
