use std::collections::HashMap;

use flame_tree_protocol::SharedStr;

use super::key::NodeKey;

/// Label given to nodes whose source carried no usable name.
pub const UNKNOWN_LABEL: &str = "(unknown)";

/// Index of a node in a [`CallGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub(crate) usize);

impl NodeIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Aggregated call site. Every occurrence of the same key in the input is
/// merged into one node.
#[derive(Debug, Clone)]
pub struct MergedNode {
    pub key: NodeKey,
    pub label: SharedStr,
    /// Sum of the selected metric across all merged occurrences.
    pub metric_total: u64,
    /// Sum of the sample counts across all merged occurrences.
    pub sample_occurrences: u64,
    /// Attached children, deduplicated by key. Empty until assembly.
    pub children: Vec<NodeIdx>,
}

impl MergedNode {
    fn new(key: NodeKey, label: SharedStr) -> Self {
        Self {
            key,
            label,
            metric_total: 0,
            sample_occurrences: 0,
            children: Vec::new(),
        }
    }
}

/// Arena of merged nodes, addressed by [`NodeIdx`] and looked up by key.
///
/// One graph is created per build and dropped when the build returns.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<MergedNode>,
    index: HashMap<NodeKey, NodeIdx>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIdx) -> &MergedNode {
        &self.nodes[idx.0]
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIdx) -> &mut MergedNode {
        &mut self.nodes[idx.0]
    }

    pub fn lookup(&self, key: &str) -> Option<NodeIdx> {
        self.index.get(key).copied()
    }

    /// Node for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&MergedNode> {
        self.lookup(key).map(|idx| self.node(idx))
    }

    /// Index of `key`, creating a zeroed node with `label` on first sight.
    pub(crate) fn entry(&mut self, key: &NodeKey, label: &SharedStr) -> NodeIdx {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(MergedNode::new(key.clone(), label.clone()));
        self.index.insert(key.clone(), idx);
        idx
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIdx, &MergedNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIdx(i), n))
    }

    /// All node indices, ordered by key.
    pub fn indices_by_key(&self) -> Vec<NodeIdx> {
        let mut order: Vec<NodeIdx> = (0..self.nodes.len()).map(NodeIdx).collect();
        order.sort_by(|a, b| self.nodes[a.0].key.cmp(&self.nodes[b.0].key));
        order
    }
}

/// An assembled call graph: every node's children are attached, no cycles
/// exist, and `roots` lists the top-level nodes ordered by key.
#[derive(Debug, Clone, Default)]
pub struct CallTree {
    pub graph: CallGraph,
    pub roots: Vec<NodeIdx>,
}

impl CallTree {
    pub fn root_nodes(&self) -> impl Iterator<Item = &MergedNode> {
        self.roots.iter().map(|&idx| self.graph.node(idx))
    }

    pub fn children(&self, idx: NodeIdx) -> impl Iterator<Item = &MergedNode> {
        self.graph
            .node(idx)
            .children
            .iter()
            .map(|&child| self.graph.node(child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> NodeKey {
        NodeKey::parse(s).unwrap()
    }

    #[test]
    fn entry_creates_once() {
        let mut graph = CallGraph::new();
        let a = graph.entry(&key("a"), &SharedStr::from("f"));
        let again = graph.entry(&key("a"), &SharedStr::from("other"));
        assert_eq!(a, again);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(a).label, "f");
        assert_eq!(graph.node(a).metric_total, 0);
    }

    #[test]
    fn indices_by_key_are_sorted() {
        let mut graph = CallGraph::new();
        let label = SharedStr::from("x");
        graph.entry(&key("c"), &label);
        graph.entry(&key("a"), &label);
        graph.entry(&key("b"), &label);
        let keys: Vec<_> = graph
            .indices_by_key()
            .into_iter()
            .map(|i| graph.node(i).key.to_string())
            .collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn lookup_by_str() {
        let mut graph = CallGraph::new();
        graph.entry(&key("frame-1"), &SharedStr::from("main"));
        assert!(graph.get("frame-1").is_some());
        assert!(graph.get("frame-2").is_none());
    }
}
