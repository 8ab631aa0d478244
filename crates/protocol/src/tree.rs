use serde::{Deserialize, Serialize};

use crate::diagnostics::BuildDiagnostics;
use crate::metric::MetricKind;
use crate::shared_str::SharedStr;

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// One node of the materialized call tree.
///
/// `children` is always present in memory and may be empty. On the wire an
/// empty `children` list is omitted, and a missing one decodes as empty.
/// `samples` is likewise omitted when zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameNode {
    pub name: SharedStr,
    pub value: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub samples: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FlameNode>,
}

impl FlameNode {
    pub fn leaf(name: impl Into<SharedStr>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
            samples: 0,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&FlameNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Sum of the direct children's values.
    pub fn children_value(&self) -> u64 {
        self.children
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.value))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.children);
        }
        count
    }

    /// Depth of the deepest leaf below `self` (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|c| (c, level + 1)));
        }
        deepest
    }
}

/// Profiled programs recurse deeply; unlink children onto a heap stack so
/// dropping a tall tree does not recurse once per level.
impl Drop for FlameNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// The response handed to the serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTree {
    pub tree: FlameNode,
    /// Denominator for percent-of-total display: the larger of the root's
    /// value and the sum of its children's values.
    pub total_value: u64,
    pub metric: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_nanos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<BuildDiagnostics>,
}
