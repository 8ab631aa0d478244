//! Metric accumulation: merge every occurrence of a key into one node.
//!
//! Totals are plain saturating `u64` sums, so the result does not depend on
//! the order in which samples arrive. Parent/child observations are kept in
//! an ordered set per parent: an edge seen in a thousand samples is recorded
//! once, and all weight lives on the nodes.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use flame_tree_protocol::{BuildDiagnostics, MetricKind, RawLinkRecord, RawSample, SharedStr};

use super::identity::{self, Resolved};
use crate::model::{CallGraph, NodeIdx, NodeKey, UNKNOWN_LABEL};

/// How the input identifies parent/child relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// Full leaf-first stacks whose frame ids encode the call path.
    PathIdentified,
    /// Single nodes that name their parent explicitly.
    LinkIdentified,
}

/// Weight contributed by one occurrence of a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricDelta {
    pub value: u64,
    pub samples: u64,
}

/// Parent key to the set of child keys observed under it.
pub type EdgeMap = BTreeMap<NodeKey, BTreeSet<NodeKey>>;

/// Builds the keyed node table for one request. Feed it one input shape.
#[derive(Debug)]
pub struct MetricAccumulator {
    shape: InputShape,
    metric: MetricKind,
    graph: CallGraph,
    edges: EdgeMap,
    roots: BTreeSet<NodeKey>,
    duration_nanos: Option<u64>,
    diagnostics: BuildDiagnostics,
}

/// Everything the accumulator collected. No further merging happens once
/// this is handed to the assembler.
#[derive(Debug)]
pub struct Accumulated {
    pub shape: InputShape,
    pub graph: CallGraph,
    pub edges: EdgeMap,
    /// Path-identified: the outermost frame of every sample.
    /// Link-identified: every record without a parent.
    pub roots: BTreeSet<NodeKey>,
    pub duration_nanos: Option<u64>,
    pub diagnostics: BuildDiagnostics,
}

impl Accumulated {
    /// `(metric_total, sample_occurrences)` per key, ordered by key.
    pub fn totals(&self) -> BTreeMap<NodeKey, (u64, u64)> {
        self.graph
            .iter()
            .map(|(_, n)| (n.key.clone(), (n.metric_total, n.sample_occurrences)))
            .collect()
    }
}

impl MetricAccumulator {
    pub fn new(shape: InputShape, metric: MetricKind) -> Self {
        Self {
            shape,
            metric,
            graph: CallGraph::new(),
            edges: EdgeMap::new(),
            roots: BTreeSet::new(),
            duration_nanos: None,
            diagnostics: BuildDiagnostics::default(),
        }
    }

    /// Merge one occurrence of `node`, creating it on first sight.
    ///
    /// When the same key arrives with different labels, a real label wins
    /// over `(unknown)`, and otherwise the smaller label wins, so the result
    /// is the same for any arrival order.
    pub fn observe(&mut self, node: &Resolved, delta: MetricDelta) -> NodeIdx {
        let idx = self.graph.entry(&node.key, &node.label);
        let merged = self.graph.node_mut(idx);
        if prefer_label(&node.label, &merged.label) {
            merged.label = node.label.clone();
        }
        merged.metric_total = merged.metric_total.saturating_add(delta.value);
        merged.sample_occurrences = merged.sample_occurrences.saturating_add(delta.samples);
        idx
    }

    /// Record `child` under `parent`. Repeated observations are no-ops.
    pub fn link(&mut self, parent: NodeKey, child: NodeKey) {
        self.edges.entry(parent).or_default().insert(child);
    }

    /// Mark `key` as a candidate root.
    pub fn mark_root(&mut self, key: NodeKey) {
        self.roots.insert(key);
    }

    /// Merge one leaf-first stack sample.
    ///
    /// A sample with any frame lacking an id is dropped whole. Each key is
    /// weighted at most once per sample, so recursion does not inflate
    /// inclusive totals. A key repeated back to back is collapsed; a key
    /// repeated further up the stack is linked as its own ancestor and
    /// rejected later as a cycle.
    pub fn add_sample(&mut self, sample: &RawSample) {
        let mut resolved = Vec::with_capacity(sample.frames.len());
        let mut missing = 0u64;
        for frame in &sample.frames {
            match identity::resolve_frame(frame) {
                Ok(r) => resolved.push(r),
                Err(_) => missing += 1,
            }
        }
        if missing > 0 || resolved.is_empty() {
            self.diagnostics.dropped_samples += 1;
            self.diagnostics.dropped_frames += missing;
            tracing::debug!(
                frames = sample.frames.len(),
                missing,
                "dropping sample without usable frame ids"
            );
            return;
        }

        let delta = MetricDelta {
            value: sample.metrics.value(self.metric),
            samples: sample.metrics.sample_count,
        };
        let mut weighted: HashSet<NodeKey> = HashSet::with_capacity(resolved.len());
        let mut previous: Option<NodeKey> = None;
        for frame in &resolved {
            if previous.as_ref() == Some(&frame.key) {
                continue;
            }
            if weighted.insert(frame.key.clone()) {
                self.observe(frame, delta);
            }
            if let Some(child) = previous.take() {
                self.link(frame.key.clone(), child);
            }
            previous = Some(frame.key.clone());
        }
        if let Some(outermost) = previous {
            self.mark_root(outermost);
        }
    }

    /// Merge one link record. Records without a node id are dropped.
    pub fn add_link(&mut self, record: &RawLinkRecord) {
        let link = match identity::resolve_link(record) {
            Ok(link) => link,
            Err(err) => {
                self.diagnostics.dropped_records += 1;
                tracing::debug!(label = ?record.label, "dropping link record: {err}");
                return;
            }
        };
        self.observe(
            &link.node,
            MetricDelta {
                value: record.metric,
                samples: record.samples,
            },
        );
        match link.parent {
            Some(parent) => self.link(parent, link.node.key),
            None => {
                if let Some(d) = record.duration_nanos {
                    self.duration_nanos = Some(self.duration_nanos.unwrap_or(0).saturating_add(d));
                }
                self.mark_root(link.node.key);
            }
        }
    }

    pub fn finish(self) -> Accumulated {
        tracing::debug!(
            nodes = self.graph.len(),
            parents = self.edges.len(),
            roots = self.roots.len(),
            "accumulation finished"
        );
        Accumulated {
            shape: self.shape,
            graph: self.graph,
            edges: self.edges,
            roots: self.roots,
            duration_nanos: self.duration_nanos,
            diagnostics: self.diagnostics,
        }
    }
}

fn prefer_label(candidate: &SharedStr, current: &SharedStr) -> bool {
    match (*candidate == UNKNOWN_LABEL, *current == UNKNOWN_LABEL) {
        (true, _) => false,
        (false, true) => true,
        (false, false) => candidate < current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flame_tree_protocol::{RawFrame, SampleMetrics};

    fn sample(frames: &[(&str, &str)], cpu: u64) -> RawSample {
        RawSample {
            frames: frames.iter().map(|(id, f)| RawFrame::new(*id, *f)).collect(),
            metrics: SampleMetrics::cpu(cpu, 1),
        }
    }

    fn children(acc: &Accumulated, parent: &str) -> Vec<String> {
        acc.edges
            .get(parent)
            .map(|s| s.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn repeated_keys_sum_metrics() {
        let mut acc = MetricAccumulator::new(InputShape::PathIdentified, MetricKind::CpuNanos);
        acc.add_sample(&sample(&[("a", "leaf"), ("m", "main")], 10));
        acc.add_sample(&sample(&[("a", "leaf"), ("m", "main")], 5));
        let acc = acc.finish();

        let totals = acc.totals();
        assert_eq!(totals.get("a"), Some(&(15, 2)));
        assert_eq!(totals.get("m"), Some(&(15, 2)));
        assert_eq!(children(&acc, "m"), ["a"]);
        assert_eq!(acc.roots.len(), 1);
    }

    #[test]
    fn edges_are_deduplicated() {
        let mut acc = MetricAccumulator::new(InputShape::PathIdentified, MetricKind::CpuNanos);
        for _ in 0..50 {
            acc.add_sample(&sample(&[("a", "f"), ("b", "g"), ("c", "main")], 1));
        }
        let acc = acc.finish();
        assert_eq!(acc.edges.values().map(BTreeSet::len).sum::<usize>(), 2);
        assert_eq!(children(&acc, "c"), ["b"]);
        assert_eq!(children(&acc, "b"), ["a"]);
    }

    #[test]
    fn selected_metric_drives_value() {
        let mut acc = MetricAccumulator::new(InputShape::PathIdentified, MetricKind::AllocBytes);
        acc.add_sample(&RawSample {
            frames: vec![RawFrame::new("a", "alloc")],
            metrics: SampleMetrics {
                cpu_time_nanos: 999,
                alloc_space_bytes: 4096,
                sample_count: 3,
                ..SampleMetrics::default()
            },
        });
        let acc = acc.finish();
        assert_eq!(acc.totals().get("a"), Some(&(4096, 3)));
    }

    #[test]
    fn sample_with_missing_id_is_dropped_whole() {
        let mut acc = MetricAccumulator::new(InputShape::PathIdentified, MetricKind::CpuNanos);
        let mut bad = sample(&[("a", "f"), ("m", "main")], 10);
        bad.frames[1].id = None;
        acc.add_sample(&bad);
        acc.add_sample(&RawSample::default());
        let acc = acc.finish();
        assert!(acc.graph.is_empty());
        assert!(acc.roots.is_empty());
        assert_eq!(acc.diagnostics.dropped_samples, 2);
        assert_eq!(acc.diagnostics.dropped_frames, 1);
    }

    #[test]
    fn adjacent_recursion_is_collapsed() {
        let mut acc = MetricAccumulator::new(InputShape::PathIdentified, MetricKind::CpuNanos);
        acc.add_sample(&sample(&[("a", "f"), ("r", "rec"), ("r", "rec"), ("m", "main")], 7));
        let acc = acc.finish();
        assert_eq!(acc.totals().get("r"), Some(&(7, 1)));
        assert!(children(&acc, "r").iter().all(|c| c != "r"));
        assert_eq!(children(&acc, "m"), ["r"]);
    }

    #[test]
    fn non_adjacent_repeat_records_back_edge() {
        let mut acc = MetricAccumulator::new(InputShape::PathIdentified, MetricKind::CpuNanos);
        acc.add_sample(&sample(&[("a", "f"), ("b", "g"), ("a", "f")], 4));
        let acc = acc.finish();
        assert_eq!(acc.totals().get("a"), Some(&(4, 1)));
        assert_eq!(children(&acc, "b"), ["a"]);
        assert_eq!(children(&acc, "a"), ["b"]);
    }

    #[test]
    fn label_choice_ignores_order() {
        let run = |first: &str, second: &str| {
            let mut acc =
                MetricAccumulator::new(InputShape::PathIdentified, MetricKind::CpuNanos);
            acc.add_sample(&sample(&[("k", first)], 1));
            acc.add_sample(&sample(&[("k", second)], 1));
            acc.finish().graph.get("k").map(|n| n.label.to_string())
        };
        assert_eq!(run("zeta", "alpha"), run("alpha", "zeta"));
        assert_eq!(run("", "named"), Some("named".to_string()));
        assert_eq!(run("named", ""), Some("named".to_string()));
    }

    #[test]
    fn link_records_register_roots_and_edges() {
        let mut acc = MetricAccumulator::new(InputShape::LinkIdentified, MetricKind::CpuNanos);
        let mut root = RawLinkRecord::new("root", None, "root", 0);
        root.duration_nanos = Some(1_000);
        acc.add_link(&root);
        acc.add_link(&RawLinkRecord::new("n1", Some("root"), "f", 100));
        acc.add_link(&RawLinkRecord::new("n1", Some("root"), "f", 20));
        acc.add_link(&RawLinkRecord::default());
        let acc = acc.finish();

        assert_eq!(acc.totals().get("n1"), Some(&(120, 0)));
        assert_eq!(children(&acc, "root"), ["n1"]);
        assert_eq!(acc.roots.iter().map(ToString::to_string).collect::<Vec<_>>(), ["root"]);
        assert_eq!(acc.duration_nanos, Some(1_000));
        assert_eq!(acc.diagnostics.dropped_records, 1);
    }
}
