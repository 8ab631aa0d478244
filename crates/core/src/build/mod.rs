//! The sample-to-tree pipeline.
//!
//! ```text
//!   RawSample / RawLinkRecord
//!        │  identity     (key, label) per frame or record
//!        ▼
//!   MetricAccumulator    keyed node arena + parent→children key sets
//!        │  assembler    attach children, reject cycles, pick roots
//!        ▼
//!   CallTree
//!        │  materializer bounded expansion, nested output,
//!        │               siblings heaviest first
//!        ▼
//!   ProfileTree
//! ```
//!
//! Every call owns its working set and returns it as plain data; nothing is
//! cached or shared between calls, so concurrent builds need no locking.

pub mod accumulator;
pub mod assembler;
pub mod identity;
pub mod materializer;

use flame_tree_protocol::{ProfileTree, RawLinkRecord, RawSample};

pub use accumulator::{Accumulated, InputShape, MetricAccumulator, MetricDelta};
pub use assembler::assemble;
pub use materializer::{check_expansion, materialize};

use crate::error::BuildError;
use crate::options::BuildOptions;

/// A decoded batch of either input shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputBatch {
    Samples(Vec<RawSample>),
    Links(Vec<RawLinkRecord>),
}

impl InputBatch {
    pub fn shape(&self) -> InputShape {
        match self {
            Self::Samples(_) => InputShape::PathIdentified,
            Self::Links(_) => InputShape::LinkIdentified,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Samples(s) => s.len(),
            Self::Links(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a tree from leaf-first stack samples.
///
/// Frame ids must already distinguish call paths; see
/// [`identity`](self::identity) for what happens when they do not.
pub fn build_from_samples(
    samples: &[RawSample],
    options: &BuildOptions,
) -> Result<ProfileTree, BuildError> {
    let _span = tracing::info_span!("build_from_samples", samples = samples.len()).entered();
    let mut acc = MetricAccumulator::new(InputShape::PathIdentified, options.metric);
    for sample in samples {
        acc.add_sample(sample);
    }
    finish(acc, options)
}

/// Build a tree from parent-linked records. `options.metric` only labels
/// the response; each record's `metric` is used as given.
pub fn build_from_links(
    records: &[RawLinkRecord],
    options: &BuildOptions,
) -> Result<ProfileTree, BuildError> {
    let _span = tracing::info_span!("build_from_links", records = records.len()).entered();
    let mut acc = MetricAccumulator::new(InputShape::LinkIdentified, options.metric);
    for record in records {
        acc.add_link(record);
    }
    finish(acc, options)
}

pub fn build(batch: &InputBatch, options: &BuildOptions) -> Result<ProfileTree, BuildError> {
    match batch {
        InputBatch::Samples(samples) => build_from_samples(samples, options),
        InputBatch::Links(records) => build_from_links(records, options),
    }
}

fn finish(acc: MetricAccumulator, options: &BuildOptions) -> Result<ProfileTree, BuildError> {
    let accumulated = acc.finish();
    let duration_nanos = accumulated.duration_nanos;
    let (tree, diagnostics) = assemble(accumulated)?;
    let nodes = check_expansion(&tree, options.max_output_nodes)?;
    tracing::debug!(nodes, "materializing");
    let root = materialize(&tree, &options.aggregate_root_name);

    if !diagnostics.is_clean() {
        tracing::info!(?diagnostics, "build recovered from skipped input");
    }

    Ok(ProfileTree {
        total_value: root.value.max(root.children_value()),
        tree: root,
        metric: options.metric,
        duration_nanos,
        diagnostics: options.include_diagnostics.then_some(diagnostics),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flame_tree_protocol::{FlameNode, MetricKind, RawFrame, SampleMetrics};

    #[test]
    fn diagnostics_only_when_requested() {
        let samples = vec![RawSample {
            frames: vec![RawFrame {
                id: None,
                ..RawFrame::default()
            }],
            metrics: SampleMetrics::default(),
        }];
        let quiet = build_from_samples(&samples, &BuildOptions::default()).unwrap();
        assert!(quiet.diagnostics.is_none());

        let opts = BuildOptions {
            include_diagnostics: true,
            ..BuildOptions::default()
        };
        let loud = build_from_samples(&samples, &opts).unwrap();
        assert_eq!(loud.diagnostics.map(|d| d.dropped_samples), Some(1));
        assert_eq!(loud.tree, FlameNode::leaf(opts.aggregate_root_name.as_str(), 0));
    }

    #[test]
    fn total_value_uses_children_when_root_is_zero() {
        let records = vec![
            RawLinkRecord::new("root", None, "root", 0),
            RawLinkRecord::new("n1", Some("root"), "f", 100),
        ];
        let out = build_from_links(&records, &BuildOptions::default()).unwrap();
        assert_eq!(out.tree.value, 0);
        assert_eq!(out.total_value, 100);
    }

    #[test]
    fn batch_dispatches_by_shape() {
        let batch = InputBatch::Samples(vec![RawSample {
            frames: vec![RawFrame::new("a", "main")],
            metrics: SampleMetrics::cpu(3, 1),
        }]);
        assert_eq!(batch.shape(), InputShape::PathIdentified);
        let out = build(&batch, &BuildOptions::with_metric(MetricKind::Samples)).unwrap();
        assert_eq!(out.tree.value, 1);
        assert_eq!(out.metric, MetricKind::Samples);
    }
}
