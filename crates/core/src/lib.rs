//! Reconstructs a weighted call tree from profiling stack samples.
//!
//! Input is a batch that is already fetched and filtered. It comes in one of
//! two shapes: path-identified [`RawSample`]s (full leaf-first stacks) or
//! link-identified [`RawLinkRecord`]s (nodes that name their parent). Output
//! is a single-rooted [`ProfileTree`] ready for flame graph rendering.
//!
//! The transformation is pure and deterministic. It does no I/O, keeps no
//! state between calls, and gives the same tree for any order of the input
//! batch.
//!
//! Path-identified merging trusts the upstream frame ids: two frames with the
//! same id are the same call site. When distinct call paths share an id,
//! their subtrees are merged, and the shared node appears under each of its
//! parents with its combined total. The build reports this as
//! `shared_children` in [`BuildDiagnostics`] instead of inventing new ids.
//!
//! ```
//! use flame_tree_core::{build_from_links, BuildOptions};
//! use flame_tree_protocol::RawLinkRecord;
//!
//! let records = vec![
//!     RawLinkRecord::new("root", None, "root", 0),
//!     RawLinkRecord::new("n1", Some("root"), "f", 100),
//!     RawLinkRecord::new("n2", Some("root"), "g", 50),
//! ];
//! let profile = build_from_links(&records, &BuildOptions::default()).unwrap();
//! assert_eq!(profile.tree.children[0].name, "f");
//! assert_eq!(profile.total_value, 150);
//! ```

pub mod build;
pub mod error;
pub mod model;
pub mod options;
pub mod parsers;

pub use build::{InputBatch, build, build_from_links, build_from_samples};
pub use error::{BuildError, MalformedInput};
pub use options::{AGGREGATE_ROOT_NAME, BuildOptions, MAX_OUTPUT_NODES};

pub use flame_tree_protocol::{
    BuildDiagnostics, FlameNode, MetricKind, ProfileTree, RawFrame, RawLinkRecord, RawSample,
    SampleMetrics,
};
