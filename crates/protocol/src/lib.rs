//! Boundary types for flame-tree.
//!
//! Input records arrive already filtered by service and time range; the
//! output is a single nested call tree plus the scalars a renderer needs for
//! percent-of-total display.

pub mod diagnostics;
pub mod metric;
pub mod samples;
pub mod shared_str;
pub mod tree;

pub use diagnostics::BuildDiagnostics;
pub use metric::{MetricKind, UnknownMetric};
pub use samples::{RawFrame, RawLinkRecord, RawSample, SampleMetrics};
pub use shared_str::SharedStr;
pub use tree::{FlameNode, ProfileTree};
