use flame_tree_protocol::MetricKind;
use serde::{Deserialize, Serialize};

/// Name of the synthetic node that wraps several top-level stacks.
/// Brackets keep it apart from any real symbol name.
pub const AGGREGATE_ROOT_NAME: &str = "[all stacks]";

/// Default cap on output nodes once shared frame ids are repeated under
/// each of their parents.
pub const MAX_OUTPUT_NODES: usize = 1_000_000;

/// Per-request build settings.
///
/// Every field has a default, so a partial JSON object (or `{}`) decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
    /// Metric that becomes each node's `value` for path-identified samples.
    pub metric: MetricKind,
    /// Attach [`flame_tree_protocol::BuildDiagnostics`] to the response.
    pub include_diagnostics: bool,
    /// Name for the synthetic root used when input has no single root.
    pub aggregate_root_name: String,
    /// Upper bound on nodes in the materialized tree. Never lower than the
    /// number of distinct keys plus one, so only shared frame ids can hit it.
    pub max_output_nodes: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            include_diagnostics: false,
            aggregate_root_name: AGGREGATE_ROOT_NAME.to_string(),
            max_output_nodes: MAX_OUTPUT_NODES,
        }
    }
}

impl BuildOptions {
    pub fn with_metric(metric: MetricKind) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }

    /// Decode options from a JSON object; absent fields keep their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
