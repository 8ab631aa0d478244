pub mod collapsed;
pub mod elastic;
pub mod native;

use flame_tree_protocol::MetricKind;
use serde_json::Value;
use thiserror::Error;

use crate::build::InputBatch;

pub use collapsed::parse_collapsed;
pub use elastic::{parse_node_buckets, parse_stack_buckets};
pub use native::{parse_links, parse_samples};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("native: {0}")]
    Native(#[from] native::NativeParseError),
    #[error("aggregation: {0}")]
    Elastic(#[from] elastic::ElasticParseError),
    #[error("collapsed: {0}")]
    Collapsed(#[from] collapsed::CollapsedParseError),
    #[error("unable to detect format")]
    UnknownFormat,
}

/// Input layouts understood by [`parse_as`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Samples,
    Links,
    StackBuckets,
    NodeBuckets,
    Collapsed,
}

/// Parse `data` as a known layout. `metric` picks which count collapsed
/// stacks fill in and which sum node buckets report.
pub fn parse_as(
    data: &[u8],
    format: InputFormat,
    metric: MetricKind,
) -> Result<InputBatch, ParseError> {
    Ok(match format {
        InputFormat::Samples => InputBatch::Samples(parse_samples(data)?),
        InputFormat::Links => InputBatch::Links(parse_links(data)?),
        InputFormat::StackBuckets => InputBatch::Samples(parse_stack_buckets(data)?),
        InputFormat::NodeBuckets => InputBatch::Links(parse_node_buckets(data, metric)?),
        InputFormat::Collapsed => InputBatch::Samples(parse_collapsed(data, metric)?),
    })
}

/// Detect the input layout from its top-level shape.
///
/// Detection strategy:
/// 1. JSON object with `aggregations.stacks` / `aggregations.nodes`:
///    aggregation responses.
/// 2. JSON object with `samples` / `nodes`, or an array whose first element
///    has `frames` / `nodeId`: native batches. An empty array is an empty
///    sample batch.
/// 3. Anything else that is not JSON: collapsed stacks.
pub fn detect_format(data: &[u8]) -> Option<InputFormat> {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return std::str::from_utf8(data)
            .is_ok()
            .then_some(InputFormat::Collapsed);
    };

    if let Some(obj) = value.as_object() {
        if let Some(aggs) = obj.get("aggregations").and_then(Value::as_object) {
            if aggs.contains_key("stacks") {
                return Some(InputFormat::StackBuckets);
            }
            if aggs.contains_key("nodes") {
                return Some(InputFormat::NodeBuckets);
            }
            return None;
        }
        if obj.contains_key("samples") {
            return Some(InputFormat::Samples);
        }
        if obj.contains_key("nodes") {
            return Some(InputFormat::Links);
        }
        return None;
    }

    let arr = value.as_array()?;
    match arr.first() {
        None => Some(InputFormat::Samples),
        Some(first) if first.get("frames").is_some() => Some(InputFormat::Samples),
        Some(first) if first.get("nodeId").is_some() => Some(InputFormat::Links),
        Some(_) => None,
    }
}

/// Auto-detect the input layout and parse it.
pub fn parse_auto(data: &[u8], metric: MetricKind) -> Result<InputBatch, ParseError> {
    let format = detect_format(data).ok_or(ParseError::UnknownFormat)?;
    tracing::debug!(?format, bytes = data.len(), "detected input format");
    parse_as(data, format, metric)
}
