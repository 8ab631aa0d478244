//! Decoders for search-engine aggregation responses.
//!
//! Two response layouts are understood:
//!
//! - **stack buckets**: a terms aggregation `stacks` keyed by the leaf frame
//!   id, with sum sub-aggregations per metric and one `top_hit` document
//!   carrying the full `profile.stack` (leaf first);
//! - **node buckets**: a terms aggregation `nodes` keyed by node id, with
//!   `parent_id` and `function` terms sub-aggregations and sum
//!   sub-aggregations for `cpu_ns`, `duration_ns` and `samples_count`.
//!
//! Sum aggregations report floating-point values; they are rounded to the
//! nearest integer and negative or non-finite sums read as zero.

use flame_tree_protocol::{MetricKind, RawFrame, RawLinkRecord, RawSample, SampleMetrics};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElasticParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response has no `{0}` aggregation")]
    MissingAggregation(&'static str),
    #[error("node buckets carry no {0} metric")]
    UnsupportedMetric(MetricKind),
}

#[derive(Debug, Deserialize)]
struct SearchResponse<A> {
    aggregations: Option<A>,
}

#[derive(Debug, Deserialize)]
struct Buckets<B> {
    #[serde(default = "Vec::new")]
    buckets: Vec<B>,
}

#[derive(Debug, Default, Deserialize)]
struct Sum {
    value: Option<f64>,
}

impl Sum {
    fn get(sum: Option<&Sum>) -> u64 {
        sum.and_then(|s| s.value)
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(0, |v| v.round() as u64)
    }
}

#[derive(Debug, Deserialize)]
struct TermBucket {
    key: Value,
}

fn first_key(terms: Option<&Buckets<TermBucket>>) -> Option<String> {
    terms
        .and_then(|t| t.buckets.first())
        .and_then(|b| key_string(&b.key))
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// --- stack buckets ---

#[derive(Debug, Deserialize)]
struct StackAggregations {
    stacks: Option<Buckets<StackBucket>>,
}

#[derive(Debug, Deserialize)]
struct StackBucket {
    duration_us: Option<Sum>,
    cpu_ns: Option<Sum>,
    samples_count: Option<Sum>,
    alloc_objects: Option<Sum>,
    alloc_space: Option<Sum>,
    inuse_objects: Option<Sum>,
    inuse_space: Option<Sum>,
    top_hit: Option<TopHit>,
}

#[derive(Debug, Deserialize)]
struct TopHit {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    profile: HitProfile,
}

#[derive(Debug, Deserialize)]
struct HitProfile {
    #[serde(default)]
    stack: Vec<RawFrame>,
}

/// Parse a `stacks` aggregation response into path-identified samples.
///
/// A bucket without a top hit becomes a sample with no frames, which the
/// accumulator drops and counts.
pub fn parse_stack_buckets(data: &[u8]) -> Result<Vec<RawSample>, ElasticParseError> {
    let response: SearchResponse<StackAggregations> = serde_json::from_slice(data)?;
    let stacks = response
        .aggregations
        .and_then(|a| a.stacks)
        .ok_or(ElasticParseError::MissingAggregation("stacks"))?;

    Ok(stacks
        .buckets
        .into_iter()
        .map(|bucket| {
            let metrics = SampleMetrics {
                cpu_time_nanos: Sum::get(bucket.cpu_ns.as_ref()),
                sample_count: Sum::get(bucket.samples_count.as_ref()),
                wall_duration_micros: Sum::get(bucket.duration_us.as_ref()),
                alloc_objects: Sum::get(bucket.alloc_objects.as_ref()),
                alloc_space_bytes: Sum::get(bucket.alloc_space.as_ref()),
                inuse_objects: Sum::get(bucket.inuse_objects.as_ref()),
                inuse_space_bytes: Sum::get(bucket.inuse_space.as_ref()),
            };
            let frames = bucket
                .top_hit
                .and_then(|t| t.hits.hits.into_iter().next())
                .map(|hit| hit.source.profile.stack)
                .unwrap_or_default();
            RawSample { frames, metrics }
        })
        .collect())
}

// --- node buckets ---

#[derive(Debug, Deserialize)]
struct NodeAggregations {
    nodes: Option<Buckets<NodeBucket>>,
}

#[derive(Debug, Deserialize)]
struct NodeBucket {
    key: Value,
    parent_id: Option<Buckets<TermBucket>>,
    function: Option<Buckets<TermBucket>>,
    cpu_ns: Option<Sum>,
    duration_ns: Option<Sum>,
    samples_count: Option<Sum>,
}

/// Parse a `nodes` aggregation response into link-identified records.
///
/// `metric` selects which sum becomes each record's `metric`: CPU time,
/// wall time (nanoseconds rounded to the nearest microsecond) or sample count.
/// Every record keeps its `duration_ns` sum; only the root's is reported.
pub fn parse_node_buckets(
    data: &[u8],
    metric: MetricKind,
) -> Result<Vec<RawLinkRecord>, ElasticParseError> {
    if !matches!(
        metric,
        MetricKind::CpuNanos | MetricKind::WallMicros | MetricKind::Samples
    ) {
        return Err(ElasticParseError::UnsupportedMetric(metric));
    }

    let response: SearchResponse<NodeAggregations> = serde_json::from_slice(data)?;
    let nodes = response
        .aggregations
        .and_then(|a| a.nodes)
        .ok_or(ElasticParseError::MissingAggregation("nodes"))?;

    Ok(nodes
        .buckets
        .into_iter()
        .map(|bucket| {
            let duration_ns = Sum::get(bucket.duration_ns.as_ref());
            let samples = Sum::get(bucket.samples_count.as_ref());
            let value = match metric {
                MetricKind::WallMicros => duration_ns.saturating_add(500) / 1_000,
                MetricKind::Samples => samples,
                _ => Sum::get(bucket.cpu_ns.as_ref()),
            };
            RawLinkRecord {
                node_id: key_string(&bucket.key),
                parent_id: first_key(bucket.parent_id.as_ref()),
                label: first_key(bucket.function.as_ref()),
                metric: value,
                samples,
                duration_nanos: Some(duration_ns),
            }
        })
        .collect())
}
