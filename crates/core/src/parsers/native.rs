use flame_tree_protocol::{RawLinkRecord, RawSample};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NativeParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SampleBatch {
    Wrapped { samples: Vec<RawSample> },
    Bare(Vec<RawSample>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LinkBatch {
    Wrapped { nodes: Vec<RawLinkRecord> },
    Bare(Vec<RawLinkRecord>),
}

/// Parse path-identified samples: `{"samples": [...]}` or a bare array.
pub fn parse_samples(data: &[u8]) -> Result<Vec<RawSample>, NativeParseError> {
    Ok(match serde_json::from_slice::<SampleBatch>(data)? {
        SampleBatch::Wrapped { samples } => samples,
        SampleBatch::Bare(samples) => samples,
    })
}

/// Parse link-identified records: `{"nodes": [...]}` or a bare array.
pub fn parse_links(data: &[u8]) -> Result<Vec<RawLinkRecord>, NativeParseError> {
    Ok(match serde_json::from_slice::<LinkBatch>(data)? {
        LinkBatch::Wrapped { nodes } => nodes,
        LinkBatch::Bare(nodes) => nodes,
    })
}
