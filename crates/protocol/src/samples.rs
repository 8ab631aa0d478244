use serde::{Deserialize, Serialize};

use crate::metric::MetricKind;

/// One entry of a captured stack.
///
/// `id` is assigned upstream and is expected to be unique per distinct call
/// path up to and including this frame. Two frames with the same `id` are
/// treated as the same call site, even if they were reached through
/// different ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: String,
    #[serde(default, alias = "filename")]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

impl RawFrame {
    pub fn new(id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            function: function.into(),
            file: None,
            line: None,
        }
    }
}

/// Metric vector carried by a path-identified sample.
///
/// Every field is a plain sum; missing fields decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SampleMetrics {
    pub cpu_time_nanos: u64,
    pub sample_count: u64,
    pub wall_duration_micros: u64,
    pub alloc_objects: u64,
    pub alloc_space_bytes: u64,
    pub inuse_objects: u64,
    pub inuse_space_bytes: u64,
}

impl SampleMetrics {
    /// CPU-only metrics, the most common shape in tests and fixtures.
    pub fn cpu(cpu_time_nanos: u64, sample_count: u64) -> Self {
        Self {
            cpu_time_nanos,
            sample_count,
            ..Self::default()
        }
    }

    /// The value selected by `kind`.
    pub fn value(&self, kind: MetricKind) -> u64 {
        match kind {
            MetricKind::CpuNanos => self.cpu_time_nanos,
            MetricKind::WallMicros => self.wall_duration_micros,
            MetricKind::Samples => self.sample_count,
            MetricKind::AllocObjects => self.alloc_objects,
            MetricKind::AllocBytes => self.alloc_space_bytes,
            MetricKind::InuseObjects => self.inuse_objects,
            MetricKind::InuseBytes => self.inuse_space_bytes,
        }
    }

    pub fn set(&mut self, kind: MetricKind, value: u64) {
        let slot = match kind {
            MetricKind::CpuNanos => &mut self.cpu_time_nanos,
            MetricKind::WallMicros => &mut self.wall_duration_micros,
            MetricKind::Samples => &mut self.sample_count,
            MetricKind::AllocObjects => &mut self.alloc_objects,
            MetricKind::AllocBytes => &mut self.alloc_space_bytes,
            MetricKind::InuseObjects => &mut self.inuse_objects,
            MetricKind::InuseBytes => &mut self.inuse_space_bytes,
        };
        *slot = value;
    }
}

/// A full stack sample, ordered leaf first. The last frame is the outermost
/// ancestor recorded for this sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    pub frames: Vec<RawFrame>,
    #[serde(default)]
    pub metrics: SampleMetrics,
}

/// A single pre-aggregated node that names its parent explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLinkRecord {
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub metric: u64,
    #[serde(default)]
    pub samples: u64,
    /// Only meaningful on the root record, where it carries the total
    /// duration of the profiled window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_nanos: Option<u64>,
}

impl RawLinkRecord {
    pub fn new(
        node_id: impl Into<String>,
        parent_id: Option<&str>,
        label: impl Into<String>,
        metric: u64,
    ) -> Self {
        Self {
            node_id: Some(node_id.into()),
            parent_id: parent_id.map(str::to_owned),
            label: Some(label.into()),
            metric,
            samples: 0,
            duration_nanos: None,
        }
    }
}
