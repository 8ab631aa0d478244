use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which sample metric becomes the `value` of each tree node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    /// On-CPU time in nanoseconds.
    #[default]
    CpuNanos,
    /// Wall-clock duration in microseconds.
    WallMicros,
    /// Number of samples.
    Samples,
    /// Objects allocated.
    AllocObjects,
    /// Bytes allocated.
    AllocBytes,
    /// Objects live at collection time.
    InuseObjects,
    /// Bytes live at collection time.
    InuseBytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric {0:?} (expected cpu, wall, samples, alloc-objects, alloc-bytes, inuse-objects or inuse-bytes)")]
pub struct UnknownMetric(pub String);

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        Self::CpuNanos,
        Self::WallMicros,
        Self::Samples,
        Self::AllocObjects,
        Self::AllocBytes,
        Self::InuseObjects,
        Self::InuseBytes,
    ];

    /// Format a value of this metric for display.
    pub fn format_value(&self, value: u64) -> String {
        let v = value as f64;
        match self {
            Self::CpuNanos => {
                if v >= 1_000_000_000.0 {
                    format!("{:.2}s", v / 1_000_000_000.0)
                } else if v >= 1_000_000.0 {
                    format!("{:.1}ms", v / 1_000_000.0)
                } else if v >= 1_000.0 {
                    format!("{:.0}µs", v / 1_000.0)
                } else {
                    format!("{value}ns")
                }
            }
            Self::WallMicros => {
                if v >= 1_000_000.0 {
                    format!("{:.2}s", v / 1_000_000.0)
                } else if v >= 1_000.0 {
                    format!("{:.1}ms", v / 1_000.0)
                } else {
                    format!("{value}µs")
                }
            }
            Self::Samples => format!("{value} samples"),
            Self::AllocObjects | Self::InuseObjects => format!("{value} objects"),
            Self::AllocBytes | Self::InuseBytes => {
                if v >= 1_073_741_824.0 {
                    format!("{:.1} GiB", v / 1_073_741_824.0)
                } else if v >= 1_048_576.0 {
                    format!("{:.1} MiB", v / 1_048_576.0)
                } else if v >= 1_024.0 {
                    format!("{:.1} KiB", v / 1_024.0)
                } else {
                    format!("{value} B")
                }
            }
        }
    }

    /// Percentage of `total` taken by `value`, or 0 when `total` is zero.
    pub fn percent_of(value: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            value as f64 * 100.0 / total as f64
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CpuNanos => write!(f, "cpu"),
            Self::WallMicros => write!(f, "wall"),
            Self::Samples => write!(f, "samples"),
            Self::AllocObjects => write!(f, "alloc-objects"),
            Self::AllocBytes => write!(f, "alloc-bytes"),
            Self::InuseObjects => write!(f, "inuse-objects"),
            Self::InuseBytes => write!(f, "inuse-bytes"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "cpu-nanos" | "cpu_ns" => Ok(Self::CpuNanos),
            "wall" | "wall-micros" | "duration" => Ok(Self::WallMicros),
            "samples" | "count" => Ok(Self::Samples),
            "alloc-objects" => Ok(Self::AllocObjects),
            "alloc-bytes" | "alloc-space" => Ok(Self::AllocBytes),
            "inuse-objects" => Ok(Self::InuseObjects),
            "inuse-bytes" | "inuse-space" => Ok(Self::InuseBytes),
            _ => Err(UnknownMetric(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_cpu_nanos() {
        assert_eq!(MetricKind::CpuNanos.format_value(500), "500ns");
        assert_eq!(MetricKind::CpuNanos.format_value(1_500_000), "1.5ms");
        assert_eq!(MetricKind::CpuNanos.format_value(2_500_000_000), "2.50s");
    }

    #[test]
    fn format_bytes() {
        assert_eq!(MetricKind::AllocBytes.format_value(512), "512 B");
        assert_eq!(MetricKind::AllocBytes.format_value(2048), "2.0 KiB");
        assert_eq!(MetricKind::InuseBytes.format_value(5_242_880), "5.0 MiB");
    }

    #[test]
    fn format_counts() {
        assert_eq!(MetricKind::Samples.format_value(42), "42 samples");
        assert_eq!(MetricKind::AllocObjects.format_value(3), "3 objects");
    }

    #[test]
    fn display_parses_back() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.to_string().parse::<MetricKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_metric_is_rejected() {
        assert!("heap".parse::<MetricKind>().is_err());
    }

    #[test]
    fn percent_of_zero_total() {
        assert_eq!(MetricKind::percent_of(5, 0), 0.0);
        assert!((MetricKind::percent_of(25, 100) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&MetricKind::InuseBytes).unwrap();
        assert_eq!(json, "\"inuse-bytes\"");
    }
}
