use serde::{Deserialize, Serialize};

/// Counters for conditions that were recovered from during a build.
///
/// None of these abort the build. They are only reported when the caller
/// asks for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    /// Path-identified samples skipped because a frame lacked an id, or
    /// because the sample had no frames at all.
    pub dropped_samples: u64,
    /// Frames without an id, counted across all dropped samples.
    pub dropped_frames: u64,
    /// Link-identified records skipped because they lacked a node id.
    pub dropped_records: u64,
    /// Child references that named no known node.
    pub dangling_children: u64,
    /// Link-identified nodes whose parent chain never reaches the root.
    pub unreachable_records: u64,
    /// Path-identified nodes observed under more than one parent. Each
    /// such node is repeated under every parent in the output.
    pub shared_children: u64,
}

impl BuildDiagnostics {
    /// Whether anything was skipped or repeated.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_clean() {
        assert!(BuildDiagnostics::default().is_clean());
        let d = BuildDiagnostics {
            dangling_children: 1,
            ..BuildDiagnostics::default()
        };
        assert!(!d.is_clean());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(BuildDiagnostics::default()).unwrap();
        assert_eq!(json["droppedSamples"], 0);
        assert_eq!(json["sharedChildren"], 0);
    }
}
