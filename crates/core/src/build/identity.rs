//! Frame identity resolution: raw frames and link records to `(key, label)`.
//!
//! Keys are taken from the source as-is. No disambiguation happens here:
//! upstream aggregation must already give distinct call paths through the
//! same function distinct frame ids. If two paths collapse onto one id,
//! their subtrees are merged downstream and the output tree will show the
//! merged node under every parent that reached it (counted as
//! `shared_children` in the build diagnostics).

use flame_tree_protocol::{RawFrame, RawLinkRecord, SharedStr};
use thiserror::Error;

use crate::model::{NodeKey, UNKNOWN_LABEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingIdentity {
    #[error("frame has no id")]
    FrameId,
    #[error("record has no node id")]
    NodeId,
}

/// A raw input entry reduced to its canonical key and display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub key: NodeKey,
    pub label: SharedStr,
}

/// A resolved link record: its own identity plus the parent it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub node: Resolved,
    pub parent: Option<NodeKey>,
}

pub fn resolve_frame(frame: &RawFrame) -> Result<Resolved, MissingIdentity> {
    let key = frame
        .id
        .as_deref()
        .and_then(NodeKey::parse)
        .ok_or(MissingIdentity::FrameId)?;
    Ok(Resolved {
        key,
        label: frame_label(frame),
    })
}

/// A blank `parent_id` is read as "no parent".
pub fn resolve_link(record: &RawLinkRecord) -> Result<ResolvedLink, MissingIdentity> {
    let key = record
        .node_id
        .as_deref()
        .and_then(NodeKey::parse)
        .ok_or(MissingIdentity::NodeId)?;
    let label = record
        .label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map_or_else(|| SharedStr::from(UNKNOWN_LABEL), SharedStr::from);
    Ok(ResolvedLink {
        node: Resolved { key, label },
        parent: record.parent_id.as_deref().and_then(NodeKey::parse),
    })
}

/// Display label for a frame: the function name, else `file:line`, else
/// `(unknown)`.
fn frame_label(frame: &RawFrame) -> SharedStr {
    let function = frame.function.trim();
    if !function.is_empty() {
        return SharedStr::from(function);
    }
    match (frame.file.as_deref().map(str::trim), frame.line) {
        (Some(file), Some(line)) if !file.is_empty() => SharedStr::from(format!("{file}:{line}")),
        (Some(file), None) if !file.is_empty() => SharedStr::from(file),
        _ => SharedStr::from(UNKNOWN_LABEL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_key_is_upstream_id() {
        let r = resolve_frame(&RawFrame::new("abc123", "main.work")).unwrap();
        assert_eq!(r.key.as_str(), "abc123");
        assert_eq!(r.label, "main.work");
    }

    #[test]
    fn padded_ids_are_distinct_call_sites() {
        let padded = resolve_frame(&RawFrame::new(" a", "f")).unwrap();
        let plain = resolve_frame(&RawFrame::new("a", "f")).unwrap();
        assert_eq!(padded.key.as_str(), " a");
        assert_ne!(padded.key, plain.key);
    }

    #[test]
    fn frame_without_id_is_rejected() {
        let frame = RawFrame {
            id: None,
            function: "f".into(),
            ..RawFrame::default()
        };
        assert_eq!(resolve_frame(&frame), Err(MissingIdentity::FrameId));

        let blank = RawFrame::new("  ", "f");
        assert_eq!(resolve_frame(&blank), Err(MissingIdentity::FrameId));
    }

    #[test]
    fn anonymous_frame_falls_back_to_location() {
        let frame = RawFrame {
            id: Some("x".into()),
            function: String::new(),
            file: Some("server.go".into()),
            line: Some(88),
        };
        assert_eq!(resolve_frame(&frame).unwrap().label, "server.go:88");

        let bare = RawFrame::new("y", "");
        assert_eq!(resolve_frame(&bare).unwrap().label, UNKNOWN_LABEL);
    }

    #[test]
    fn link_parent_and_label() {
        let r = resolve_link(&RawLinkRecord::new("n1", Some("root"), "f", 100)).unwrap();
        assert_eq!(r.node.key.as_str(), "n1");
        assert_eq!(r.parent.map(|p| p.to_string()), Some("root".into()));

        let root = resolve_link(&RawLinkRecord::new("root", Some(""), "root", 0)).unwrap();
        assert!(root.parent.is_none());
    }

    #[test]
    fn link_without_node_id_is_rejected() {
        let record = RawLinkRecord {
            node_id: None,
            label: Some("f".into()),
            ..RawLinkRecord::default()
        };
        assert_eq!(resolve_link(&record), Err(MissingIdentity::NodeId));
    }

    #[test]
    fn link_without_label_is_unknown() {
        let record = RawLinkRecord {
            node_id: Some("n".into()),
            ..RawLinkRecord::default()
        };
        assert_eq!(resolve_link(&record).unwrap().node.label, UNKNOWN_LABEL);
    }
}
