use std::io::Write;

use anyhow::Result;
use flame_tree_protocol::{MetricKind, ProfileTree};

pub fn write_json(out: &mut impl Write, profile: &ProfileTree, compact: bool) -> Result<()> {
    if compact {
        serde_json::to_writer(&mut *out, profile)?;
    } else {
        serde_json::to_writer_pretty(&mut *out, profile)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Indented tree with formatted values and share of the total, children
/// past `max_depth` folded into a count.
pub fn write_text(out: &mut impl Write, profile: &ProfileTree, max_depth: usize) -> Result<()> {
    let metric = profile.metric;
    let mut stack = vec![(&profile.tree, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        writeln!(
            out,
            "{:indent$}{} {} ({:.1}%)",
            "",
            node.name,
            metric.format_value(node.value),
            MetricKind::percent_of(node.value, profile.total_value),
            indent = depth * 2,
        )?;
        if node.is_leaf() {
            continue;
        }
        if depth >= max_depth {
            writeln!(
                out,
                "{:indent$}... {} more nodes (depth {})",
                "",
                node.node_count() - 1,
                node.depth() - 1,
                indent = (depth + 1) * 2,
            )?;
            continue;
        }
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }

    if let Some(diag) = profile.diagnostics.as_ref().filter(|d| !d.is_clean()) {
        writeln!(
            out,
            "-- dropped {} samples ({} frames), {} records; {} dangling, {} unreachable, {} shared",
            diag.dropped_samples,
            diag.dropped_frames,
            diag.dropped_records,
            diag.dangling_children,
            diag.unreachable_records,
            diag.shared_children,
        )?;
    }
    Ok(())
}
