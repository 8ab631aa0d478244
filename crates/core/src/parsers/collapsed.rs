use flame_tree_protocol::{MetricKind, RawFrame, RawSample, SampleMetrics};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollapsedParseError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("no valid stack lines found")]
    Empty,
}

/// Parse Brendan Gregg's collapsed/folded stack format into samples.
///
/// Each line has the format `frame;frame;... count`, outermost frame first.
/// The count is stored as the sample count and as the `metric` field, so
/// the resulting tree can be weighted by either.
///
/// Folded stacks carry no frame ids. Each frame's id is the `;`-joined path
/// from the outermost frame down to it, which makes ids unique per call path.
///
/// Used by: `perf script | stackcollapse-perf.pl`, dtrace, FlameGraph tools.
pub fn parse_collapsed(
    data: &[u8],
    metric: MetricKind,
) -> Result<Vec<RawSample>, CollapsedParseError> {
    let text = std::str::from_utf8(data)?;
    let mut samples = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Split into stack and count: "a;b;c 42"
        let Some(pos) = line.rfind(' ') else {
            continue;
        };
        let count = parse_count(line[pos + 1..].trim());
        let stack_str = line[..pos].trim();
        if stack_str.is_empty() {
            continue;
        }

        let mut path = String::with_capacity(stack_str.len());
        let mut frames = Vec::new();
        for name in stack_str.split(';').map(str::trim).filter(|n| !n.is_empty()) {
            if !path.is_empty() {
                path.push(';');
            }
            path.push_str(name);
            frames.push(RawFrame::new(path.as_str(), name));
        }
        if frames.is_empty() {
            continue;
        }
        frames.reverse();

        let mut metrics = SampleMetrics {
            sample_count: count,
            ..SampleMetrics::default()
        };
        metrics.set(metric, count);
        samples.push(RawSample { frames, metrics });
    }

    if samples.is_empty() {
        return Err(CollapsedParseError::Empty);
    }
    Ok(samples)
}

/// Counts are integers in practice; fractional weights are rounded and
/// anything unparseable counts as one sample.
fn parse_count(s: &str) -> u64 {
    s.parse::<u64>().unwrap_or_else(|_| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map_or(1, |v| v.round() as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_collapsed() {
        let input = b"main;foo;bar 10\nmain;foo;baz 20\nmain;qux 5\n";
        let samples = parse_collapsed(input, MetricKind::CpuNanos).unwrap();
        assert_eq!(samples.len(), 3);

        // Leaf first, ids are path prefixes.
        let ids: Vec<_> = samples[0]
            .frames
            .iter()
            .map(|f| f.id.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(ids, ["main;foo;bar", "main;foo", "main"]);
        assert_eq!(samples[0].frames[0].function, "bar");
        assert_eq!(samples[1].metrics.cpu_time_nanos, 20);
        assert_eq!(samples[1].metrics.sample_count, 20);
    }

    #[test]
    fn same_function_on_different_paths_gets_distinct_ids() {
        let input = b"a;shared 1\nb;shared 1\n";
        let samples = parse_collapsed(input, MetricKind::Samples).unwrap();
        assert_ne!(samples[0].frames[0].id, samples[1].frames[0].id);
    }

    #[test]
    fn skips_comments_and_empty_lines() {
        let input = b"# comment\n\nmain;foo 5\n";
        let samples = parse_collapsed(input, MetricKind::CpuNanos).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].frames.len(), 2);
    }

    #[test]
    fn odd_counts() {
        assert_eq!(parse_count("2.6"), 3);
        assert_eq!(parse_count("lots"), 1);
        assert_eq!(parse_count("-4"), 1);
    }

    #[test]
    fn empty_input_errors() {
        assert!(parse_collapsed(b"", MetricKind::CpuNanos).is_err());
    }
}
