mod report;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use flame_tree_core::parsers::{self, InputFormat};
use flame_tree_core::{BuildOptions, MetricKind};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Build a flame graph call tree from a batch of profiling samples.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file, or `-` for stdin
    input: PathBuf,

    /// Input layout
    #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Metric used as node value (cpu, wall, samples, alloc-objects,
    /// alloc-bytes, inuse-objects, inuse-bytes)
    #[arg(short, long)]
    metric: Option<MetricKind>,

    /// JSON file with build options; flags override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name for the synthetic root that wraps several top-level stacks
    #[arg(long)]
    root_name: Option<String>,

    /// Attach dropped/shared record counters to the output
    #[arg(short, long)]
    diagnostics: bool,

    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Print an indented text tree instead of JSON, down to this depth
    #[arg(long, value_name = "DEPTH")]
    text: Option<usize>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Auto,
    Samples,
    Links,
    StackBuckets,
    NodeBuckets,
    Collapsed,
}

impl FormatArg {
    fn input_format(self) -> Option<InputFormat> {
        match self {
            Self::Auto => None,
            Self::Samples => Some(InputFormat::Samples),
            Self::Links => Some(InputFormat::Links),
            Self::StackBuckets => Some(InputFormat::StackBuckets),
            Self::NodeBuckets => Some(InputFormat::NodeBuckets),
            Self::Collapsed => Some(InputFormat::Collapsed),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        io::stdin()
            .read_to_end(&mut data)
            .context("failed to read stdin")?;
        return Ok(data);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_options(args: &Args) -> Result<BuildOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            BuildOptions::from_json(&data)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => BuildOptions::default(),
    };
    if let Some(metric) = args.metric {
        options.metric = metric;
    }
    if let Some(name) = &args.root_name {
        options.aggregate_root_name.clone_from(name);
    }
    options.include_diagnostics |= args.diagnostics;
    Ok(options)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let options = load_options(&args)?;
    let data = read_input(&args.input)?;

    let batch = match args.format.input_format() {
        Some(format) => parsers::parse_as(&data, format, options.metric),
        None => parsers::parse_auto(&data, options.metric),
    }
    .with_context(|| format!("failed to parse {}", args.input.display()))?;
    tracing::info!(records = batch.len(), metric = %options.metric, "input parsed");

    let profile = flame_tree_core::build(&batch, &options).context("failed to build call tree")?;

    let mut out = io::stdout().lock();
    match args.text {
        Some(depth) => report::write_text(&mut out, &profile, depth)?,
        None => report::write_json(&mut out, &profile, args.compact)?,
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "flame-tree",
            "batch.json",
            "--format",
            "node-buckets",
            "--metric",
            "wall",
            "-d",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.format, FormatArg::NodeBuckets);
        assert_eq!(args.metric, Some(MetricKind::WallMicros));
        assert!(args.diagnostics);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn rejects_unknown_metric() {
        assert!(Args::try_parse_from(["flame-tree", "x", "--metric", "heat"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "flame-tree",
            "x",
            "--metric",
            "alloc-bytes",
            "--root-name",
            "all",
        ])
        .unwrap();
        let options = load_options(&args).unwrap();
        assert_eq!(options.metric, MetricKind::AllocBytes);
        assert_eq!(options.aggregate_root_name, "all");
        assert!(!options.include_diagnostics);
    }

    #[test]
    fn auto_has_no_fixed_format() {
        assert_eq!(FormatArg::Auto.input_format(), None);
        assert_eq!(
            FormatArg::Collapsed.input_format(),
            Some(InputFormat::Collapsed)
        );
    }
}
