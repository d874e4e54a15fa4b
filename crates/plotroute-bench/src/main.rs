//! plotroute-bench: CLI tool for route parameter experimentation and diagnostics.
//!
//! Runs the route optimizer on a JSON drawing with configurable parameters,
//! printing detailed per-stage diagnostics. Useful for:
//!
//! - Comparing refinement strategies (`first` vs `best` improvement)
//! - Tuning pen width and visibility threshold for the coverage filter
//! - Measuring per-stage durations to identify bottlenecks
//! - Seeing how much pen-up travel each stage saves
//!
//! The input file is a JSON array of polylines, each an array of
//! `{"x": .., "y": ..}` points in millimetres.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin plotroute-bench -- [OPTIONS] <DRAWING_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path as FsPath, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use plotroute_core::diagnostics::{Clock, JobDiagnostics};
use plotroute_core::pipeline::optimize_with_diagnostics;
use plotroute_core::{
    MoveStrategy, OptimizeConfig, OptimizeResult, Path, Point, Progress, ProgressFn,
};
use tracing_subscriber::EnvFilter;

/// Route parameter experimentation and diagnostics for plotroute.
///
/// Optimizes the drawing order of a polyline file and prints per-stage
/// timing, counts, and pen-up travel.
#[derive(Parser)]
#[command(name = "plotroute-bench", version)]
struct Cli {
    /// Path to the input drawing (JSON array of polylines).
    drawing_path: PathBuf,

    /// Pen tip diameter in mm. Zero disables the coverage filter.
    #[arg(long, default_value_t = OptimizeConfig::DEFAULT_PEN_WIDTH)]
    pen_width: f64,

    /// Minimum mean visibility (0.0-1.0) a stroke needs to be kept.
    #[arg(long, default_value_t = OptimizeConfig::DEFAULT_VISIBILITY_THRESHOLD)]
    visibility_threshold: f64,

    /// Minimum visibility as a percentage (0-100). Overrides
    /// `--visibility-threshold`.
    #[arg(long, conflicts_with = "visibility_threshold")]
    visibility_percent: Option<f64>,

    /// Largest end-to-start gap in mm that the adjacency merge bridges.
    #[arg(long, default_value_t = OptimizeConfig::DEFAULT_MERGE_THRESHOLD)]
    merge_threshold: f64,

    /// Disable the adjacency merge.
    #[arg(long)]
    no_merge: bool,

    /// Cap on accepted 2-opt moves.
    #[arg(long, default_value_t = OptimizeConfig::DEFAULT_MAX_ITERATIONS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_iterations: usize,

    /// Clamp `--max-iterations` into the range the plotter UI accepts.
    #[arg(long)]
    ui_clamp: bool,

    /// Refinement move selection.
    #[arg(long, value_enum, default_value_t = strategy_from_core(MoveStrategy::default()))]
    strategy: Strategy,

    /// Home position X in mm.
    #[arg(long, default_value_t = Point::ORIGIN.x, allow_negative_numbers = true)]
    home_x: f64,

    /// Home position Y in mm.
    #[arg(long, default_value_t = Point::ORIGIN.y, allow_negative_numbers = true)]
    home_y: f64,

    /// Write an SVG route preview to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Draw pen-up travel in the SVG preview.
    #[arg(long, requires = "svg")]
    show_travel: bool,

    /// Write the optimized route as JSON to file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full job config as a JSON string.
    ///
    /// When provided, all other job parameter flags are ignored.
    /// The JSON must be a valid `OptimizeConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Refinement strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Apply the first improving move found, then rescan.
    First,
    /// Apply the largest-gain move of each full scan.
    Best,
}

const fn strategy_from_core(strategy: MoveStrategy) -> Strategy {
    match strategy {
        MoveStrategy::FirstImprovement => Strategy::First,
        MoveStrategy::BestImprovement => Strategy::Best,
    }
}

/// Build an [`OptimizeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> anyhow::Result<OptimizeConfig> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).context("parsing --config-json");
    }

    let visibility_threshold = cli
        .visibility_percent
        .map_or(cli.visibility_threshold, |percent| percent / 100.0);
    let max_iterations = if cli.ui_clamp {
        OptimizeConfig::clamp_iterations(cli.max_iterations)
    } else {
        cli.max_iterations
    };

    Ok(OptimizeConfig {
        pen_width: cli.pen_width,
        visibility_threshold,
        merge_threshold: (!cli.no_merge).then_some(cli.merge_threshold),
        max_iterations,
        move_strategy: match cli.strategy {
            Strategy::First => MoveStrategy::FirstImprovement,
            Strategy::Best => MoveStrategy::BestImprovement,
        },
        home: Point::new(cli.home_x, cli.home_y),
    })
}

fn read_drawing(path: &FsPath) -> anyhow::Result<Vec<Path>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing drawing {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = config_from_cli(cli)?;
    config.validate().context("invalid job configuration")?;
    let drawing = read_drawing(&cli.drawing_path)?;

    let point_count: usize = drawing.iter().map(Path::point_count).sum();
    eprintln!(
        "Drawing: {} ({} paths, {} points)",
        cli.drawing_path.display(),
        drawing.len(),
        point_count,
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let control = ProgressFn(|event: &Progress| match *event {
        Progress::Construction {
            placed,
            total,
            travel,
        } => tracing::debug!(placed, total, travel, "construction progress"),
        Progress::Refinement {
            iteration,
            distance,
        } => tracing::trace!(iteration, distance, "refinement progress"),
    });

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (result, diagnostics) =
            optimize_with_diagnostics(&drawing, &config, &StdClock, &control)?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&diagnostics).context("serializing diagnostics")?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        // Write outputs on the first run only.
        if run == 0 {
            if let Some(ref output) = cli.output {
                write_route(output, &result)?;
            }
            if let Some(ref svg_path) = cli.svg {
                write_svg(cli, svg_path, &config, &result)?;
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

fn write_route(path: &FsPath, result: &OptimizeResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&result.paths).context("serializing route")?;
    std::fs::write(path, &json).with_context(|| format!("writing route to {}", path.display()))?;
    eprintln!(
        "Route written to {} ({} paths, {} bytes)",
        path.display(),
        result.paths.len(),
        json.len(),
    );
    Ok(())
}

fn write_svg(
    cli: &Cli,
    svg_path: &FsPath,
    config: &OptimizeConfig,
    result: &OptimizeResult,
) -> anyhow::Result<()> {
    if result.paths.is_empty() {
        tracing::warn!("optimized route is empty; SVG will have no strokes");
    }

    let title = cli
        .drawing_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bench");
    let desc = format!(
        "pen-up travel {:.3} mm -> {:.3} mm",
        result.summary.input_travel, result.summary.final_travel,
    );
    let config_json = serde_json::to_string(config).context("serializing config")?;
    let metadata = plotroute_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: Some(&config_json),
    };
    let options = plotroute_export::SvgOptions {
        show_travel: cli.show_travel,
        home: Some(config.home),
        ..plotroute_export::SvgOptions::default()
    };
    let svg = plotroute_export::to_svg(&result.paths, &metadata, &options);
    std::fs::write(svg_path, &svg)
        .with_context(|| format!("writing SVG to {}", svg_path.display()))?;
    eprintln!(
        "SVG written to {} ({} bytes)",
        svg_path.display(),
        svg.len(),
    );
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&JobDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[JobDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // The optimizer is deterministic, so travel is the same every run.
    println!(
        "Travel: {:.3}mm -> {:.3}mm ({:.1}% saved by refinement)",
        first.summary.input_travel,
        first.summary.final_travel,
        first.summary.refinement_savings_percent,
    );

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Coverage Filter", |d| d.filter.as_ref().map(|s| s.duration)),
        ("Construction", |d| Some(d.construct.duration)),
        ("Merge", |d| d.merge.as_ref().map(|s| s.duration)),
        ("Refinement", |d| Some(d.refine.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
