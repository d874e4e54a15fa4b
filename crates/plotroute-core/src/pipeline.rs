//! The optimization job: filter, construct, merge, refine.
//!
//! [`crate::optimize`] runs the whole job and returns only the route;
//! [`optimize_with_diagnostics`] additionally times each stage against a
//! caller-supplied [`Clock`].
//!
//! ```rust
//! # use plotroute_core::{OptimizeConfig, Path, Unmonitored};
//! # fn run(paths: Vec<Path>) -> Result<(), plotroute_core::ConfigError> {
//! use plotroute_core::diagnostics::FrozenClock;
//! use plotroute_core::pipeline::optimize_with_diagnostics;
//!
//! let config = OptimizeConfig {
//!     pen_width: 0.5,
//!     ..OptimizeConfig::default()
//! };
//! let (result, diagnostics) =
//!     optimize_with_diagnostics(&paths, &config, &FrozenClock, &Unmonitored)?;
//! println!("{}", diagnostics.report());
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

use tracing::info;

use crate::construct::{ConstructionStep, construct_route_from};
use crate::control::Control;
use crate::coverage::{FilterStats, filter_covered_paths};
use crate::diagnostics::{
    Clock, JobDiagnostics, RouteSummary, StageDiagnostics, StageMetrics, savings_percent,
};
use crate::geometry::pen_up_distance;
use crate::merge::merge_adjacent;
use crate::refine::{RefineOptions, refine_route_with};
use crate::types::{ConfigError, OptimizeConfig, Path};

/// Everything a job produces apart from timing.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeResult {
    /// The route to draw, in order, each path oriented for drawing.
    pub paths: Vec<Path>,
    /// What the coverage filter removed.
    pub filter: FilterStats,
    /// How the constructor placed each surviving path. `source_index`
    /// refers to the job's input, like [`FilterStats::removed_indices`].
    pub construction_trace: Vec<ConstructionStep>,
    /// Joins made by the adjacency merge.
    pub merged: usize,
    /// Accepted 2-opt moves.
    pub iterations: usize,
    /// Total travel before refinement, then after each accepted move.
    pub history: Vec<f64>,
    /// Whether refinement ran out of improving moves.
    pub converged: bool,
    /// Whether the caller cancelled refinement.
    pub cancelled: bool,
    /// Counts and travel across the job.
    pub summary: RouteSummary,
}

/// Run the full job, timing each stage with `clock`.
///
/// The home position takes part in both construction (the pen starts
/// there) and refinement (the leg to the first stroke is improvable).
///
/// # Errors
///
/// Returns the [`ConfigError`] from [`OptimizeConfig::validate`] when
/// `config` is out of range. Nothing else fails.
pub fn optimize_with_diagnostics<C: Clock>(
    paths: &[Path],
    config: &OptimizeConfig,
    clock: &C,
    control: &impl Control,
) -> Result<(OptimizeResult, JobDiagnostics), ConfigError> {
    config.validate()?;
    let total_start = clock.now();
    let input_travel = pen_up_distance(paths, Some(config.home));

    // 1. Coverage filter.
    let start = clock.now();
    let filtered = filter_covered_paths(paths, config.pen_width, config.visibility_threshold);
    let filter_diag = (config.pen_width > 0.0).then(|| StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Filter {
            pen_width: config.pen_width,
            visibility_threshold: config.visibility_threshold,
            paths_before: paths.len(),
            paths_after: filtered.kept.len(),
            samples_evaluated: filtered.samples_evaluated,
        },
    });
    let filter = filtered.stats();
    let kept_sources = surviving_indices(paths.len(), &filter.removed_indices);

    // 2. Greedy construction from home.
    let start = clock.now();
    let construction = construct_route_from(filtered.kept, config.home, control);
    let constructed_travel = construction.travel();
    let construct_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Construct {
            paths: construction.paths.len(),
            reversed: construction.reversed_count(),
            travel: constructed_travel,
        },
    };
    let construction_trace: Vec<ConstructionStep> = construction
        .trace
        .iter()
        .map(|step| ConstructionStep {
            source_index: kept_sources[step.source_index],
            ..*step
        })
        .collect();

    // 3. Optional adjacency merge.
    let (route, merged, merge_diag) = match config.merge_threshold {
        Some(threshold) => {
            let start = clock.now();
            let paths_before = construction.paths.len();
            let outcome = merge_adjacent(construction.paths, threshold);
            let diag = StageDiagnostics {
                duration: clock.elapsed(&start),
                metrics: StageMetrics::Merge {
                    threshold,
                    paths_before,
                    paths_after: outcome.paths.len(),
                },
            };
            (outcome.paths, outcome.merged, Some(diag))
        }
        None => (construction.paths, 0, None),
    };

    // 4. 2-opt refinement, home leg included.
    let start = clock.now();
    let options = RefineOptions {
        max_iterations: config.max_iterations,
        strategy: config.move_strategy,
        home: Some(config.home),
    };
    let refinement = refine_route_with(route, &options, control);
    let final_travel = refinement.final_distance();
    let refine_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Refine {
            strategy: config.move_strategy,
            iterations: refinement.iterations,
            max_iterations: config.max_iterations,
            initial_distance: refinement.initial_distance,
            final_distance: final_travel,
            converged: refinement.converged,
            cancelled: refinement.cancelled,
        },
    };

    let summary = RouteSummary {
        input_paths: paths.len(),
        output_paths: refinement.paths.len(),
        output_points: refinement.paths.iter().map(Path::point_count).sum(),
        input_travel,
        constructed_travel,
        final_travel,
        refinement_savings_percent: savings_percent(refinement.initial_distance, final_travel),
    };

    info!(
        input_paths = summary.input_paths,
        removed = filter.removed_count,
        merged,
        output_paths = summary.output_paths,
        iterations = refinement.iterations,
        input_travel,
        final_travel,
        cancelled = refinement.cancelled,
        "route optimized"
    );

    let diagnostics = JobDiagnostics {
        filter: filter_diag,
        construct: construct_diag,
        merge: merge_diag,
        refine: refine_diag,
        total_duration: clock.elapsed(&total_start),
        summary: summary.clone(),
    };

    let result = OptimizeResult {
        paths: refinement.paths,
        filter,
        construction_trace,
        merged,
        iterations: refinement.iterations,
        history: refinement.history,
        converged: refinement.converged,
        cancelled: refinement.cancelled,
        summary,
    };

    Ok((result, diagnostics))
}

/// Input indices that survived filtering, in input order.
fn surviving_indices(count: usize, removed: &[usize]) -> Vec<usize> {
    let mut keep = vec![true; count];
    for &index in removed {
        keep[index] = false;
    }
    (0..count).filter(|&index| keep[index]).collect()
}
