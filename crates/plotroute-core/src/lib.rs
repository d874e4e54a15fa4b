//! plotroute-core: pen-plotter route optimization (sans-IO).
//!
//! Takes a drawing as a set of polylines and produces the order and
//! direction in which a pen plotter should draw them, keeping pen-up
//! travel short:
//!
//! coverage filter -> greedy construction -> adjacency merge -> 2-opt refinement.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! [`Path`]s and returns structured data. Parsing drawings and talking to
//! the machine live elsewhere.
//!
//! Every stage is also usable on its own:
//! [`filter_covered_paths`], [`construct_route`], [`merge_adjacent`] and
//! [`refine_route`].

pub mod construct;
pub mod control;
pub mod coverage;
pub mod diagnostics;
pub mod geometry;
pub mod merge;
pub mod pipeline;
pub mod refine;
pub mod spatial_hash;
pub mod types;

pub use construct::{Construction, ConstructionStep, construct_route};
pub use control::{CancelFlag, Control, Progress, ProgressFn, Unmonitored};
pub use coverage::{CoverageOutcome, FilterStats, filter_covered_paths};
pub use geometry::pen_up_distance;
pub use merge::{MergeOutcome, merge_adjacent};
pub use pipeline::OptimizeResult;
pub use refine::{MoveStrategy, Refinement, refine_route};
pub use types::{ConfigError, OptimizeConfig, Path, PathError, Point};

/// Run a complete optimization job.
///
/// # Pipeline steps
///
/// 1. Coverage filter (skipped unless `pen_width > 0`)
/// 2. Greedy nearest-neighbour construction from the home position
/// 3. Adjacency merge (skipped when `merge_threshold` is `None`)
/// 4. 2-opt refinement, up to `max_iterations` accepted moves
///
/// `control` is polled for cancellation during refinement and receives
/// progress from construction and refinement. A cancelled job still
/// returns a complete route, refined as far as it got.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config` fails [`OptimizeConfig::validate`].
///
/// # Examples
///
/// ```
/// use plotroute_core::{OptimizeConfig, Path, Point, Unmonitored, optimize};
///
/// let line = |x0: f64, x1: f64| Path::new(vec![Point::new(x0, 0.0), Point::new(x1, 0.0)]);
/// let drawing = vec![line(40.0, 50.0)?, line(0.0, 10.0)?, line(20.0, 30.0)?];
///
/// let result = optimize(&drawing, &OptimizeConfig::default(), &Unmonitored)?;
/// let starts: Vec<f64> = result.paths.iter().map(|p| p.start().x).collect();
/// assert_eq!(starts, vec![0.0, 20.0, 40.0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn optimize(
    paths: &[Path],
    config: &OptimizeConfig,
    control: &impl Control,
) -> Result<OptimizeResult, ConfigError> {
    pipeline::optimize_with_diagnostics(paths, config, &diagnostics::FrozenClock, control)
        .map(|(result, _)| result)
}
