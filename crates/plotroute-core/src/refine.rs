//! Route refinement: 2-opt local search over a constructed route.
//!
//! A move picks two positions `i < j`, reverses the block of strokes
//! between them and flips the drawing direction of every stroke in the
//! block. Connections inside the block join the same physical endpoints
//! as before, so only the connection entering position `i` and the one
//! leaving position `j` change length. Each candidate move therefore
//! costs O(1) to evaluate and O(j - i) to apply.
//!
//! A move is accepted when it shortens total pen-up travel by more than
//! [`IMPROVEMENT_EPSILON`]. The search stops when no move qualifies, when
//! the iteration cap is reached, or when the caller cancels.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::control::{Control, Progress, Unmonitored};
use crate::types::{Path, Point};

/// Smallest travel reduction, in millimetres, that counts as an
/// improvement.
pub const IMPROVEMENT_EPSILON: f64 = 1e-6;

/// How the refiner chooses among improving moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    /// Scan `i` ascending, then `j` ascending, and apply the first
    /// improving move found. The next pass starts from the beginning.
    #[default]
    FirstImprovement,
    /// Evaluate every move and apply the one with the largest gain.
    /// Ties go to the earliest in scan order.
    BestImprovement,
}

impl MoveStrategy {
    /// All strategies, in declaration order.
    pub const ALL: [Self; 2] = [Self::FirstImprovement, Self::BestImprovement];

    /// Short name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstImprovement => "first-improvement",
            Self::BestImprovement => "best-improvement",
        }
    }
}

impl std::fmt::Display for MoveStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for [`refine_route_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineOptions {
    /// Cap on accepted moves.
    pub max_iterations: usize,
    /// Move selection.
    pub strategy: MoveStrategy,
    /// Pen position before the first stroke. When set, the leg from here
    /// to the first stroke counts toward travel and can be improved.
    pub home: Option<Point>,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iterations: crate::OptimizeConfig::DEFAULT_MAX_ITERATIONS,
            strategy: MoveStrategy::default(),
            home: None,
        }
    }
}

/// Outcome of a refinement run.
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// Paths in refined order, each oriented for drawing.
    pub paths: Vec<Path>,
    /// For each output position, the index of that path in the input.
    pub order: Vec<usize>,
    /// For each output position, whether the path is drawn opposite to
    /// its input direction.
    pub flipped: Vec<bool>,
    /// Accepted moves.
    pub iterations: usize,
    /// Total travel of the input order followed by the total after each
    /// accepted move; strictly decreasing. Never empty.
    pub history: Vec<f64>,
    /// Total travel of the input order.
    pub initial_distance: f64,
    /// Whether the search stopped because no improving move remained.
    pub converged: bool,
    /// Whether the search stopped because the caller cancelled.
    pub cancelled: bool,
}

impl Refinement {
    /// Total travel of the refined order.
    #[must_use]
    pub fn final_distance(&self) -> f64 {
        self.history.last().copied().unwrap_or(self.initial_distance)
    }

    /// Travel removed by refinement.
    #[must_use]
    pub fn saved_distance(&self) -> f64 {
        self.initial_distance - self.final_distance()
    }
}

/// Refine `paths` without a home leg, using the default move strategy.
///
/// Travel is the sum of gaps between consecutive strokes only, so the
/// first stroke is free to start anywhere.
///
/// # Examples
///
/// ```
/// use plotroute_core::{Path, Point};
/// use plotroute_core::refine::refine_route;
///
/// let line = |x0: f64, x1: f64| Path::new(vec![Point::new(x0, 0.0), Point::new(x1, 0.0)]);
/// let route = vec![line(0.0, 1.0)?, line(4.0, 5.0)?, line(3.0, 2.0)?];
///
/// let refined = refine_route(route, 100);
/// assert_eq!(refined.order, vec![0, 2, 1]);
/// assert_eq!(refined.history, vec![5.0, 3.0]);
/// # Ok::<(), plotroute_core::PathError>(())
/// ```
#[must_use = "returns the refined route"]
pub fn refine_route(paths: Vec<Path>, max_iterations: usize) -> Refinement {
    refine_route_with(
        paths,
        &RefineOptions {
            max_iterations,
            ..RefineOptions::default()
        },
        &Unmonitored,
    )
}

/// Refine `paths` with explicit options, reporting to `control`.
///
/// Cancellation is checked before every pass; a cancelled run returns
/// the best order found so far with `cancelled` set. Each accepted move
/// emits a [`Progress::Refinement`] event.
#[must_use = "returns the refined route"]
pub fn refine_route_with(
    paths: Vec<Path>,
    options: &RefineOptions,
    control: &impl Control,
) -> Refinement {
    let mut route = Route::new(&paths, options.home);
    let initial_distance = route.total_distance();
    let mut history = vec![initial_distance];
    let mut iterations = 0;
    let mut converged = false;
    let mut cancelled = false;

    while iterations < options.max_iterations {
        if control.is_cancelled() {
            cancelled = true;
            break;
        }
        let found = match options.strategy {
            MoveStrategy::FirstImprovement => route.first_improving_move(),
            MoveStrategy::BestImprovement => route.best_improving_move(),
        };
        let Some(Move { i, j, gain }) = found else {
            converged = true;
            break;
        };

        route.reverse_block(i, j);
        let distance = route.total_distance();
        history.push(distance);
        iterations += 1;
        trace!(iteration = iterations, i, j, gain, distance, "2-opt move");
        control.progress(&Progress::Refinement {
            iteration: iterations,
            distance,
        });
    }

    debug!(
        paths = paths.len(),
        strategy = %options.strategy,
        iterations,
        initial_distance,
        final_distance = history.last().copied().unwrap_or(initial_distance),
        converged,
        cancelled,
        "route refined"
    );

    let Route { order, flipped, .. } = route;
    let mut slots: Vec<Option<Path>> = paths.into_iter().map(Some).collect();
    let paths = order
        .iter()
        .zip(&flipped)
        .filter_map(|(&index, &flip)| {
            let path = slots[index].take()?;
            Some(if flip { path.reversed() } else { path })
        })
        .collect();

    Refinement {
        paths,
        order,
        flipped,
        iterations,
        history,
        initial_distance,
        converged,
        cancelled,
    }
}

/// A candidate block reversal and the travel it saves.
#[derive(Debug, Clone, Copy)]
struct Move {
    i: usize,
    j: usize,
    gain: f64,
}

/// Endpoint view of a route, indexed by position.
///
/// `starts[k]` and `ends[k]` are the effective endpoints of the stroke at
/// position `k` as currently oriented.
struct Route {
    starts: Vec<Point>,
    ends: Vec<Point>,
    order: Vec<usize>,
    flipped: Vec<bool>,
    home: Option<Point>,
}

impl Route {
    fn new(paths: &[Path], home: Option<Point>) -> Self {
        Self {
            starts: paths.iter().map(Path::start).collect(),
            ends: paths.iter().map(Path::end).collect(),
            order: (0..paths.len()).collect(),
            flipped: vec![false; paths.len()],
            home,
        }
    }

    fn len(&self) -> usize {
        self.starts.len()
    }

    fn total_distance(&self) -> f64 {
        let between: f64 = self
            .ends
            .iter()
            .zip(self.starts.iter().skip(1))
            .map(|(end, start)| end.distance(*start))
            .sum();
        let lead_in = match (self.home, self.starts.first()) {
            (Some(home), Some(first)) => home.distance(*first),
            _ => 0.0,
        };
        lead_in + between
    }

    /// Travel saved by reversing positions `i..=j`.
    fn gain(&self, i: usize, j: usize) -> f64 {
        let entry = if i > 0 { Some(self.ends[i - 1]) } else { self.home };
        let mut current = 0.0;
        let mut candidate = 0.0;
        if let Some(entry) = entry {
            current += entry.distance(self.starts[i]);
            candidate += entry.distance(self.ends[j]);
        }
        if let Some(&next) = self.starts.get(j + 1) {
            current += self.ends[j].distance(next);
            candidate += self.starts[i].distance(next);
        }
        current - candidate
    }

    fn first_improving_move(&self) -> Option<Move> {
        let n = self.len();
        (0..n.saturating_sub(1))
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .map(|(i, j)| Move {
                i,
                j,
                gain: self.gain(i, j),
            })
            .find(|m| m.gain > IMPROVEMENT_EPSILON)
    }

    fn best_improving_move(&self) -> Option<Move> {
        let n = self.len();
        let mut best: Option<Move> = None;
        for i in 0..n.saturating_sub(1) {
            for j in i + 1..n {
                let gain = self.gain(i, j);
                if gain > IMPROVEMENT_EPSILON && best.is_none_or(|b| gain > b.gain) {
                    best = Some(Move { i, j, gain });
                }
            }
        }
        best
    }

    /// Reverse positions `i..=j` and flip each stroke in the block.
    fn reverse_block(&mut self, i: usize, j: usize) {
        self.starts[i..=j].reverse();
        self.ends[i..=j].reverse();
        self.order[i..=j].reverse();
        self.flipped[i..=j].reverse();
        self.starts[i..=j].swap_with_slice(&mut self.ends[i..=j]);
        for flip in &mut self.flipped[i..=j] {
            *flip = !*flip;
        }
    }
}
