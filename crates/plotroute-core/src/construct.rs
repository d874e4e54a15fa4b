//! Route construction: greedy nearest-neighbour ordering with orientation.
//!
//! Starting from the pen's home position, repeatedly picks the unplaced
//! stroke with the lowest approach score, in whichever direction scores
//! lower, and moves the pen to that stroke's end.
//!
//! The score is the pen-up distance to the approached endpoint plus
//! [`LENGTH_BIAS`] times the stroke's length. The length term breaks
//! near-ties in favour of short strokes so they are cleared before the
//! pen wanders off along a long one.
//!
//! Candidates are scanned in input order and the forward direction is
//! scored before the reversed one; a candidate only replaces the current
//! best on a strictly lower score, so exact ties go to the earliest scan.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::control::{Control, Progress, Unmonitored};
use crate::types::{Path, Point};

/// Weight of a stroke's length in its approach score.
pub const LENGTH_BIAS: f64 = 0.1;

/// One placement made by the constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstructionStep {
    /// Index of the placed path in the constructor's input.
    pub source_index: usize,
    /// Whether the path was reversed before placing it.
    pub reversed: bool,
    /// Pen-up travel from the previous pen position to this path's start.
    pub travel: f64,
    /// Pen-up travel accumulated up to and including this step.
    pub cumulative: f64,
}

/// Ordered, oriented paths plus the trace of how they were chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Construction {
    /// Paths in visiting order, each oriented for drawing.
    pub paths: Vec<Path>,
    /// One entry per placed path, in visiting order.
    pub trace: Vec<ConstructionStep>,
}

impl Construction {
    /// Total pen-up travel of the constructed route, including the leg
    /// from the start position.
    #[must_use]
    pub fn travel(&self) -> f64 {
        self.trace.last().map_or(0.0, |step| step.cumulative)
    }

    /// Number of paths the constructor reversed.
    #[must_use]
    pub fn reversed_count(&self) -> usize {
        self.trace.iter().filter(|step| step.reversed).count()
    }
}

/// Order and orient `paths` starting from the origin.
///
/// See [`construct_route_from`].
///
/// # Examples
///
/// ```
/// use plotroute_core::{Path, Point};
/// use plotroute_core::construct::construct_route;
///
/// let far = Path::new(vec![Point::new(50.0, 0.0), Point::new(60.0, 0.0)])?;
/// let near = Path::new(vec![Point::new(20.0, 0.0), Point::new(10.0, 0.0)])?;
/// let route = construct_route(vec![far, near]);
///
/// // The near stroke comes first, reversed so it starts at x = 10.
/// assert_eq!(route.trace[0].source_index, 1);
/// assert!(route.trace[0].reversed);
/// assert_eq!(route.paths[0].start(), Point::new(10.0, 0.0));
/// # Ok::<(), plotroute_core::PathError>(())
/// ```
#[must_use = "returns the constructed route"]
pub fn construct_route(paths: Vec<Path>) -> Construction {
    construct_route_from(paths, Point::ORIGIN, &Unmonitored)
}

/// Order and orient `paths` starting from `start`, reporting progress to
/// `control`.
///
/// A [`Progress::Construction`] event is emitted every
/// `max(1, n / 100)` placements and once more when the last path is
/// placed (unless that placement already produced one).
///
/// Construction always places every path; cancellation is not checked.
#[must_use = "returns the constructed route"]
pub fn construct_route_from(
    paths: Vec<Path>,
    start: Point,
    control: &impl Control,
) -> Construction {
    let total = paths.len();
    let report_every = (total / 100).max(1);

    // Placed paths are taken out of their slot; the rest keep their
    // input index so scan order never changes.
    let mut pool: Vec<Option<Path>> = paths.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(total);
    let mut trace = Vec::with_capacity(total);
    let mut position = start;
    let mut cumulative = 0.0;

    while let Some((index, reversed)) = best_candidate(&pool, position) {
        let Some(mut path) = pool[index].take() else {
            break;
        };
        if reversed {
            path.reverse();
        }

        let travel = position.distance(path.start());
        cumulative += travel;
        position = path.end();
        ordered.push(path);
        trace.push(ConstructionStep {
            source_index: index,
            reversed,
            travel,
            cumulative,
        });

        let placed = ordered.len();
        if placed % report_every == 0 || placed == total {
            control.progress(&Progress::Construction {
                placed,
                total,
                travel: cumulative,
            });
        }
    }

    debug!(
        paths = total,
        reversed = trace.iter().filter(|s| s.reversed).count(),
        travel = cumulative,
        "route constructed"
    );

    Construction {
        paths: ordered,
        trace,
    }
}

/// Index and orientation of the lowest-scoring unplaced path, or `None`
/// once everything is placed.
fn best_candidate(pool: &[Option<Path>], position: Point) -> Option<(usize, bool)> {
    let mut best: Option<(usize, bool)> = None;
    let mut best_score = f64::INFINITY;

    for (index, slot) in pool.iter().enumerate() {
        let Some(path) = slot else {
            continue;
        };
        let bias = LENGTH_BIAS * path.length();

        for (reversed, endpoint) in [(false, path.start()), (true, path.end())] {
            let score = position.distance(endpoint) + bias;
            // The first candidate is taken even if its score is NaN.
            if best.is_none() || score < best_score {
                best = Some((index, reversed));
                best_score = score;
            }
        }
    }

    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::control::ProgressFn;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
        Path::new(vec![Point::new(x0, y0), Point::new(x1, y1)]).unwrap()
    }

    fn sources(route: &Construction) -> Vec<usize> {
        route.trace.iter().map(|s| s.source_index).collect()
    }

    #[test]
    fn empty_input_returns_empty() {
        let route = construct_route(Vec::new());
        assert!(route.paths.is_empty());
        assert!(route.trace.is_empty());
        assert!(route.travel().abs() < f64::EPSILON);
    }

    #[test]
    fn single_path_kept_when_start_is_nearer() {
        let path = line(1.0, 0.0, 9.0, 0.0);
        let route = construct_route(vec![path.clone()]);
        assert_eq!(route.paths, vec![path]);
        assert!(!route.trace[0].reversed);
    }

    #[test]
    fn single_path_reversed_when_end_is_nearer() {
        let route = construct_route(vec![line(9.0, 0.0, 1.0, 0.0)]);
        assert_eq!(route.paths[0].start(), Point::new(1.0, 0.0));
        assert!(route.trace[0].reversed);
        assert!((route.travel() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn collinear_paths_visited_left_to_right() {
        let paths = vec![
            line(40.0, 0.0, 50.0, 0.0),
            line(0.0, 0.0, 10.0, 0.0),
            line(20.0, 0.0, 30.0, 0.0),
        ];
        let route = construct_route(paths);
        assert_eq!(sources(&route), vec![1, 2, 0]);
        assert_eq!(route.reversed_count(), 0);
        assert!((route.travel() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn exact_tie_goes_to_earliest_index() {
        let route = construct_route(vec![line(0.0, 5.0, 0.0, 6.0), line(0.0, 5.0, 0.0, 6.0)]);
        assert_eq!(sources(&route), vec![0, 1]);
    }

    #[test]
    fn orientation_tie_keeps_forward() {
        // Both endpoints are equidistant from the origin.
        let route = construct_route(vec![line(-3.0, 4.0, 3.0, 4.0)]);
        assert!(!route.trace[0].reversed);
    }

    #[test]
    fn length_bias_prefers_short_strokes() {
        // Long: 10 + 0.1 * 100 = 20. Short: 15 + 0.1 * 1 = 15.1.
        let long = line(10.0, 0.0, 10.0, 100.0);
        let short = line(15.0, 0.0, 16.0, 0.0);
        let route = construct_route(vec![long, short]);
        assert_eq!(sources(&route), vec![1, 0]);
    }

    #[test]
    fn trace_accumulates_travel() {
        let paths = vec![line(3.0, 4.0, 10.0, 4.0), line(10.0, 7.0, 20.0, 7.0)];
        let route = construct_route(paths);
        assert!((route.trace[0].travel - 5.0).abs() < 1e-12);
        assert!((route.trace[1].travel - 3.0).abs() < 1e-12);
        assert!((route.trace[1].cumulative - 8.0).abs() < 1e-12);
    }

    #[test]
    fn custom_start_position() {
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), line(100.0, 0.0, 101.0, 0.0)];
        let route = construct_route_from(paths, Point::new(100.0, 0.0), &Unmonitored);
        assert_eq!(sources(&route), vec![1, 0]);
        assert!(route.trace[0].travel.abs() < f64::EPSILON);
    }

    #[test]
    fn every_path_placed_once() {
        let paths: Vec<Path> = (0..25)
            .map(|i| {
                let x = f64::from((i * 37) % 25) * 4.0;
                line(x, 0.0, x + 1.0, 2.0)
            })
            .collect();
        let route = construct_route(paths);
        let mut seen = sources(&route);
        seen.sort_unstable();
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn progress_reported_per_interval_and_at_completion() {
        let events = RefCell::new(Vec::new());
        let control = ProgressFn(|event: &Progress| events.borrow_mut().push(event.clone()));
        let paths: Vec<Path> = (0..250)
            .map(|i| {
                let x = f64::from(i) * 2.0;
                line(x, 0.0, x + 1.0, 0.0)
            })
            .collect();

        let _ = construct_route_from(paths, Point::ORIGIN, &control);

        // Every 2 placements: 125 events; 250 is itself a multiple of 2.
        let events = events.into_inner();
        assert_eq!(events.len(), 125);
        assert!(matches!(
            events.last(),
            Some(Progress::Construction {
                placed: 250,
                total: 250,
                ..
            })
        ));
    }

    #[test]
    fn completion_reported_off_interval() {
        let events = RefCell::new(Vec::new());
        let control = ProgressFn(|event: &Progress| events.borrow_mut().push(event.clone()));
        let paths: Vec<Path> = (0..201)
            .map(|i| {
                let x = f64::from(i) * 2.0;
                line(x, 0.0, x + 1.0, 0.0)
            })
            .collect();

        let _ = construct_route_from(paths, Point::ORIGIN, &control);

        // Interval 2: placements 2, 4, ..., 200 plus the final 201.
        let events = events.into_inner();
        assert_eq!(events.len(), 101);
        assert!(matches!(
            events.last(),
            Some(Progress::Construction { placed: 201, .. })
        ));
    }
}
