//! Pen-width coverage filter: drop strokes whose ink is already on paper.
//!
//! Strokes are considered longest first, so a long stroke is never removed
//! in favour of a shorter one. Each candidate is sampled every half pen
//! width; at each sample the [`SpatialHash`] of already-kept strokes gives
//! the coverage fraction, and `1 - coverage` is the visible fraction. A
//! stroke whose mean visibility falls below the threshold is dropped;
//! otherwise it is kept and indexed for the strokes after it.
//!
//! Coverage model, for two pens of equal width `w` whose centre lines are
//! `d` apart: `max(0, 1 - d / w)`.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::geometry::resample_polyline;
use crate::spatial_hash::SpatialHash;
use crate::types::Path;

/// Result of running the coverage filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageOutcome {
    /// Surviving paths, in their original relative order.
    pub kept: Vec<Path>,
    /// Original indices of removed paths, in the order they were rejected
    /// (longest first).
    pub removed_indices: Vec<usize>,
    /// Number of paths given to the filter.
    pub original_count: usize,
    /// Pen width the filter ran with.
    pub pen_width: f64,
    /// Visibility threshold the filter ran with.
    pub visibility_threshold: f64,
    /// Coverage queries issued against the index.
    pub samples_evaluated: usize,
}

impl CoverageOutcome {
    /// Number of paths removed.
    #[must_use]
    pub const fn removed_count(&self) -> usize {
        self.removed_indices.len()
    }

    /// Summary suitable for reporting back to a client.
    #[must_use]
    pub fn stats(&self) -> FilterStats {
        FilterStats {
            original_count: self.original_count,
            removed_count: self.removed_count(),
            removed_indices: self.removed_indices.clone(),
            pen_width: self.pen_width,
            visibility_threshold: self.visibility_threshold,
        }
    }

    fn unchanged(paths: &[Path], pen_width: f64, visibility_threshold: f64) -> Self {
        Self {
            kept: paths.to_vec(),
            removed_indices: Vec::new(),
            original_count: paths.len(),
            pen_width,
            visibility_threshold,
            samples_evaluated: 0,
        }
    }
}

/// Serializable coverage filter summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Paths before filtering.
    pub original_count: usize,
    /// Paths removed.
    pub removed_count: usize,
    /// Original indices of removed paths.
    pub removed_indices: Vec<usize>,
    /// Pen width in millimetres.
    pub pen_width: f64,
    /// Visibility threshold as a fraction.
    pub visibility_threshold: f64,
}

/// Remove paths whose drawn area is mostly covered by longer paths.
///
/// Returns the input unchanged, with nothing removed, when there are
/// fewer than two paths, when `pen_width` is not finite, or when
/// `pen_width` or `visibility_threshold` is not positive.
///
/// # Examples
///
/// ```
/// use plotroute_core::{Path, Point};
/// use plotroute_core::coverage::filter_covered_paths;
///
/// let a = Path::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 100.0)])?;
/// let b = Path::new(vec![Point::new(0.0, 0.5), Point::new(0.0, 100.5)])?;
/// let outcome = filter_covered_paths(&[a.clone(), b], 2.0, 0.9);
/// assert_eq!(outcome.kept, vec![a]);
/// assert_eq!(outcome.removed_indices, vec![1]);
/// # Ok::<(), plotroute_core::PathError>(())
/// ```
#[must_use = "returns the filtered paths"]
pub fn filter_covered_paths(
    paths: &[Path],
    pen_width: f64,
    visibility_threshold: f64,
) -> CoverageOutcome {
    if paths.len() < 2
        || !pen_width.is_finite()
        || pen_width <= 0.0
        || visibility_threshold.is_nan()
        || visibility_threshold <= 0.0
    {
        return CoverageOutcome::unchanged(paths, pen_width, visibility_threshold);
    }

    let sample_interval = pen_width / 2.0;

    // Stable sort: equal lengths keep their input order.
    let mut by_length: Vec<usize> = (0..paths.len()).collect();
    by_length.sort_by(|&a, &b| paths[b].length().total_cmp(&paths[a].length()));

    let mut index = SpatialHash::new(SpatialHash::cell_size_for_pen(pen_width));
    let mut keep = vec![false; paths.len()];
    let mut removed_indices = Vec::new();
    let mut samples_evaluated = 0;

    for (rank, &i) in by_length.iter().enumerate() {
        let path = &paths[i];

        if rank == 0 {
            index.insert_path(path.points());
            keep[i] = true;
            continue;
        }

        let samples = if path.is_zero_length() {
            vec![path.start()]
        } else {
            resample_polyline(path.points(), sample_interval)
        };
        samples_evaluated += samples.len();

        let visible: f64 = samples
            .iter()
            .map(|&p| 1.0 - index.max_coverage_at(p, pen_width))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let mean_visibility = visible / samples.len() as f64;

        if mean_visibility >= visibility_threshold {
            index.insert_path(path.points());
            keep[i] = true;
        } else {
            trace!(index = i, mean_visibility, "path covered, removing");
            removed_indices.push(i);
        }
    }

    let kept: Vec<Path> = paths
        .iter()
        .zip(&keep)
        .filter_map(|(path, &k)| k.then(|| path.clone()))
        .collect();

    debug!(
        original = paths.len(),
        kept = kept.len(),
        removed = removed_indices.len(),
        pen_width,
        visibility_threshold,
        indexed_segments = index.segment_count(),
        "coverage filter finished"
    );

    CoverageOutcome {
        kept,
        removed_indices,
        original_count: paths.len(),
        pen_width,
        visibility_threshold,
        samples_evaluated,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn path(coords: &[(f64, f64)]) -> Path {
        Path::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()).unwrap()
    }

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
        path(&[(x0, y0), (x1, y1)])
    }

    #[test]
    fn guard_fewer_than_two_paths() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0)];
        let outcome = filter_covered_paths(&paths, 2.0, 0.5);
        assert_eq!(outcome.kept, paths);
        assert!(outcome.removed_indices.is_empty());
    }

    #[test]
    fn guard_non_positive_pen_width() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), line(0.0, 0.0, 10.0, 0.0)];
        for pen_width in [0.0, -1.0] {
            let outcome = filter_covered_paths(&paths, pen_width, 0.5);
            assert_eq!(outcome.kept, paths);
            assert!(outcome.removed_indices.is_empty());
        }
    }

    #[test]
    fn guard_non_finite_pen_width() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), line(0.0, 5.0, 10.0, 5.0)];
        for pen_width in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let outcome = filter_covered_paths(&paths, pen_width, 0.5);
            assert_eq!(outcome.kept, paths);
            assert!(outcome.removed_indices.is_empty());
            assert_eq!(outcome.samples_evaluated, 0);
        }
    }

    #[test]
    fn point_far_from_ink_is_kept() {
        let paths = vec![line(0.0, 0.0, 20.0, 0.0), path(&[(1e19, 0.0)])];
        let outcome = filter_covered_paths(&paths, 1.0, 0.5);
        assert_eq!(outcome.kept, paths);
        assert!(outcome.removed_indices.is_empty());
    }

    #[test]
    fn guard_non_positive_threshold() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), line(0.0, 0.0, 10.0, 0.0)];
        for threshold in [0.0, -0.25] {
            let outcome = filter_covered_paths(&paths, 1.0, threshold);
            assert_eq!(outcome.kept, paths);
            assert_eq!(outcome.removed_count(), 0);
        }
    }

    #[test]
    fn identical_paths_keep_the_first() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), line(0.0, 0.0, 10.0, 0.0)];
        let outcome = filter_covered_paths(&paths, 0.5, 0.1);
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.removed_indices, vec![1]);
    }

    #[test]
    fn longer_path_wins_regardless_of_input_order() {
        let short = line(2.0, 0.0, 8.0, 0.0);
        let long = line(0.0, 0.0, 10.0, 0.0);
        let outcome = filter_covered_paths(&[short, long.clone()], 1.0, 0.5);
        assert_eq!(outcome.kept, vec![long]);
        assert_eq!(outcome.removed_indices, vec![0]);
    }

    #[test]
    fn disjoint_paths_all_survive() {
        let paths: Vec<Path> = (0..5)
            .map(|i| {
                let y = f64::from(i) * 5.0;
                line(0.0, y, 20.0, y)
            })
            .collect();
        let outcome = filter_covered_paths(&paths, 2.0, 1.0);
        assert_eq!(outcome.kept, paths);
        assert!(outcome.removed_indices.is_empty());
    }

    #[test]
    fn output_preserves_input_order() {
        let paths = vec![
            line(0.0, 10.0, 3.0, 10.0),
            line(0.0, 0.0, 50.0, 0.0),
            line(0.0, 20.0, 10.0, 20.0),
        ];
        let outcome = filter_covered_paths(&paths, 1.0, 0.5);
        assert_eq!(outcome.kept, paths);
    }

    #[test]
    fn partially_covered_path_depends_on_threshold() {
        // Second path overlaps the first for half its length.
        let paths = vec![line(0.0, 0.0, 20.0, 0.0), line(10.0, 0.0, 30.0, 0.0)];
        let lenient = filter_covered_paths(&paths, 1.0, 0.3);
        assert_eq!(lenient.kept.len(), 2);
        let strict = filter_covered_paths(&paths, 1.0, 0.7);
        assert_eq!(strict.kept.len(), 1);
        assert_eq!(strict.removed_indices, vec![1]);
    }

    #[test]
    fn zero_length_path_on_ink_is_removed() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), path(&[(5.0, 0.0), (5.0, 0.0)])];
        let outcome = filter_covered_paths(&paths, 1.0, 0.5);
        assert_eq!(outcome.removed_indices, vec![1]);
        assert_eq!(outcome.samples_evaluated, 1);
    }

    #[test]
    fn zero_length_path_off_ink_is_kept() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), path(&[(5.0, 5.0)])];
        let outcome = filter_covered_paths(&paths, 1.0, 0.5);
        assert_eq!(outcome.kept.len(), 2);
    }

    #[test]
    fn removed_indices_follow_processing_order() {
        let paths = vec![
            line(0.0, 0.0, 4.0, 0.0),
            line(0.0, 0.0, 100.0, 0.0),
            line(0.0, 0.0, 8.0, 0.0),
        ];
        let outcome = filter_covered_paths(&paths, 1.0, 0.5);
        assert_eq!(outcome.removed_indices, vec![2, 0]);
    }

    #[test]
    fn stats_report_parameters() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), line(0.0, 0.0, 10.0, 0.0)];
        let stats = filter_covered_paths(&paths, 0.8, 0.6).stats();
        assert_eq!(stats.original_count, 2);
        assert_eq!(stats.removed_count, 1);
        assert_eq!(stats.removed_indices, vec![1]);
        assert!((stats.pen_width - 0.8).abs() < f64::EPSILON);
        assert!((stats.visibility_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn filtering_its_own_output_removes_nothing_more() {
        let paths = vec![
            line(0.0, 0.0, 30.0, 0.0),
            line(0.0, 0.4, 30.0, 0.4),
            line(0.0, 3.0, 30.0, 3.0),
            line(5.0, 3.2, 12.0, 3.2),
            line(40.0, 0.0, 40.0, 30.0),
        ];
        let first = filter_covered_paths(&paths, 1.0, 0.5);
        let second = filter_covered_paths(&first.kept, 1.0, 0.5);
        assert_eq!(second.kept, first.kept);
        assert!(second.removed_indices.is_empty());
    }
}
