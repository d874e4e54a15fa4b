//! Adjacency merge: fuse consecutive strokes whose gap is negligible.
//!
//! Runs on an already ordered route and never reorders it. Whenever the
//! end of one stroke lies within the merge threshold of the next stroke's
//! start, the two become one stroke and a pen lift/drop pair disappears.
//! A gap below [`DUPLICATE_EPSILON`] is treated as the same point and the
//! duplicate is dropped; a wider gap is bridged by a straight segment.

use tracing::debug;

use crate::types::Path;

/// Gaps shorter than this join without a bridging segment.
pub const DUPLICATE_EPSILON: f64 = 0.001;

/// Result of [`merge_adjacent`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The route after merging.
    pub paths: Vec<Path>,
    /// Number of joins performed (input count minus output count).
    pub merged: usize,
}

/// Merge consecutive paths whose end-to-start gap is at most `threshold`.
///
/// A negative or NaN threshold merges nothing.
///
/// # Examples
///
/// ```
/// use plotroute_core::{Path, Point};
/// use plotroute_core::merge::merge_adjacent;
///
/// let a = Path::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)])?;
/// let b = Path::new(vec![Point::new(10.0, 0.0), Point::new(10.0, 5.0)])?;
/// let outcome = merge_adjacent(vec![a, b], 0.05);
/// assert_eq!(outcome.merged, 1);
/// assert_eq!(outcome.paths[0].point_count(), 3);
/// # Ok::<(), plotroute_core::PathError>(())
/// ```
#[must_use = "returns the merged route"]
pub fn merge_adjacent(paths: Vec<Path>, threshold: f64) -> MergeOutcome {
    let input_count = paths.len();
    let mut merged_paths: Vec<Path> = Vec::with_capacity(input_count);

    for path in paths {
        if let Some(current) = merged_paths.last_mut() {
            let gap = current.end().distance(path.start());
            if gap <= threshold {
                current.extend_with(&path, gap < DUPLICATE_EPSILON);
                continue;
            }
        }
        merged_paths.push(path);
    }

    let merged = input_count - merged_paths.len();
    debug!(
        input = input_count,
        output = merged_paths.len(),
        merged,
        threshold,
        "adjacent paths merged"
    );

    MergeOutcome {
        paths: merged_paths,
        merged,
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

    #[test]
    fn empty_route_stays_empty() {
        let outcome = merge_adjacent(Vec::new(), 1.0);
        assert!(outcome.paths.is_empty());
        assert_eq!(outcome.merged, 0);
    }

    #[test]
    fn touching_paths_drop_the_duplicate_point() {
        let outcome = merge_adjacent(
            vec![path(&[(0.0, 0.0), (5.0, 0.0)]), path(&[(5.0, 0.0), (5.0, 5.0)])],
            0.05,
        );
        assert_eq!(outcome.paths, vec![path(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)])]);
        assert!((outcome.paths[0].length() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn small_gap_is_bridged() {
        let outcome = merge_adjacent(
            vec![path(&[(0.0, 0.0), (5.0, 0.0)]), path(&[(5.0, 0.04), (5.0, 5.0)])],
            0.05,
        );
        assert_eq!(outcome.merged, 1);
        assert_eq!(
            outcome.paths[0],
            path(&[(0.0, 0.0), (5.0, 0.0), (5.0, 0.04), (5.0, 5.0)])
        );
    }

    #[test]
    fn gap_equal_to_threshold_merges() {
        let outcome = merge_adjacent(
            vec![path(&[(0.0, 0.0), (1.0, 0.0)]), path(&[(1.5, 0.0), (2.0, 0.0)])],
            0.5,
        );
        assert_eq!(outcome.merged, 1);
    }

    #[test]
    fn wide_gap_is_left_alone() {
        let paths = vec![path(&[(0.0, 0.0), (1.0, 0.0)]), path(&[(2.0, 0.0), (3.0, 0.0)])];
        let outcome = merge_adjacent(paths.clone(), 0.5);
        assert_eq!(outcome.paths, paths);
        assert_eq!(outcome.merged, 0);
    }

    #[test]
    fn chains_of_touching_paths_collapse() {
        let paths = vec![
            path(&[(0.0, 0.0), (1.0, 0.0)]),
            path(&[(1.0, 0.0), (2.0, 0.0)]),
            path(&[(2.0, 0.0), (3.0, 0.0)]),
            path(&[(10.0, 0.0), (11.0, 0.0)]),
            path(&[(11.0, 0.0), (12.0, 0.0)]),
        ];
        let outcome = merge_adjacent(paths, 0.05);
        assert_eq!(outcome.merged, 3);
        assert_eq!(outcome.paths.len(), 2);
        assert_eq!(outcome.paths[0].point_count(), 4);
        assert_eq!(outcome.paths[1].start(), Point::new(10.0, 0.0));
    }

    #[test]
    fn negative_threshold_merges_nothing() {
        let paths = vec![path(&[(0.0, 0.0), (1.0, 0.0)]), path(&[(1.0, 0.0), (2.0, 0.0)])];
        let outcome = merge_adjacent(paths, -1.0);
        assert_eq!(outcome.merged, 0);
    }

    #[test]
    fn order_is_not_reconsidered() {
        // The second path touches the first path's start, not its end.
        let paths = vec![path(&[(0.0, 0.0), (5.0, 0.0)]), path(&[(0.0, 0.0), (0.0, 5.0)])];
        let outcome = merge_adjacent(paths.clone(), 0.05);
        assert_eq!(outcome.paths, paths);
    }
}
