//! Uniform-grid spatial hash over line segments.
//!
//! Each inserted segment is recorded in every cell its bounding box
//! touches. A coverage query only visits the cells within the pen-width
//! radius of the query point, so its cost tracks local ink density rather
//! than the total amount indexed.
//!
//! The index only grows. Build a fresh one per job.

use std::collections::HashMap;

use crate::geometry::point_segment_distance_squared;
use crate::types::Point;

/// Coverage at or above this is reported as full coverage.
const SATURATED_COVERAGE: f64 = 0.999;

/// Integer grid coordinate `(floor(x / cell), floor(y / cell))`.
type CellKey = (i64, i64);

/// A directed edge between two consecutive points of an indexed path.
#[derive(Debug, Clone, Copy)]
struct Segment {
    a: Point,
    b: Point,
}

/// Grid of segments keyed by cell.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f64,
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<Segment>>,
    segment_count: usize,
}

impl SpatialHash {
    /// Create an empty index with square cells of side `cell_size`.
    ///
    /// Non-positive or non-finite sizes fall back to 1 mm.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            inv_cell_size: cell_size.recip(),
            cells: HashMap::new(),
            segment_count: 0,
        }
    }

    /// Recommended cell size for a pen: the pen width, but never below 1 mm.
    #[must_use]
    pub fn cell_size_for_pen(pen_width: f64) -> f64 {
        pen_width.max(1.0)
    }

    /// Side length of one cell.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of segments inserted so far (each counted once).
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_coord(&self, v: f64) -> i64 {
        (v * self.inv_cell_size).floor() as i64
    }

    /// Insert every consecutive segment of `points`.
    ///
    /// A single point contributes nothing.
    pub fn insert_path(&mut self, points: &[Point]) {
        for window in points.windows(2) {
            let segment = Segment {
                a: window[0],
                b: window[1],
            };
            let cx0 = self.cell_coord(segment.a.x.min(segment.b.x));
            let cx1 = self.cell_coord(segment.a.x.max(segment.b.x));
            let cy0 = self.cell_coord(segment.a.y.min(segment.b.y));
            let cy1 = self.cell_coord(segment.a.y.max(segment.b.y));
            for cx in cx0..=cx1 {
                for cy in cy0..=cy1 {
                    self.cells.entry((cx, cy)).or_default().push(segment);
                }
            }
            self.segment_count += 1;
        }
    }

    /// Largest coverage fraction any indexed segment gives at `p`.
    ///
    /// Coverage falls off linearly with distance `d` to the segment:
    /// `max(0, 1 - d / pen_width)`. Only cells within
    /// `ceil(pen_width / cell_size)` of `p`'s cell are scanned; segments
    /// further out are at least `pen_width` away and cover nothing. When
    /// that neighbourhood holds more cells than the index, every occupied
    /// cell is scanned instead.
    ///
    /// Returns `1.0` as soon as any segment reaches near-full coverage,
    /// and `0.0` for a non-finite or non-positive `pen_width`.
    #[must_use]
    pub fn max_coverage_at(&self, p: Point, pen_width: f64) -> f64 {
        if !(pen_width.is_finite() && pen_width > 0.0) || self.cells.is_empty() {
            return 0.0;
        }

        let radius = (pen_width * self.inv_cell_size).ceil();
        let span = 2.0f64.mul_add(radius, 1.0);
        #[allow(clippy::cast_precision_loss)]
        let occupied = self.cells.len() as f64;

        let mut best = 0.0_f64;
        let saturated = if span * span >= occupied {
            self.cells
                .values()
                .any(|bucket| raise_coverage(bucket, p, pen_width, &mut best))
        } else {
            // span^2 < occupied, so the radius fits comfortably in i64.
            #[allow(clippy::cast_possible_truncation)]
            let radius = radius as i64;
            let cx = self.cell_coord(p.x);
            let cy = self.cell_coord(p.y);
            (-radius..=radius)
                .flat_map(|dx| (-radius..=radius).map(move |dy| (dx, dy)))
                .filter_map(|(dx, dy)| {
                    self.cells
                        .get(&(cx.saturating_add(dx), cy.saturating_add(dy)))
                })
                .any(|bucket| raise_coverage(bucket, p, pen_width, &mut best))
        };

        if saturated { 1.0 } else { best }
    }
}

/// Raise `best` to the strongest coverage any segment in `bucket` gives
/// at `p`. Returns `true` once coverage saturates.
fn raise_coverage(bucket: &[Segment], p: Point, pen_width: f64, best: &mut f64) -> bool {
    let pen_width_sq = pen_width * pen_width;
    for segment in bucket {
        let d_sq = point_segment_distance_squared(p, segment.a, segment.b);
        if d_sq >= pen_width_sq {
            continue;
        }
        let coverage = 1.0 - d_sq.sqrt() / pen_width;
        if coverage > *best {
            *best = coverage;
            if *best >= SATURATED_COVERAGE {
                return true;
            }
        }
    }
    false
}
