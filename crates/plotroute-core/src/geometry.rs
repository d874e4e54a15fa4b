//! Geometry kernel: point-to-segment distance, polyline length, and
//! equidistant resampling.
//!
//! Everything here is a pure function of its inputs. The coverage filter
//! and the route stages build on these primitives; none of them allocate
//! beyond their returned vectors.

use crate::types::{Path, Point};

/// Squared segment length below which a segment is treated as a point.
pub const DEGENERATE_SEGMENT_EPSILON: f64 = 1e-24;

/// Lengths below this are treated as zero when walking a polyline.
pub const LENGTH_EPSILON: f64 = 1e-12;

/// Squared distance from `p` to the closed segment `a`–`b`.
///
/// The projection parameter is clamped to `[0, 1]`, so points beyond
/// either end measure to that endpoint. A segment whose squared length is
/// below [`DEGENERATE_SEGMENT_EPSILON`] measures to `a`.
///
/// # Examples
///
/// ```
/// use plotroute_core::Point;
/// use plotroute_core::geometry::point_segment_distance_squared;
///
/// let d = point_segment_distance_squared(
///     Point::new(5.0, 3.0),
///     Point::new(0.0, 0.0),
///     Point::new(10.0, 0.0),
/// );
/// assert!((d - 9.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn point_segment_distance_squared(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx.mul_add(dx, dy * dy);
    if len_sq < DEGENERATE_SEGMENT_EPSILON {
        return p.distance_squared(a);
    }

    let t = ((p.x - a.x).mul_add(dx, (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let nearest = Point::new(t.mul_add(dx, a.x), t.mul_add(dy, a.y));
    p.distance_squared(nearest)
}

/// Sum of consecutive Euclidean distances. Zero for fewer than two points.
#[must_use]
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Equally spaced samples along a polyline, `interval` apart.
///
/// The first and last input points are always included exactly once;
/// the spacing before the last point may be shorter than `interval`.
/// Zero-length segments are skipped, so a polyline whose points all
/// coincide yields a single sample. Inputs with fewer than two points,
/// and non-positive or non-finite intervals, return the input unchanged.
///
/// # Examples
///
/// ```
/// use plotroute_core::Point;
/// use plotroute_core::geometry::resample_polyline;
///
/// let samples = resample_polyline(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 4.0);
/// let xs: Vec<f64> = samples.iter().map(|p| p.x).collect();
/// assert_eq!(xs, vec![0.0, 4.0, 8.0, 10.0]);
/// ```
#[must_use]
pub fn resample_polyline(points: &[Point], interval: f64) -> Vec<Point> {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if points.len() < 2 || !(interval > 0.0 && interval.is_finite()) {
        return points.to_vec();
    }

    let mut samples = vec![first];
    // Distance already travelled along the current segment before the
    // next sample is due.
    let mut carried = 0.0;

    for window in points.windows(2) {
        let (a, b) = (window[0], window[1]);
        let seg_len = a.distance(b);
        if seg_len < LENGTH_EPSILON {
            continue;
        }
        let ux = (b.x - a.x) / seg_len;
        let uy = (b.y - a.y) / seg_len;

        let mut pos = interval - carried;
        while pos < seg_len - LENGTH_EPSILON {
            samples.push(Point::new(ux.mul_add(pos, a.x), uy.mul_add(pos, a.y)));
            pos += interval;
        }
        carried = seg_len - (pos - interval);
    }

    if samples
        .last()
        .is_some_and(|tail| tail.distance(last) > LENGTH_EPSILON)
    {
        samples.push(last);
    }

    samples
}

/// Pen-up travel for drawing `paths` in order, each as currently oriented.
///
/// Sums the gap from each path's end to the next path's start. When
/// `home` is given, the leg from `home` to the first path's start is
/// included as well.
#[must_use]
pub fn pen_up_distance(paths: &[Path], home: Option<Point>) -> f64 {
    let between: f64 = paths
        .windows(2)
        .map(|pair| pair[0].end().distance(pair[1].start()))
        .sum();
    let lead_in = match (home, paths.first()) {
        (Some(home), Some(first)) => home.distance(first.start()),
        _ => 0.0,
    };
    lead_in + between
}
