//! Shared types for plotroute: points, paths, job configuration, and errors.

use serde::{Deserialize, Serialize};

use crate::geometry::{LENGTH_EPSILON, polyline_length};
use crate::refine::MoveStrategy;

/// A 2D point in plotter coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position in millimetres.
    pub x: f64,
    /// Vertical position in millimetres.
    pub y: f64,
}

impl Point {
    /// The machine origin, where the pen rests before a job.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// One continuous pen-down stroke.
///
/// Always holds at least one point. Length and centre are computed once
/// at construction; reversing a path keeps them, since the stroke covers
/// the same ink either way.
///
/// Two paths are equal when their point sequences are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Path {
    points: Vec<Point>,
    length: f64,
    center: Point,
}

impl Path {
    /// Create a path from its points in drawing order.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Empty`] if `points` is empty.
    pub fn new(points: Vec<Point>) -> Result<Self, PathError> {
        if points.is_empty() {
            return Err(PathError::Empty);
        }
        let length = polyline_length(&points);
        let center = centroid(&points);
        Ok(Self {
            points,
            length,
            center,
        })
    }

    /// First point: where the pen goes down.
    #[must_use]
    pub fn start(&self) -> Point {
        // Non-empty by construction.
        self.points[0]
    }

    /// Last point: where the pen lifts.
    #[must_use]
    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Drawn length in millimetres.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Arithmetic mean of the points.
    #[must_use]
    pub const fn center(&self) -> Point {
        self.center
    }

    /// Whether every point coincides (the stroke is a dot).
    #[must_use]
    pub fn is_zero_length(&self) -> bool {
        self.length <= LENGTH_EPSILON
    }

    /// Number of points.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        self.points.len()
    }

    /// The points in drawing order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the path and returns its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Reverse the drawing direction in place, swapping start and end.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// The same stroke drawn in the opposite direction.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reverse();
        self
    }

    /// Append the points of `other` after this path's end.
    ///
    /// Used by the adjacency merge; `skip_first` drops `other`'s first
    /// point when it duplicates this path's end.
    pub(crate) fn extend_with(&mut self, other: &Self, skip_first: bool) {
        let tail = if skip_first {
            &other.points[1..]
        } else {
            &other.points[..]
        };
        self.points.extend_from_slice(tail);
        self.length = polyline_length(&self.points);
        self.center = centroid(&self.points);
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

impl TryFrom<Vec<Point>> for Path {
    type Error = PathError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Path> for Vec<Point> {
    fn from(path: Path) -> Self {
        path.points
    }
}

#[allow(clippy::cast_precision_loss)]
fn centroid(points: &[Point]) -> Point {
    let n = points.len().max(1) as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Errors constructing a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path needs at least one point.
    #[error("a path must contain at least one point")]
    Empty,
}

/// Configuration for one optimization job.
///
/// All parameters have defaults matching the plotter service this
/// engine was built for. Use [`validate`](Self::validate) before running
/// a job with user-supplied values; [`crate::optimize`] does so itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    /// Pen tip diameter in millimetres. The coverage filter only runs
    /// when this is positive.
    pub pen_width: f64,

    /// Minimum mean visibility, in `[0, 1]`, a stroke needs to survive
    /// the coverage filter.
    pub visibility_threshold: f64,

    /// Largest end-to-start gap in millimetres that the adjacency merge
    /// bridges. `None` disables merging.
    pub merge_threshold: Option<f64>,

    /// Cap on accepted 2-opt moves.
    pub max_iterations: usize,

    /// How the refiner picks among improving moves.
    pub move_strategy: MoveStrategy,

    /// Where the pen rests before the first stroke.
    pub home: Point,
}

impl OptimizeConfig {
    /// Default pen width: filter disabled.
    pub const DEFAULT_PEN_WIDTH: f64 = 0.0;
    /// Default visibility threshold (50 %).
    pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.5;
    /// Default merge threshold in millimetres.
    pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.05;
    /// Default refinement iteration cap.
    pub const DEFAULT_MAX_ITERATIONS: usize = 500;
    /// Largest accepted iteration cap.
    pub const MAX_ITERATIONS_CAP: usize = 1_000_000;
    /// Range the plotter UI clamps user-entered iteration caps into.
    pub const UI_ITERATION_RANGE: std::ops::RangeInclusive<usize> = 50..=1000;

    /// Check every field, reporting the first that is out of range.
    ///
    /// # Errors
    ///
    /// Returns the matching [`ConfigError`] variant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pen_width.is_finite() && self.pen_width >= 0.0) {
            return Err(ConfigError::PenWidth(self.pen_width));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(ConfigError::VisibilityThreshold(self.visibility_threshold));
        }
        if let Some(gap) = self.merge_threshold
            && !(gap.is_finite() && gap >= 0.0)
        {
            return Err(ConfigError::MergeThreshold(gap));
        }
        if !(1..=Self::MAX_ITERATIONS_CAP).contains(&self.max_iterations) {
            return Err(ConfigError::MaxIterations(self.max_iterations));
        }
        if !(self.home.x.is_finite() && self.home.y.is_finite()) {
            return Err(ConfigError::Home(self.home));
        }
        Ok(())
    }

    /// Clamp a user-entered iteration cap into [`Self::UI_ITERATION_RANGE`].
    #[must_use]
    pub fn clamp_iterations(requested: usize) -> usize {
        requested.clamp(
            *Self::UI_ITERATION_RANGE.start(),
            *Self::UI_ITERATION_RANGE.end(),
        )
    }
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            pen_width: Self::DEFAULT_PEN_WIDTH,
            visibility_threshold: Self::DEFAULT_VISIBILITY_THRESHOLD,
            merge_threshold: Some(Self::DEFAULT_MERGE_THRESHOLD),
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            move_strategy: MoveStrategy::default(),
            home: Point::ORIGIN,
        }
    }
}

/// An [`OptimizeConfig`] field is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Pen width must be finite and non-negative.
    #[error("pen width must be finite and >= 0, got {0}")]
    PenWidth(f64),

    /// Visibility threshold must lie in `[0, 1]`.
    #[error("visibility threshold must be within 0..=1, got {0}")]
    VisibilityThreshold(f64),

    /// Merge threshold must be finite and non-negative.
    #[error("merge threshold must be finite and >= 0, got {0}")]
    MergeThreshold(f64),

    /// Iteration cap must be at least one and at most the hard cap.
    #[error(
        "max iterations must be within 1..={max}, got {0}",
        max = OptimizeConfig::MAX_ITERATIONS_CAP
    )]
    MaxIterations(usize),

    /// Home position must be finite.
    #[error("home position must be finite, got {0:?}")]
    Home(Point),
}
