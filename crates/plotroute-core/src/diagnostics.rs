//! Job diagnostics: timing and metrics for each route stage.
//!
//! Every call to [`optimize_with_diagnostics`](crate::pipeline::optimize_with_diagnostics)
//! collects these alongside the optimized route. They exist for parameter
//! tuning and for comparing move strategies on real drawings.
//!
//! Timestamps come from a caller-supplied [`Clock`], so the core never
//! reads the system time itself.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::refine::MoveStrategy;

/// Monotonic time source for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances. Every stage reports zero duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrozenClock;

impl Clock for FrozenClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from one optimization job.
///
/// Stages that can be switched off by configuration are `Option` and
/// `None` when they did not run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDiagnostics {
    /// Coverage filter (only when `pen_width > 0`).
    pub filter: Option<StageDiagnostics>,
    /// Greedy route construction.
    pub construct: StageDiagnostics,
    /// Adjacency merge (only when a merge threshold is set).
    pub merge: Option<StageDiagnostics>,
    /// 2-opt refinement.
    pub refine: StageDiagnostics,
    /// Wall-clock duration of the whole job (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Counts and travel across the job.
    pub summary: RouteSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Coverage filter metrics.
    Filter {
        /// Pen width in millimetres.
        pen_width: f64,
        /// Visibility threshold as a fraction.
        visibility_threshold: f64,
        /// Paths before filtering.
        paths_before: usize,
        /// Paths after filtering.
        paths_after: usize,
        /// Coverage queries issued against the spatial hash.
        samples_evaluated: usize,
    },
    /// Route construction metrics.
    Construct {
        /// Paths placed.
        paths: usize,
        /// Paths placed in reverse.
        reversed: usize,
        /// Pen-up travel of the constructed route.
        travel: f64,
    },
    /// Adjacency merge metrics.
    Merge {
        /// Largest gap bridged, in millimetres.
        threshold: f64,
        /// Paths before merging.
        paths_before: usize,
        /// Paths after merging.
        paths_after: usize,
    },
    /// Refinement metrics.
    Refine {
        /// Move selection used.
        strategy: MoveStrategy,
        /// Accepted moves.
        iterations: usize,
        /// Cap on accepted moves.
        max_iterations: usize,
        /// Travel before the first move.
        initial_distance: f64,
        /// Travel after the last move.
        final_distance: f64,
        /// Whether no improving move remained.
        converged: bool,
        /// Whether the caller cancelled.
        cancelled: bool,
    },
}

/// Job-level counts and travel distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Paths given to the job.
    pub input_paths: usize,
    /// Paths in the final route.
    pub output_paths: usize,
    /// Total points in the final route.
    pub output_points: usize,
    /// Pen-up travel of the input order, from the home position.
    pub input_travel: f64,
    /// Pen-up travel after construction.
    pub constructed_travel: f64,
    /// Pen-up travel after refinement.
    pub final_travel: f64,
    /// Travel removed by refinement, as a percentage of its starting
    /// travel. Zero when there was nothing to remove.
    pub refinement_savings_percent: f64,
}

impl JobDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Route Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Paths: {} in, {} out ({} points)",
            self.summary.input_paths, self.summary.output_paths, self.summary.output_points,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages: Vec<(&str, &StageDiagnostics)> = Vec::with_capacity(4);
        if let Some(ref filter) = self.filter {
            stages.push(("Filter", filter));
        }
        stages.push(("Construct", &self.construct));
        if let Some(ref merge) = self.merge {
            stages.push(("Merge", merge));
        }
        stages.push(("Refine", &self.refine));

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Pen-up travel: input {:.2}mm  |  constructed {:.2}mm  |  final {:.2}mm ({:.1}% saved by refinement)",
            self.summary.input_travel,
            self.summary.constructed_travel,
            self.summary.final_travel,
            self.summary.refinement_savings_percent,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Filter {
            pen_width,
            visibility_threshold,
            paths_before,
            paths_after,
            samples_evaluated,
        } => {
            format!(
                "pen={pen_width:.2}mm vis>={:.0}% {paths_before}->{paths_after} paths ({samples_evaluated} samples)",
                visibility_threshold * 100.0,
            )
        }
        StageMetrics::Construct {
            paths,
            reversed,
            travel,
        } => format!("{paths} paths, {reversed} reversed, travel={travel:.2}mm"),
        StageMetrics::Merge {
            threshold,
            paths_before,
            paths_after,
        } => format!("gap<={threshold:.3}mm {paths_before}->{paths_after} paths"),
        StageMetrics::Refine {
            strategy,
            iterations,
            max_iterations,
            initial_distance,
            final_distance,
            converged,
            cancelled,
        } => {
            let stop = if *cancelled {
                "cancelled"
            } else if *converged {
                "converged"
            } else {
                "capped"
            };
            format!(
                "{strategy} {iterations}/{max_iterations} moves, {initial_distance:.2}->{final_distance:.2}mm ({stop})",
            )
        }
    }
}

/// Percentage of `before` removed to reach `after`.
pub(crate) fn savings_percent(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (before - after) / before * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> JobDiagnostics {
        JobDiagnostics {
            filter: Some(StageDiagnostics {
                duration: Duration::from_millis(12),
                metrics: StageMetrics::Filter {
                    pen_width: 0.5,
                    visibility_threshold: 0.5,
                    paths_before: 120,
                    paths_after: 100,
                    samples_evaluated: 4000,
                },
            }),
            construct: StageDiagnostics {
                duration: Duration::from_millis(8),
                metrics: StageMetrics::Construct {
                    paths: 100,
                    reversed: 40,
                    travel: 900.0,
                },
            },
            merge: None,
            refine: StageDiagnostics {
                duration: Duration::from_millis(30),
                metrics: StageMetrics::Refine {
                    strategy: MoveStrategy::FirstImprovement,
                    iterations: 17,
                    max_iterations: 500,
                    initial_distance: 900.0,
                    final_distance: 810.0,
                    converged: true,
                    cancelled: false,
                },
            },
            total_duration: Duration::from_millis(50),
            summary: RouteSummary {
                input_paths: 120,
                output_paths: 100,
                output_points: 2400,
                input_travel: 3000.0,
                constructed_travel: 900.0,
                final_travel: 810.0,
                refinement_savings_percent: 10.0,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn frozen_clock_reports_zero() {
        let clock = FrozenClock;
        let start = clock.now();
        assert_eq!(clock.elapsed(&start), Duration::ZERO);
    }

    #[test]
    fn savings_percent_handles_zero_start() {
        assert!((savings_percent(200.0, 150.0) - 25.0).abs() < 1e-12);
        assert!(savings_percent(0.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_lists_stages_that_ran() {
        let report = sample().report();
        assert!(report.contains("Route Diagnostics Report"));
        assert!(report.contains("Filter"));
        assert!(report.contains("first-improvement 17/500 moves"));
        assert!(report.contains("converged"));
        assert!(!report.contains("Merge"));
        assert!(report.contains("10.0% saved by refinement"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.05).abs() < 1e-9);
        assert!((json["refine"]["duration"].as_f64().unwrap() - 0.03).abs() < 1e-9);
        assert!(json["merge"].is_null());
    }

    #[test]
    fn diagnostics_deserialize_back() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: JobDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary, sample().summary);
        assert!((parsed.construct.duration.as_secs_f64() - 0.008).abs() < 1e-9);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        let parsed: Result<JobDiagnostics, _> = serde_json::from_value(json);
        assert!(parsed.is_err());
    }
}
