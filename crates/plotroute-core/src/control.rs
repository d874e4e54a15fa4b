//! Cooperative cancellation and progress reporting.
//!
//! The core never decides how progress travels or how a cancel request
//! arrives. Callers hand a [`Control`] implementation to the long-running
//! stages; the stages poll [`Control::is_cancelled`] between units of work
//! and call [`Control::progress`] when they have something to report.
//!
//! Both methods are called from the optimizing thread and should return
//! quickly. A service that streams progress elsewhere typically forwards
//! the event over a channel from inside `progress`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// A progress event from one of the route stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Progress {
    /// The constructor has placed `placed` of `total` paths.
    Construction {
        /// Paths placed so far.
        placed: usize,
        /// Paths to place in total.
        total: usize,
        /// Pen-up travel accumulated so far.
        travel: f64,
    },
    /// The refiner accepted a move.
    Refinement {
        /// Accepted moves so far.
        iteration: usize,
        /// Total pen-up travel after the move.
        distance: f64,
    },
}

/// Cancellation and progress hooks for a running job.
pub trait Control {
    /// Whether the caller has asked the job to stop.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Receive a progress event.
    fn progress(&self, _event: &Progress) {}
}

/// Never cancels and discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmonitored;

impl Control for Unmonitored {}

/// Cancellation through a shared flag.
///
/// Clone the flag (or its [`handle`](Self::handle)) into whatever thread
/// decides to stop the job.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// The shared flag, for callers that already hold an `AtomicBool`.
    #[must_use]
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Control for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress through a callback; never cancels.
pub struct ProgressFn<F>(pub F);

impl<F: Fn(&Progress)> Control for ProgressFn<F> {
    fn progress(&self, event: &Progress) {
        (self.0)(event);
    }
}

impl<C: Control + ?Sized> Control for &C {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }

    fn progress(&self, event: &Progress) {
        (**self).progress(event);
    }
}
