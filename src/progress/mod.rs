//! Progress tracking with a smoothed ETA.
//!
//! [`ProgressEstimator`] keeps a bounded, time-ordered history of
//! `(elapsed, work)` samples for one transfer and blends two rate estimates:
//! a windowed rate over just enough trailing history to cover the remaining
//! work, and a pessimistic rate built from the mean and standard deviation of
//! the observed time per byte. Bursty sub-second updates collapse into the
//! newest sample so they do not skew either estimate.

pub mod estimators;

use estimators::{PessimistStats, Sample};
use std::time::Instant;
use tracing::debug;

/// Upper bound on retained samples; the oldest are dropped beyond it
const MAX_HISTORY: usize = 512;

/// Tracks one transfer and derives percent complete, rate and ETA
#[derive(Clone, Debug)]
pub struct ProgressEstimator {
    /// Declared total, None when unknown
    total: Option<u64>,
    /// Work completed so far
    completed: u64,
    /// Wall-clock origin used by [`observe`](Self::observe)
    origin: Instant,
    /// Very first observation, kept for the overall average
    start: Sample,
    /// Retained samples, oldest first
    history: Vec<Sample>,
    /// Running time-per-unit statistics
    stats: PessimistStats,
    /// Last defined predicted rate
    rate: Option<f64>,
}

impl ProgressEstimator {
    /// Start tracking a transfer of `total` units (None = unknown size)
    ///
    /// An empty baseline sample is recorded immediately.
    pub fn new(total: Option<u64>) -> Self {
        let start = Sample::new(0.0, 0.0);
        Self {
            total,
            completed: 0,
            origin: Instant::now(),
            start,
            history: vec![start],
            stats: PessimistStats::default(),
            rate: None,
        }
    }

    /// Record cumulative `work` at the current time
    pub fn observe(&mut self, work: u64) {
        let elapsed = self.origin.elapsed().as_secs_f64();
        self.observe_at(elapsed, work);
    }

    /// Record `delta` more units of work at the current time
    pub fn add(&mut self, delta: u64) {
        self.observe(self.completed.saturating_add(delta));
    }

    /// Record cumulative `work` at `elapsed` seconds after the origin
    pub fn observe_at(&mut self, elapsed: f64, work: u64) {
        let work = if work < self.completed {
            debug!(work, completed = self.completed, "ignoring backwards progress");
            self.completed
        } else {
            work
        };
        if let Some(total) = self.total
            && work > total
        {
            debug!(work, total, "observed work exceeds declared total, raising total");
            self.total = Some(work);
        }

        let sample = Sample::new(elapsed, work as f64);
        let replace = estimators::should_replace(&self.history, elapsed);

        // Statistics are folded in only when the newest sample becomes permanent,
        // so a sample that is later replaced is never counted
        let len = self.history.len();
        if !replace && len > 1 {
            self.stats
                .record(&self.history[len - 2], &self.history[len - 1]);
        }

        if replace && len > 0 {
            self.history[len - 1] = sample;
        } else {
            self.history.push(sample);
        }
        self.completed = work;

        let start = estimators::window_start(&self.history, self.total_f64());
        if start > 0 {
            self.history.drain(..start);
        }
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }

        if let Some(rate) = self.compute_rate() {
            self.rate = Some(rate);
        }
    }

    fn total_f64(&self) -> Option<f64> {
        self.total.map(|total| total as f64)
    }

    fn compute_rate(&self) -> Option<f64> {
        let total = self.total_f64();
        let windowed = estimators::windowed_rate(&self.history, total);
        let pessimistic = estimators::pessimistic_rate(
            &self.start,
            &self.history,
            &self.stats,
            self.percent_complete(),
        );
        estimators::blend(windowed, pessimistic)
    }

    /// Declared total, None when unknown
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Work completed so far
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// True exactly when the completed work equals a known total
    pub fn done(&self) -> bool {
        self.total == Some(self.completed)
    }

    /// Percent complete, None when the total is unknown or zero
    pub fn percent_complete(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(100.0 * self.completed as f64 / total as f64),
            _ => None,
        }
    }

    /// Predicted rate for the remaining work, in units per second
    ///
    /// Keeps the last defined estimate when the newest samples do not allow a
    /// fresh one.
    pub fn predicted_rate(&self) -> Option<f64> {
        self.rate
    }

    /// Seconds between the first and the newest observation
    pub fn elapsed_secs(&self) -> f64 {
        self.history
            .last()
            .map_or(0.0, |last| last.elapsed - self.start.elapsed)
    }

    /// Average rate over the whole transfer; 0 until time has passed
    pub fn overall_rate(&self) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (self.completed as f64 - self.start.work) / elapsed
    }

    /// Estimated seconds until completion, as of now
    pub fn eta_seconds(&self) -> Option<f64> {
        self.eta_at(self.origin.elapsed().as_secs_f64())
    }

    /// Estimated seconds until completion, as of `now` seconds after the origin
    ///
    /// Time passed since the newest sample is subtracted from the raw estimate.
    /// Returns `Some(0.0)` once all work is done and `None` when the total or the
    /// rate is unknown.
    pub fn eta_at(&self, now: f64) -> Option<f64> {
        let remaining = self.total?.saturating_sub(self.completed);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.rate.filter(|rate| *rate > 0.0)?;
        let since_last_sample = self
            .history
            .last()
            .map_or(0.0, |last| (now - last.elapsed).max(0.0));
        Some((remaining as f64 / rate - since_last_sample).max(0.0))
    }

    /// Immutable view for readers on other tasks
    pub fn snapshot(&self) -> ProgressSnapshot {
        let sampled_at = Instant::now();
        let now = sampled_at.duration_since(self.origin).as_secs_f64();
        ProgressSnapshot {
            total: self.total,
            completed: self.completed,
            percent: self.percent_complete(),
            rate: self.rate,
            overall_rate: self.overall_rate(),
            eta: self.eta_at(now),
            sampled_at,
        }
    }
}

/// Point-in-time copy of a [`ProgressEstimator`]'s derived values
#[derive(Clone, Copy, Debug)]
pub struct ProgressSnapshot {
    /// Declared total, None when unknown
    pub total: Option<u64>,
    /// Work completed
    pub completed: u64,
    /// Percent complete
    pub percent: Option<f64>,
    /// Predicted rate in units per second
    pub rate: Option<f64>,
    /// Overall average rate in units per second
    pub overall_rate: f64,
    /// ETA in seconds when the snapshot was taken
    pub eta: Option<f64>,
    /// When the snapshot was taken
    pub sampled_at: Instant,
}

impl ProgressSnapshot {
    /// Snapshot of a transfer that has not produced any data yet
    pub fn initial(total: Option<u64>) -> Self {
        ProgressEstimator::new(total).snapshot()
    }

    /// ETA as of now, compensating for the age of the snapshot
    pub fn eta_seconds(&self) -> Option<f64> {
        let age = self.sampled_at.elapsed().as_secs_f64();
        self.eta.map(|eta| (eta - age).max(0.0))
    }
}
