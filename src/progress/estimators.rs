//! Pure rate estimators over a progress sample history.
//!
//! Every function here takes the history (and, where needed, the running
//! statistics) by reference and returns a rate in units of work per second, or
//! `None` when the rate is undefined. Nothing in this module touches a clock.

/// One observation: seconds since the transfer started and cumulative work done
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Seconds since the estimator's origin
    pub elapsed: f64,
    /// Cumulative work (bytes) at that moment
    pub work: f64,
}

impl Sample {
    /// Build a sample
    pub fn new(elapsed: f64, work: f64) -> Self {
        Self { elapsed, work }
    }
}

/// Minimum spacing, in seconds, between the two newest retained samples
pub const MIN_SAMPLE_SPACING_SECS: f64 = 1.0;

/// Whether a sample taken at `elapsed` replaces the newest stored sample
/// instead of being appended
///
/// Replaces when the timestamp equals the newest one, or when the two newest
/// stored samples are less than [`MIN_SAMPLE_SPACING_SECS`] apart.
pub fn should_replace(history: &[Sample], elapsed: f64) -> bool {
    match history {
        [] => false,
        [only] => only.elapsed == elapsed,
        [.., previous, last] => {
            last.elapsed == elapsed || last.elapsed - previous.elapsed < MIN_SAMPLE_SPACING_SECS
        }
    }
}

/// Rate between two samples; undefined for zero or negative time or work deltas
pub fn rate_between(from: &Sample, to: &Sample) -> Option<f64> {
    let delta_time = to.elapsed - from.elapsed;
    let delta_work = to.work - from.work;
    if delta_time <= 0.0 || delta_work <= 0.0 {
        return None;
    }
    let rate = delta_work / delta_time;
    rate.is_finite().then_some(rate)
}

/// Index of the oldest sample the windowed estimator still needs
///
/// Drops leading samples as long as the work done since the *next* sample
/// still exceeds the remaining work, i.e. keeps only enough trailing history to
/// cover the work that is left. With an unknown total the whole history is kept.
pub fn window_start(history: &[Sample], total: Option<f64>) -> usize {
    let (Some(total), Some(last)) = (total, history.last()) else {
        return 0;
    };
    let remaining = total - last.work;

    let mut start = 0;
    while start + 1 < history.len() && last.work - history[start + 1].work > remaining {
        start += 1;
    }
    start
}

/// Windowed-rate estimator: rate over the trailing window covering the remaining work
///
/// Undefined with fewer than two samples.
pub fn windowed_rate(history: &[Sample], total: Option<f64>) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let start = window_start(history, total);
    rate_between(&history[start], history.last()?)
}

/// Overall-average estimator: work since `origin` divided by time since `origin`
pub fn average_rate(origin: &Sample, history: &[Sample]) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    rate_between(origin, history.last()?)
}

/// Running statistics of time-per-unit-work between consecutive retained samples
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PessimistStats {
    sum: f64,
    sum_squares: f64,
    count: u32,
}

impl PessimistStats {
    /// Fold in the pair `(earlier, later)`
    ///
    /// Pairs without forward progress in both time and work are ignored.
    pub fn record(&mut self, earlier: &Sample, later: &Sample) {
        let delta_time = later.elapsed - earlier.elapsed;
        let delta_work = later.work - earlier.work;
        if delta_time <= 0.0 || delta_work <= 0.0 {
            return;
        }
        let secs_per_unit = delta_time / delta_work;
        self.sum += secs_per_unit;
        self.sum_squares += secs_per_unit * secs_per_unit;
        self.count += 1;
    }

    /// Number of recorded pairs
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Mean seconds per unit of work
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }

    /// Population standard deviation of seconds per unit of work
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        // Rounding can push the variance of near-identical values below zero
        let variance = (self.sum_squares / f64::from(self.count) - mean * mean).max(0.0);
        Some(variance.sqrt())
    }

    /// `1 / (mean + std_dev * percent / 100)`
    pub fn rate(&self, percent_complete: f64) -> Option<f64> {
        let denominator = self.mean()? + self.std_dev()? * percent_complete / 100.0;
        if denominator <= 0.0 {
            return None;
        }
        let rate = 1.0 / denominator;
        rate.is_finite().then_some(rate)
    }
}

/// Pessimistic estimator
///
/// Assumes each remaining unit takes the mean time per unit plus one standard
/// deviation, scaled by how far along the work is. Falls back to
/// [`average_rate`] with fewer than three samples or no usable statistics.
pub fn pessimistic_rate(
    origin: &Sample,
    history: &[Sample],
    stats: &PessimistStats,
    percent_complete: Option<f64>,
) -> Option<f64> {
    if history.len() < 3 {
        return average_rate(origin, history);
    }
    stats
        .rate(percent_complete.unwrap_or(0.0))
        .or_else(|| average_rate(origin, history))
}

/// Unweighted mean of the available estimates
pub fn blend(windowed: Option<f64>, pessimistic: Option<f64>) -> Option<f64> {
    match (windowed, pessimistic) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(rate), None) | (None, Some(rate)) => Some(rate),
        (None, None) => None,
    }
}
