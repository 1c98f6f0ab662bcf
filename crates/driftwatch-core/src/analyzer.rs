// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Driftwatch Core - Streaming Analyzer

//! # Streaming Analyzer
//!
//! Maintains a fixed-capacity trailing window of sample values with running
//! aggregates (sum and sum-of-squares), and classifies each insertion with a
//! z-score test against the window mean.
//!
//! Aggregates are updated incrementally — add the new value, subtract the
//! evicted one — so insertion is O(1) regardless of window size. The tradeoff
//! is floating-point drift over very long runs; the variance clamp below
//! absorbs the small negative values that drift can produce.
//!
//! ## Concurrency
//!
//! State lives behind a [`parking_lot::RwLock`]: [`StreamingAnalyzer::add_sample`]
//! takes the write lock for the minimal critical section (window mutation +
//! aggregate update + snapshot derivation), while
//! [`StreamingAnalyzer::snapshot`] takes the read lock and may run
//! concurrently with other readers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default trailing window capacity.
/// 50 samples balances responsiveness (a shifted baseline ages out within 50
/// observations) against stability of the mean/std-dev estimates.
pub const DEFAULT_WINDOW_SIZE: usize = 50;

/// Z-score threshold above which a sample is classified anomalous.
/// The comparison is strict: a z-score of exactly 2.0 is not flagged.
pub const ANOMALY_Z_THRESHOLD: f64 = 2.0;

/// Point-in-time view of the analyzer state.
///
/// Derived on demand from the window and running aggregates; never stored.
/// Field names match the JSON wire format served by the analyze endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Number of values currently in the window.
    pub count: u64,
    /// Mean of the window values.
    pub mean: f64,
    /// Population standard deviation of the window values.
    pub std_dev: f64,
    /// Most recently inserted value.
    pub last_value: f64,
    /// Absolute deviation of `last_value` from the mean, in standard
    /// deviations. Zero when the standard deviation is zero.
    pub z_score: f64,
    /// Whether `last_value` exceeded the anomaly threshold.
    pub is_anomaly: bool,
    /// Configured window capacity.
    pub window_size: usize,
    /// Anomalies observed since analyzer creation (monotonic).
    pub anomaly_count: u64,
}

impl StatsSnapshot {
    fn empty(window_size: usize) -> Self {
        Self {
            count: 0,
            mean: 0.0,
            std_dev: 0.0,
            last_value: 0.0,
            z_score: 0.0,
            is_anomaly: false,
            window_size,
            anomaly_count: 0,
        }
    }
}

/// Window contents and running aggregates.
///
/// Invariant: `sum == Σ values` and `sum_squares == Σ values²` to within
/// floating-point rounding.
struct WindowState {
    values: VecDeque<f64>,
    sum: f64,
    sum_squares: f64,
    anomalies: u64,
}

impl WindowState {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            sum: 0.0,
            sum_squares: 0.0,
            anomalies: 0,
        }
    }

    /// Derive mean / std-dev / z-score for `last` against the current window.
    ///
    /// The `max(0.0, variance)` clamp is mandatory: incremental aggregate
    /// updates can leave a tiny negative variance through rounding, and
    /// `sqrt` of that would poison every downstream field with NaN.
    fn derive(&self, last: f64, window_size: usize) -> StatsSnapshot {
        let n = self.values.len() as f64;
        let mean = self.sum / n;
        let variance = (self.sum_squares / n - mean * mean).max(0.0);
        let std_dev = variance.sqrt();

        // Zero std-dev (all window values identical, including a single
        // sample) never flags, regardless of magnitude. Policy, not omission:
        // there is no meaningful deviation scale to measure against.
        let (z_score, is_anomaly) = if std_dev > 0.0 {
            let z = (last - mean).abs() / std_dev;
            (z, z > ANOMALY_Z_THRESHOLD)
        } else {
            (0.0, false)
        };

        StatsSnapshot {
            count: self.values.len() as u64,
            mean,
            std_dev,
            last_value: last,
            z_score,
            is_anomaly,
            window_size,
            anomaly_count: self.anomalies,
        }
    }
}

/// Streaming statistics over a bounded trailing window.
///
/// Shared freely behind an `Arc`; interior locking handles concurrent
/// writers and readers.
pub struct StreamingAnalyzer {
    window_size: usize,
    state: RwLock<WindowState>,
}

impl StreamingAnalyzer {
    /// Create an analyzer with the given window capacity.
    ///
    /// A capacity of zero falls back to [`DEFAULT_WINDOW_SIZE`] rather than
    /// erroring, matching how the service config treats unusable values.
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        let window_size = if window_size == 0 {
            tracing::warn!(
                fallback = DEFAULT_WINDOW_SIZE,
                "analyzer window size must be > 0, using default"
            );
            DEFAULT_WINDOW_SIZE
        } else {
            window_size
        };
        Self {
            window_size,
            state: RwLock::new(WindowState::new(window_size)),
        }
    }

    /// Configured window capacity.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Insert a value and classify it. O(1) amortized.
    ///
    /// If the window is at capacity the oldest value is evicted first
    /// (strict FIFO). Returns the snapshot derived immediately after the
    /// insertion, with the anomaly counter already updated.
    pub fn add_sample(&self, value: f64) -> StatsSnapshot {
        let mut state = self.state.write();

        if state.values.len() == self.window_size {
            if let Some(evicted) = state.values.pop_front() {
                state.sum -= evicted;
                state.sum_squares -= evicted * evicted;
            }
        }
        state.values.push_back(value);
        state.sum += value;
        state.sum_squares += value * value;

        let mut stats = state.derive(value, self.window_size);
        if stats.is_anomaly {
            state.anomalies += 1;
            stats.anomaly_count = state.anomalies;
        }
        stats
    }

    /// Read-only snapshot for the most recently inserted value.
    ///
    /// Never errors: an empty window yields a zeroed snapshot with
    /// `count == 0`. Does not mutate any state — repeated calls without an
    /// intervening [`Self::add_sample`] return identical values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.read();
        match state.values.back() {
            Some(&last) => state.derive(last, self.window_size),
            None => StatsSnapshot::empty(self.window_size),
        }
    }
}
