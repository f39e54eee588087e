//! Timed execution of units of work.
//!
//! [`watch`] and [`watch_async`] run a unit of work exactly once, measure its
//! wall-clock duration and emit one [`TimingRecord`] to a [`DiagnosticSink`].
//! Work is never cancelled because it takes long; the duration is only
//! reported.
//!
//! ```
//! use sift_search::timing::{TracingSink, watch};
//!
//! let (sum, elapsed) = watch("sum", &TracingSink, || (1..=10).sum::<u32>()).into_parts();
//! assert_eq!(sum, 55);
//! assert!(elapsed.as_secs() < 60);
//! ```

use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

/// Timing of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingRecord {
    /// Label of the work.
    pub name: String,
    /// When the work started.
    pub started_at: DateTime<Utc>,
    /// How long the work took.
    pub elapsed: Duration,
}

/// Receives timing records.
pub trait DiagnosticSink: Send + Sync + Debug {
    /// Records the timing of a finished unit of work.
    fn record(&self, record: &TimingRecord);
}

/// Logs timing records at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, record: &TimingRecord) {
        debug!(
            task = %record.name,
            started_at = %record.started_at.to_rfc3339(),
            elapsed_ms = record.elapsed.as_secs_f64() * 1000.0,
            "task finished"
        );
    }
}

/// Result of a watched unit of work together with its duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watched<T> {
    /// What the work returned.
    pub result: T,
    /// How long the work took.
    pub elapsed: Duration,
}

impl<T> Watched<T> {
    /// Splits into result and duration.
    pub fn into_parts(self) -> (T, Duration) {
        (self.result, self.elapsed)
    }

    /// Returns the result, dropping the duration.
    pub fn into_result(self) -> T {
        self.result
    }
}

/// Runs `work` once and reports its duration to `sink`.
///
/// A panic in `work` propagates and no record is emitted.
pub fn watch<T, F>(name: &str, sink: &dyn DiagnosticSink, work: F) -> Watched<T>
where
    F: FnOnce() -> T,
{
    let started_at = Utc::now();
    let start = Instant::now();
    let result = work();
    finish(name, sink, started_at, start, result)
}

/// Awaits `work` once and reports its duration to `sink`.
pub async fn watch_async<T, F>(name: &str, sink: &dyn DiagnosticSink, work: F) -> Watched<T>
where
    F: Future<Output = T>,
{
    let started_at = Utc::now();
    let start = Instant::now();
    let result = work.await;
    finish(name, sink, started_at, start, result)
}

fn finish<T>(
    name: &str,
    sink: &dyn DiagnosticSink,
    started_at: DateTime<Utc>,
    start: Instant,
    result: T,
) -> Watched<T> {
    let elapsed = start.elapsed();
    sink.record(&TimingRecord {
        name: name.to_string(),
        started_at,
        elapsed,
    });
    Watched { result, elapsed }
}
