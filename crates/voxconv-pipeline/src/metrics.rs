//! Pipeline metrics.
//!
//! Counters are atomics; duration samples sit behind a mutex so percentiles
//! can be computed on snapshot.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum number of duration samples kept in memory.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Conversion metrics collector, shared by every run of one pipeline.
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Runs started.
    pub conversions_started: AtomicU64,
    /// Runs that produced an output file.
    pub conversions_succeeded: AtomicU64,
    /// Runs that ended in a `ConvertError`.
    pub conversions_failed: AtomicU64,
    /// Warnings collected over all runs.
    pub warnings_emitted: AtomicU64,
    /// Upload bytes read.
    pub total_input_bytes: AtomicU64,
    /// Output bytes written.
    pub total_output_bytes: AtomicU64,
    duration_samples: Mutex<Vec<Duration>>,
}

impl PipelineMetrics {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self {
            conversions_started: AtomicU64::new(0),
            conversions_succeeded: AtomicU64::new(0),
            conversions_failed: AtomicU64::new(0),
            warnings_emitted: AtomicU64::new(0),
            total_input_bytes: AtomicU64::new(0),
            total_output_bytes: AtomicU64::new(0),
            duration_samples: Mutex::new(Vec::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    /// Record a run start.
    pub fn record_started(&self) {
        self.conversions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the size of an upload that was read.
    pub fn record_input(&self, bytes: u64) {
        self.total_input_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a successful run.
    pub fn record_success(&self, duration: Duration, output_bytes: u64, warnings: u64) {
        self.conversions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_output_bytes
            .fetch_add(output_bytes, Ordering::Relaxed);
        self.warnings_emitted.fetch_add(warnings, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// Record a failed run.
    pub fn record_failure(&self, duration: Duration) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.remove(0);
            }
            samples.push(duration);
        }
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations = self
            .duration_samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        let (p50, p95) = percentiles(&durations);

        MetricsSnapshot {
            conversions_started: self.conversions_started.load(Ordering::Relaxed),
            conversions_succeeded: self.conversions_succeeded.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            warnings_emitted: self.warnings_emitted.load(Ordering::Relaxed),
            total_input_bytes: self.total_input_bytes.load(Ordering::Relaxed),
            total_output_bytes: self.total_output_bytes.load(Ordering::Relaxed),
            duration_p50_ms: p50.map(|d| d.as_millis() as u64),
            duration_p95_ms: p95.map(|d| d.as_millis() as u64),
            sample_count: durations.len() as u64,
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn percentiles(durations: &[Duration]) -> (Option<Duration>, Option<Duration>) {
    if durations.is_empty() {
        return (None, None);
    }
    let mut sorted = durations.to_vec();
    sorted.sort();
    let len = sorted.len();
    (
        sorted.get(len * 50 / 100).copied(),
        sorted.get(len * 95 / 100).copied(),
    )
}

/// Serializable point-in-time metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Runs started.
    pub conversions_started: u64,
    /// Successful runs.
    pub conversions_succeeded: u64,
    /// Failed runs.
    pub conversions_failed: u64,
    /// Warnings collected.
    pub warnings_emitted: u64,
    /// Upload bytes read.
    pub total_input_bytes: u64,
    /// Output bytes written.
    pub total_output_bytes: u64,
    /// Median run duration.
    pub duration_p50_ms: Option<u64>,
    /// 95th percentile run duration.
    pub duration_p95_ms: Option<u64>,
    /// Number of duration samples.
    pub sample_count: u64,
}
