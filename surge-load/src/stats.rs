//! Request statistics aggregated from request events

use crate::events::{RequestEvent, RequestListener};
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::warn;

/// Significant figures kept by response-time histograms
const HISTOGRAM_SIGFIG: u8 = 3;

/// Per-request aggregate
///
/// Response times are recorded in microseconds. Memory is bounded by the
/// histogram's value range, not by the number of samples.
struct EntryTracker {
    num_requests: u64,
    num_failures: u64,
    response_times: Histogram<u64>,
    min_response_time: f64,
    max_response_time: f64,
    total_response_time: f64,
    total_content_length: u64,
}

impl EntryTracker {
    fn new() -> Result<Self, hdrhistogram::CreationError> {
        Ok(Self {
            num_requests: 0,
            num_failures: 0,
            response_times: Histogram::new(HISTOGRAM_SIGFIG)?,
            min_response_time: f64::INFINITY,
            max_response_time: 0.0,
            total_response_time: 0.0,
            total_content_length: 0,
        })
    }

    fn record(&mut self, response_time: f64, response_length: usize) {
        self.num_requests += 1;
        self.response_times.saturating_record(to_micros(response_time));
        self.min_response_time = self.min_response_time.min(response_time);
        self.max_response_time = self.max_response_time.max(response_time);
        self.total_response_time += response_time;
        self.total_content_length += response_length as u64;
    }

    /// Response time in milliseconds at quantile `q`
    fn percentile(&self, q: f64) -> f64 {
        if self.response_times.is_empty() {
            return 0.0;
        }
        self.response_times.value_at_quantile(q) as f64 / 1000.0
    }
}

fn to_micros(millis: f64) -> u64 {
    // Float to int casts saturate; negative and NaN become zero
    (millis * 1000.0).round() as u64
}

#[derive(Default)]
struct StatsInner {
    entries: BTreeMap<(String, String), EntryTracker>,
    errors: BTreeMap<String, u64>,
    started_at: Option<DateTime<Utc>>,
}

/// Request listener collecting samples and task errors
#[derive(Default)]
pub struct RequestStats {
    inner: Mutex<StatsInner>,
}

/// Summary of one request name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsEntry {
    pub request_type: String,
    pub name: String,
    pub num_requests: u64,
    pub num_failures: u64,
    pub min_response_time: f64,
    pub avg_response_time: f64,
    pub max_response_time: f64,
    pub p50_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    pub requests_per_second: f64,
    pub avg_content_length: f64,
}

/// Final report of a run
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub started_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub entries: Vec<StatsEntry>,
    /// Error message to number of occurrences
    pub errors: Vec<(String, u64)>,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StatsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one request sample
    pub fn record(&self, event: &RequestEvent) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.started_at.get_or_insert(event.timestamp);

        let key = (event.request_type.clone(), event.name.clone());
        let entry = match inner.entries.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(slot) => match EntryTracker::new() {
                Ok(tracker) => slot.insert(tracker),
                Err(e) => {
                    warn!("Failed to create response time histogram: {}", e);
                    return;
                }
            },
        };
        entry.record(event.response_time, event.response_length);

        if let Some(ref exception) = event.exception {
            entry.num_failures += 1;
            let error_key = format!("{} {}: {}", event.request_type, event.name, exception);
            *inner.errors.entry(error_key).or_insert(0) += 1;
        }
    }

    /// Record a task failure that produced no request sample
    pub fn record_task_error(&self, user_class: &str, error: &str) {
        let mut inner = self.lock();
        *inner
            .errors
            .entry(format!("{}: {}", user_class, error))
            .or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.lock().entries.values().map(|e| e.num_requests).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.lock().entries.values().map(|e| e.num_failures).sum()
    }

    /// Total occurrences across the error table
    pub fn total_errors(&self) -> u64 {
        self.lock().errors.values().sum()
    }

    /// Forget every sample and error
    pub fn reset(&self) {
        *self.lock() = StatsInner::default();
    }

    /// Build a report for a run that lasted `duration`
    pub fn report(&self, duration: Duration) -> StatsReport {
        let inner = self.lock();
        let secs = duration.as_secs_f64();

        let entries = inner
            .entries
            .iter()
            .map(|((request_type, name), tracker)| {
                let (min, avg) = if tracker.num_requests == 0 {
                    (0.0, 0.0)
                } else {
                    (
                        tracker.min_response_time,
                        tracker.total_response_time / tracker.num_requests as f64,
                    )
                };

                StatsEntry {
                    request_type: request_type.clone(),
                    name: name.clone(),
                    num_requests: tracker.num_requests,
                    num_failures: tracker.num_failures,
                    min_response_time: min,
                    avg_response_time: avg,
                    max_response_time: tracker.max_response_time,
                    p50_response_time: tracker.percentile(0.50),
                    p95_response_time: tracker.percentile(0.95),
                    p99_response_time: tracker.percentile(0.99),
                    requests_per_second: if secs > 0.0 {
                        tracker.num_requests as f64 / secs
                    } else {
                        0.0
                    },
                    avg_content_length: if tracker.num_requests > 0 {
                        tracker.total_content_length as f64 / tracker.num_requests as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        let mut errors: Vec<(String, u64)> = inner
            .errors
            .iter()
            .map(|(message, count)| (message.clone(), *count))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        StatsReport {
            started_at: inner.started_at,
            duration_secs: secs,
            entries,
            errors,
        }
    }
}

impl RequestListener for RequestStats {
    fn on_request(&self, event: &RequestEvent) {
        self.record(event);
    }

    fn on_task_error(&self, user_class: &str, error: &str) {
        self.record_task_error(user_class, error);
    }
}

impl StatsReport {
    pub fn total_requests(&self) -> u64 {
        self.entries.iter().map(|e| e.num_requests).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.entries.iter().map(|e| e.num_failures).sum()
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:<24} {:>8} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8} {:>9}",
            "Type", "Name", "# reqs", "# fails", "Avg", "Min", "Max", "p50", "p95", "p99", "req/s", "Avg size"
        )?;
        writeln!(f, "{}", "-".repeat(129))?;

        for entry in &self.entries {
            writeln!(
                f,
                "{:<12} {:<24} {:>8} {:>8} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>8.2} {:>9.1}",
                entry.request_type,
                entry.name,
                entry.num_requests,
                entry.num_failures,
                entry.avg_response_time,
                entry.min_response_time,
                entry.max_response_time,
                entry.p50_response_time,
                entry.p95_response_time,
                entry.p99_response_time,
                entry.requests_per_second,
                entry.avg_content_length,
            )?;
        }

        writeln!(f, "{}", "-".repeat(129))?;
        writeln!(
            f,
            "{:<37} {:>8} {:>8}   (run time {:.1}s)",
            "Aggregated",
            self.total_requests(),
            self.total_failures(),
            self.duration_secs
        )?;

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Error report")?;
            writeln!(f, "{:>8}  {}", "# occ", "Error")?;
            for (message, count) in &self.errors {
                writeln!(f, "{:>8}  {}", count, message)?;
            }
        }

        Ok(())
    }
}
