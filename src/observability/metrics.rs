//! Thread-safe metrics collection system
//!
//! Atomic counters for inbound relay requests and downstream forward
//! outcomes, plus a bounded window of request durations for percentiles.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Number of request durations kept for percentile calculation
const PROCESSING_WINDOW: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Thread-safe metrics collector using atomics and a mutex-guarded window
pub struct MetricsCollector {
    // Inbound requests
    requests_received: AtomicU64,
    requests_in_flight: AtomicU64,
    requests_completed: AtomicU64,
    requests_failed: AtomicU64,
    requests_rejected: AtomicU64,

    // Forward outcomes
    forwarded: AtomicU64,
    transport_errors: AtomicU64,
    status_errors: AtomicU64,
    decode_errors: AtomicU64,

    processing_times: Mutex<Vec<u64>>, // in milliseconds
    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_in_flight: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            status_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            processing_times: Mutex::new(Vec::new()),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    /// Count an inbound request; it stays in flight until the guard drops
    pub fn request_received(&self) -> InFlightRequest<'_> {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightRequest {
            collector: self,
            started: Instant::now(),
        }
    }

    /// The request produced a `{ "result": ... }` envelope
    pub fn request_completed(&self, duration: Duration) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
        self.record_processing_time(duration);
    }

    /// The request ended in an internal orchestration fault (HTTP 500)
    pub fn request_failed(&self, duration: Duration) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.record_processing_time(duration);
    }

    /// The inbound body could not be deserialized (HTTP 422)
    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one forward outcome by label
    ///
    /// Labels are `forwarded`, `transport_error`, `status_error` and
    /// `decode_error`. Unknown labels are ignored.
    pub fn record_forward_outcome(&self, outcome: &str) {
        let counter = match outcome {
            "forwarded" => &self.forwarded,
            "transport_error" => &self.transport_errors,
            "status_error" => &self.status_errors,
            "decode_error" => &self.decode_errors,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processing_time(&self, duration: Duration) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(duration.as_millis() as u64);

            if times.len() > PROCESSING_WINDOW {
                times.remove(0);
            }
        }
    }

    /// Seconds since the collector was created or last reset
    pub fn uptime_seconds(&self) -> u64 {
        current_timestamp().saturating_sub(self.uptime_start.load(Ordering::Relaxed))
    }

    // Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.requests_received,
            &self.requests_in_flight,
            &self.requests_completed,
            &self.requests_failed,
            &self.requests_rejected,
            &self.forwarded,
            &self.transport_errors,
            &self.status_errors,
            &self.decode_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut times) = self.processing_times.lock() {
            times.clear();
        }
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);
    }

    /// Calculate processing time statistics (avg, p50, p95, p99)
    fn calculate_processing_time_statistics(&self) -> (f64, f64, f64, f64) {
        let Ok(times) = self.processing_times.lock() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut sorted_times = times.clone();
        sorted_times.sort_unstable();

        let avg = sorted_times.iter().sum::<u64>() as f64 / sorted_times.len() as f64;
        (
            avg,
            percentile(&sorted_times, 50.0),
            percentile(&sorted_times, 95.0),
            percentile(&sorted_times, 99.0),
        )
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let (avg_processing_time_ms, p50, p95, p99) = self.calculate_processing_time_statistics();

        MetricsSnapshot {
            timestamp: current_timestamp(),
            uptime_seconds: self.uptime_seconds(),
            requests: RequestMetrics {
                received: self.requests_received.load(Ordering::Relaxed),
                in_flight: self.requests_in_flight.load(Ordering::Relaxed),
                completed: self.requests_completed.load(Ordering::Relaxed),
                failed: self.requests_failed.load(Ordering::Relaxed),
                rejected: self.requests_rejected.load(Ordering::Relaxed),
                avg_processing_time_ms,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
                processing_time_p99_ms: p99,
            },
            forwards: ForwardMetrics {
                forwarded: self.forwarded.load(Ordering::Relaxed),
                transport_errors: self.transport_errors.load(Ordering::Relaxed),
                status_errors: self.status_errors.load(Ordering::Relaxed),
                decode_errors: self.decode_errors.load(Ordering::Relaxed),
            },
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// In-flight marker for one inbound request
///
/// Dropping it, including when warp drops the handler because the client
/// went away, takes the request out of the in-flight gauge.
#[must_use = "the request leaves the in-flight gauge as soon as this is dropped"]
pub struct InFlightRequest<'a> {
    collector: &'a MetricsCollector,
    started: Instant,
}

impl InFlightRequest<'_> {
    pub fn completed(self) {
        self.collector.request_completed(self.started.elapsed());
    }

    pub fn failed(self) {
        self.collector.request_failed(self.started.elapsed());
    }
}

impl Drop for InFlightRequest<'_> {
    fn drop(&mut self) {
        // saturating: reset() may have zeroed the gauge while this was live
        let _ = self.collector.requests_in_flight.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |current| Some(current.saturating_sub(1)),
        );
    }
}

/// Complete metrics snapshot for export
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub requests: RequestMetrics,
    pub forwards: ForwardMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub received: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub processing_time_p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForwardMetrics {
    pub forwarded: u64,
    pub transport_errors: u64,
    pub status_errors: u64,
    pub decode_errors: u64,
}

// Helper functions
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let len = sorted_data.len();
    let index = (percentile / 100.0) * (len - 1) as f64;

    if index.fract() == 0.0 {
        sorted_data[index as usize] as f64
    } else {
        let lower_value = sorted_data[index.floor() as usize] as f64;
        let upper_value = sorted_data[index.ceil() as usize] as f64;

        lower_value + (upper_value - lower_value) * index.fract()
    }
}
