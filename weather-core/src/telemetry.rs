//! Process-wide request counters.
//!
//! One [`RequestMetrics`] is created at startup and handed to the service
//! state; handlers record into it without further synchronization.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

#[derive(Debug)]
pub struct RequestMetrics {
    service: &'static str,
    started_at: DateTime<Utc>,
    requests: AtomicU64,
    succeeded: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    latency_micros_total: AtomicU64,
}

/// Point-in-time copy served on `/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub service: &'static str,
    pub started_at: DateTime<Utc>,
    pub requests: u64,
    pub succeeded: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub mean_latency_ms: f64,
}

impl RequestMetrics {
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            started_at: Utc::now(),
            requests: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            client_errors: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            latency_micros_total: AtomicU64::new(0),
        }
    }

    pub fn record(&self, status: StatusCode, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let bucket = if status.is_success() {
            &self.succeeded
        } else if status.is_client_error() {
            &self.client_errors
        } else {
            &self.server_errors
        };
        bucket.fetch_add(1, Ordering::Relaxed);

        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros_total.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let latency_micros = self.latency_micros_total.load(Ordering::Relaxed);
        let mean_latency_ms = if requests == 0 {
            0.0
        } else {
            latency_micros as f64 / requests as f64 / 1000.0
        };

        MetricsSnapshot {
            service: self.service,
            started_at: self.started_at,
            requests,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            mean_latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn outcomes_are_bucketed_by_status_class() {
        let metrics = RequestMetrics::new("resolver");

        metrics.record(StatusCode::OK, Duration::from_millis(4));
        metrics.record(StatusCode::UNPROCESSABLE_ENTITY, Duration::from_millis(1));
        metrics.record(StatusCode::NOT_FOUND, Duration::from_millis(1));
        metrics.record(StatusCode::BAD_GATEWAY, Duration::from_millis(2));

        let snap = metrics.snapshot();
        assert_eq!(snap.service, "resolver");
        assert_eq!(snap.requests, 4);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.client_errors, 2);
        assert_eq!(snap.server_errors, 1);
        assert!((snap.mean_latency_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_snapshot_has_zero_latency() {
        assert_eq!(RequestMetrics::new("gateway").snapshot().mean_latency_ms, 0.0);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let metrics = Arc::new(RequestMetrics::new("gateway"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record(StatusCode::OK, Duration::from_micros(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().requests, 8000);
        assert_eq!(metrics.snapshot().succeeded, 8000);
    }
}
