//! # Application State
//!
//! Shared state handed to every request handler: the resolved configuration
//! (read-only after startup), the loaded speech engine, and process
//! metrics. The engine handle is initialized once in `main` and shared
//! behind an `Arc`; nothing mutates it afterwards. Metrics are the only
//! shared mutable data and sit behind their own lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::config::AppConfig;
use crate::transcription::SpeechEngine;

#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration; immutable for the process lifetime.
    pub config: Arc<AppConfig>,

    /// Loaded speech engine, shared read-only across concurrent requests.
    pub engine: Arc<dyn SpeechEngine>,

    /// Request counters updated by the telemetry middleware.
    pub metrics: Arc<RwLock<AppMetrics>>,

    pub start_time: Instant,
}

/// Process-wide request counters.
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Counters for one endpoint ("POST /transcribe" etc.).
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Record one finished request for the totals and its endpoint bucket.
    pub fn record_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
        if is_error {
            metrics.error_count += 1;
        }

        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Copy of the counters, taken under the read lock so serialization
    /// happens without holding it.
    pub fn metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
