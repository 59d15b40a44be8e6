//! Inference Service Metrics
//!
//! A process-lifetime metrics registry rendered in the Prometheus text
//! exposition format:
//!
//! - `inference_requests_total`: counter, one increment per predict
//!   request, including failed decodes
//! - `inference_request_duration_seconds`: histogram of completed predict
//!   latencies
//! - `predictions_total{class=...}`: counter per emitted class label
//!
//! All state is atomic so handlers update it concurrently without locks;
//! counters reset only on process restart.

use std::sync::atomic::{AtomicU64, Ordering};

use catsdogs::CLASS_NAMES;

/// Histogram bucket upper bounds in seconds
const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Atomic metrics registry, owned by the service state and injected into
/// request handlers.
#[derive(Debug)]
pub struct InferenceMetrics {
    requests_total: AtomicU64,
    bucket_counts: [AtomicU64; LATENCY_BUCKETS.len()],
    latency_count: AtomicU64,
    /// Sum of observed latencies, stored as f64 bits for atomic CAS updates
    latency_sum_bits: AtomicU64,
    class_counts: [AtomicU64; CLASS_NAMES.len()],
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            bucket_counts: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_count: AtomicU64::new(0),
            latency_sum_bits: AtomicU64::new(0f64.to_bits()),
            class_counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Count one predict request (successful or not)
    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Current request count
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Observe the latency of one completed prediction
    pub fn observe_latency(&self, seconds: f64) {
        for (bound, count) in LATENCY_BUCKETS.iter().zip(self.bucket_counts.iter()) {
            if seconds <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.latency_count.fetch_add(1, Ordering::Relaxed);

        // f64 add via CAS loop on the bit representation
        let mut current = self.latency_sum_bits.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + seconds).to_bits();
            match self.latency_sum_bits.compare_exchange_weak(
                current,
                new,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Count one emitted prediction for a class label
    pub fn inc_prediction(&self, class_index: usize) {
        if let Some(count) = self.class_counts.get(class_index) {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1024);

        out.push_str("# HELP inference_requests_total Total number of inference requests\n");
        out.push_str("# TYPE inference_requests_total counter\n");
        out.push_str(&format!(
            "inference_requests_total {}\n",
            self.requests_total.load(Ordering::Relaxed)
        ));

        out.push_str(
            "# HELP inference_request_duration_seconds Inference request latency\n",
        );
        out.push_str("# TYPE inference_request_duration_seconds histogram\n");
        for (bound, count) in LATENCY_BUCKETS.iter().zip(self.bucket_counts.iter()) {
            out.push_str(&format!(
                "inference_request_duration_seconds_bucket{{le=\"{}\"}} {}\n",
                bound,
                count.load(Ordering::Relaxed)
            ));
        }
        let total = self.latency_count.load(Ordering::Relaxed);
        out.push_str(&format!(
            "inference_request_duration_seconds_bucket{{le=\"+Inf\"}} {}\n",
            total
        ));
        out.push_str(&format!(
            "inference_request_duration_seconds_sum {}\n",
            f64::from_bits(self.latency_sum_bits.load(Ordering::Relaxed))
        ));
        out.push_str(&format!(
            "inference_request_duration_seconds_count {}\n",
            total
        ));

        out.push_str("# HELP predictions_total Total predictions by class\n");
        out.push_str("# TYPE predictions_total counter\n");
        for (name, count) in CLASS_NAMES.iter().zip(self.class_counts.iter()) {
            out.push_str(&format!(
                "predictions_total{{class=\"{}\"}} {}\n",
                name,
                count.load(Ordering::Relaxed)
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counter_increments() {
        let metrics = InferenceMetrics::new();
        metrics.inc_requests();
        metrics.inc_requests();
        assert_eq!(metrics.requests_total(), 2);
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let metrics = InferenceMetrics::new();
        metrics.observe_latency(0.003);
        metrics.observe_latency(0.02);
        metrics.observe_latency(3.0);

        let text = metrics.render();
        assert!(text.contains("inference_request_duration_seconds_bucket{le=\"0.005\"} 1"));
        assert!(text.contains("inference_request_duration_seconds_bucket{le=\"0.025\"} 2"));
        assert!(text.contains("inference_request_duration_seconds_bucket{le=\"5\"} 3"));
        assert!(text.contains("inference_request_duration_seconds_bucket{le=\"+Inf\"} 3"));
        assert!(text.contains("inference_request_duration_seconds_count 3"));
    }

    #[test]
    fn test_latency_sum_accumulates() {
        let metrics = InferenceMetrics::new();
        metrics.observe_latency(0.25);
        metrics.observe_latency(0.75);

        let text = metrics.render();
        assert!(text.contains("inference_request_duration_seconds_sum 1"));
    }

    #[test]
    fn test_per_class_counters() {
        let metrics = InferenceMetrics::new();
        metrics.inc_prediction(0);
        metrics.inc_prediction(1);
        metrics.inc_prediction(1);

        let text = metrics.render();
        assert!(text.contains("predictions_total{class=\"cat\"} 1"));
        assert!(text.contains("predictions_total{class=\"dog\"} 2"));
    }

    #[test]
    fn test_render_has_help_and_type_lines() {
        let text = InferenceMetrics::new().render();
        assert!(text.contains("# TYPE inference_requests_total counter"));
        assert!(text.contains("# TYPE inference_request_duration_seconds histogram"));
        assert!(text.contains("# TYPE predictions_total counter"));
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;

        let metrics = Arc::new(InferenceMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.inc_requests();
                        metrics.observe_latency(0.01);
                        metrics.inc_prediction(0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.requests_total(), 8000);
        let text = metrics.render();
        assert!(text.contains("inference_request_duration_seconds_count 8000"));
        assert!(text.contains("predictions_total{class=\"cat\"} 8000"));
    }
}
