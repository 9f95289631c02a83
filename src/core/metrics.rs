//! In-process query metrics.
//!
//! Tracks one request counter and one latency histogram per model and
//! renders both in Prometheus text exposition format for `GET /metrics`.
//! Scraping and storage are the monitoring stack's problem, not ours.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::RwLock;

/// Upper bounds (seconds) for the latency histogram.
const BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Default, Clone)]
struct ModelSeries {
    count: u64,
    bucket_counts: [u64; BUCKETS.len()],
    sum: f64,
}

/// Shared registry of per-model query metrics.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    series: RwLock<BTreeMap<String, ModelSeries>>,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one query against `model` and observes its latency.
    pub fn record(&self, model: &str, duration_secs: f64) {
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        let entry = series.entry(model.to_string()).or_default();
        entry.count += 1;
        entry.sum += duration_secs;
        for (idx, bound) in BUCKETS.iter().enumerate() {
            if duration_secs <= *bound {
                entry.bucket_counts[idx] += 1;
            }
        }
    }

    /// Renders all series in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        let mut out = String::new();

        out.push_str("# HELP rag_queries_total Total number of queries\n");
        out.push_str("# TYPE rag_queries_total counter\n");
        for (model, data) in series.iter() {
            let _ = writeln!(out, "rag_queries_total{{model=\"{}\"}} {}", model, data.count);
        }

        out.push_str("# HELP rag_query_duration_seconds Query duration\n");
        out.push_str("# TYPE rag_query_duration_seconds histogram\n");
        for (model, data) in series.iter() {
            for (idx, bound) in BUCKETS.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "rag_query_duration_seconds_bucket{{model=\"{}\",le=\"{}\"}} {}",
                    model, bound, data.bucket_counts[idx]
                );
            }
            let _ = writeln!(
                out,
                "rag_query_duration_seconds_bucket{{model=\"{}\",le=\"+Inf\"}} {}",
                model, data.count
            );
            let _ = writeln!(
                out,
                "rag_query_duration_seconds_sum{{model=\"{}\"}} {}",
                model, data.sum
            );
            let _ = writeln!(
                out,
                "rag_query_duration_seconds_count{{model=\"{}\"}} {}",
                model, data.count
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments_per_model() {
        let metrics = QueryMetrics::new();
        metrics.record("m1", 0.3);
        metrics.record("m1", 1.2);
        metrics.record("m2", 0.05);

        let rendered = metrics.render();
        assert!(rendered.contains("rag_queries_total{model=\"m1\"} 2"));
        assert!(rendered.contains("rag_queries_total{model=\"m2\"} 1"));
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let metrics = QueryMetrics::new();
        metrics.record("m1", 0.3);

        let rendered = metrics.render();
        // 0.3s falls above le=0.25 and inside le=0.5 and everything larger.
        assert!(rendered
            .contains("rag_query_duration_seconds_bucket{model=\"m1\",le=\"0.25\"} 0"));
        assert!(rendered
            .contains("rag_query_duration_seconds_bucket{model=\"m1\",le=\"0.5\"} 1"));
        assert!(rendered
            .contains("rag_query_duration_seconds_bucket{model=\"m1\",le=\"+Inf\"} 1"));
        assert!(rendered.contains("rag_query_duration_seconds_count{model=\"m1\"} 1"));
    }

    #[test]
    fn every_observed_model_is_rendered() {
        let metrics = QueryMetrics::new();
        for model in ["a", "b", "c"] {
            metrics.record(model, 0.1);
        }
        let rendered = metrics.render();
        for model in ["a", "b", "c"] {
            assert!(rendered.contains(&format!("rag_queries_total{{model=\"{}\"}} 1", model)));
        }
    }
}
