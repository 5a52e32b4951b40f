//! Prometheus metrics for task generation and admission

use prometheus::{
    register_counter_vec_with_registry, register_histogram_with_registry,
    register_int_counter_with_registry, CounterVec, Encoder, Histogram, IntCounter, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// examd metrics, registered on a private registry
#[derive(Clone)]
pub struct Metrics {
    /// Tasks returned to clients, by `source` (cache | resolved)
    pub tasks_served_total: CounterVec,
    /// Generation failures by error kind
    pub generation_failures_total: CounterVec,
    /// Rejected requests by budget (default | generation)
    pub rate_limit_rejections_total: CounterVec,
    pub provider_fallbacks_total: IntCounter,
    /// Cache failures by operation (read | write)
    pub cache_errors_total: CounterVec,
    pub generation_seconds: Histogram,

    registry: Arc<Registry>,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let tasks_served_total = register_counter_vec_with_registry!(
            "examd_tasks_served_total",
            "Tasks returned to clients by answer source",
            &["source"],
            registry
        )?;

        let generation_failures_total = register_counter_vec_with_registry!(
            "examd_generation_failures_total",
            "Task generations that produced no answer, by error kind",
            &["kind"],
            registry
        )?;

        let rate_limit_rejections_total = register_counter_vec_with_registry!(
            "examd_rate_limit_rejections_total",
            "Requests rejected by a rate-limit budget",
            &["budget"],
            registry
        )?;

        let provider_fallbacks_total = register_int_counter_with_registry!(
            "examd_provider_fallbacks_total",
            "Generations that used the placeholder task",
            registry
        )?;

        let cache_errors_total = register_counter_vec_with_registry!(
            "examd_cache_errors_total",
            "Task cache failures by operation",
            &["op"],
            registry
        )?;

        let generation_seconds = register_histogram_with_registry!(
            "examd_generation_seconds",
            "Time spent generating a task",
            vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0],
            registry
        )?;

        Ok(Self {
            tasks_served_total,
            generation_failures_total,
            rate_limit_rejections_total,
            provider_fallbacks_total,
            cache_errors_total,
            generation_seconds,
            registry: Arc::new(registry),
        })
    }

    pub fn record_served(&self, source: &str) {
        self.tasks_served_total.with_label_values(&[source]).inc();
    }

    pub fn record_failure(&self, kind: &str) {
        self.generation_failures_total.with_label_values(&[kind]).inc();
    }

    pub fn record_rate_limit_rejection(&self, budget: &str) {
        self.rate_limit_rejections_total
            .with_label_values(&[budget])
            .inc();
    }

    pub fn record_cache_error(&self, op: &str) {
        self.cache_errors_total.with_label_values(&[op]).inc();
    }

    /// Render all metrics in the text exposition format
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
