//! Metrics collection for observability

use prometheus::{
    Counter, CounterVec, HistogramVec, Opts, Registry,
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry,
};
use std::sync::Arc;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Question intake
    pub questions: CounterVec,
    pub request_duration: HistogramVec,

    // Backend fan-out
    pub backend_requests: CounterVec,
    pub backend_duration: HistogramVec,
    pub backend_timeouts: CounterVec,

    // Glossary snapshot refreshes
    pub glossary_refreshes: CounterVec,

    // Synthesis
    pub synthesis_requests: CounterVec,
    pub synthesis_duration: HistogramVec,
    pub synthesis_tokens: CounterVec,
    pub synthesis_cost_dollars: Counter,
    pub fallback_responses: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        // Question intake
        let questions = register_counter_vec_with_registry!(
            Opts::new("questions_total", "Total questions received, by intent"),
            &["intent"],
            registry
        )?;

        let request_duration = register_histogram_vec_with_registry!(
            "request_duration_seconds",
            "End-to-end request duration in seconds",
            &["endpoint"],
            registry
        )?;

        // Backend fan-out
        let backend_requests = register_counter_vec_with_registry!(
            Opts::new("backend_requests_total", "Total backend requests"),
            &["source", "status"],
            registry
        )?;

        let backend_duration = register_histogram_vec_with_registry!(
            "backend_request_duration_seconds",
            "Backend request duration in seconds",
            &["source"],
            registry
        )?;

        let backend_timeouts = register_counter_vec_with_registry!(
            Opts::new("backend_timeouts_total", "Backend calls abandoned on timeout"),
            &["source"],
            registry
        )?;

        // Glossary snapshot refreshes
        let glossary_refreshes = register_counter_vec_with_registry!(
            Opts::new("glossary_refreshes_total", "Glossary snapshot refresh attempts"),
            &["status"],
            registry
        )?;

        // Synthesis
        let synthesis_requests = register_counter_vec_with_registry!(
            Opts::new("synthesis_requests_total", "Total synthesis attempts"),
            &["provider", "status"],
            registry
        )?;

        let synthesis_duration = register_histogram_vec_with_registry!(
            "synthesis_duration_seconds",
            "Synthesis call duration in seconds",
            &["provider"],
            registry
        )?;

        let synthesis_tokens = register_counter_vec_with_registry!(
            Opts::new("synthesis_tokens_total", "Tokens consumed by synthesis"),
            &["provider", "direction"],
            registry
        )?;

        let synthesis_cost_dollars = register_counter_with_registry!(
            Opts::new("synthesis_cost_dollars_total", "Estimated synthesis spend in dollars"),
            registry
        )?;

        let fallback_responses = register_counter_with_registry!(
            Opts::new("fallback_responses_total", "Responses served by the deterministic fallback"),
            registry
        )?;

        Ok(Self {
            registry,
            questions,
            request_duration,
            backend_requests,
            backend_duration,
            backend_timeouts,
            glossary_refreshes,
            synthesis_requests,
            synthesis_duration,
            synthesis_tokens,
            synthesis_cost_dollars,
            fallback_responses,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record an incoming question by classified intent
    pub fn record_question(&self, intent: &str) {
        self.questions.with_label_values(&[intent]).inc();
    }

    /// Record a backend call outcome
    pub fn record_backend(&self, source: &str, success: bool, duration_seconds: f64) {
        let status = if success { "success" } else { "error" };
        self.backend_requests.with_label_values(&[source, status]).inc();
        self.backend_duration
            .with_label_values(&[source])
            .observe(duration_seconds);
    }

    /// Record an abandoned backend call
    pub fn record_backend_timeout(&self, source: &str) {
        self.backend_timeouts.with_label_values(&[source]).inc();
    }

    /// Record a glossary snapshot refresh
    pub fn record_glossary_refresh(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.glossary_refreshes.with_label_values(&[status]).inc();
    }

    /// Record a synthesis attempt
    pub fn record_synthesis(&self, provider: &str, success: bool, duration_seconds: f64) {
        let status = if success { "success" } else { "error" };
        self.synthesis_requests.with_label_values(&[provider, status]).inc();
        self.synthesis_duration
            .with_label_values(&[provider])
            .observe(duration_seconds);
    }

    /// Record token usage for a synthesis call
    pub fn record_tokens(&self, provider: &str, input_tokens: u64, output_tokens: u64) {
        self.synthesis_tokens
            .with_label_values(&[provider, "input"])
            .inc_by(input_tokens as f64);
        self.synthesis_tokens
            .with_label_values(&[provider, "output"])
            .inc_by(output_tokens as f64);
    }

    /// Record estimated synthesis spend
    pub fn record_cost(&self, dollars: f64) {
        self.synthesis_cost_dollars.inc_by(dollars);
    }

    /// Record a fallback response
    pub fn record_fallback(&self) {
        self.fallback_responses.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Helper macro to time operations
#[macro_export]
macro_rules! time_operation {
    ($histogram:expr, $label:expr, $operation:expr) => {{
        let timer = $histogram.with_label_values(&[$label]).start_timer();
        let result = $operation;
        timer.observe_duration();
        result
    }};
}
