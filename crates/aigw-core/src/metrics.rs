use prometheus::{CounterVec, HistogramVec, Opts, Registry};

/// The six named families from `spec.md` §6 — nothing more. Registered
/// once per process (`grounded on ioi-telemetry`'s `Registry`-per-process
/// shape).
pub struct Metrics {
    pub registry: Registry,
    pub requests_total: CounterVec,
    pub request_latency_seconds: HistogramVec,
    pub jobs_total: CounterVec,
    pub webhook_deliveries_total: CounterVec,
    pub tokens_total: CounterVec,
    pub cost_total: CounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("requests_total", "Sync requests by endpoint/provider/status"),
            &["endpoint", "provider", "status"],
        )?;
        let request_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "request_latency_seconds",
                "Sync request latency by endpoint/provider",
            ),
            &["endpoint", "provider"],
        )?;
        let jobs_total = CounterVec::new(
            Opts::new("jobs_total", "Jobs processed by provider/status"),
            &["provider", "status"],
        )?;
        let webhook_deliveries_total = CounterVec::new(
            Opts::new("webhook_deliveries_total", "Webhook deliveries by status"),
            &["status"],
        )?;
        let tokens_total = CounterVec::new(
            Opts::new("tokens_total", "Tokens consumed by provider/model/kind"),
            &["provider", "model", "kind"],
        )?;
        let cost_total = CounterVec::new(
            Opts::new("cost_rub_total", "Cost accrued by provider/model"),
            &["provider", "model"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_latency_seconds.clone()))?;
        registry.register(Box::new(jobs_total.clone()))?;
        registry.register(Box::new(webhook_deliveries_total.clone()))?;
        registry.register(Box::new(tokens_total.clone()))?;
        registry.register(Box::new(cost_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_latency_seconds,
            jobs_total,
            webhook_deliveries_total,
            tokens_total,
            cost_total,
        })
    }

    pub fn encode_text(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        let _ = encoder.encode(&self.registry.gather(), &mut buffer);
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_are_registered_and_encodable() {
        let metrics = Metrics::new().unwrap();
        metrics
            .requests_total
            .with_label_values(&["responses", "mock", "succeeded"])
            .inc();
        let text = metrics.encode_text();
        assert!(text.contains("requests_total"));
    }
}
