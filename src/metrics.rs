// Prometheus counters for the subscriber. The registry is shared with the
// `/metrics` handler through an `Extension` layer.
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    pub orders_received: IntCounter,
    pub cloudevents_unwrapped: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Arc::new(Registry::new());

        let orders_received = IntCounter::new("orders_received_total", "Total orders received from the orders topic")?;
        registry.register(Box::new(orders_received.clone()))?;

        let cloudevents_unwrapped = IntCounter::new("cloudevents_unwrapped_total", "Total CloudEvents envelopes unwrapped")?;
        registry.register(Box::new(cloudevents_unwrapped.clone()))?;

        Ok(Metrics { registry, orders_received, cloudevents_unwrapped })
    }

    /// Render the registry in the Prometheus text format. Returns the body
    /// together with the encoder's content type.
    pub fn render(&self) -> anyhow::Result<(String, String)> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok((String::from_utf8(buffer)?, encoder.format_type().to_string()))
    }
}
