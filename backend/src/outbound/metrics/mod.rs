//! Prometheus-backed metrics exporters, compiled with the `metrics` feature.

mod prometheus_webhooks;

pub use prometheus_webhooks::PrometheusWebhookMetrics;
