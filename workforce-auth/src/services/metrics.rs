use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

use crate::models::Role;

/// Every collector, registered together so they are always installed as a set.
pub struct Metrics {
    pub registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub sessions_created_total: IntCounterVec,
    pub magic_links_issued_total: IntCounter,
    pub invitations_total: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

impl Metrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path", "status"],
        )?;
        let sessions_created_total = IntCounterVec::new(
            Opts::new("sessions_created_total", "Sessions created, by user type"),
            &["user_type"],
        )?;
        let magic_links_issued_total = IntCounter::new(
            "magic_links_issued_total",
            "Magic links persisted and emailed",
        )?;
        let invitations_total = IntCounterVec::new(
            Opts::new("invitations_total", "Invitation lifecycle events, by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(sessions_created_total.clone()))?;
        registry.register(Box::new(magic_links_issued_total.clone()))?;
        registry.register(Box::new(invitations_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            sessions_created_total,
            magic_links_issued_total,
            invitations_total,
        })
    }
}

/// Register every collector. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_some() {
        return Ok(());
    }
    let _ = METRICS.set(Metrics::new()?);
    tracing::info!("Prometheus metrics registered");
    Ok(())
}

/// Installed collectors, or `None` before [`init_metrics`] has run.
pub fn metrics() -> Option<&'static Metrics> {
    METRICS.get()
}

pub fn record_session_created(user_type: Role) {
    if let Some(m) = METRICS.get() {
        m.sessions_created_total
            .with_label_values(&[user_type.as_str()])
            .inc();
    }
}

pub fn record_magic_link_issued() {
    if let Some(m) = METRICS.get() {
        m.magic_links_issued_total.inc();
    }
}

/// `outcome` is one of `issued`, `accepted`, `expired`, `email_failed`.
pub fn record_invitation(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.invitations_total.with_label_values(&[outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match METRICS.get() {
        Some(m) => &m.registry,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_counters_appear_in_exposition() {
        init_metrics().unwrap();
        record_session_created(Role::Manager);
        record_magic_link_issued();
        record_invitation("issued");

        let text = get_metrics();
        assert!(text.contains("sessions_created_total{user_type=\"manager\"}"));
        assert!(text.contains("magic_links_issued_total"));
        assert!(text.contains("invitations_total{outcome=\"issued\"}"));
    }
}
