//! # Metrics Collection
//!
//! Prometheus counters for the account backend: authentication outcomes,
//! account creation, token issuance/revocation and mail dispatch.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Install the Prometheus exporter and register metric descriptions.
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.metrics_port)
        .parse()
        .map_err(|e| Error::config(format!("Invalid metrics address: {}", e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| Error::config(format!("Failed to install metrics exporter: {}", e)))?;

    describe_counter!("auth_attempts_total", "Authentication attempts by outcome");
    describe_counter!("accounts_created_total", "Accounts created through sign-up");
    describe_counter!("session_tokens_issued_total", "Signed tokens issued by kind");
    describe_counter!("session_tokens_revoked_total", "Session token records revoked");
    describe_counter!("mail_dispatch_total", "Mail provider calls by kind and outcome");

    info!(metrics_port = config.metrics_port, "Prometheus metrics exporter installed");
    Ok(())
}

/// Record an authentication attempt outcome ("success", "invalid_credentials", ...).
pub fn record_authentication(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("auth_attempts_total", &labels).increment(1);
}

/// Record a successful account creation.
pub fn record_account_created() {
    counter!("accounts_created_total").increment(1);
}

/// Record issuance of a signed token ("access" or "refresh").
pub fn record_token_issued(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!("session_tokens_issued_total", &labels).increment(1);
}

/// Record revocation of a stored session token record.
pub fn record_token_revoked() {
    counter!("session_tokens_revoked_total").increment(1);
}

/// Record a mail provider call ("welcome", "subscribe", "unsubscribe").
pub fn record_mail_dispatch(kind: &str, success: bool) {
    let labels = [
        ("kind", kind.to_string()),
        ("outcome", if success { "success" } else { "error" }.to_string()),
    ];
    counter!("mail_dispatch_total", &labels).increment(1);
}
