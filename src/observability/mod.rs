//! # Observability Infrastructure
//!
//! Structured logging via the tracing ecosystem and Prometheus metrics for
//! the account backend.

pub mod metrics;

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging and (optionally) the metrics exporter.
///
/// The log filter comes from `RUST_LOG` when set, falling back to the
/// configured level. Safe to call once per process; a second call fails
/// because the global subscriber is already installed.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let builder = fmt().with_env_filter(filter).with_target(true);

    let init_result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(err) = init_result {
        // Tests and embedded callers may have installed a subscriber already.
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }

    if config.enable_metrics {
        metrics::init_metrics(config)?;
    }

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );

    Ok(())
}
