use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::routes::{build_router, ApiState};
use crate::config::AppConfig;
use crate::errors::Error;
use crate::storage::DbPool;

/// Bind and serve the HTTP API until a shutdown signal arrives.
pub async fn start_api_server(config: &AppConfig, pool: DbPool) -> crate::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address: {}", e)))?;

    let state = ApiState::new(pool, config);
    let mut router: Router = build_router(state).layer(TraceLayer::new_for_http());

    if config.server.enable_cors {
        router = router.layer(cors_layer(&config.server.cors_origins)?);
    }

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind API server: {}", e)))?;

    info!(address = %addr, "Starting HTTP API server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "API server shutdown listener failed");
            }
        })
        .await
        .map_err(|e| Error::internal(format!("API server error: {}", e)))?;

    info!("API server shutdown completed");
    Ok(())
}

fn cors_layer(origins: &[String]) -> crate::Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let parsed = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<axum::http::HeaderValue>()
                .map_err(|e| Error::config(format!("Invalid CORS origin '{}': {}", origin, e)))
        })
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(CorsLayer::new().allow_origin(parsed).allow_methods(Any).allow_headers(Any))
}
