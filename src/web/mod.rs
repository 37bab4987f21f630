//! Web server module

mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::service::ThreatService;

pub struct AppState {
    pub threats: ThreatService,
}

/// Build the `/api` router around a threat service.
pub fn build_router(threats: ThreatService) -> Router {
    let state = Arc::new(AppState { threats });

    let api = Router::new()
        .route("/livecheck", get(routes::livecheck))
        .route("/threats", get(routes::list_threats))
        .route("/threats/stats", get(routes::threat_stats))
        .route("/threats/:id", get(routes::get_threat));

    Router::new()
        .nest("/api", api)
        .fallback(routes::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin '{}'", o)))
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET]))
}

pub async fn start_server(config: &Config, threats: ThreatService) -> Result<()> {
    let mut app = build_router(threats);
    if !config.server.cors_origins.is_empty() {
        app = app.layer(cors_layer(&config.server.cors_origins)?);
        info!("CORS enabled for {:?}", config.server.cors_origins);
    }

    let addr = config.bind_addr();
    info!("Web server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
