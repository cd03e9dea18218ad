//! HTTP dashboard over the warehouse tables.

pub mod handlers;
pub mod page;

use crate::errors::Result;
use crate::warehouse::Warehouse;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub warehouse: Warehouse,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/peg-health", get(handlers::peg_health))
        .route("/api/peg-health/latest", get(handlers::latest_peg_health))
        .route("/api/zscore", get(handlers::zscores))
        .route("/api/zscore/distribution", get(handlers::zscore_distribution))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "[DASH] dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
