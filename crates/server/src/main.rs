use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    error::ApiError,
    protocol::{calculate_qpa_route, CalculateQpaRequest, CalculateQpaResponse},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;

use config::{load_settings, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let app = build_router(&settings);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, body_limit = settings.body_limit_bytes, "qpa calculator listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_router(settings: &Settings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(calculate_qpa_route(), post(http_calculate_qpa))
        .layer(RequestBodyLimitLayer::new(settings.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn index() -> &'static str {
    "QPA calculator API is running."
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn http_calculate_qpa(
    Json(req): Json<CalculateQpaRequest>,
) -> Result<Json<CalculateQpaResponse>, (StatusCode, Json<ApiError>)> {
    let response = api::calculate(&req).map_err(|e| {
        warn!(message = %e.message, "rejected calculation request");
        (StatusCode::BAD_REQUEST, Json(e))
    })?;
    info!(
        courses = req.grades.len(),
        qpa = response.qpa,
        total_units = response.total_units,
        "calculated QPA"
    );
    Ok(Json(response))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
