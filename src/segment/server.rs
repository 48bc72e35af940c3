//! HTTP surface of the segment query service

use super::error::SegmentError;
use super::table::{SegmentRecord, SegmentTable};
use crate::config::{ConfigError, ServiceConfig};
use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<SegmentTable>,
}

impl AppState {
    pub fn new(table: SegmentTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

/// Errors returned to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
}

impl From<SegmentError> for ApiError {
    fn from(err: SegmentError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub segment_id: i64,
    pub records: Vec<SegmentRecord>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    segments: usize,
    records: usize,
}

async fn get_segment(
    State(state): State<AppState>,
    Path(segment_id): Path<i64>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let records = state.table.segment(segment_id)?;
    tracing::debug!(segment_id, rows = records.len(), "Segment lookup");

    Ok(Json(SegmentResponse {
        segment_id,
        records: records.to_vec(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        segments: state.table.segment_count(),
        records: state.table.len(),
    })
}

/// CORS for an explicit origin allow-list with credentials
///
/// Methods and headers mirror the preflight request; a wildcard is not
/// permitted alongside credentials.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| ConfigError::Invalid(format!("invalid CORS origin: {o:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Create the router with all routes
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/segment/:segment_id", get(get_segment))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the table, bind and serve until Ctrl-C
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let table = SegmentTable::load(&config.dataset_path).with_context(|| {
        format!(
            "Failed to load segment dataset {}",
            config.dataset_path.display()
        )
    })?;
    let cors = cors_layer(&config.cors_origins)?;
    let app = create_router(AppState::new(table), cors);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        origins = ?config.cors_origins,
        "Segment service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Segment service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_default_origins() {
        let origins = ServiceConfig::default().cors_origins;
        assert!(cors_layer(&origins).is_ok());
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        let origins = vec!["http://bad\norigin".to_string()];
        assert!(matches!(
            cors_layer(&origins),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::from(SegmentError::NotFound(9)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
