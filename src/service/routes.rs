//! HTTP routes for uploads, catalog queries, health and metrics

use crate::error::CafeHopError;
use crate::metrics::encode_metrics;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::upload::{CafeSummary, UploadReceipt, UploadRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Create the router with every service endpoint
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/uploads",
            axum::routing::post(upload_handler).options(preflight_handler),
        )
        .route("/cafes", get(list_cafes_handler))
        .route("/cafes/{id}", get(get_cafe_handler))
        .layer(middleware::from_fn_with_state(state.clone(), cors_headers))
        .with_state(state)
}

/// Error returned from handlers, mapped to a status code by its kind
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<CafeHopError>() {
            Some(CafeHopError::CafeNotFound { .. }) => StatusCode::NOT_FOUND,
            Some(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Attach CORS headers to every response
async fn cors_headers(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if let Ok(origin) = HeaderValue::from_str(&state.config().service.allowed_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    response
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/uploads",
            "/cafes",
            "/cafes/{id}",
            "/health",
            "/metrics"
        ]
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Health check requested");

    match HealthCheck::check(state).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            (code, Json(health)).into_response()
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy" })),
            )
                .into_response()
        }
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match encode_metrics(&state.metrics()) {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadReceipt>, ApiError> {
    let Json(request) = payload.map_err(|e| CafeHopError::InvalidUploadRequest {
        reason: e.body_text(),
    })?;

    let receipt = state.uploads().handle_upload(request).await?;
    Ok(Json(receipt))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list_cafes_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CafeSummary>>, ApiError> {
    Ok(Json(state.uploads().ranked_cafes(params.limit)?))
}

async fn get_cafe_handler(
    State(state): State<Arc<AppState>>,
    Path(cafe_id): Path<String>,
) -> Result<Json<CafeSummary>, ApiError> {
    Ok(Json(state.uploads().get_cafe(&cafe_id)?))
}
