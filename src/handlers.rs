use crate::db_storage::{clamp_limit, SoilHistoryStorage};
use crate::estimator::SoilEstimator;
use crate::errors::AppError;
use crate::geocoding::UNKNOWN_LOCATION;
use crate::models::*;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// The soil estimation engine (provider session and place cache live inside).
    pub estimator: Arc<SoilEstimator>,
    /// History storage; `None` when no database is configured.
    pub history: Option<SoilHistoryStorage>,
}

/// Health check endpoint.
///
/// Reports service status and whether the remote soil provider is usable.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy"))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "soil-fertility-api",
            "version": env!("CARGO_PKG_VERSION"),
            "soilProvider": state.estimator.provider_status(),
            "historyStorage": state.history.is_some(),
        })),
    )
}

/// POST /api/v1/soil-data
///
/// Estimates soil nutrients and fertility for a GPS coordinate. The snapshot is
/// stored in history when a database is configured; a storage failure is
/// logged and does not fail the request.
#[utoipa::path(
    post,
    path = "/api/v1/soil-data",
    request_body = SoilEstimateRequest,
    responses(
        (status = 200, description = "Soil reading", body = SoilReading),
        (status = 400, description = "Invalid coordinate")
    )
)]
pub async fn estimate_soil(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SoilEstimateRequest>,
) -> Result<Json<SoilReading>, AppError> {
    tracing::info!("POST /soil-data - lat: {}, lng: {}", request.lat, request.lng);

    let reading = state
        .estimator
        .estimate_soil(request.lat, request.lng)
        .await?;

    if let Some(ref history) = state.history {
        let location = history_location(&reading, &request);
        if let Err(e) = history.store(&location, &reading).await {
            tracing::error!("Failed to store soil history for {}: {}", location, e);
        }
    }

    Ok(Json(reading))
}

/// GET /api/v1/history/soil
///
/// Lists stored soil estimates, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/history/soil",
    params(("limit" = Option<i64>, Query, description = "Maximum rows (1-200, default 50)")),
    responses(
        (status = 200, description = "Stored estimates", body = [SoilHistoryRecord]),
        (status = 404, description = "History storage not configured")
    )
)]
pub async fn soil_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQueryParams>,
) -> Result<Json<Vec<SoilHistoryRecord>>, AppError> {
    let history = state
        .history
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Soil history storage is not configured".to_string()))?;

    let records = history.list(clamp_limit(params.limit)).await?;
    tracing::info!("GET /history/soil - {} records", records.len());

    Ok(Json(records))
}

/// Place name when known, raw coordinates otherwise.
fn history_location(reading: &SoilReading, request: &SoilEstimateRequest) -> String {
    match reading.location_name.as_deref() {
        Some(name) if name != UNKNOWN_LOCATION => name.to_string(),
        _ => format!("{:.4}, {:.4}", request.lat, request.lng),
    }
}
