use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::SessionUser,
    entities::demand_forecast,
    errors::ServiceError,
    services::analytics::{DashboardMetrics, ForecastFilter, RecordForecastsInput},
    ApiResponse, AppState,
};

/// Build the analytics Router scoped under `/api/v1/analytics`.
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard_metrics))
        .route("/forecasts", get(list_forecasts).post(record_forecasts))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Expense window in days (default: 30)
    #[param(minimum = 1, maximum = 366)]
    pub days: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard metrics for the caller's store", body = ApiResponse<DashboardMetrics>),
        (status = 400, description = "Invalid expense window", body = crate::errors::ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn get_dashboard_metrics(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardMetrics>>, ServiceError> {
    let store_id = session.store_id()?;
    let metrics = state
        .services
        .analytics
        .dashboard(store_id, params.days)
        .await?;
    Ok(Json(ApiResponse::success(metrics)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/forecasts",
    params(ForecastFilter),
    responses(
        (status = 200, description = "Forecasts ordered by period start", body = ApiResponse<Vec<demand_forecast::Model>>)
    ),
    tag = "analytics"
)]
pub async fn list_forecasts(
    State(state): State<AppState>,
    session: SessionUser,
    Query(filter): Query<ForecastFilter>,
) -> Result<Json<ApiResponse<Vec<demand_forecast::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    let forecasts = state.services.analytics.forecasts(store_id, &filter).await?;
    Ok(Json(ApiResponse::success(forecasts)))
}

#[utoipa::path(
    post,
    path = "/api/v1/analytics/forecasts",
    request_body = RecordForecastsInput,
    responses(
        (status = 201, description = "Forecasts stored", body = ApiResponse<Vec<demand_forecast::Model>>),
        (status = 400, description = "Invalid forecast in batch; nothing stored", body = crate::errors::ErrorResponse),
        (status = 403, description = "Managers only", body = crate::errors::ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn record_forecasts(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<RecordForecastsInput>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<demand_forecast::Model>>>), ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    let created = state
        .services
        .analytics
        .record_forecasts(store_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}
