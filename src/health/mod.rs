/*!
 * # Health endpoints
 *
 * - `/health`: database reachability, 503 when the database is down
 * - `/status`: build and runtime information
 *
 * Both are mounted outside `/api/v1` and need no session.
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

use crate::{ApiResponse, AppState};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub checks: BTreeMap<String, HealthStatus>,
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(api_status))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthStatus::Up,
        Err(err) => {
            error!(error = %err, "Database health check failed");
            HealthStatus::Down
        }
    };

    let mut checks = BTreeMap::new();
    checks.insert("database".to_string(), database);

    let info = HealthInfo {
        status: database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        checks,
    };
    let code = match database {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(ApiResponse::success(info)))
}

#[derive(Serialize, Debug)]
pub struct StatusInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: String,
}

pub async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<StatusInfo>> {
    Json(ApiResponse::success(StatusInfo {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}
