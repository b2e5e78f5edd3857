use super::common::ok;
use crate::{
    auth::{extract_token, LoginRequest, LoginResponse, SessionUser, UserProfile},
    config::AppConfig,
    errors::ServiceError,
    handlers::AppState,
    ApiResponse,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
}

fn session_cookie(config: &AppConfig, token: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        config.session_cookie_name, token, max_age
    );
    if config.session_cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created; the token is also set as a cookie", body = crate::ApiResponse<LoginResponse>),
        (status = 400, description = "Malformed credentials", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state.services.auth.login(payload).await?;
    let max_age = state.services.auth.session_ttl().num_seconds();
    let cookie = session_cookie(&state.config, &response.token, max_age);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(response)),
    ))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session ended and cookie cleared"),
        (status = 401, description = "No active session", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    _session: SessionUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(token) = extract_token(&headers, &state.config.session_cookie_name) {
        state.services.auth.logout(&token).await?;
    }
    let cookie = session_cookie(&state.config, "", 0);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// The user behind the current session
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses(
        (status = 200, description = "Current user", body = crate::ApiResponse<UserProfile>),
        (status = 401, description = "No active session", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn current_session(session: SessionUser) -> Json<ApiResponse<UserProfile>> {
    ok(UserProfile::from(&session.user))
}
