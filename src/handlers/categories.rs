use super::common::{created, ok, paginated, PaginationParams};
use crate::{
    auth::SessionUser,
    entities::category,
    errors::ServiceError,
    handlers::AppState,
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(PaginationParams),
    responses(
        (status = 200, description = "Categories of the caller's store", body = crate::ApiResponse<PaginatedResponse<category::Model>>),
        (status = 401, description = "No active session", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<category::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state
        .services
        .categories
        .list(store_id, page, limit)
        .await?;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = crate::ApiResponse<category::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<category::Model>>), ServiceError> {
    let store_id = session.store_id()?;
    let category = state.services.categories.create(store_id, payload).await?;
    Ok(created(category))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = crate::ApiResponse<category::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.categories.get(store_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryInput,
    responses(
        (status = 200, description = "Category updated", body = crate::ApiResponse<category::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .categories
        .update(store_id, id, payload)
        .await?))
}

/// Products in the category are kept and become uncategorised.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let store_id = session.store_id()?;
    state.services.categories.delete(store_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
