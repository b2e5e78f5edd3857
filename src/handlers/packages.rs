use super::common::{created, ok, paginated, PaginationParams};
use crate::{
    auth::SessionUser,
    errors::ServiceError,
    handlers::AppState,
    services::packages::{CreatePackageInput, PackageWithItems, UpdatePackageInput},
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_packages).post(create_package))
        .route(
            "/:id",
            get(get_package).put(update_package).delete(delete_package),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/packages",
    params(PaginationParams),
    responses(
        (status = 200, description = "Packages with their items", body = crate::ApiResponse<PaginatedResponse<PackageWithItems>>)
    ),
    tag = "packages"
)]
pub async fn list_packages(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<PackageWithItems>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state.services.packages.list(store_id, page, limit).await?;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    post,
    path = "/api/v1/packages",
    request_body = CreatePackageInput,
    responses(
        (status = 201, description = "Package created", body = crate::ApiResponse<PackageWithItems>),
        (status = 400, description = "Invalid items", body = crate::errors::ErrorResponse)
    ),
    tag = "packages"
)]
pub async fn create_package(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<CreatePackageInput>,
) -> Result<(StatusCode, Json<ApiResponse<PackageWithItems>>), ServiceError> {
    let store_id = session.store_id()?;
    Ok(created(
        state.services.packages.create(store_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/packages/{id}",
    params(("id" = Uuid, Path, description = "Package id")),
    responses(
        (status = 200, description = "Package with items", body = crate::ApiResponse<PackageWithItems>),
        (status = 404, description = "Package not found", body = crate::errors::ErrorResponse)
    ),
    tag = "packages"
)]
pub async fn get_package(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PackageWithItems>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.packages.get(store_id, id).await?))
}

/// When `items` is present it replaces the package's item list.
#[utoipa::path(
    put,
    path = "/api/v1/packages/{id}",
    params(("id" = Uuid, Path, description = "Package id")),
    request_body = UpdatePackageInput,
    responses(
        (status = 200, description = "Package updated", body = crate::ApiResponse<PackageWithItems>),
        (status = 404, description = "Package not found", body = crate::errors::ErrorResponse)
    ),
    tag = "packages"
)]
pub async fn update_package(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePackageInput>,
) -> Result<Json<ApiResponse<PackageWithItems>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .packages
        .update(store_id, id, payload)
        .await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/packages/{id}",
    params(("id" = Uuid, Path, description = "Package id")),
    responses(
        (status = 204, description = "Package and its items deleted"),
        (status = 404, description = "Package not found", body = crate::errors::ErrorResponse)
    ),
    tag = "packages"
)]
pub async fn delete_package(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let store_id = session.store_id()?;
    state.services.packages.delete(store_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
