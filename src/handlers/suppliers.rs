use super::common::{created, ok, paginated, PaginationParams};
use crate::{
    auth::SessionUser,
    entities::supplier,
    errors::ServiceError,
    handlers::AppState,
    services::suppliers::{CreateSupplierInput, UpdateSupplierInput},
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    params(PaginationParams),
    responses(
        (status = 200, description = "Suppliers of the caller's store", body = crate::ApiResponse<PaginatedResponse<supplier::Model>>)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<supplier::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state.services.suppliers.list(store_id, page, limit).await?;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierInput,
    responses(
        (status = 201, description = "Supplier created", body = crate::ApiResponse<supplier::Model>),
        (status = 403, description = "Managers only", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<CreateSupplierInput>,
) -> Result<(StatusCode, Json<ApiResponse<supplier::Model>>), ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    Ok(created(
        state.services.suppliers.create(store_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier", body = crate::ApiResponse<supplier::Model>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<supplier::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.suppliers.get(store_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier id")),
    request_body = UpdateSupplierInput,
    responses(
        (status = 200, description = "Supplier updated", body = crate::ApiResponse<supplier::Model>),
        (status = 403, description = "Managers only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierInput>,
) -> Result<Json<ApiResponse<supplier::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    Ok(ok(state
        .services
        .suppliers
        .update(store_id, id, payload)
        .await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 409, description = "Supplier has purchase orders", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    state.services.suppliers.delete(store_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
