use super::common::{created, ok, paginated, PaginationParams};
use crate::{
    auth::SessionUser,
    entities::product,
    errors::ServiceError,
    handlers::AppState,
    services::products::{
        CreateProductInput, ProductFilter, StockAdjustmentInput, UpdateProductInput,
    },
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(low_stock_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/stock", post(adjust_stock))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams, ProductFilter),
    responses(
        (status = 200, description = "Products of the caller's store", body = crate::ApiResponse<PaginatedResponse<product::Model>>)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<product::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state
        .services
        .products
        .list(store_id, &filter, page, limit)
        .await?;
    Ok(paginated(items, total, page, limit))
}

/// Active products at or below their reorder point, most depleted first
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses(
        (status = 200, description = "Low-stock products", body = crate::ApiResponse<Vec<product::Model>>)
    ),
    tag = "products"
)]
pub async fn low_stock_products(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.products.low_stock(store_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<product::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already used in this store", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let store_id = session.store_id()?;
    Ok(created(
        state.services.products.create(store_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = crate::ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.products.get(store_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .products
        .update(store_id, id, payload)
        .await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = StockAdjustmentInput,
    responses(
        (status = 200, description = "Stock adjusted", body = crate::ApiResponse<product::Model>),
        (status = 400, description = "Adjustment would make stock negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustmentInput>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .products
        .adjust_stock(store_id, id, payload)
        .await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 409, description = "Product appears on purchase orders", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let store_id = session.store_id()?;
    state.services.products.delete(store_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
