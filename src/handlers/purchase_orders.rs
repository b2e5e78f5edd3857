use super::common::{ok, paginated, PaginationParams};
use crate::{
    auth::SessionUser,
    entities::purchase_order::PurchaseOrderWithItems,
    errors::ServiceError,
    handlers::AppState,
    services::{
        purchase_orders::{PurchaseOrderFilter, StatusChangeInput},
        replenishment::ReplenishmentOutcome,
    },
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders))
        .route("/auto", post(generate_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/status", put(update_purchase_order_status))
}

/// Draft one purchase order per supplier for every low-stock product
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/auto",
    responses(
        (status = 200, description = "Generated drafts; empty when nothing needs reordering", body = ReplenishmentOutcome),
        (status = 400, description = "No store associated with session", body = crate::errors::ErrorResponse),
        (status = 403, description = "Managers only", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failure", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn generate_purchase_orders(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<ReplenishmentOutcome>, ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    let outcome = state
        .services
        .replenishment
        .generate_replenishment_orders(store_id, Some(session.user_id()))
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(PaginationParams, PurchaseOrderFilter),
    responses(
        (status = 200, description = "Purchase orders, newest first", body = crate::ApiResponse<PaginatedResponse<PurchaseOrderWithItems>>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<PurchaseOrderWithItems>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state
        .services
        .purchase_orders
        .list(store_id, &filter, page, limit)
        .await?;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order with items", body = crate::ApiResponse<PurchaseOrderWithItems>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PurchaseOrderWithItems>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.purchase_orders.get(store_id, id).await?))
}

/// Move a purchase order along DRAFT → SUBMITTED → APPROVED → RECEIVED, or cancel it
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = StatusChangeInput,
    responses(
        (status = 200, description = "Status changed; receiving adds stock", body = crate::ApiResponse<PurchaseOrderWithItems>),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse),
        (status = 403, description = "Managers only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChangeInput>,
) -> Result<Json<ApiResponse<PurchaseOrderWithItems>>, ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    Ok(ok(state
        .services
        .purchase_orders
        .change_status(store_id, id, payload.status)
        .await?))
}
