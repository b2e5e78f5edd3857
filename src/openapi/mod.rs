use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "POS Back-Office API",
        version = "0.1.0",
        description = r#"
Back-office API for a point-of-sale system.

## Authentication

Log in with `POST /api/v1/auth/login`. The session token is returned in the
body and set as an HttpOnly cookie; either the cookie or an
`Authorization: Bearer <token>` header authenticates later requests.

## Money

Amounts are decimals serialized as strings (`"350.00"`).

## Pagination

List endpoints accept `page` (1-based) and `limit` query parameters.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Session login and logout"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Catalog and stock"),
        (name = "suppliers", description = "Supplier directory"),
        (name = "packages", description = "Product bundles"),
        (name = "customers", description = "Customers and the credit ledger"),
        (name = "expenses", description = "Operating expenses"),
        (name = "purchase-orders", description = "Replenishment and purchase order lifecycle"),
        (name = "analytics", description = "Dashboard and demand forecasts")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::current_session,

        crate::handlers::categories::list_categories,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::products::list_products,
        crate::handlers::products::low_stock_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::adjust_stock,
        crate::handlers::products::delete_product,

        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        crate::handlers::packages::list_packages,
        crate::handlers::packages::create_package,
        crate::handlers::packages::get_package,
        crate::handlers::packages::update_package,
        crate::handlers::packages::delete_package,

        crate::handlers::customers::settle_credit,
        crate::handlers::customers::record_charge,
        crate::handlers::customers::list_credit_transactions,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,

        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::expense_summary,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,

        crate::handlers::purchase_orders::generate_purchase_orders,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order_status,

        crate::handlers::analytics::get_dashboard_metrics,
        crate::handlers::analytics::list_forecasts,
        crate::handlers::analytics::record_forecasts,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::entities::purchase_order::PurchaseOrderStatus,
            crate::entities::user::Role,
            crate::services::replenishment::SkipReason,
        )
    )
)]
pub struct ApiDocV1;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_covers_core_routes() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("POS Back-Office API"));
        assert!(json.contains("/api/v1/purchase-orders/auto"));
        assert!(json.contains("/api/v1/customers/credit"));
    }
}
