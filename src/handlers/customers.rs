use super::common::{created, ok, paginated, ApiJson, PaginationParams};
use crate::{
    auth::SessionUser,
    entities::{credit_transaction, customer},
    errors::ServiceError,
    handlers::AppState,
    services::{
        credit_ledger::{parse_amount, parse_customer_id},
        customers::{CreateCustomerInput, UpdateCustomerInput},
    },
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/credit", post(settle_credit))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/:id/credit-transactions", get(list_credit_transactions))
        .route("/:id/charges", post(record_charge))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerSearch {
    /// Substring match on name, email or phone
    pub search: Option<String>,
}

/// Body of a debt payment. Fields are read leniently so malformed values
/// produce a 400 naming the field.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditPaymentRequest {
    pub customer_id: Uuid,
    /// Positive amount, as a JSON number or decimal string
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Defaults to CASH
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditPaymentResponse {
    pub success: bool,
    #[schema(value_type = String, example = "350.00")]
    pub new_debt: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChargeRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Money as it leaves the API: two decimal places.
fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Settle part or all of a customer's outstanding debt
#[utoipa::path(
    post,
    path = "/api/v1/customers/credit",
    request_body = CreditPaymentRequest,
    responses(
        (status = 200, description = "Payment applied", body = CreditPaymentResponse),
        (status = 400, description = "Missing or invalid customerId or amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failure; nothing was written", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn settle_credit(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<CreditPaymentResponse>, ServiceError> {
    let store_id = session.store_id()?;
    let customer_id = parse_customer_id(body.get("customerId"))?;
    let amount = parse_amount(body.get("amount"))?;
    let payment_method = match body.get("paymentMethod") {
        None | Some(Value::Null) => None,
        Some(Value::String(method)) => Some(method.as_str()),
        Some(_) => {
            return Err(ServiceError::InvalidInput(
                "paymentMethod must be a string".to_string(),
            ))
        }
    };

    let settlement = state
        .services
        .credit_ledger
        .settle_debt_payment(store_id, customer_id, amount, payment_method)
        .await?;

    Ok(Json(CreditPaymentResponse {
        success: true,
        new_debt: to_cents(settlement.new_debt),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers/{id}/charges",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = ChargeRequest,
    responses(
        (status = 201, description = "Charge recorded", body = crate::ApiResponse<credit_transaction::Model>),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn record_charge(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ChargeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<credit_transaction::Model>>), ServiceError> {
    let store_id = session.store_id()?;
    let entry = state
        .services
        .credit_ledger
        .record_charge(store_id, id, payload.amount, payload.description)
        .await?;
    Ok(created(entry))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/credit-transactions",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = crate::ApiResponse<Vec<credit_transaction::Model>>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn list_credit_transactions(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<credit_transaction::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .credit_ledger
        .list_transactions(store_id, id)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(PaginationParams, CustomerSearch),
    responses(
        (status = 200, description = "Customers of the caller's store", body = crate::ApiResponse<PaginatedResponse<customer::Model>>)
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
    Query(search): Query<CustomerSearch>,
) -> Result<Json<ApiResponse<PaginatedResponse<customer::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state
        .services
        .customers
        .list(store_id, search.search.as_deref(), page, limit)
        .await?;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerInput,
    responses(
        (status = 201, description = "Customer created with zero debt", body = crate::ApiResponse<customer::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<CreateCustomerInput>,
) -> Result<(StatusCode, Json<ApiResponse<customer::Model>>), ServiceError> {
    let store_id = session.store_id()?;
    Ok(created(
        state.services.customers.create(store_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = crate::ApiResponse<customer::Model>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<customer::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.customers.get(store_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerInput,
    responses(
        (status = 200, description = "Customer updated", body = crate::ApiResponse<customer::Model>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerInput>,
) -> Result<Json<ApiResponse<customer::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .customers
        .update(store_id, id, payload)
        .await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 409, description = "Customer still owes money", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let store_id = session.store_id()?;
    state.services.customers.delete(store_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn debt_is_reported_with_two_decimals() {
        assert_eq!(to_cents(dec!(350)).to_string(), "350.00");
        assert_eq!(to_cents(dec!(12.5)).to_string(), "12.50");
        assert_eq!(to_cents(dec!(0.125)).to_string(), "0.12");
    }
}
