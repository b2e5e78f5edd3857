use super::common::{created, ok, paginated, PaginationParams};
use crate::{
    auth::SessionUser,
    entities::expense,
    errors::ServiceError,
    handlers::AppState,
    services::expenses::{CreateExpenseInput, ExpenseFilter, ExpenseSummary, UpdateExpenseInput},
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/summary", get(expense_summary))
        .route(
            "/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(PaginationParams, ExpenseFilter),
    responses(
        (status = 200, description = "Expenses, most recent first", body = crate::ApiResponse<PaginatedResponse<expense::Model>>),
        (status = 400, description = "from is after to", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    session: SessionUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<ExpenseFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<expense::Model>>>, ServiceError> {
    let store_id = session.store_id()?;
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state
        .services
        .expenses
        .list(store_id, &filter, page, limit)
        .await?;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses/summary",
    params(ExpenseFilter),
    responses(
        (status = 200, description = "Totals per category", body = crate::ApiResponse<ExpenseSummary>)
    ),
    tag = "expenses"
)]
pub async fn expense_summary(
    State(state): State<AppState>,
    session: SessionUser,
    Query(filter): Query<ExpenseFilter>,
) -> Result<Json<ApiResponse<ExpenseSummary>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.expenses.summary(store_id, &filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpenseInput,
    responses(
        (status = 201, description = "Expense recorded", body = crate::ApiResponse<expense::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<CreateExpenseInput>,
) -> Result<(StatusCode, Json<ApiResponse<expense::Model>>), ServiceError> {
    let store_id = session.store_id()?;
    let expense = state
        .services
        .expenses
        .create(store_id, session.user_id(), payload)
        .await?;
    Ok(created(expense))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense", body = crate::ApiResponse<expense::Model>),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn get_expense(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<expense::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state.services.expenses.get(store_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = UpdateExpenseInput,
    responses(
        (status = 200, description = "Expense updated", body = crate::ApiResponse<expense::Model>),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpenseInput>,
) -> Result<Json<ApiResponse<expense::Model>>, ServiceError> {
    let store_id = session.store_id()?;
    Ok(ok(state
        .services
        .expenses
        .update(store_id, id, payload)
        .await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "Managers only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let store_id = session.store_id()?;
    session.require_manager()?;
    state.services.expenses.delete(store_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
