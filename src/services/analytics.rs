use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    db::{with_transaction, DbPool},
    entities::{
        customer, demand_forecast, expense, product,
        purchase_order::{self, PurchaseOrderStatus},
    },
    errors::ServiceError,
};

pub const DEFAULT_EXPENSE_WINDOW_DAYS: i64 = 30;
const MAX_EXPENSE_WINDOW_DAYS: i64 = 366;
const MAX_FORECAST_BATCH: usize = 500;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMetrics {
    pub product_count: u64,
    pub low_stock_count: u64,
    /// Σ stock × cost price over active products
    #[schema(value_type = String)]
    pub inventory_value: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMetrics {
    pub customers_with_debt: u64,
    #[schema(value_type = String)]
    pub total_outstanding_debt: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseMetrics {
    pub window_days: i64,
    pub since: NaiveDate,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchasingMetrics {
    pub open_orders: u64,
    #[schema(value_type = String)]
    pub open_order_value: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub inventory: InventoryMetrics,
    pub customers: CustomerMetrics,
    pub expenses: ExpenseMetrics,
    pub purchasing: PurchasingMetrics,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInput {
    pub product_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub forecast_quantity: i32,
    /// Between 0 and 1
    #[schema(value_type = Option<String>)]
    pub confidence: Option<Decimal>,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordForecastsInput {
    pub forecasts: Vec<ForecastInput>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ForecastFilter {
    pub product_id: Option<Uuid>,
    /// Periods ending on or after this date
    pub from: Option<NaiveDate>,
    /// Periods starting on or before this date
    pub to: Option<NaiveDate>,
}

fn check_forecast(input: &ForecastInput) -> Result<(), ServiceError> {
    if input.forecast_quantity < 0 {
        return Err(ServiceError::InvalidInput(format!(
            "forecast quantity for product {} must not be negative",
            input.product_id
        )));
    }
    if input.period_end < input.period_start {
        return Err(ServiceError::InvalidInput(format!(
            "forecast period for product {} ends before it starts",
            input.product_id
        )));
    }
    if let Some(confidence) = input.confidence {
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(ServiceError::InvalidInput(
                "confidence must be between 0 and 1".to_string(),
            ));
        }
    }
    if let Some(name) = &input.model_name {
        if name.trim().is_empty() || name.len() > 100 {
            return Err(ServiceError::InvalidInput(
                "model name must be 1 to 100 characters".to_string(),
            ));
        }
    }
    Ok(())
}

fn money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Store dashboard and demand forecasts
#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

/// Expense window for the dashboard, at most one leap year.
fn expense_window(days: Option<i64>) -> Result<i64, ServiceError> {
    let days = days.unwrap_or(DEFAULT_EXPENSE_WINDOW_DAYS);
    if !(1..=MAX_EXPENSE_WINDOW_DAYS).contains(&days) {
        return Err(ServiceError::InvalidInput(format!(
            "days must be between 1 and {}",
            MAX_EXPENSE_WINDOW_DAYS
        )));
    }
    Ok(days)
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(
        &self,
        store_id: Uuid,
        expense_window_days: Option<i64>,
    ) -> Result<DashboardMetrics, ServiceError> {
        let window_days = expense_window(expense_window_days)?;

        let inventory = self.inventory_metrics(store_id).await?;
        let customers = self.customer_metrics(store_id).await?;
        let expenses = self.expense_metrics(store_id, window_days).await?;
        let purchasing = self.purchasing_metrics(store_id).await?;

        info!(store_id = %store_id, "Dashboard generated");
        Ok(DashboardMetrics {
            inventory,
            customers,
            expenses,
            purchasing,
            generated_at: Utc::now(),
        })
    }

    async fn inventory_metrics(&self, store_id: Uuid) -> Result<InventoryMetrics, ServiceError> {
        let products = product::Entity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Active.eq(true))
            .all(&*self.db_pool)
            .await?;

        let low_stock_count = products.iter().filter(|p| p.is_low_stock()).count() as u64;
        let inventory_value = products
            .iter()
            .map(|p| p.cost_price * Decimal::from(p.stock))
            .sum();

        Ok(InventoryMetrics {
            product_count: products.len() as u64,
            low_stock_count,
            inventory_value: money(inventory_value),
        })
    }

    async fn customer_metrics(&self, store_id: Uuid) -> Result<CustomerMetrics, ServiceError> {
        let debtors = customer::Entity::find()
            .filter(customer::Column::StoreId.eq(store_id))
            .filter(customer::Column::Debt.gt(Decimal::ZERO))
            .all(&*self.db_pool)
            .await?;

        Ok(CustomerMetrics {
            customers_with_debt: debtors.len() as u64,
            total_outstanding_debt: money(debtors.iter().map(|c| c.debt).sum()),
        })
    }

    async fn expense_metrics(
        &self,
        store_id: Uuid,
        window_days: i64,
    ) -> Result<ExpenseMetrics, ServiceError> {
        let since = (Utc::now() - Duration::days(window_days - 1)).date_naive();
        let rows = expense::Entity::find()
            .filter(expense::Column::StoreId.eq(store_id))
            .filter(expense::Column::IncurredOn.gte(since))
            .all(&*self.db_pool)
            .await?;

        Ok(ExpenseMetrics {
            window_days,
            since,
            total: money(rows.iter().map(|e| e.amount).sum()),
            count: rows.len() as u64,
        })
    }

    async fn purchasing_metrics(&self, store_id: Uuid) -> Result<PurchasingMetrics, ServiceError> {
        let open = purchase_order::Entity::find()
            .filter(purchase_order::Column::StoreId.eq(store_id))
            .filter(purchase_order::Column::Status.is_in([
                PurchaseOrderStatus::Draft,
                PurchaseOrderStatus::Submitted,
                PurchaseOrderStatus::Approved,
            ]))
            .all(&*self.db_pool)
            .await?;

        Ok(PurchasingMetrics {
            open_orders: open.len() as u64,
            open_order_value: money(open.iter().map(|o| o.total_amount).sum()),
        })
    }

    /// Stores a batch of forecasts atomically; one bad row rejects the batch.
    #[instrument(skip(self, input), fields(count = input.forecasts.len()))]
    pub async fn record_forecasts(
        &self,
        store_id: Uuid,
        input: RecordForecastsInput,
    ) -> Result<Vec<demand_forecast::Model>, ServiceError> {
        if input.forecasts.is_empty() {
            return Err(ServiceError::InvalidInput(
                "at least one forecast is required".to_string(),
            ));
        }
        if input.forecasts.len() > MAX_FORECAST_BATCH {
            return Err(ServiceError::InvalidInput(format!(
                "at most {} forecasts per request",
                MAX_FORECAST_BATCH
            )));
        }
        for forecast in &input.forecasts {
            check_forecast(forecast)?;
        }

        let product_ids: Vec<Uuid> = input
            .forecasts
            .iter()
            .map(|f| f.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let created = with_transaction(&self.db_pool, "forecast.record", move |txn| {
            Box::pin(async move {
                let known = product::Entity::find()
                    .filter(product::Column::StoreId.eq(store_id))
                    .filter(product::Column::Id.is_in(product_ids.clone()))
                    .count(txn)
                    .await?;
                if known != product_ids.len() as u64 {
                    return Err(ServiceError::InvalidInput(
                        "every forecast must reference a product of this store".to_string(),
                    ));
                }

                let now = Utc::now();
                let mut created = Vec::with_capacity(input.forecasts.len());
                for forecast in input.forecasts {
                    let row = demand_forecast::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        store_id: Set(store_id),
                        product_id: Set(forecast.product_id),
                        period_start: Set(forecast.period_start),
                        period_end: Set(forecast.period_end),
                        forecast_quantity: Set(forecast.forecast_quantity),
                        confidence: Set(forecast.confidence),
                        model_name: Set(forecast
                            .model_name
                            .map(|m| m.trim().to_string())
                            .unwrap_or_else(|| "manual".to_string())),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    created.push(row);
                }
                Ok(created)
            })
        })
        .await?;

        info!(store_id = %store_id, count = created.len(), "Forecasts recorded");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn forecasts(
        &self,
        store_id: Uuid,
        filter: &ForecastFilter,
    ) -> Result<Vec<demand_forecast::Model>, ServiceError> {
        let mut query = demand_forecast::Entity::find()
            .filter(demand_forecast::Column::StoreId.eq(store_id));
        if let Some(product_id) = filter.product_id {
            query = query.filter(demand_forecast::Column::ProductId.eq(product_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(demand_forecast::Column::PeriodEnd.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(demand_forecast::Column::PeriodStart.lte(to));
        }

        Ok(query
            .order_by_asc(demand_forecast::Column::PeriodStart)
            .order_by_asc(demand_forecast::Column::ProductId)
            .order_by_asc(demand_forecast::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn forecast() -> ForecastInput {
        ForecastInput {
            product_id: Uuid::new_v4(),
            period_start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            forecast_quantity: 40,
            confidence: Some(dec!(0.8)),
            model_name: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_forecast() {
        assert!(check_forecast(&forecast()).is_ok());
    }

    #[test]
    fn rejects_inverted_period() {
        let mut input = forecast();
        input.period_end = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_matches!(check_forecast(&input), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn rejects_negative_quantity_and_bad_confidence() {
        let mut input = forecast();
        input.forecast_quantity = -1;
        assert_matches!(check_forecast(&input), Err(ServiceError::InvalidInput(_)));

        let mut input = forecast();
        input.confidence = Some(dec!(1.5));
        assert_matches!(check_forecast(&input), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn expense_window_spans_one_to_366_days() {
        assert_eq!(expense_window(None).unwrap(), DEFAULT_EXPENSE_WINDOW_DAYS);
        assert_eq!(expense_window(Some(1)).unwrap(), 1);
        assert_eq!(expense_window(Some(366)).unwrap(), 366);
        assert_matches!(expense_window(Some(0)), Err(ServiceError::InvalidInput(_)));
        assert_matches!(expense_window(Some(367)), Err(ServiceError::InvalidInput(_)));
    }
}
