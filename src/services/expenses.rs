use super::validate_positive;
use crate::{db::DbPool, entities::expense, errors::ServiceError};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
    Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseInput {
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_positive")]
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 32))]
    pub payment_method: Option<String>,
    /// Defaults to today (UTC)
    pub incurred_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseInput {
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_positive")]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, max = 32))]
    pub payment_method: Option<String>,
    pub incurred_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExpenseFilter {
    /// Inclusive lower bound on `incurredOn`
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `incurredOn`
    pub to: Option<NaiveDate>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryTotal {
    pub category: String,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub categories: Vec<CategoryTotal>,
    #[schema(value_type = String)]
    pub grand_total: Decimal,
}

/// Totals per category, alphabetically
pub fn summarize(expenses: &[expense::Model]) -> (Vec<CategoryTotal>, Decimal) {
    let mut by_category: BTreeMap<&str, (Decimal, u64)> = BTreeMap::new();
    for row in expenses {
        let entry = by_category
            .entry(row.category.as_str())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += row.amount;
        entry.1 += 1;
    }

    let grand_total = by_category.values().map(|(total, _)| *total).sum();
    let categories = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.to_string(),
            total,
            count,
        })
        .collect();
    (categories, grand_total)
}

fn normalize_method(method: Option<String>) -> String {
    method
        .map(|m| m.trim().to_ascii_uppercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "CASH".to_string())
}

#[derive(Clone)]
pub struct ExpenseService {
    db_pool: Arc<DbPool>,
}

impl ExpenseService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    fn filtered(store_id: Uuid, filter: &ExpenseFilter) -> Result<Select<expense::Entity>, ServiceError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ServiceError::InvalidInput(
                    "from must not be after to".to_string(),
                ));
            }
        }

        let mut query = expense::Entity::find().filter(expense::Column::StoreId.eq(store_id));
        if let Some(from) = filter.from {
            query = query.filter(expense::Column::IncurredOn.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expense::Column::IncurredOn.lte(to));
        }
        if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.filter(expense::Column::Category.eq(category));
        }
        Ok(query)
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        store_id: Uuid,
        recorded_by: Uuid,
        input: CreateExpenseInput,
    ) -> Result<expense::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let created = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            category: Set(input.category.trim().to_string()),
            description: Set(input.description),
            amount: Set(input.amount),
            payment_method: Set(normalize_method(input.payment_method)),
            incurred_on: Set(input.incurred_on.unwrap_or_else(|| now.date_naive())),
            recorded_by: Set(Some(recorded_by)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(expense_id = %created.id, amount = %created.amount, "Expense recorded");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: Uuid, id: Uuid) -> Result<expense::Model, ServiceError> {
        expense::Entity::find_by_id(id)
            .filter(expense::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("expense", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        filter: &ExpenseFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<expense::Model>, u64), ServiceError> {
        let paginator = Self::filtered(store_id, filter)?
            .order_by_desc(expense::Column::IncurredOn)
            .order_by_desc(expense::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        input: UpdateExpenseInput,
    ) -> Result<expense::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(store_id, id).await?;

        let mut active: expense::ActiveModel = existing.into();
        if let Some(category) = input.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if input.payment_method.is_some() {
            active.payment_method = Set(normalize_method(input.payment_method));
        }
        if let Some(incurred_on) = input.incurred_on {
            active.incurred_on = Set(incurred_on);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.get(store_id, id).await?;
        expense::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(expense_id = %id, "Expense deleted");
        Ok(())
    }

    /// Totals per category over the filtered range.
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        store_id: Uuid,
        filter: &ExpenseFilter,
    ) -> Result<ExpenseSummary, ServiceError> {
        let rows = Self::filtered(store_id, filter)?
            .all(&*self.db_pool)
            .await?;
        let (categories, grand_total) = summarize(&rows);

        Ok(ExpenseSummary {
            from: filter.from,
            to: filter.to,
            categories,
            grand_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expense(category: &str, amount: Decimal) -> expense::Model {
        let now = Utc::now();
        expense::Model {
            id: Uuid::new_v4(),
            store_id: Uuid::nil(),
            category: category.to_string(),
            description: None,
            amount,
            payment_method: "CASH".to_string(),
            incurred_on: now.date_naive(),
            recorded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn summary_groups_and_totals_by_category() {
        let rows = vec![
            expense("rent", dec!(1200.00)),
            expense("utilities", dec!(85.40)),
            expense("utilities", dec!(14.60)),
            expense("supplies", dec!(32.15)),
        ];

        let (categories, grand_total) = summarize(&rows);

        let names: Vec<&str> = categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["rent", "supplies", "utilities"]);
        assert_eq!(categories[2].total, dec!(100.00));
        assert_eq!(categories[2].count, 2);
        assert_eq!(grand_total, dec!(1332.15));
    }

    #[test]
    fn empty_summary_is_zero() {
        let (categories, grand_total) = summarize(&[]);
        assert!(categories.is_empty());
        assert_eq!(grand_total, Decimal::ZERO);
    }

    #[test]
    fn payment_method_defaults_to_cash() {
        assert_eq!(normalize_method(None), "CASH");
        assert_eq!(normalize_method(Some(" transfer ".into())), "TRANSFER");
    }
}
