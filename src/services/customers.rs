use super::validate_non_negative;
use crate::{db::DbPool, entities::customer, errors::ServiceError};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub credit_limit: Option<Decimal>,
}

/// Contact and limit changes. Debt is never writable here; it only moves
/// through the credit ledger.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub credit_limit: Option<Decimal>,
}

/// Customer directory of a store
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates a customer with no outstanding debt
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        store_id: Uuid,
        input: CreateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let created = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            name: Set(input.name.trim().to_string()),
            email: Set(input.email),
            phone: Set(input.phone),
            debt: Set(Decimal::ZERO),
            credit_limit: Set(input.credit_limit.unwrap_or(Decimal::ZERO)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(customer_id = %created.id, "Customer created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: Uuid, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .filter(customer::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("customer", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let mut query = customer::Entity::find().filter(customer::Column::StoreId.eq(store_id));
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(term))
                    .add(customer::Column::Email.contains(term))
                    .add(customer::Column::Phone.contains(term)),
            );
        }

        let paginator = query
            .order_by_asc(customer::Column::Name)
            .order_by_asc(customer::Column::Id)
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
        input: UpdateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(store_id, id).await?;

        let mut active: customer::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(limit) = input.credit_limit {
            active.credit_limit = Set(limit);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a customer whose balance is settled.
    #[instrument(skip(self))]
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(store_id, id).await?;
        if !existing.debt.is_zero() {
            return Err(ServiceError::Conflict(format!(
                "customer {} has an outstanding balance of {}",
                id, existing.debt
            )));
        }

        customer::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(customer_id = %id, "Customer deleted");
        Ok(())
    }
}
