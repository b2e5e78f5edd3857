use crate::{
    db::{with_transaction, DbPool},
    entities::{product, purchase_order, supplier},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
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
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

/// Supplier directory of a store
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        store_id: Uuid,
        input: CreateSupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let created = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            name: Set(input.name.trim().to_string()),
            contact_name: Set(input.contact_name),
            email: Set(input.email),
            phone: Set(input.phone),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(supplier_id = %created.id, "Supplier created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: Uuid, id: Uuid) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .filter(supplier::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("supplier", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let paginator = supplier::Entity::find()
            .filter(supplier::Column::StoreId.eq(store_id))
            .order_by_asc(supplier::Column::Name)
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
        input: UpdateSupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(store_id, id).await?;

        let mut active: supplier::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(contact_name) = input.contact_name {
            active.contact_name = Set(Some(contact_name));
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a supplier that has never been ordered from. Products that
    /// referenced it lose their supplier and drop out of auto-replenishment.
    #[instrument(skip(self))]
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.get(store_id, id).await?;

        let orders = purchase_order::Entity::find()
            .filter(purchase_order::Column::SupplierId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "supplier {} has {} purchase order(s)",
                id, orders
            )));
        }

        with_transaction(&self.db_pool, "supplier.delete", move |txn| {
            Box::pin(async move {
                product::Entity::update_many()
                    .col_expr(product::Column::SupplierId, Expr::value(Option::<Uuid>::None))
                    .filter(product::Column::SupplierId.eq(id))
                    .exec(txn)
                    .await?;
                supplier::Entity::delete_by_id(id).exec(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}
