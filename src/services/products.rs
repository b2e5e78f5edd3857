use super::validate_non_negative;
use crate::{
    db::DbPool,
    entities::{category, product, purchase_order_item, supplier},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const MAX_STOCK_DELTA: u32 = 1_000_000;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub price: Decimal,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub reorder_point: i32,
    #[serde(default)]
    pub safety_stock: i32,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// Partial update. Stock is changed through [`ProductService::adjust_stock`].
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub reorder_point: Option<i32>,
    pub safety_stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentInput {
    /// Signed change applied to the on-hand quantity
    pub delta: i32,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-sensitive substring match on name or SKU
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub low_stock_only: bool,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn ensure_references(
        &self,
        store_id: Uuid,
        category_id: Option<Uuid>,
        supplier_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(category_id) = category_id {
            let found = category::Entity::find_by_id(category_id)
                .filter(category::Column::StoreId.eq(store_id))
                .count(&*self.db_pool)
                .await?;
            if found == 0 {
                return Err(ServiceError::InvalidInput(format!(
                    "category {} does not exist in this store",
                    category_id
                )));
            }
        }
        if let Some(supplier_id) = supplier_id {
            let found = supplier::Entity::find_by_id(supplier_id)
                .filter(supplier::Column::StoreId.eq(store_id))
                .count(&*self.db_pool)
                .await?;
            if found == 0 {
                return Err(ServiceError::InvalidInput(format!(
                    "supplier {} does not exist in this store",
                    supplier_id
                )));
            }
        }
        Ok(())
    }

    async fn ensure_unique_sku(
        &self,
        store_id: Uuid,
        sku: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = product::Entity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!("SKU {} already exists", sku)));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        store_id: Uuid,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let sku = input.sku.trim().to_string();
        self.ensure_unique_sku(store_id, &sku, None).await?;
        self.ensure_references(store_id, input.category_id, input.supplier_id)
            .await?;

        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            category_id: Set(input.category_id),
            supplier_id: Set(input.supplier_id),
            sku: Set(sku),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            price: Set(input.price),
            cost_price: Set(input.cost_price),
            stock: Set(input.stock),
            reorder_point: Set(input.reorder_point),
            safety_stock: Set(input.safety_stock),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(product_id = %created.id, sku = %created.sku, "Product created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: Uuid, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .filter(product::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        filter: &ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::StoreId.eq(store_id));

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(search))
                    .add(product::Column::Sku.contains(search)),
            );
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(product::Column::SupplierId.eq(supplier_id));
        }
        if filter.low_stock_only {
            query = query.filter(
                Expr::col(product::Column::Stock).lte(Expr::col(product::Column::ReorderPoint)),
            );
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .order_by_asc(product::Column::Id)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Active products at or below their reorder point, most depleted first.
    #[instrument(skip(self))]
    pub async fn low_stock(&self, store_id: Uuid) -> Result<Vec<product::Model>, ServiceError> {
        let mut rows = product::Entity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Active.eq(true))
            .filter(
                Expr::col(product::Column::Stock).lte(Expr::col(product::Column::ReorderPoint)),
            )
            .order_by_asc(product::Column::Name)
            .all(&*self.db_pool)
            .await?;

        rows.sort_by_key(|p| i64::from(p.stock) - i64::from(p.reorder_point));
        Ok(rows)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(store_id, id).await?;

        if let Some(sku) = input.sku.as_deref() {
            self.ensure_unique_sku(store_id, sku.trim(), Some(id)).await?;
        }
        self.ensure_references(store_id, input.category_id, input.supplier_id)
            .await?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(sku) = input.sku {
            active.sku = Set(sku.trim().to_string());
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(cost_price) = input.cost_price {
            active.cost_price = Set(cost_price);
        }
        if let Some(reorder_point) = input.reorder_point {
            active.reorder_point = Set(reorder_point);
        }
        if let Some(safety_stock) = input.safety_stock {
            active.safety_stock = Set(safety_stock);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(supplier_id) = input.supplier_id {
            active.supplier_id = Set(Some(supplier_id));
        }
        if let Some(flag) = input.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Applies a signed stock change; the result may not drop below zero.
    #[instrument(skip(self, input))]
    pub async fn adjust_stock(
        &self,
        store_id: Uuid,
        id: Uuid,
        input: StockAdjustmentInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        if input.delta == 0 || input.delta.unsigned_abs() > MAX_STOCK_DELTA {
            return Err(ServiceError::InvalidInput(format!(
                "delta must be non-zero and within ±{}",
                MAX_STOCK_DELTA
            )));
        }

        let result = product::Entity::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(input.delta),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(id))
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Stock.gte(-input.delta))
            .exec(&*self.db_pool)
            .await?;

        if result.rows_affected == 0 {
            let current = self.get(store_id, id).await?;
            return Err(ServiceError::InvalidInput(format!(
                "stock cannot go below zero (on hand {}, change {})",
                current.stock, input.delta
            )));
        }

        let updated = self.get(store_id, id).await?;
        info!(
            product_id = %id,
            delta = input.delta,
            stock = updated.stock,
            reason = input.reason.as_deref().unwrap_or(""),
            "Stock adjusted"
        );
        Ok(updated)
    }

    /// Deletes a product that no purchase order references.
    #[instrument(skip(self))]
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.get(store_id, id).await?;

        let lines = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::ProductId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if lines > 0 {
            return Err(ServiceError::Conflict(format!(
                "product {} appears on purchase orders; deactivate it instead",
                id
            )));
        }

        product::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
