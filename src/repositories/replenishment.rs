use crate::{
    db::{with_transaction, DbPool},
    entities::{
        product,
        purchase_order::{self, PurchaseOrderStatus, PurchaseOrderWithItems},
        purchase_order_item, store, supplier,
    },
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// Draft order ready to be written together with its lines
#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub po_number: String,
    pub store_id: Uuid,
    pub supplier_id: Uuid,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub items: Vec<NewPurchaseOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub cost_price: Decimal,
}

#[async_trait]
pub trait ReplenishmentRepository: Send + Sync {
    async fn store_exists(&self, store_id: Uuid) -> Result<bool, ServiceError>;

    /// Every product of the store with its supplier, in catalog order.
    async fn products_with_suppliers(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<(product::Model, Option<supplier::Model>)>, ServiceError>;

    /// Writes the order and all of its lines atomically.
    async fn create_purchase_order(
        &self,
        order: NewPurchaseOrder,
    ) -> Result<PurchaseOrderWithItems, ServiceError>;
}

#[derive(Clone)]
pub struct SeaOrmReplenishmentRepository {
    db: Arc<DbPool>,
}

impl SeaOrmReplenishmentRepository {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReplenishmentRepository for SeaOrmReplenishmentRepository {
    async fn store_exists(&self, store_id: Uuid) -> Result<bool, ServiceError> {
        let count = store::Entity::find_by_id(store_id)
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }

    async fn products_with_suppliers(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<(product::Model, Option<supplier::Model>)>, ServiceError> {
        let rows = product::Entity::find()
            .find_also_related(supplier::Entity)
            .filter(product::Column::StoreId.eq(store_id))
            .order_by_asc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    async fn create_purchase_order(
        &self,
        order: NewPurchaseOrder,
    ) -> Result<PurchaseOrderWithItems, ServiceError> {
        with_transaction(&self.db, "purchase_order.create", move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let header = purchase_order::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    po_number: Set(order.po_number),
                    supplier_id: Set(order.supplier_id),
                    store_id: Set(order.store_id),
                    status: Set(PurchaseOrderStatus::Draft),
                    total_amount: Set(order.total_amount),
                    notes: Set(order.notes),
                    created_by: Set(order.created_by),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let mut items = Vec::with_capacity(order.items.len());
                for line in order.items {
                    let item = purchase_order_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        purchase_order_id: Set(header.id),
                        product_id: Set(line.product_id),
                        quantity: Set(line.quantity),
                        cost_price: Set(line.cost_price),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    items.push(item);
                }

                Ok(PurchaseOrderWithItems {
                    order: header,
                    items,
                })
            })
        })
        .await
    }
}
