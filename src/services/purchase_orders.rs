use crate::{
    db::{with_transaction, DbPool},
    entities::{
        product,
        purchase_order::{self, PurchaseOrderStatus, PurchaseOrderWithItems},
        purchase_order_item,
    },
    errors::ServiceError,
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusChangeInput {
    pub status: PurchaseOrderStatus,
}

async fn load_items<C: ConnectionTrait>(
    db: &C,
    order_ids: Vec<Uuid>,
) -> Result<Vec<purchase_order_item::Model>, ServiceError> {
    Ok(purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.is_in(order_ids))
        .order_by_asc(purchase_order_item::Column::CreatedAt)
        .order_by_asc(purchase_order_item::Column::Id)
        .all(db)
        .await?)
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
}

impl PurchaseOrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn find<C: ConnectionTrait>(
        db: &C,
        store_id: Uuid,
        id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find_by_id(id)
            .filter(purchase_order::Column::StoreId.eq(store_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("purchase order", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        filter: &PurchaseOrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<PurchaseOrderWithItems>, u64), ServiceError> {
        let mut query = purchase_order::Entity::find()
            .filter(purchase_order::Column::StoreId.eq(store_id));
        if let Some(status) = filter.status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id));
        }

        let paginator = query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .order_by_desc(purchase_order::Column::PoNumber)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let ids = orders.iter().map(|o| o.id).collect();
        let mut items = load_items(&*self.db_pool, ids).await?;
        let rows = orders
            .into_iter()
            .map(|order| {
                let (mine, rest): (Vec<_>, Vec<_>) = items
                    .drain(..)
                    .partition(|i| i.purchase_order_id == order.id);
                items = rest;
                PurchaseOrderWithItems { order, items: mine }
            })
            .collect();
        Ok((rows, total))
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        store_id: Uuid,
        id: Uuid,
    ) -> Result<PurchaseOrderWithItems, ServiceError> {
        let order = Self::find(&*self.db_pool, store_id, id).await?;
        let items = load_items(&*self.db_pool, vec![order.id]).await?;
        Ok(PurchaseOrderWithItems { order, items })
    }

    /// Moves an order along its lifecycle. Receiving adds every line's
    /// quantity to its product's stock in the same transaction. The status
    /// update is conditional on the status read, so two concurrent
    /// transitions cannot both apply.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        store_id: Uuid,
        id: Uuid,
        next: PurchaseOrderStatus,
    ) -> Result<PurchaseOrderWithItems, ServiceError> {
        let result = with_transaction(&self.db_pool, "purchase_order.change_status", move |txn| {
            Box::pin(async move {
                let current = Self::find(txn, store_id, id).await?;
                if !current.status.can_transition_to(next) {
                    return Err(ServiceError::InvalidOperation(format!(
                        "cannot move purchase order {} from {} to {}",
                        current.po_number,
                        current.status.to_value(),
                        next.to_value()
                    )));
                }

                let updated = purchase_order::Entity::update_many()
                    .col_expr(purchase_order::Column::Status, Expr::value(next.to_value()))
                    .col_expr(purchase_order::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(purchase_order::Column::Id.eq(id))
                    .filter(purchase_order::Column::Status.eq(current.status))
                    .exec(txn)
                    .await?;
                if updated.rows_affected == 0 {
                    return Err(ServiceError::Conflict(format!(
                        "purchase order {} changed concurrently",
                        current.po_number
                    )));
                }

                let items = load_items(txn, vec![id]).await?;
                if next == PurchaseOrderStatus::Received {
                    for item in &items {
                        product::Entity::update_many()
                            .col_expr(
                                product::Column::Stock,
                                Expr::col(product::Column::Stock).add(item.quantity),
                            )
                            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                            .filter(product::Column::Id.eq(item.product_id))
                            .exec(txn)
                            .await?;
                    }
                }

                let order = Self::find(txn, store_id, id).await?;
                Ok(PurchaseOrderWithItems { order, items })
            })
        })
        .await?;

        counter!("pos_purchase_orders.status_changed", 1, "status" => next.to_value());
        info!(
            po_number = %result.order.po_number,
            status = %next.to_value(),
            "Purchase order status changed"
        );
        Ok(result)
    }
}
