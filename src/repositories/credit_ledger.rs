use crate::{
    db::{with_transaction, DbPool},
    entities::{
        credit_transaction::{self, TransactionKind},
        customer,
    },
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// A balance change and the ledger entry that records it
#[derive(Debug, Clone)]
pub struct LedgerPosting {
    pub store_id: Uuid,
    pub customer_id: Uuid,
    /// Signed change applied to the customer's debt
    pub delta: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    /// Refuse postings that would take the debt below zero
    pub forbid_negative_debt: bool,
}

#[derive(Debug, Clone)]
pub struct PostingOutcome {
    /// Debt read back inside the posting transaction
    pub new_debt: Decimal,
    pub transaction: credit_transaction::Model,
}

#[async_trait]
pub trait CreditLedgerRepository: Send + Sync {
    /// Applies the balance change and appends the ledger entry in one
    /// transaction. Either both are committed or neither is.
    async fn post(&self, posting: LedgerPosting) -> Result<PostingOutcome, ServiceError>;

    /// Ledger history of a store customer, newest first.
    async fn transactions(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Vec<credit_transaction::Model>, ServiceError>;
}

#[derive(Clone)]
pub struct SeaOrmCreditLedgerRepository {
    db: Arc<DbPool>,
}

impl SeaOrmCreditLedgerRepository {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn customer_exists(&self, store_id: Uuid, customer_id: Uuid) -> Result<bool, ServiceError> {
        let count = customer::Entity::find()
            .filter(customer::Column::Id.eq(customer_id))
            .filter(customer::Column::StoreId.eq(store_id))
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl CreditLedgerRepository for SeaOrmCreditLedgerRepository {
    async fn post(&self, posting: LedgerPosting) -> Result<PostingOutcome, ServiceError> {
        with_transaction(&self.db, "credit_ledger.post", move |txn| {
            Box::pin(async move {
                let now = Utc::now();

                // Single UPDATE so concurrent postings serialize on the row.
                let mut update = customer::Entity::update_many()
                    .col_expr(
                        customer::Column::Debt,
                        Expr::col(customer::Column::Debt).add(posting.delta),
                    )
                    .col_expr(customer::Column::UpdatedAt, Expr::value(now))
                    .filter(customer::Column::Id.eq(posting.customer_id))
                    .filter(customer::Column::StoreId.eq(posting.store_id));
                if posting.forbid_negative_debt && posting.delta.is_sign_negative() {
                    update = update.filter(customer::Column::Debt.gte(-posting.delta));
                }
                let result = update.exec(txn).await?;

                if result.rows_affected == 0 {
                    let exists = customer::Entity::find()
                        .filter(customer::Column::Id.eq(posting.customer_id))
                        .filter(customer::Column::StoreId.eq(posting.store_id))
                        .count(txn)
                        .await?
                        > 0;
                    return Err(if exists {
                        ServiceError::InvalidInput("payment exceeds outstanding debt".to_string())
                    } else {
                        ServiceError::not_found("customer", posting.customer_id)
                    });
                }

                let transaction = credit_transaction::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(posting.customer_id),
                    amount: Set(posting.delta),
                    kind: Set(posting.kind),
                    description: Set(posting.description),
                    created_at: Set(now),
                }
                .insert(txn)
                .await?;

                let customer = customer::Entity::find_by_id(posting.customer_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("customer", posting.customer_id))?;

                Ok(PostingOutcome {
                    new_debt: customer.debt,
                    transaction,
                })
            })
        })
        .await
    }

    async fn transactions(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Vec<credit_transaction::Model>, ServiceError> {
        if !self.customer_exists(store_id, customer_id).await? {
            return Err(ServiceError::not_found("customer", customer_id));
        }

        let rows = credit_transaction::Entity::find()
            .filter(credit_transaction::Column::CustomerId.eq(customer_id))
            .order_by_desc(credit_transaction::Column::CreatedAt)
            .order_by_desc(credit_transaction::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }
}
