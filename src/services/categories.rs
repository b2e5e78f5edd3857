use crate::{
    db::{with_transaction, DbPool},
    entities::{category, product},
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
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        store_id: Uuid,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(category_id = %created.id, "Category created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: Uuid, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .filter(category::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<category::Model>, u64), ServiceError> {
        let paginator = category::Entity::find()
            .filter(category::Column::StoreId.eq(store_id))
            .order_by_asc(category::Column::Name)
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
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(store_id, id).await?;

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a category; its products stay in the catalog uncategorised.
    #[instrument(skip(self))]
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.get(store_id, id).await?;

        with_transaction(&self.db_pool, "category.delete", move |txn| {
            Box::pin(async move {
                product::Entity::update_many()
                    .col_expr(product::Column::CategoryId, Expr::value(Option::<Uuid>::None))
                    .filter(product::Column::CategoryId.eq(id))
                    .exec(txn)
                    .await?;
                category::Entity::delete_by_id(id).exec(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(category_id = %id, "Category deleted");
        Ok(())
    }
}
