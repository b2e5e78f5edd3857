use super::validate_non_negative;
use crate::{
    db::{with_transaction, DbPool},
    entities::{package, package_item, product},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackageInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub price: Decimal,
    #[validate(length(min = 1))]
    pub items: Vec<PackageItemInput>,
}

/// Partial update; `items`, when present, replaces the whole item list.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePackageInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub active: Option<bool>,
    #[validate(length(min = 1))]
    pub items: Option<Vec<PackageItemInput>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageWithItems {
    #[serde(flatten)]
    pub package: package::Model,
    pub items: Vec<package_item::Model>,
}

#[derive(Clone)]
pub struct PackageService {
    db_pool: Arc<DbPool>,
}

/// Checks that every product exists in the store, appears only once and has
/// a positive quantity.
async fn ensure_items_belong_to_store<C: ConnectionTrait>(
    db: &C,
    store_id: Uuid,
    items: &[PackageItemInput],
) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for item in items {
        if item.quantity < 1 {
            return Err(ServiceError::InvalidInput(format!(
                "quantity for product {} must be at least 1",
                item.product_id
            )));
        }
        if !seen.insert(item.product_id) {
            return Err(ServiceError::InvalidInput(format!(
                "product {} listed more than once",
                item.product_id
            )));
        }
    }

    let ids: Vec<Uuid> = seen.into_iter().collect();
    let found = product::Entity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .filter(product::Column::Id.is_in(ids.clone()))
        .count(db)
        .await?;
    if found != ids.len() as u64 {
        return Err(ServiceError::InvalidInput(
            "every package item must reference a product of this store".to_string(),
        ));
    }
    Ok(())
}

async fn insert_items<C: ConnectionTrait>(
    db: &C,
    package_id: Uuid,
    items: Vec<PackageItemInput>,
) -> Result<Vec<package_item::Model>, ServiceError> {
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        let row = package_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            package_id: Set(package_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
        }
        .insert(db)
        .await?;
        created.push(row);
    }
    Ok(created)
}

impl PackageService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn find(&self, store_id: Uuid, id: Uuid) -> Result<package::Model, ServiceError> {
        package::Entity::find_by_id(id)
            .filter(package::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("package", id))
    }

    async fn items_of(&self, package_id: Uuid) -> Result<Vec<package_item::Model>, ServiceError> {
        Ok(package_item::Entity::find()
            .filter(package_item::Column::PackageId.eq(package_id))
            .all(&*self.db_pool)
            .await?)
    }

    /// Creates the package and its items in one transaction.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        store_id: Uuid,
        input: CreatePackageInput,
    ) -> Result<PackageWithItems, ServiceError> {
        input.validate()?;

        let result = with_transaction(&self.db_pool, "package.create", move |txn| {
            Box::pin(async move {
                ensure_items_belong_to_store(txn, store_id, &input.items).await?;

                let now = Utc::now();
                let package = package::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    store_id: Set(store_id),
                    name: Set(input.name.trim().to_string()),
                    description: Set(input.description),
                    price: Set(input.price),
                    active: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let items = insert_items(txn, package.id, input.items).await?;
                Ok(PackageWithItems { package, items })
            })
        })
        .await?;

        info!(package_id = %result.package.id, items = result.items.len(), "Package created");
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: Uuid, id: Uuid) -> Result<PackageWithItems, ServiceError> {
        let package = self.find(store_id, id).await?;
        let items = self.items_of(package.id).await?;
        Ok(PackageWithItems { package, items })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        store_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<PackageWithItems>, u64), ServiceError> {
        let paginator = package::Entity::find()
            .filter(package::Column::StoreId.eq(store_id))
            .order_by_asc(package::Column::Name)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let packages = paginator.fetch_page(page.saturating_sub(1)).await?;

        let ids: Vec<Uuid> = packages.iter().map(|p| p.id).collect();
        let mut items = package_item::Entity::find()
            .filter(package_item::Column::PackageId.is_in(ids))
            .all(&*self.db_pool)
            .await?;

        let rows = packages
            .into_iter()
            .map(|package| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    items.drain(..).partition(|i| i.package_id == package.id);
                items = rest;
                PackageWithItems {
                    package,
                    items: mine,
                }
            })
            .collect();
        Ok((rows, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        input: UpdatePackageInput,
    ) -> Result<PackageWithItems, ServiceError> {
        input.validate()?;
        let existing = self.find(store_id, id).await?;

        with_transaction(&self.db_pool, "package.update", move |txn| {
            Box::pin(async move {
                let mut active: package::ActiveModel = existing.into();
                if let Some(name) = input.name {
                    active.name = Set(name.trim().to_string());
                }
                if let Some(description) = input.description {
                    active.description = Set(Some(description));
                }
                if let Some(price) = input.price {
                    active.price = Set(price);
                }
                if let Some(flag) = input.active {
                    active.active = Set(flag);
                }
                active.updated_at = Set(Utc::now());
                let package = active.update(txn).await?;

                let items = match input.items {
                    Some(items) => {
                        ensure_items_belong_to_store(txn, store_id, &items).await?;
                        package_item::Entity::delete_many()
                            .filter(package_item::Column::PackageId.eq(id))
                            .exec(txn)
                            .await?;
                        insert_items(txn, id, items).await?
                    }
                    None => {
                        package_item::Entity::find()
                            .filter(package_item::Column::PackageId.eq(id))
                            .all(txn)
                            .await?
                    }
                };

                Ok(PackageWithItems { package, items })
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.find(store_id, id).await?;

        with_transaction(&self.db_pool, "package.delete", move |txn| {
            Box::pin(async move {
                package_item::Entity::delete_many()
                    .filter(package_item::Column::PackageId.eq(id))
                    .exec(txn)
                    .await?;
                package::Entity::delete_by_id(id).exec(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(package_id = %id, "Package deleted");
        Ok(())
    }
}
