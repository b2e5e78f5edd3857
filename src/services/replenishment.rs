//! Low-stock replenishment planner.
//!
//! Scans a store's catalog, keeps products at or below their reorder point
//! that have a supplier, and drafts one purchase order per supplier.

use crate::{
    entities::{product, purchase_order::PurchaseOrderWithItems, supplier},
    errors::ServiceError,
    repositories::{NewPurchaseOrder, NewPurchaseOrderItem, ReplenishmentRepository},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Why a low-stock product was left out of the generated orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `reorder_point - stock + safety_stock` is zero or negative
    NonPositiveQuantity,
    /// The computed quantity does not fit an order line
    QuantityOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProduct {
    pub product_id: Uuid,
    pub sku: String,
    pub computed_quantity: i64,
    pub reason: SkipReason,
}

/// Lines to order from one supplier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierGroup {
    pub supplier_id: Uuid,
    pub lines: Vec<NewPurchaseOrderItem>,
}

impl SupplierGroup {
    pub fn total_amount(&self) -> Decimal {
        self.lines
            .iter()
            .map(|line| line.cost_price * Decimal::from(line.quantity))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplenishmentPlan {
    /// Supplier groups in the order their first product was encountered
    pub groups: Vec<SupplierGroup>,
    pub skipped: Vec<SkippedProduct>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReplenishmentOutcome {
    pub message: String,
    pub orders: Vec<PurchaseOrderWithItems>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProduct>,
}

/// Quantity to order so stock climbs back above the reorder point plus the
/// safety buffer. Computed in `i64` so extreme thresholds cannot wrap.
pub fn reorder_quantity(product: &product::Model) -> i64 {
    i64::from(product.reorder_point) - i64::from(product.stock) + i64::from(product.safety_stock)
}

/// Groups low-stock products by supplier.
///
/// Products without a resolvable supplier are ignored. Rows are expected in
/// catalog order; the output keeps that order both across and within groups.
pub fn plan_replenishment(
    rows: Vec<(product::Model, Option<supplier::Model>)>,
) -> ReplenishmentPlan {
    let mut plan = ReplenishmentPlan::default();
    let mut group_index: HashMap<Uuid, usize> = HashMap::new();

    for (product, supplier) in rows {
        let Some(supplier) = supplier else {
            continue;
        };
        if !product.is_low_stock() {
            continue;
        }

        let computed = reorder_quantity(&product);
        let quantity = match i32::try_from(computed) {
            Ok(q) if q > 0 => q,
            Ok(_) => {
                plan.skipped.push(SkippedProduct {
                    product_id: product.id,
                    sku: product.sku,
                    computed_quantity: computed,
                    reason: SkipReason::NonPositiveQuantity,
                });
                continue;
            }
            Err(_) => {
                plan.skipped.push(SkippedProduct {
                    product_id: product.id,
                    sku: product.sku,
                    computed_quantity: computed,
                    reason: SkipReason::QuantityOverflow,
                });
                continue;
            }
        };

        let line = NewPurchaseOrderItem {
            product_id: product.id,
            quantity,
            cost_price: product.cost_price,
        };

        match group_index.get(&supplier.id) {
            Some(&idx) => plan.groups[idx].lines.push(line),
            None => {
                group_index.insert(supplier.id, plan.groups.len());
                plan.groups.push(SupplierGroup {
                    supplier_id: supplier.id,
                    lines: vec![line],
                });
            }
        }
    }

    plan
}

/// Produces purchase order numbers that are unique within the process.
///
/// Format: `{prefix}-{UTC yyyymmddHHMMSSmmm}-{seq:06}-{supplier tag}` where the
/// tag is the first six hex digits of the supplier id.
#[derive(Debug)]
pub struct OrderNumberGenerator {
    prefix: String,
    sequence: AtomicU64,
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next_number(&self, supplier_id: Uuid, now: DateTime<Utc>) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let simple = supplier_id.simple().to_string();
        let tag = simple[..6].to_ascii_uppercase();
        format!(
            "{}-{}-{:06}-{}",
            self.prefix,
            now.format("%Y%m%d%H%M%S%3f"),
            seq,
            tag
        )
    }
}

/// Service that turns a replenishment plan into draft purchase orders
pub struct ReplenishmentService {
    repository: Arc<dyn ReplenishmentRepository>,
    numbers: OrderNumberGenerator,
}

impl ReplenishmentService {
    pub fn new(repository: Arc<dyn ReplenishmentRepository>, po_prefix: impl Into<String>) -> Self {
        Self {
            repository,
            numbers: OrderNumberGenerator::new(po_prefix),
        }
    }

    /// Drafts one purchase order per supplier for the store's low-stock products.
    ///
    /// Runs are not deduplicated: calling this twice without stock changes
    /// creates two independent sets of drafts.
    #[instrument(skip(self))]
    pub async fn generate_replenishment_orders(
        &self,
        store_id: Uuid,
        created_by: Option<Uuid>,
    ) -> Result<ReplenishmentOutcome, ServiceError> {
        if !self.repository.store_exists(store_id).await? {
            return Err(ServiceError::not_found("store", store_id));
        }

        let rows = self.repository.products_with_suppliers(store_id).await?;
        let plan = plan_replenishment(rows);

        for skipped in &plan.skipped {
            warn!(
                product_id = %skipped.product_id,
                sku = %skipped.sku,
                computed_quantity = skipped.computed_quantity,
                reason = ?skipped.reason,
                "Skipping low-stock product with unusable reorder quantity"
            );
        }
        if !plan.skipped.is_empty() {
            counter!("pos_replenishment.skipped", plan.skipped.len() as u64);
        }

        if plan.groups.is_empty() {
            counter!("pos_replenishment.runs", 1, "outcome" => "empty");
            let message = if plan.skipped.is_empty() {
                "No low-stock products with an assigned supplier; no purchase orders created"
                    .to_string()
            } else {
                format!(
                    "No purchase orders created; {} low-stock product(s) skipped",
                    plan.skipped.len()
                )
            };
            return Ok(ReplenishmentOutcome {
                message,
                orders: Vec::new(),
                skipped: plan.skipped,
            });
        }

        let mut orders = Vec::with_capacity(plan.groups.len());
        for group in plan.groups {
            let total_amount = group.total_amount();
            let line_count = group.lines.len();
            let order = NewPurchaseOrder {
                po_number: self.numbers.next_number(group.supplier_id, Utc::now()),
                store_id,
                supplier_id: group.supplier_id,
                total_amount,
                notes: Some(format!(
                    "Auto-generated replenishment for {} low-stock product(s)",
                    line_count
                )),
                created_by,
                items: group.lines,
            };

            let created = self.repository.create_purchase_order(order).await?;
            info!(
                po_number = %created.order.po_number,
                supplier_id = %created.order.supplier_id,
                lines = line_count,
                total = %created.order.total_amount,
                "Draft purchase order created"
            );
            counter!("pos_replenishment.orders_created", 1);
            orders.push(created);
        }

        counter!("pos_replenishment.runs", 1, "outcome" => "created");
        Ok(ReplenishmentOutcome {
            message: format!("Created {} purchase order(s)", orders.len()),
            orders,
            skipped: plan.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::purchase_order::{self, PurchaseOrderStatus};
    use crate::entities::purchase_order_item;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn supplier(name: &str) -> supplier::Model {
        supplier::Model {
            id: Uuid::new_v4(),
            store_id: Uuid::nil(),
            name: name.to_string(),
            contact_name: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(
        sku: &str,
        stock: i32,
        reorder_point: i32,
        safety_stock: i32,
        cost_price: Decimal,
        supplier: Option<&supplier::Model>,
    ) -> (product::Model, Option<supplier::Model>) {
        (
            product::Model {
                id: Uuid::new_v4(),
                store_id: Uuid::nil(),
                category_id: None,
                supplier_id: supplier.map(|s| s.id),
                sku: sku.to_string(),
                name: sku.to_string(),
                description: None,
                price: cost_price * dec!(2),
                cost_price,
                stock,
                reorder_point,
                safety_stock,
                active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            supplier.cloned(),
        )
    }

    #[test]
    fn groups_by_supplier_in_encounter_order() {
        let acme = supplier("Acme");
        let globex = supplier("Globex");
        let rows = vec![
            product("A-1", 2, 5, 3, dec!(1.50), Some(&globex)),
            product("B-1", 10, 5, 3, dec!(4.00), Some(&acme)),
            product("C-1", 0, 4, 1, dec!(2.00), Some(&acme)),
            product("D-1", 6, 5, 0, dec!(3.00), Some(&globex)),
            product("E-1", 0, 10, 0, dec!(9.99), None),
        ];

        let plan = plan_replenishment(rows);

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].supplier_id, globex.id);
        assert_eq!(plan.groups[1].supplier_id, acme.id);

        let globex_qty: Vec<i32> = plan.groups[0].lines.iter().map(|l| l.quantity).collect();
        assert_eq!(globex_qty, vec![6]);
        assert_eq!(plan.groups[1].lines[0].quantity, 5);
        assert_eq!(plan.groups[0].total_amount(), dec!(9.00));
        assert_eq!(plan.groups[1].total_amount(), dec!(10.00));
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn product_exactly_at_reorder_point_with_no_buffer_is_skipped() {
        let acme = supplier("Acme");
        let plan = plan_replenishment(vec![product("AT-RP", 5, 5, 0, dec!(1), Some(&acme))]);

        assert!(plan.groups.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].computed_quantity, 0);
        assert_eq!(plan.skipped[0].reason, SkipReason::NonPositiveQuantity);
    }

    #[test]
    fn negative_safety_stock_never_yields_a_line() {
        let acme = supplier("Acme");
        let plan = plan_replenishment(vec![
            product("NEG", 3, 4, -5, dec!(1), Some(&acme)),
            product("OK", 0, 4, 1, dec!(1), Some(&acme)),
        ]);

        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].lines.len(), 1);
        assert_eq!(plan.groups[0].lines[0].quantity, 5);
        assert_eq!(plan.skipped[0].sku, "NEG");
        assert_eq!(plan.skipped[0].computed_quantity, -4);
    }

    #[test]
    fn overflowing_quantity_is_reported() {
        let acme = supplier("Acme");
        let plan = plan_replenishment(vec![product(
            "HUGE",
            0,
            i32::MAX,
            i32::MAX,
            dec!(1),
            Some(&acme),
        )]);

        assert!(plan.groups.is_empty());
        assert_eq!(plan.skipped[0].reason, SkipReason::QuantityOverflow);
    }

    #[test]
    fn order_numbers_are_unique_and_tagged_with_supplier() {
        let generator = OrderNumberGenerator::new("PO");
        let supplier_id = Uuid::parse_str("abcdef12-3456-7890-abcd-ef1234567890").unwrap();
        let now = Utc::now();

        let numbers: HashSet<String> = (0..1000)
            .map(|_| generator.next_number(supplier_id, now))
            .collect();
        assert_eq!(numbers.len(), 1000);

        let first = generator.next_number(supplier_id, now);
        assert!(first.starts_with("PO-"));
        assert!(first.ends_with("-001001-ABCDEF"));
        let stamp = first.split('-').nth(1).unwrap();
        assert_eq!(stamp.len(), 17);
    }

    proptest! {
        #[test]
        fn every_planned_line_matches_the_reorder_formula(
            specs in prop::collection::vec((0i32..500, -50i32..500, -50i32..100, 0usize..4), 0..40)
        ) {
            let suppliers: Vec<supplier::Model> = (0..3).map(|i| supplier(&format!("S{i}"))).collect();
            let rows: Vec<_> = specs
                .iter()
                .map(|&(stock, rp, ss, sup)| {
                    product("P", stock, rp, ss, dec!(2.50), suppliers.get(sup))
                })
                .collect();
            let by_id: HashMap<Uuid, product::Model> =
                rows.iter().map(|(p, _)| (p.id, p.clone())).collect();

            let plan = plan_replenishment(rows.clone());

            let mut seen = HashSet::new();
            for group in &plan.groups {
                prop_assert!(!group.lines.is_empty());
                for line in &group.lines {
                    let p = &by_id[&line.product_id];
                    prop_assert!(line.quantity > 0);
                    prop_assert!(p.stock <= p.reorder_point);
                    prop_assert_eq!(p.supplier_id, Some(group.supplier_id));
                    prop_assert_eq!(i64::from(line.quantity), reorder_quantity(p));
                    prop_assert!(seen.insert(line.product_id));
                }
            }

            // Every eligible product is either ordered or reported.
            for (p, s) in &rows {
                if s.is_some() && p.stock <= p.reorder_point {
                    let reported = plan.skipped.iter().any(|sk| sk.product_id == p.id);
                    prop_assert!(seen.contains(&p.id) ^ reported);
                } else {
                    prop_assert!(!seen.contains(&p.id));
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingRepository {
        rows: Vec<(product::Model, Option<supplier::Model>)>,
        created: Mutex<Vec<NewPurchaseOrder>>,
        store_missing: bool,
    }

    #[async_trait]
    impl ReplenishmentRepository for RecordingRepository {
        async fn store_exists(&self, _store_id: Uuid) -> Result<bool, ServiceError> {
            Ok(!self.store_missing)
        }

        async fn products_with_suppliers(
            &self,
            _store_id: Uuid,
        ) -> Result<Vec<(product::Model, Option<supplier::Model>)>, ServiceError> {
            Ok(self.rows.clone())
        }

        async fn create_purchase_order(
            &self,
            order: NewPurchaseOrder,
        ) -> Result<PurchaseOrderWithItems, ServiceError> {
            self.created.lock().unwrap().push(order.clone());
            let id = Uuid::new_v4();
            let now = Utc::now();
            Ok(PurchaseOrderWithItems {
                order: purchase_order::Model {
                    id,
                    po_number: order.po_number,
                    supplier_id: order.supplier_id,
                    store_id: order.store_id,
                    status: PurchaseOrderStatus::Draft,
                    total_amount: order.total_amount,
                    notes: order.notes,
                    created_by: order.created_by,
                    created_at: now,
                    updated_at: now,
                },
                items: order
                    .items
                    .into_iter()
                    .map(|line| purchase_order_item::Model {
                        id: Uuid::new_v4(),
                        purchase_order_id: id,
                        product_id: line.product_id,
                        quantity: line.quantity,
                        cost_price: line.cost_price,
                        created_at: now,
                    })
                    .collect(),
            })
        }
    }

    #[tokio::test]
    async fn missing_store_is_not_found() {
        let repo = Arc::new(RecordingRepository {
            store_missing: true,
            ..Default::default()
        });
        let service = ReplenishmentService::new(repo, "PO");

        let err = service
            .generate_replenishment_orders(Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn writes_one_draft_per_supplier_with_notes() {
        let acme = supplier("Acme");
        let globex = supplier("Globex");
        let repo = Arc::new(RecordingRepository {
            rows: vec![
                product("A", 1, 5, 2, dec!(3.00), Some(&acme)),
                product("B", 0, 2, 0, dec!(7.25), Some(&globex)),
                product("C", 4, 5, 0, dec!(1.00), Some(&acme)),
            ],
            ..Default::default()
        });
        let service = ReplenishmentService::new(repo.clone(), "PO");

        let outcome = service
            .generate_replenishment_orders(Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(outcome.orders.len(), 2);
        assert_eq!(outcome.message, "Created 2 purchase order(s)");

        let created = repo.created.lock().unwrap();
        assert_eq!(created[0].supplier_id, acme.id);
        assert_eq!(created[0].items.len(), 2);
        assert_eq!(created[0].total_amount, dec!(19.00));
        assert_eq!(
            created[0].notes.as_deref(),
            Some("Auto-generated replenishment for 2 low-stock product(s)")
        );
        assert_eq!(created[1].total_amount, dec!(14.50));
        assert_ne!(created[0].po_number, created[1].po_number);
    }

    #[tokio::test]
    async fn empty_catalog_is_not_an_error() {
        let service = ReplenishmentService::new(Arc::new(RecordingRepository::default()), "PO");

        let outcome = service
            .generate_replenishment_orders(Uuid::new_v4(), None)
            .await
            .unwrap();

        assert!(outcome.orders.is_empty());
        assert!(outcome.message.starts_with("No low-stock products"));
    }
}
