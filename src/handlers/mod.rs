pub mod analytics;
pub mod auth;
pub mod categories;
pub mod common;
pub mod customers;
pub mod expenses;
pub mod packages;
pub mod products;
pub mod purchase_orders;
pub mod suppliers;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    repositories::{SeaOrmCreditLedgerRepository, SeaOrmReplenishmentRepository},
    services::{
        analytics::AnalyticsService, categories::CategoryService,
        credit_ledger::CreditLedgerService, customers::CustomerService,
        expenses::ExpenseService, packages::PackageService, products::ProductService,
        purchase_orders::PurchaseOrderService, replenishment::ReplenishmentService,
        suppliers::SupplierService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub suppliers: Arc<SupplierService>,
    pub packages: Arc<PackageService>,
    pub customers: Arc<CustomerService>,
    pub credit_ledger: Arc<CreditLedgerService>,
    pub expenses: Arc<ExpenseService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub replenishment: Arc<ReplenishmentService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Wires every service to the shared pool. The planner and the ledger get
    /// their SeaORM repositories here.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let replenishment_repo = Arc::new(SeaOrmReplenishmentRepository::new(db_pool.clone()));
        let ledger_repo = Arc::new(SeaOrmCreditLedgerRepository::new(db_pool.clone()));

        Self {
            auth: Arc::new(AuthService::new(db_pool.clone(), config.session_ttl_secs)),
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            packages: Arc::new(PackageService::new(db_pool.clone())),
            customers: Arc::new(CustomerService::new(db_pool.clone())),
            credit_ledger: Arc::new(CreditLedgerService::new(
                ledger_repo,
                config.allow_credit_overpayment,
            )),
            expenses: Arc::new(ExpenseService::new(db_pool.clone())),
            purchase_orders: Arc::new(PurchaseOrderService::new(db_pool.clone())),
            replenishment: Arc::new(ReplenishmentService::new(
                replenishment_repo,
                config.purchase_order_prefix.clone(),
            )),
            analytics: Arc::new(AnalyticsService::new(db_pool)),
        }
    }
}
