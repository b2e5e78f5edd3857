//! Persistence seams for the replenishment planner and the credit ledger.
//!
//! Both services take their repository as `Arc<dyn Trait>` so tests can
//! swap the SeaORM implementation for an in-memory double.

pub mod credit_ledger;
pub mod replenishment;

pub use credit_ledger::{
    CreditLedgerRepository, LedgerPosting, PostingOutcome, SeaOrmCreditLedgerRepository,
};
pub use replenishment::{
    NewPurchaseOrder, NewPurchaseOrderItem, ReplenishmentRepository, SeaOrmReplenishmentRepository,
};
