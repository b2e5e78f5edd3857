//! SeaORM entities, one module per table.

pub mod category;
pub mod credit_transaction;
pub mod customer;
pub mod demand_forecast;
pub mod expense;
pub mod package;
pub mod package_item;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod session;
pub mod store;
pub mod supplier;
pub mod user;
