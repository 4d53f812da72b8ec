//! Storage seam for the order workflow.
//!
//! [`OrderTx`] is the set of row operations the workflow performs inside one
//! transaction; [`OrderStore`] owns the transaction boundary and the
//! read-only queries served outside of it. Table and product rows are only
//! ever mutated through an `OrderTx`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Deserialize;
use shared::OrderView;

use crate::error::OrderError;
use crate::models::*;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait OrderTx: Send {
    /// Live (not soft-deleted) table, locked until the transaction ends.
    async fn lock_table(&mut self, table_id: i32) -> Result<Option<DiningTable>, OrderError>;

    /// Flips `is_book` to `booked` only if it currently holds the opposite
    /// value. Returns whether a row changed.
    async fn set_table_booked(&mut self, table_id: i32, booked: bool) -> Result<bool, OrderError>;

    /// Live product, locked until the transaction ends.
    async fn lock_product(&mut self, product_id: i32) -> Result<Option<Product>, OrderError>;

    /// Any product row, soft-deleted included. Used to describe historical
    /// line items.
    async fn find_product(&mut self, product_id: i32) -> Result<Option<Product>, OrderError>;

    /// `qty = qty - n` guarded by `qty >= n`. Returns whether a row changed.
    async fn decrement_stock(&mut self, product_id: i32, qty: i32) -> Result<bool, OrderError>;

    async fn increment_stock(&mut self, product_id: i32, qty: i32) -> Result<bool, OrderError>;

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, OrderError>;

    /// Live order, locked until the transaction ends.
    async fn lock_order(&mut self, order_id: i32) -> Result<Option<Order>, OrderError>;

    async fn save_order(&mut self, order_id: i32, changes: OrderChanges) -> Result<Order, OrderError>;

    /// Marks a live order deleted. Returns whether a row changed.
    async fn soft_delete_order(&mut self, order_id: i32) -> Result<bool, OrderError>;

    async fn line_items(&mut self, order_id: i32) -> Result<Vec<OrderProduct>, OrderError>;

    async fn delete_line_items(&mut self, order_id: i32) -> Result<usize, OrderError>;

    async fn insert_line_item(&mut self, item: NewOrderProduct) -> Result<OrderProduct, OrderError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl OrderFilter {
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Runs `work` in one transaction: committed when it returns `Ok`,
    /// rolled back entirely when it returns `Err`.
    async fn transaction<T, F>(&self, work: F) -> Result<T, OrderError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn OrderTx) -> BoxFuture<'t, Result<T, OrderError>>
            + Send
            + 'static;

    async fn get_order(&self, order_id: i32) -> Result<OrderView, OrderError>;

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderView>, OrderError>;

    async fn list_tables(&self) -> Result<Vec<DiningTable>, OrderError>;

    async fn list_payments(&self) -> Result<Vec<Payment>, OrderError>;
}
