use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use futures::future::BoxFuture;
use shared::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{OrderFilter, OrderStore, OrderTx};
use crate::error::OrderError;
use crate::models::*;
use crate::seed;

#[derive(Debug, Clone, Default)]
struct Sequences {
    tables: i32,
    products: i32,
    payments: i32,
    orders: i32,
    order_products: i32,
}

fn next(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: BTreeMap<i32, DiningTable>,
    products: BTreeMap<i32, Product>,
    payments: BTreeMap<i32, Payment>,
    orders: BTreeMap<i32, Order>,
    order_products: BTreeMap<i32, OrderProduct>,
    seq: Sequences,
}

impl MemoryState {
    fn lines_for(&self, order_id: i32) -> Vec<OrderLine> {
        self.order_products
            .values()
            .filter(|item| item.order_id == order_id)
            .filter_map(|item| self.products.get(&item.product_id).map(|p| p.line(item.qty)))
            .collect()
    }
}

/// In-process store with the same transactional semantics as [`PgStore`]:
/// a transaction works on a private copy of the state and swaps it in on
/// commit. Transactions are serialized by a single lock.
///
/// [`PgStore`]: super::PgStore
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the demo tables, products and payment methods.
    pub async fn seeded() -> Self {
        let store = Self::new();
        for table in seed::demo_tables() {
            store.add_table(&table.name, table.is_book).await;
        }
        for product in seed::demo_products() {
            store.add_product(&product.name, product.price, product.qty).await;
        }
        for payment in seed::demo_payments() {
            store.add_payment(&payment.name).await;
        }
        store
    }

    pub async fn add_table(&self, name: &str, is_book: bool) -> i32 {
        let mut state = self.state.lock().await;
        let id = next(&mut state.seq.tables);
        let now = Some(Utc::now());
        state.tables.insert(
            id,
            DiningTable {
                id,
                name: name.to_string(),
                is_book,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        );
        id
    }

    pub async fn add_product(&self, name: &str, price: BigDecimal, qty: i32) -> i32 {
        let mut state = self.state.lock().await;
        let id = next(&mut state.seq.products);
        let now = Some(Utc::now());
        state.products.insert(
            id,
            Product {
                id,
                name: name.to_string(),
                price,
                qty,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        );
        id
    }

    pub async fn add_payment(&self, name: &str) -> i32 {
        let mut state = self.state.lock().await;
        let id = next(&mut state.seq.payments);
        let now = Some(Utc::now());
        state.payments.insert(
            id,
            Payment {
                id,
                name: name.to_string(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        );
        id
    }

    pub async fn product(&self, product_id: i32) -> Option<Product> {
        self.state.lock().await.products.get(&product_id).cloned()
    }

    pub async fn table(&self, table_id: i32) -> Option<DiningTable> {
        self.state.lock().await.tables.get(&table_id).cloned()
    }

    #[cfg(test)]
    /// Raw order row, soft-deleted ones included.
    pub async fn order_row(&self, order_id: i32) -> Option<Order> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    #[cfg(test)]
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    #[cfg(test)]
    pub async fn line_item_count(&self) -> usize {
        self.state.lock().await.order_products.len()
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

#[async_trait]
impl OrderTx for MemoryTx<'_> {
    async fn lock_table(&mut self, table_id: i32) -> Result<Option<DiningTable>, OrderError> {
        Ok(self
            .state
            .tables
            .get(&table_id)
            .filter(|t| t.deleted_at.is_none())
            .cloned())
    }

    async fn set_table_booked(&mut self, table_id: i32, booked: bool) -> Result<bool, OrderError> {
        match self.state.tables.get_mut(&table_id) {
            Some(table) if table.deleted_at.is_none() && table.is_book != booked => {
                table.is_book = booked;
                table.updated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn lock_product(&mut self, product_id: i32) -> Result<Option<Product>, OrderError> {
        Ok(self
            .state
            .products
            .get(&product_id)
            .filter(|p| p.deleted_at.is_none())
            .cloned())
    }

    async fn find_product(&mut self, product_id: i32) -> Result<Option<Product>, OrderError> {
        Ok(self.state.products.get(&product_id).cloned())
    }

    async fn decrement_stock(&mut self, product_id: i32, qty: i32) -> Result<bool, OrderError> {
        match self.state.products.get_mut(&product_id) {
            Some(product) if product.qty >= qty => {
                product.qty -= qty;
                product.updated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&mut self, product_id: i32, qty: i32) -> Result<bool, OrderError> {
        match self.state.products.get_mut(&product_id) {
            Some(product) => {
                product.qty += qty;
                product.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, OrderError> {
        let id = next(&mut self.state.seq.orders);
        let now = Some(Utc::now());
        let order = Order {
            id,
            table_id: order.table_id,
            customer_name: order.customer_name,
            status: order.status,
            total_amount: order.total_amount,
            tax: order.tax,
            payment_method: order.payment_method,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.state.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn lock_order(&mut self, order_id: i32) -> Result<Option<Order>, OrderError> {
        Ok(self
            .state
            .orders
            .get(&order_id)
            .filter(|o| o.deleted_at.is_none())
            .cloned())
    }

    async fn save_order(&mut self, order_id: i32, changes: OrderChanges) -> Result<Order, OrderError> {
        let order = self
            .state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::Database(diesel::result::Error::NotFound))?;

        order.table_id = changes.table_id;
        order.customer_name = changes.customer_name;
        order.status = changes.status;
        order.total_amount = changes.total_amount;
        order.tax = changes.tax;
        if changes.payment_method.is_some() {
            order.payment_method = changes.payment_method;
        }
        order.updated_at = changes.updated_at;
        Ok(order.clone())
    }

    async fn soft_delete_order(&mut self, order_id: i32) -> Result<bool, OrderError> {
        match self.state.orders.get_mut(&order_id) {
            Some(order) if order.deleted_at.is_none() => {
                order.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn line_items(&mut self, order_id: i32) -> Result<Vec<OrderProduct>, OrderError> {
        Ok(self
            .state
            .order_products
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn delete_line_items(&mut self, order_id: i32) -> Result<usize, OrderError> {
        let before = self.state.order_products.len();
        self.state
            .order_products
            .retain(|_, item| item.order_id != order_id);
        Ok(before - self.state.order_products.len())
    }

    async fn insert_line_item(&mut self, item: NewOrderProduct) -> Result<OrderProduct, OrderError> {
        let id = next(&mut self.state.seq.order_products);
        let item = OrderProduct {
            id,
            order_id: item.order_id,
            product_id: item.product_id,
            qty: item.qty,
        };
        self.state.order_products.insert(id, item.clone());
        Ok(item)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn transaction<T, F>(&self, work: F) -> Result<T, OrderError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn OrderTx) -> BoxFuture<'t, Result<T, OrderError>>
            + Send
            + 'static,
    {
        let mut state = self.state.lock().await;
        let mut working = state.clone();

        let mut tx = MemoryTx {
            state: &mut working,
        };
        let result = work(&mut tx).await;

        if result.is_ok() {
            *state = working;
        }
        result
    }

    async fn get_order(&self, order_id: i32) -> Result<OrderView, OrderError> {
        let state = self.state.lock().await;
        let order = state
            .orders
            .get(&order_id)
            .filter(|o| o.deleted_at.is_none())
            .cloned()
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let lines = state.lines_for(order_id);
        Ok(order.into_view(lines))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderView>, OrderError> {
        let state = self.state.lock().await;
        let search = filter.search();
        let status = filter.status();

        Ok(state
            .orders
            .values()
            .filter(|o| o.deleted_at.is_none())
            .filter(|o| match search {
                Some(search) => match search.parse::<i32>() {
                    Ok(id) => o.id == id || contains_ignore_case(&o.customer_name, search),
                    Err(_) => contains_ignore_case(&o.customer_name, search),
                },
                None => true,
            })
            .filter(|o| status.map_or(true, |s| contains_ignore_case(&o.status, s)))
            .map(|o| o.clone().into_view(state.lines_for(o.id)))
            .collect())
    }

    async fn list_tables(&self) -> Result<Vec<DiningTable>, OrderError> {
        let state = self.state.lock().await;
        Ok(state
            .tables
            .values()
            .filter(|t| t.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_payments(&self) -> Result<Vec<Payment>, OrderError> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .collect())
    }
}
