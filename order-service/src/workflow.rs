//! Order workflow engine.
//!
//! Each operation runs as one store transaction touching the order, its line
//! items, the stock ledger and table availability. Any error rolls the whole
//! unit back; nothing is retried.

use bigdecimal::BigDecimal;
use chrono::Utc;
use num_traits::Zero;
use shared::*;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, OrderError};
use crate::models::*;
use crate::stock;
use crate::store::{OrderFilter, OrderStore, OrderTx};
use crate::tables;

pub struct OrderWorkflow<S> {
    store: Arc<S>,
    tax: TaxPolicy,
}

impl<S: OrderStore> OrderWorkflow<S> {
    pub fn new(store: Arc<S>, tax: TaxPolicy) -> Self {
        Self { store, tax }
    }

    pub async fn create_order(&self, input: OrderInput) -> Result<OrderView, OrderError> {
        let tax = self.tax.clone();
        let table_id = input.table_id;

        let result = self
            .store
            .transaction(move |tx| Box::pin(async move { create_in_tx(tx, input, &tax).await }))
            .await;

        match &result {
            Ok(order) => info!(
                "Order {} created on table {} with total {}",
                order.id, order.table_id, order.total_amount
            ),
            Err(e) => log_failure("create", format!("table {}", table_id), e),
        }
        result
    }

    pub async fn update_order(&self, order_id: i32, input: OrderInput) -> Result<OrderView, OrderError> {
        let tax = self.tax.clone();

        let result = self
            .store
            .transaction(move |tx| {
                Box::pin(async move { update_in_tx(tx, order_id, input, &tax).await })
            })
            .await;

        match &result {
            Ok(order) => info!("Order {} updated, status {}", order.id, order.status),
            Err(e) => log_failure("update", format!("order {}", order_id), e),
        }
        result
    }

    /// Soft-deletes the order. Table and stock are left as they are.
    pub async fn delete_order(&self, order_id: i32) -> Result<(), OrderError> {
        let result = self
            .store
            .transaction(move |tx| {
                Box::pin(async move {
                    if !tx.soft_delete_order(order_id).await? {
                        return Err(OrderError::OrderNotFound(order_id));
                    }
                    Ok(())
                })
            })
            .await;

        match &result {
            Ok(()) => info!("Order {} deleted", order_id),
            Err(e) => log_failure("delete", format!("order {}", order_id), e),
        }
        result
    }

    pub async fn get_order(&self, order_id: i32) -> Result<OrderView, OrderError> {
        self.store.get_order(order_id).await
    }

    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderView>, OrderError> {
        self.store.list_orders(filter).await
    }

    pub async fn list_tables(&self) -> Result<Vec<DiningTable>, OrderError> {
        self.store.list_tables().await
    }

    pub async fn list_payments(&self) -> Result<Vec<Payment>, OrderError> {
        self.store.list_payments().await
    }
}

fn log_failure(operation: &str, target: String, e: &OrderError) {
    match e.kind() {
        ErrorKind::Internal => error!("Failed to {} order ({}): {}", operation, target, e),
        _ => warn!("Rejected {} of order ({}): {}", operation, target, e),
    }
}

/// Column widths of the `orders` table.
pub const MAX_CUSTOMER_NAME_LEN: usize = 255;
pub const MAX_STATUS_LEN: usize = 64;
pub const MAX_PAYMENT_METHOD_LEN: usize = 255;

fn validate_length(field: &'static str, value: &str, max: usize) -> Result<(), OrderError> {
    if value.chars().count() > max {
        return Err(OrderError::FieldTooLong { field, max });
    }
    Ok(())
}

fn validate_customer(input: &OrderInput) -> Result<(), OrderError> {
    let name = input.customer_name.trim();
    if name.is_empty() {
        return Err(OrderError::MissingCustomerName);
    }
    validate_length("customer_name", name, MAX_CUSTOMER_NAME_LEN)?;
    if let Some(method) = input.payment_method() {
        validate_length("payment_method", method, MAX_PAYMENT_METHOD_LEN)?;
    }
    Ok(())
}

fn validate_items(items: &[LineItemInput]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    if let Some(item) = items.iter().find(|item| item.qty <= 0) {
        return Err(OrderError::InvalidQuantity {
            product_id: item.product_id,
            qty: item.qty,
        });
    }
    Ok(())
}

/// Deducts stock for every requested item and stores it against the order.
async fn place_line_items(
    tx: &mut dyn OrderTx,
    order_id: i32,
    items: &[LineItemInput],
) -> Result<Vec<OrderLine>, OrderError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = stock::reserve(tx, item.product_id, item.qty).await?;
        tx.insert_line_item(NewOrderProduct {
            order_id,
            product_id: item.product_id,
            qty: item.qty,
        })
        .await?;
        lines.push(product.line(item.qty));
    }
    Ok(lines)
}

async fn describe_line_items(
    tx: &mut dyn OrderTx,
    items: &[OrderProduct],
) -> Result<Vec<OrderLine>, OrderError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        if let Some(product) = tx.find_product(item.product_id).await? {
            lines.push(product.line(item.qty));
        }
    }
    Ok(lines)
}

async fn create_in_tx(
    tx: &mut dyn OrderTx,
    input: OrderInput,
    tax: &TaxPolicy,
) -> Result<OrderView, OrderError> {
    tables::find_available(tx, input.table_id).await?;
    validate_customer(&input)?;
    validate_items(&input.order_products)?;

    let payment_method = input.payment_method().map(str::to_string);
    let order = tx
        .insert_order(NewOrder {
            table_id: input.table_id,
            customer_name: input.customer_name.trim().to_string(),
            status: OrderStatus::InProcess.to_string(),
            total_amount: BigDecimal::zero(),
            tax: tax.percent().clone(),
            payment_method,
        })
        .await?;

    tables::claim(tx, order.table_id).await?;

    let lines = place_line_items(tx, order.id, &input.order_products).await?;

    let order = tx
        .save_order(
            order.id,
            OrderChanges {
                table_id: order.table_id,
                customer_name: order.customer_name,
                status: order.status,
                total_amount: tax.total_for(&lines),
                tax: order.tax,
                payment_method: None,
                updated_at: Some(Utc::now()),
            },
        )
        .await?;

    Ok(order.into_view(lines))
}

async fn update_in_tx(
    tx: &mut dyn OrderTx,
    order_id: i32,
    input: OrderInput,
    tax: &TaxPolicy,
) -> Result<OrderView, OrderError> {
    let existing = tx
        .lock_order(order_id)
        .await?
        .ok_or(OrderError::OrderNotFound(order_id))?;

    let current = existing.status();
    let status = OrderStatus::resolve_update(
        input.status.as_deref(),
        &current,
        input.payment_method(),
    );

    validate_customer(&input)?;
    validate_length("status", &status.to_string(), MAX_STATUS_LEN)?;
    if !status.is_cancelled() {
        validate_items(&input.order_products)?;
    }

    // Whether this order occupies `input.table_id` once the switch is done.
    let mut holds_table = current.holds_table();
    if input.table_id != existing.table_id {
        tables::find_available(tx, input.table_id).await?;
        if holds_table {
            tables::release(tx, existing.table_id).await?;
        }
        tables::claim(tx, input.table_id).await?;
        holds_table = true;
    } else if !holds_table && !status.is_terminal() {
        // Reopening a closed order takes its table back.
        tables::find_available(tx, input.table_id).await?;
        tables::claim(tx, input.table_id).await?;
        holds_table = true;
    }

    let previous = tx.line_items(order_id).await?;
    if !current.is_cancelled() {
        for item in &previous {
            stock::release(tx, item.product_id, item.qty).await?;
        }
    }

    let (lines, total_amount, tax_percent) = match status {
        OrderStatus::Cancelled => {
            let lines = describe_line_items(tx, &previous).await?;
            (lines, existing.total_amount, existing.tax)
        }
        OrderStatus::InProcess
        | OrderStatus::Ready
        | OrderStatus::Completed
        | OrderStatus::Other(_) => {
            tx.delete_line_items(order_id).await?;
            let lines = place_line_items(tx, order_id, &input.order_products).await?;
            let total = tax.total_for(&lines);
            (lines, total, tax.percent().clone())
        }
    };

    if status.is_terminal() && holds_table {
        tables::release(tx, input.table_id).await?;
    }

    let order = tx
        .save_order(
            order_id,
            OrderChanges {
                table_id: input.table_id,
                customer_name: input.customer_name.trim().to_string(),
                status: status.to_string(),
                total_amount,
                tax: tax_percent,
                payment_method: input.payment_method().map(str::to_string),
                updated_at: Some(Utc::now()),
            },
        )
        .await?;

    Ok(order.into_view(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use futures::future::join_all;
    use std::str::FromStr;

    struct Fixture {
        store: Arc<MemoryStore>,
        workflow: Arc<OrderWorkflow<MemoryStore>>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let workflow = Arc::new(OrderWorkflow::new(store.clone(), TaxPolicy::default()));
            Self { store, workflow }
        }

        async fn qty(&self, product_id: i32) -> i32 {
            self.store.product(product_id).await.unwrap().qty
        }

        async fn booked(&self, table_id: i32) -> bool {
            self.store.table(table_id).await.unwrap().is_book
        }
    }

    fn input(table_id: i32, items: &[(i32, i32)]) -> OrderInput {
        OrderInput {
            table_id,
            customer_name: "Juned".to_string(),
            status: None,
            payment_method: None,
            order_products: items
                .iter()
                .map(|&(product_id, qty)| LineItemInput { product_id, qty })
                .collect(),
        }
    }

    fn with_status(mut input: OrderInput, status: &str) -> OrderInput {
        input.status = Some(status.to_string());
        input
    }

    #[tokio::test]
    async fn create_claims_table_deducts_stock_and_computes_total() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(100), 10).await;
        let tea = f.store.add_product("Teh", BigDecimal::from(50), 10).await;

        let order = f
            .workflow
            .create_order(input(table, &[(rice, 2), (tea, 1)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::InProcess);
        assert_eq!(order.tax, BigDecimal::from(12));
        assert_eq!(order.sub_total, BigDecimal::from(250));
        assert_eq!(order.total_amount, BigDecimal::from(280));
        assert_eq!(order.order_products.len(), 2);
        assert!(f.booked(table).await);
        assert_eq!(f.qty(rice).await, 8);
        assert_eq!(f.qty(tea).await, 9);

        let stored = f.workflow.get_order(order.id).await.unwrap();
        assert_eq!(stored.total_amount, BigDecimal::from(280));
    }

    #[tokio::test]
    async fn create_ignores_requested_status() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(10), 5).await;

        let order = f
            .workflow
            .create_order(with_status(input(table, &[(rice, 1)]), "completed"))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::InProcess);
    }

    #[tokio::test]
    async fn create_rejects_booked_or_missing_table() {
        let f = Fixture::new();
        let booked = f.store.add_table("Table 1", true).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(10), 5).await;

        let err = f
            .workflow
            .create_order(input(booked, &[(rice, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::TableAlreadyBooked(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = f
            .workflow
            .create_order(input(42, &[(rice, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.store.order_count().await, 0);
        assert_eq!(f.qty(rice).await, 5);
    }

    #[tokio::test]
    async fn create_rejects_empty_order_without_side_effects() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;

        let err = f.workflow.create_order(input(table, &[])).await.unwrap_err();
        assert!(matches!(err, OrderError::EmptyOrder));
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(!f.booked(table).await);
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn create_rejects_non_positive_quantity() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(10), 5).await;

        let err = f
            .workflow
            .create_order(input(table, &[(rice, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidQuantity { qty: 0, .. }));
        assert_eq!(f.qty(rice).await, 5);
    }

    #[tokio::test]
    async fn create_failure_midway_rolls_everything_back() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let first = f.store.add_product("Nasi", BigDecimal::from(10), 5).await;
        let second = f.store.add_product("Mie", BigDecimal::from(10), 0).await;
        let third = f.store.add_product("Teh", BigDecimal::from(10), 5).await;

        let err = f
            .workflow
            .create_order(input(table, &[(first, 2), (second, 1), (third, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::OutOfStock(id) if id == second));
        assert_eq!(f.qty(first).await, 5);
        assert_eq!(f.qty(third).await, 5);
        assert!(!f.booked(table).await);
        assert_eq!(f.store.order_count().await, 0);
        assert_eq!(f.store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn create_reports_insufficient_and_unknown_products() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(10), 2).await;

        let err = f
            .workflow
            .create_order(input(table, &[(rice, 3)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock { requested: 3, available: 2, .. }
        ));

        let err = f
            .workflow
            .create_order(input(table, &[(77, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(77)));
        assert!(!f.booked(table).await);
    }

    #[tokio::test]
    async fn update_replaces_line_items_and_recomputes_total() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(100), 10).await;
        let tea = f.store.add_product("Teh", BigDecimal::from(50), 10).await;

        let order = f
            .workflow
            .create_order(input(table, &[(rice, 2)]))
            .await
            .unwrap();

        let updated = f
            .workflow
            .update_order(order.id, with_status(input(table, &[(rice, 1), (tea, 2)]), "ready"))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Ready);
        assert_eq!(updated.order_products.len(), 2);
        assert_eq!(updated.total_amount, BigDecimal::from_str("224").unwrap());
        assert_eq!(f.qty(rice).await, 9);
        assert_eq!(f.qty(tea).await, 8);
        assert_eq!(f.store.line_item_count().await, 2);
        assert!(f.booked(table).await);
    }

    #[tokio::test]
    async fn update_with_payment_completes_and_releases_table() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(100), 10).await;

        let order = f
            .workflow
            .create_order(input(table, &[(rice, 2)]))
            .await
            .unwrap();

        let mut paid = input(table, &[(rice, 2)]);
        paid.payment_method = Some("Cash".to_string());
        let updated = f.workflow.update_order(order.id, paid).await.unwrap();

        assert_eq!(updated.status, OrderStatus::Completed);
        assert_eq!(updated.payment_method.as_deref(), Some("Cash"));
        assert!(!f.booked(table).await);
        assert_eq!(f.qty(rice).await, 8);
    }

    #[tokio::test]
    async fn cancellation_restores_stock_and_frees_table() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 5).await;

        let order = f
            .workflow
            .create_order(input(table, &[(product, 3)]))
            .await
            .unwrap();
        assert_eq!(f.qty(product).await, 2);

        let mut cancel = with_status(input(table, &[(product, 1)]), "cancelled");
        cancel.payment_method = Some("Cash".to_string());
        let cancelled = f.workflow.update_order(order.id, cancel).await.unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.qty(product).await, 5);
        assert!(!f.booked(table).await);
        // Line items stay as history and the total keeps its last value.
        assert_eq!(cancelled.order_products.len(), 1);
        assert_eq!(cancelled.order_products[0].qty, 3);
        assert_eq!(cancelled.total_amount, order.total_amount);
    }

    #[tokio::test]
    async fn updating_a_cancelled_order_does_not_restore_stock_twice() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 5).await;

        let order = f
            .workflow
            .create_order(input(table, &[(product, 3)]))
            .await
            .unwrap();
        f.workflow
            .update_order(order.id, with_status(input(table, &[]), "canceled"))
            .await
            .unwrap();
        f.workflow
            .update_order(order.id, with_status(input(table, &[]), "cancelled"))
            .await
            .unwrap();

        assert_eq!(f.qty(product).await, 5);
    }

    #[tokio::test]
    async fn reopening_a_completed_order_reclaims_its_table() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 5).await;

        let order = f
            .workflow
            .create_order(input(table, &[(product, 1)]))
            .await
            .unwrap();
        f.workflow
            .update_order(order.id, with_status(input(table, &[(product, 1)]), "completed"))
            .await
            .unwrap();
        assert!(!f.booked(table).await);

        f.workflow
            .update_order(order.id, with_status(input(table, &[(product, 2)]), "In Process"))
            .await
            .unwrap();
        assert!(f.booked(table).await);
        assert_eq!(f.qty(product).await, 3);
    }

    #[tokio::test]
    async fn completed_order_does_not_free_a_table_it_no_longer_holds() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 5).await;

        let first = f
            .workflow
            .create_order(input(table, &[(product, 1)]))
            .await
            .unwrap();
        f.workflow
            .update_order(first.id, with_status(input(table, &[(product, 1)]), "completed"))
            .await
            .unwrap();

        f.workflow
            .create_order(input(table, &[(product, 1)]))
            .await
            .unwrap();
        f.workflow
            .update_order(first.id, with_status(input(table, &[(product, 1)]), "completed"))
            .await
            .unwrap();

        assert!(f.booked(table).await);
    }

    #[tokio::test]
    async fn update_switches_table() {
        let f = Fixture::new();
        let a = f.store.add_table("Table A", false).await;
        let b = f.store.add_table("Table B", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 5).await;

        let order = f
            .workflow
            .create_order(input(a, &[(product, 1)]))
            .await
            .unwrap();
        let moved = f
            .workflow
            .update_order(order.id, input(b, &[(product, 1)]))
            .await
            .unwrap();

        assert_eq!(moved.table_id, b);
        assert!(!f.booked(a).await);
        assert!(f.booked(b).await);
        assert_eq!(f.qty(product).await, 4);
    }

    #[tokio::test]
    async fn failed_table_switch_keeps_old_table_claimed() {
        let f = Fixture::new();
        let a = f.store.add_table("Table A", false).await;
        let b = f.store.add_table("Table B", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 10).await;

        let order = f
            .workflow
            .create_order(input(a, &[(product, 1)]))
            .await
            .unwrap();
        f.workflow
            .create_order(input(b, &[(product, 1)]))
            .await
            .unwrap();

        let err = f
            .workflow
            .update_order(order.id, input(b, &[(product, 2)]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(f.booked(a).await);
        assert!(f.booked(b).await);
        assert_eq!(f.store.order_row(order.id).await.unwrap().table_id, a);
        assert_eq!(f.qty(product).await, 8);
    }

    #[tokio::test]
    async fn failed_update_rolls_back_stock_restore() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(10), 3).await;

        let order = f
            .workflow
            .create_order(input(table, &[(rice, 2)]))
            .await
            .unwrap();

        let err = f
            .workflow
            .update_order(order.id, input(table, &[(rice, 4)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock { available: 3, .. }));
        assert_eq!(f.qty(rice).await, 1);
        assert_eq!(f.workflow.get_order(order.id).await.unwrap().order_products[0].qty, 2);
    }

    #[tokio::test]
    async fn update_of_missing_order_is_not_found() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let err = f
            .workflow
            .update_order(5, input(table, &[(1, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(5)));
    }

    #[tokio::test]
    async fn delete_is_soft_and_only_succeeds_once() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 5).await;

        let order = f
            .workflow
            .create_order(input(table, &[(product, 2)]))
            .await
            .unwrap();

        f.workflow.delete_order(order.id).await.unwrap();
        let err = f.workflow.delete_order(order.id).await.unwrap_err();

        assert!(matches!(err, OrderError::OrderNotFound(_)));
        assert!(f.booked(table).await);
        assert_eq!(f.qty(product).await, 3);
        assert!(f.store.order_row(order.id).await.unwrap().deleted_at.is_some());
        assert!(matches!(
            f.workflow.get_order(order.id).await,
            Err(OrderError::OrderNotFound(_))
        ));
        assert!(matches!(
            f.workflow.update_order(order.id, input(table, &[(product, 1)])).await,
            Err(OrderError::OrderNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_never_oversell() {
        let f = Fixture::new();
        let product = f.store.add_product("Sate", BigDecimal::from(30), 10).await;
        let mut table_ids = Vec::new();
        for n in 0..8 {
            table_ids.push(f.store.add_table(&format!("Table {}", n), false).await);
        }

        let attempts = table_ids.into_iter().map(|table| {
            let workflow = f.workflow.clone();
            tokio::spawn(async move { workflow.create_order(input(table, &[(product, 3)])).await })
        });
        let results = join_all(attempts).await;

        let placed = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count() as i32;
        assert_eq!(placed, 3);
        assert_eq!(f.qty(product).await, 10 - placed * 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_never_double_book() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 100).await;

        let attempts = (0..6).map(|_| {
            let workflow = f.workflow.clone();
            tokio::spawn(async move { workflow.create_order(input(table, &[(product, 1)])).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.expect("task panicked"))
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::Conflict));
        assert_eq!(f.qty(product).await, 99);
    }

    #[tokio::test]
    async fn list_orders_filters_by_search_and_status() {
        let f = Fixture::new();
        let a = f.store.add_table("Table A", false).await;
        let b = f.store.add_table("Table B", false).await;
        let product = f.store.add_product("Sate", BigDecimal::from(30), 10).await;

        let first = f
            .workflow
            .create_order(input(a, &[(product, 1)]))
            .await
            .unwrap();
        let mut other = input(b, &[(product, 2)]);
        other.customer_name = "Diana".to_string();
        let second = f.workflow.create_order(other).await.unwrap();
        let mut ready = with_status(input(b, &[(product, 2)]), "ready");
        ready.customer_name = "Diana".to_string();
        f.workflow.update_order(second.id, ready).await.unwrap();

        let all = f.workflow.list_orders(OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_name = f
            .workflow
            .list_orders(OrderFilter {
                search: Some("jun".into()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, first.id);
        assert_eq!(by_name[0].sub_total, BigDecimal::from(30));

        let by_id = f
            .workflow
            .list_orders(OrderFilter {
                search: Some(first.id.to_string()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);

        let ready = f
            .workflow
            .list_orders(OrderFilter {
                search: None,
                status: Some("READY".into()),
            })
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, second.id);

        f.workflow.delete_order(first.id).await.unwrap();
        let remaining = f.workflow.list_orders(OrderFilter::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn overlong_text_is_rejected_as_invalid() {
        let f = Fixture::new();
        let table = f.store.add_table("Table 1", false).await;
        let rice = f.store.add_product("Nasi", BigDecimal::from(10), 5).await;

        let mut long_name = input(table, &[(rice, 1)]);
        long_name.customer_name = "x".repeat(MAX_CUSTOMER_NAME_LEN + 1);
        let err = f.workflow.create_order(long_name).await.unwrap_err();
        assert!(matches!(err, OrderError::FieldTooLong { field: "customer_name", .. }));
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(f.store.order_count().await, 0);
        assert!(!f.booked(table).await);

        let order = f
            .workflow
            .create_order(input(table, &[(rice, 1)]))
            .await
            .unwrap();
        let long_status = with_status(input(table, &[(rice, 1)]), &"w".repeat(MAX_STATUS_LEN + 1));
        let err = f.workflow.update_order(order.id, long_status).await.unwrap_err();
        assert!(matches!(err, OrderError::FieldTooLong { field: "status", .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(f.qty(rice).await, 4);

        let mut long_payment = input(table, &[(rice, 1)]);
        long_payment.payment_method = Some("p".repeat(MAX_PAYMENT_METHOD_LEN + 1));
        let err = f.workflow.update_order(order.id, long_payment).await.unwrap_err();
        assert!(matches!(err, OrderError::FieldTooLong { field: "payment_method", .. }));

        let exact = with_status(input(table, &[(rice, 1)]), &"w".repeat(MAX_STATUS_LEN));
        let updated = f.workflow.update_order(order.id, exact).await.unwrap();
        assert_eq!(updated.status.to_string().len(), MAX_STATUS_LEN);
    }
}
