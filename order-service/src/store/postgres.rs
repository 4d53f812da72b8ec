use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use futures::future::BoxFuture;
use shared::*;
use std::collections::HashMap;

use super::{OrderFilter, OrderStore, OrderTx};
use crate::error::OrderError;
use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// Postgres-backed store. Rows read for a decision inside a transaction are
/// taken with `FOR UPDATE`, and the writes that guard an invariant are
/// conditional updates whose affected-row count is checked.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderTx for AsyncPgConnection {
    async fn lock_table(&mut self, table_id: i32) -> Result<Option<DiningTable>, OrderError> {
        let table = tables::table
            .find(table_id)
            .filter(tables::deleted_at.is_null())
            .for_update()
            .get_result::<DiningTable>(self)
            .await
            .optional()?;
        Ok(table)
    }

    async fn set_table_booked(&mut self, table_id: i32, booked: bool) -> Result<bool, OrderError> {
        let rows = diesel::update(
            tables::table
                .filter(tables::id.eq(table_id))
                .filter(tables::is_book.eq(!booked))
                .filter(tables::deleted_at.is_null()),
        )
        .set((
            tables::is_book.eq(booked),
            tables::updated_at.eq(Some(Utc::now())),
        ))
        .execute(self)
        .await?;
        Ok(rows == 1)
    }

    async fn lock_product(&mut self, product_id: i32) -> Result<Option<Product>, OrderError> {
        let product = products::table
            .find(product_id)
            .filter(products::deleted_at.is_null())
            .for_update()
            .get_result::<Product>(self)
            .await
            .optional()?;
        Ok(product)
    }

    async fn find_product(&mut self, product_id: i32) -> Result<Option<Product>, OrderError> {
        let product = products::table
            .find(product_id)
            .get_result::<Product>(self)
            .await
            .optional()?;
        Ok(product)
    }

    async fn decrement_stock(&mut self, product_id: i32, qty: i32) -> Result<bool, OrderError> {
        let rows = diesel::update(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::qty.ge(qty)),
        )
        .set((
            products::qty.eq(products::qty - qty),
            products::updated_at.eq(Some(Utc::now())),
        ))
        .execute(self)
        .await?;
        Ok(rows == 1)
    }

    async fn increment_stock(&mut self, product_id: i32, qty: i32) -> Result<bool, OrderError> {
        let rows = diesel::update(products::table.filter(products::id.eq(product_id)))
            .set((
                products::qty.eq(products::qty + qty),
                products::updated_at.eq(Some(Utc::now())),
            ))
            .execute(self)
            .await?;
        Ok(rows == 1)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, OrderError> {
        let order = diesel::insert_into(orders::table)
            .values(&order)
            .get_result::<Order>(self)
            .await?;
        Ok(order)
    }

    async fn lock_order(&mut self, order_id: i32) -> Result<Option<Order>, OrderError> {
        let order = orders::table
            .find(order_id)
            .filter(orders::deleted_at.is_null())
            .for_update()
            .get_result::<Order>(self)
            .await
            .optional()?;
        Ok(order)
    }

    async fn save_order(&mut self, order_id: i32, changes: OrderChanges) -> Result<Order, OrderError> {
        let order = diesel::update(orders::table.find(order_id))
            .set(&changes)
            .get_result::<Order>(self)
            .await?;
        Ok(order)
    }

    async fn soft_delete_order(&mut self, order_id: i32) -> Result<bool, OrderError> {
        let rows = diesel::update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::deleted_at.is_null()),
        )
        .set(orders::deleted_at.eq(Some(Utc::now())))
        .execute(self)
        .await?;
        Ok(rows == 1)
    }

    async fn line_items(&mut self, order_id: i32) -> Result<Vec<OrderProduct>, OrderError> {
        let items = order_products::table
            .filter(order_products::order_id.eq(order_id))
            .order(order_products::id.asc())
            .load::<OrderProduct>(self)
            .await?;
        Ok(items)
    }

    async fn delete_line_items(&mut self, order_id: i32) -> Result<usize, OrderError> {
        let rows = diesel::delete(order_products::table.filter(order_products::order_id.eq(order_id)))
            .execute(self)
            .await?;
        Ok(rows)
    }

    async fn insert_line_item(&mut self, item: NewOrderProduct) -> Result<OrderProduct, OrderError> {
        let item = diesel::insert_into(order_products::table)
            .values(&item)
            .get_result::<OrderProduct>(self)
            .await?;
        Ok(item)
    }
}

async fn load_lines(
    conn: &mut AsyncPgConnection,
    order_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<OrderLine>>, OrderError> {
    let rows = order_products::table
        .inner_join(products::table)
        .filter(order_products::order_id.eq_any(order_ids))
        .order(order_products::id.asc())
        .select((
            order_products::order_id,
            order_products::product_id,
            products::name,
            products::price,
            order_products::qty,
        ))
        .load::<(i32, i32, String, BigDecimal, i32)>(conn)
        .await?;

    let mut lines: HashMap<i32, Vec<OrderLine>> = HashMap::new();
    for (order_id, product_id, item, price, qty) in rows {
        lines.entry(order_id).or_default().push(OrderLine {
            product_id,
            item,
            price,
            qty,
        });
    }
    Ok(lines)
}

#[async_trait]
impl OrderStore for PgStore {
    async fn transaction<T, F>(&self, work: F) -> Result<T, OrderError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn OrderTx) -> BoxFuture<'t, Result<T, OrderError>>
            + Send
            + 'static,
    {
        let mut pooled = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<T, OrderError, _>(|conn| Box::pin(async move { work(conn).await }))
            .await
    }

    async fn get_order(&self, order_id: i32) -> Result<OrderView, OrderError> {
        let mut conn = self.pool.get().await?;

        let order = orders::table
            .find(order_id)
            .filter(orders::deleted_at.is_null())
            .first::<Order>(&mut conn)
            .await
            .optional()?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let mut lines = load_lines(&mut conn, vec![order_id]).await?;
        let lines = lines.remove(&order_id).unwrap_or_default();
        Ok(order.into_view(lines))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderView>, OrderError> {
        let mut conn = self.pool.get().await?;

        let mut query = orders::table
            .filter(orders::deleted_at.is_null())
            .order(orders::id.asc())
            .into_boxed();

        if let Some(search) = filter.search() {
            let pattern = format!("%{}%", search);
            query = match search.parse::<i32>() {
                Ok(id) => query.filter(orders::id.eq(id).or(orders::customer_name.ilike(pattern))),
                Err(_) => query.filter(orders::customer_name.ilike(pattern)),
            };
        }

        if let Some(status) = filter.status() {
            query = query.filter(orders::status.ilike(format!("%{}%", status)));
        }

        let orders = query.load::<Order>(&mut conn).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids = orders.iter().map(|order| order.id).collect();
        let mut lines = load_lines(&mut conn, ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let order_lines = lines.remove(&order.id).unwrap_or_default();
                order.into_view(order_lines)
            })
            .collect())
    }

    async fn list_tables(&self) -> Result<Vec<DiningTable>, OrderError> {
        let mut conn = self.pool.get().await?;

        let tables = tables::table
            .filter(tables::deleted_at.is_null())
            .order(tables::id.asc())
            .load::<DiningTable>(&mut conn)
            .await?;
        Ok(tables)
    }

    async fn list_payments(&self) -> Result<Vec<Payment>, OrderError> {
        let mut conn = self.pool.get().await?;

        let payments = payments::table
            .filter(payments::deleted_at.is_null())
            .order(payments::id.asc())
            .load::<Payment>(&mut conn)
            .await?;
        Ok(payments)
    }
}
