use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use shared::*;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: i32,
    pub table_id: i32,
    pub customer_name: String,
    pub status: String,
    pub total_amount: BigDecimal,
    pub tax: BigDecimal,
    pub payment_method: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct NewOrder {
    pub table_id: i32,
    pub customer_name: String,
    pub status: String,
    pub total_amount: BigDecimal,
    pub tax: BigDecimal,
    pub payment_method: Option<String>,
}

/// Scalar fields written back by an update. A `None` payment method keeps
/// the stored one.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::orders)]
pub struct OrderChanges {
    pub table_id: i32,
    pub customer_name: String,
    pub status: String,
    pub total_amount: BigDecimal,
    pub tax: BigDecimal,
    pub payment_method: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::order_products)]
pub struct OrderProduct {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub qty: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::order_products)]
pub struct NewOrderProduct {
    pub order_id: i32,
    pub product_id: i32,
    pub qty: i32,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::products)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: BigDecimal,
    pub qty: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct {
    pub name: String,
    pub price: BigDecimal,
    pub qty: i32,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::tables)]
pub struct DiningTable {
    pub id: i32,
    pub name: String,
    pub is_book: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::tables)]
pub struct NewDiningTable {
    pub name: String,
    pub is_book: bool,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::payments)]
pub struct Payment {
    pub id: i32,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::payments)]
pub struct NewPayment {
    pub name: String,
}

impl Product {
    pub fn line(&self, qty: i32) -> OrderLine {
        OrderLine {
            product_id: self.id,
            item: self.name.clone(),
            price: self.price.clone(),
            qty,
        }
    }
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::from(self.status.as_str())
    }

    pub fn into_view(self, lines: Vec<OrderLine>) -> OrderView {
        let status = self.status();
        OrderView {
            id: self.id,
            table_id: self.table_id,
            customer_name: self.customer_name,
            status,
            total_amount: self.total_amount,
            tax: self.tax,
            payment_method: self.payment_method,
            sub_total: sub_total(&lines),
            order_products: lines,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
