use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tax applied when nothing else is configured.
pub const DEFAULT_TAX_PERCENT: i32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: i32,
    pub qty: i32,
}

/// Desired shape of an order as sent by a caller. `tax` and `total_amount`
/// are never taken from the payload; the workflow engine computes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInput {
    pub table_id: i32,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub order_products: Vec<LineItemInput>,
}

impl OrderInput {
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Lifecycle of an order. Unknown labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    InProcess,
    Ready,
    Completed,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Completed and cancelled orders no longer occupy their table.
    pub fn is_terminal(&self) -> bool {
        match self {
            OrderStatus::Completed | OrderStatus::Cancelled => true,
            OrderStatus::InProcess | OrderStatus::Ready | OrderStatus::Other(_) => false,
        }
    }

    pub fn holds_table(&self) -> bool {
        !self.is_terminal()
    }

    /// Status an update ends up with: the requested one (or `current` when
    /// none was sent), promoted to `Completed` once a payment method is
    /// supplied, unless the order is being cancelled.
    pub fn resolve_update(
        requested: Option<&str>,
        current: &OrderStatus,
        payment_method: Option<&str>,
    ) -> OrderStatus {
        let status = requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(OrderStatus::from)
            .unwrap_or_else(|| current.clone());
        let paid = payment_method
            .map(str::trim)
            .is_some_and(|m| !m.is_empty());

        match status {
            OrderStatus::Cancelled => OrderStatus::Cancelled,
            _ if paid => OrderStatus::Completed,
            other => other,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "in process" | "in progress" => OrderStatus::InProcess,
            "ready" => OrderStatus::Ready,
            "completed" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        OrderStatus::from(value.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::InProcess => f.write_str("In Process"),
            OrderStatus::Ready => f.write_str("ready"),
            OrderStatus::Completed => f.write_str("completed"),
            OrderStatus::Cancelled => f.write_str("cancelled"),
            OrderStatus::Other(label) => f.write_str(label),
        }
    }
}

/// A line item together with the product data it was priced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i32,
    pub item: String,
    pub price: BigDecimal,
    pub qty: i32,
}

impl OrderLine {
    pub fn subtotal(&self) -> BigDecimal {
        self.price.clone() * BigDecimal::from(self.qty)
    }
}

pub fn sub_total(lines: &[OrderLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.subtotal())
}

/// `subtotal + subtotal * tax_percent / 100`, rounded half-up to cents.
pub fn total_with_tax(subtotal: &BigDecimal, tax_percent: &BigDecimal) -> BigDecimal {
    let tax = (subtotal * tax_percent) / BigDecimal::from(100);
    (subtotal.clone() + tax).with_scale_round(2, RoundingMode::HalfUp)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxPolicy {
    percent: BigDecimal,
}

impl TaxPolicy {
    pub fn new(percent: BigDecimal) -> Self {
        Self { percent }
    }

    pub fn percent(&self) -> &BigDecimal {
        &self.percent
    }

    pub fn total_for(&self, lines: &[OrderLine]) -> BigDecimal {
        total_with_tax(&sub_total(lines), &self.percent)
    }
}

impl FromStr for TaxPolicy {
    type Err = String;

    /// Parses a non-negative percentage such as `12` or `7.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percent = BigDecimal::from_str(s.trim())
            .map_err(|e| format!("invalid tax percentage {:?}: {}", s, e))?;
        if percent < BigDecimal::zero() {
            return Err(format!("tax percentage must not be negative, got {}", percent));
        }
        Ok(Self::new(percent))
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self::new(BigDecimal::from(DEFAULT_TAX_PERCENT))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i32,
    pub table_id: i32,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    pub tax: BigDecimal,
    pub payment_method: Option<String>,
    pub sub_total: BigDecimal,
    pub order_products: Vec<OrderLine>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
