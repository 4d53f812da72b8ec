use axum::{http::StatusCode, response::IntoResponse, Json};
use diesel_async::pooled_connection::PoolError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Internal,
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("table {0} does not exist")]
    TableNotFound(i32),
    #[error("table {0} is already booked")]
    TableAlreadyBooked(i32),
    #[error("order with id {0} does not exist")]
    OrderNotFound(i32),
    #[error("product with id {0} does not exist")]
    ProductNotFound(i32),
    #[error("product with id {0} is out of stock")]
    OutOfStock(i32),
    #[error("stock of product {product_id} is less than requested: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i32,
        requested: i32,
        available: i32,
    },
    #[error("order has no products")]
    EmptyOrder,
    #[error("quantity {qty} for product {product_id} must be positive")]
    InvalidQuantity { product_id: i32, qty: i32 },
    #[error("customer name is required")]
    MissingCustomerName,
    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::TableNotFound(_)
            | OrderError::OrderNotFound(_)
            | OrderError::ProductNotFound(_) => ErrorKind::NotFound,
            OrderError::TableAlreadyBooked(_)
            | OrderError::OutOfStock(_)
            | OrderError::InsufficientStock { .. } => ErrorKind::Conflict,
            OrderError::EmptyOrder
            | OrderError::InvalidQuantity { .. }
            | OrderError::MissingCustomerName
            | OrderError::FieldTooLong { .. } => ErrorKind::Invalid,
            OrderError::Database(_) | OrderError::Pool(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<bb8::RunError<PoolError>> for OrderError {
    fn from(e: bb8::RunError<PoolError>) -> Self {
        OrderError::Pool(e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for OrderError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error = match self.kind() {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "order request failed");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
