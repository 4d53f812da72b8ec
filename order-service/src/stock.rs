//! Stock ledger: per-product quantity on hand, only moved inside an order
//! transaction.

use tracing::warn;

use crate::error::OrderError;
use crate::models::Product;
use crate::store::OrderTx;

/// Takes `qty` units of a product. The product row is locked first so the
/// availability check and the guarded decrement see the same quantity.
pub async fn reserve(tx: &mut dyn OrderTx, product_id: i32, qty: i32) -> Result<Product, OrderError> {
    let product = tx
        .lock_product(product_id)
        .await?
        .ok_or(OrderError::ProductNotFound(product_id))?;

    if product.qty <= 0 {
        return Err(OrderError::OutOfStock(product_id));
    }

    if product.qty < qty {
        return Err(OrderError::InsufficientStock {
            product_id,
            requested: qty,
            available: product.qty,
        });
    }

    if !tx.decrement_stock(product_id, qty).await? {
        return Err(OrderError::InsufficientStock {
            product_id,
            requested: qty,
            available: product.qty,
        });
    }

    Ok(product)
}

/// Gives `qty` units back to a product.
pub async fn release(tx: &mut dyn OrderTx, product_id: i32, qty: i32) -> Result<(), OrderError> {
    if !tx.increment_stock(product_id, qty).await? {
        warn!("Stock for product {} not restored, product row is gone", product_id);
    }
    Ok(())
}
