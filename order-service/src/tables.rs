//! Table availability: a table is claimed by at most one open order.

use crate::error::OrderError;
use crate::store::OrderTx;

/// Locks the table and fails unless it exists and is free.
pub async fn find_available(tx: &mut dyn OrderTx, table_id: i32) -> Result<(), OrderError> {
    let table = tx
        .lock_table(table_id)
        .await?
        .ok_or(OrderError::TableNotFound(table_id))?;

    if table.is_book {
        return Err(OrderError::TableAlreadyBooked(table_id));
    }
    Ok(())
}

pub async fn claim(tx: &mut dyn OrderTx, table_id: i32) -> Result<(), OrderError> {
    if !tx.set_table_booked(table_id, true).await? {
        return Err(OrderError::TableAlreadyBooked(table_id));
    }
    Ok(())
}

pub async fn release(tx: &mut dyn OrderTx, table_id: i32) -> Result<(), OrderError> {
    tx.set_table_booked(table_id, false).await?;
    Ok(())
}
