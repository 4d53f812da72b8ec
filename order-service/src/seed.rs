use anyhow::Result;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::PgConnection;
use std::str::FromStr;
use tracing::info;

use crate::models::*;
use crate::schema::*;

pub fn demo_tables() -> Vec<NewDiningTable> {
    (1..=10)
        .map(|n| NewDiningTable {
            name: format!("Table {}", n),
            is_book: false,
        })
        .collect()
}

pub fn demo_products() -> Vec<NewProduct> {
    [
        ("Nasi Goreng", "25.00", 20),
        ("Mie Ayam", "18.50", 15),
        ("Sate Ayam", "30.00", 12),
        ("Es Teh", "5.00", 50),
        ("Kopi Susu", "12.00", 30),
        ("Pisang Goreng", "10.00", 8),
    ]
    .into_iter()
    .filter_map(|(name, price, qty)| {
        Some(NewProduct {
            name: name.to_string(),
            price: BigDecimal::from_str(price).ok()?,
            qty,
        })
    })
    .collect()
}

pub fn demo_payments() -> Vec<NewPayment> {
    ["Cash", "Credit Card", "Bank Transfer", "E-Wallet"]
        .into_iter()
        .map(|name| NewPayment {
            name: name.to_string(),
        })
        .collect()
}

/// Inserts the demo data unless the database already has tables.
pub fn run(conn: &mut PgConnection) -> Result<()> {
    let existing: i64 = tables::table.count().get_result(conn)?;
    if existing > 0 {
        info!("Skipping seed, {} tables already present", existing);
        return Ok(());
    }

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        diesel::insert_into(tables::table)
            .values(&demo_tables())
            .execute(conn)?;
        diesel::insert_into(products::table)
            .values(&demo_products())
            .execute(conn)?;
        diesel::insert_into(payments::table)
            .values(&demo_payments())
            .execute(conn)?;
        Ok(())
    })?;

    info!("Seeded demo tables, products and payment methods");
    Ok(())
}
