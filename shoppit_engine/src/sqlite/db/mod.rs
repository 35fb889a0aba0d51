//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions. Everything is a plain function taking a
//! `&mut SqliteConnection`, so callers can run one against a pooled connection or compose several inside a single
//! atomic transaction by passing `&mut *tx`.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod carts;
pub mod customers;
pub mod products;
pub mod transactions;

const SQLITE_DB_URL: &str = "sqlite://data/shoppit.db";

pub fn db_url() -> String {
    let result = env::var("SHOP_DATABASE_URL").unwrap_or_else(|_| {
        info!("SHOP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
