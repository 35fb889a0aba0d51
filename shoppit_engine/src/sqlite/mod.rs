//! SQLite backend for the Shoppit engine.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
