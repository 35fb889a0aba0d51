//! Shoppit Engine
//!
//! The storage and domain engine behind the Shoppit e-commerce backend. The engine owns the product catalogue,
//! shopping carts, customer accounts, and, most importantly, the checkout transactions and the reconciliation
//! rules that decide when a provider's payment confirmation is allowed to mark a cart as paid.
//!
//! The crate is split into three layers:
//! 1. Database backends ([`mod@sqlite`]). SQLite is the default; the traits are written so that a Postgres
//!    backend can slot in behind a feature flag. You should never need to touch the database modules directly;
//!    go through the public APIs instead.
//! 2. The trait seams ([`mod@traits`]) a backend must implement.
//! 3. The public APIs ([`mod@api`]): [`CatalogApi`], [`CartApi`], [`AccountApi`], [`AuthApi`] and the
//!    reconciliation heart, [`CheckoutApi`].
//!
//! The engine also emits events (a transaction completed, a customer registered) through a small async hook
//! system ([`mod@events`]), so the server can bolt on side effects (welcome emails, notifications) without the
//! engine knowing about them.

pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{
    accounts_api::AccountApi,
    auth_api::AuthApi,
    cart_api::CartApi,
    cart_objects,
    catalog_api::CatalogApi,
    checkout_api::CheckoutApi,
    errors::{AccountApiError, AuthApiError, CartApiError, CatalogApiError},
    transaction_objects,
};
pub use traits::CheckoutError;
