//! `SqliteDatabase` is the concrete SQLite backend for the Shoppit engine.
//!
//! It owns the connection pool and implements every trait in the [`traits`][crate::traits] module. Multi-step
//! operations with atomicity requirements (completing a payment, reconciling a push payment) run inside a single
//! database transaction here; everything else borrows a pooled connection and delegates to the function modules
//! in [`db`][super::db].

use std::fmt::Debug;

use chrono::Duration;
use log::*;
use shop_common::Money;
use sqlx::SqlitePool;

use super::db::{carts, customers, db_url, new_pool, products, transactions};
use crate::{
    api::{
        cart_objects::{CartDetail, CartSummary},
        transaction_objects::TransactionQueryFilter,
        AccountApiError,
        AuthApiError,
        CartApiError,
        CatalogApiError,
    },
    db_types::{
        Cart,
        CartItem,
        Customer,
        CustomerProfileUpdate,
        NewCustomer,
        NewProduct,
        NewTransaction,
        Product,
        Role,
        Roles,
        Transaction,
        TransactionStatus,
        TxRef,
    },
    traits::{
        AccountManagement,
        AuthManagement,
        CartManagement,
        CatalogManagement,
        CheckoutDatabase,
        CheckoutError,
        ProductUpdate,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database instance using the `SHOP_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_products(&self) -> Result<Vec<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_products(&mut conn).await
    }

    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product_by_slug(slug, &mut conn).await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn update_product(&self, slug: &str, update: ProductUpdate) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::update_product(slug, update, &mut conn).await
    }
}

impl CartManagement for SqliteDatabase {
    async fn add_item_to_cart(&self, cart_code: &str, product_id: i64) -> Result<(CartItem, bool), CartApiError> {
        let mut tx = self.pool.begin().await?;
        let result = carts::add_item(cart_code, product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn item_in_cart(&self, cart_code: &str, product_id: i64) -> Result<bool, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::item_in_cart(cart_code, product_id, &mut conn).await
    }

    async fn fetch_cart_by_code(&self, cart_code: &str) -> Result<Option<Cart>, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart_by_code(cart_code, &mut conn).await
    }

    async fn fetch_cart_summary(&self, cart_code: &str) -> Result<Option<CartSummary>, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart_summary(cart_code, &mut conn).await
    }

    async fn fetch_cart_detail(&self, cart_code: &str) -> Result<Option<CartDetail>, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart_detail(cart_code, &mut conn).await
    }

    async fn update_item_quantity(&self, item_id: i64, quantity: i64) -> Result<CartItem, CartApiError> {
        if quantity < 1 {
            return Err(CartApiError::InvalidQuantity(quantity));
        }
        let mut conn = self.pool.acquire().await?;
        carts::update_item_quantity(item_id, quantity, &mut conn).await
    }

    async fn remove_cart_item(&self, item_id: i64) -> Result<(), CartApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::remove_cart_item(item_id, &mut conn).await
    }

    async fn cart_total(&self, cart_id: i64) -> Result<Money, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::cart_total(cart_id, &mut conn).await
    }
}

impl AccountManagement for SqliteDatabase {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let customer = customers::insert_customer(customer, &mut tx).await?;
        tx.commit().await?;
        Ok(customer)
    }

    async fn fetch_customer_by_id(&self, id: i64) -> Result<Option<Customer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_customer_by_id(id, &mut conn).await
    }

    async fn fetch_customer_by_username(&self, username: &str) -> Result<Option<Customer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_customer_by_username(username, &mut conn).await
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Customer, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::verify_credentials(username, password, &mut conn).await
    }

    async fn update_customer_profile(
        &self,
        id: i64,
        update: CustomerProfileUpdate,
    ) -> Result<Customer, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::update_profile(id, update, &mut conn).await
    }

    async fn fetch_transactions_for_customer(&self, customer_id: i64) -> Result<Vec<Transaction>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_transactions_for_customer(customer_id, &mut conn).await?;
        Ok(result)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn fetch_roles_for_customer(&self, customer_id: i64) -> Result<Roles, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_roles(customer_id, &mut conn).await
    }

    async fn check_customer_has_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::check_has_roles(customer_id, roles, &mut conn).await
    }

    async fn assign_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::grant_roles(customer_id, roles, &mut conn).await
    }

    async fn remove_roles(&self, customer_id: i64, roles: &[Role]) -> Result<u64, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::revoke_roles(customer_id, roles, &mut conn).await
    }
}

impl CheckoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, CheckoutError> {
        let mut db_tx = self.pool.begin().await?;
        let transaction = transactions::insert_transaction(tx, &mut db_tx).await?;
        db_tx.commit().await?;
        Ok(transaction)
    }

    async fn fetch_transaction_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_transaction_by_ref(tx_ref, &mut conn).await?;
        Ok(result)
    }

    async fn complete_transaction(
        &self,
        tx_ref: &TxRef,
        provider_tx_id: &str,
    ) -> Result<Transaction, CheckoutError> {
        let mut db_tx = self.pool.begin().await?;
        let updated = transactions::complete_transaction(tx_ref, provider_tx_id, &mut db_tx).await?;
        let transaction = match updated {
            Some(t) => t,
            None => {
                // The guarded UPDATE touched nothing: either the ref is unknown, or the status already moved.
                let existing = transactions::fetch_transaction_by_ref(tx_ref, &mut db_tx).await?;
                db_tx.rollback().await?;
                return match existing {
                    None => Err(CheckoutError::TransactionNotFound(tx_ref.clone())),
                    Some(t) if t.status == TransactionStatus::Completed => {
                        Err(CheckoutError::TransactionModificationNoOp)
                    },
                    Some(t) => Err(CheckoutError::TransactionModificationForbidden {
                        from: t.status,
                        to: TransactionStatus::Completed,
                    }),
                };
            },
        };
        carts::mark_cart_paid(transaction.cart_id, transaction.customer_id, &mut db_tx).await?;
        db_tx.commit().await?;
        debug!("🗃️ Transaction [{}] completed and cart {} marked paid", transaction.tx_ref, transaction.cart_id);
        Ok(transaction)
    }

    async fn update_transaction_status(
        &self,
        tx_ref: &TxRef,
        status: TransactionStatus,
    ) -> Result<Transaction, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        transactions::update_transaction_status(tx_ref, status, &mut conn).await
    }

    async fn insert_completed_transaction(
        &self,
        tx: NewTransaction,
        provider_tx_id: &str,
    ) -> Result<Transaction, CheckoutError> {
        let mut db_tx = self.pool.begin().await?;
        if transactions::fetch_transaction_by_ref(&tx.tx_ref, &mut db_tx).await?.is_some() {
            db_tx.rollback().await?;
            return Err(CheckoutError::TransactionModificationNoOp);
        }
        let cart = carts::fetch_cart_by_id(tx.cart_id, &mut db_tx).await?;
        match cart {
            None => {
                db_tx.rollback().await?;
                return Err(CheckoutError::DatabaseError(format!("cart {} vanished", tx.cart_id)));
            },
            Some(cart) if cart.paid => {
                db_tx.rollback().await?;
                return Err(CheckoutError::TransactionModificationNoOp);
            },
            Some(_) => {},
        }
        let transaction = transactions::insert_completed(tx, provider_tx_id, &mut db_tx).await?;
        carts::mark_cart_paid(transaction.cart_id, transaction.customer_id, &mut db_tx).await?;
        db_tx.commit().await?;
        debug!(
            "🗃️ Push payment stored as transaction [{}]; cart {} marked paid",
            transaction.tx_ref, transaction.cart_id
        );
        Ok(transaction)
    }

    async fn expire_transactions_older_than(&self, limit: Duration) -> Result<Vec<Transaction>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        transactions::expire_transactions(limit, &mut conn).await
    }

    async fn search_transactions(
        &self,
        filter: TransactionQueryFilter,
    ) -> Result<Vec<Transaction>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        transactions::search_transactions(filter, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), CheckoutError> {
        self.pool.close().await;
        Ok(())
    }
}
