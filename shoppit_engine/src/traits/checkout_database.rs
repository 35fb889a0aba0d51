use chrono::Duration;
use thiserror::Error;

use crate::{
    api::{transaction_objects::TransactionQueryFilter, CartApiError},
    db_types::{NewTransaction, Transaction, TransactionStatus, TxRef},
    traits::CartManagement,
};

/// The highest-level storage contract of the engine: everything the checkout and reconciliation flows need,
/// with the atomicity guarantees they depend on.
///
/// The two completion methods are the crux. Both must update the transaction *and* mark the cart paid inside a
/// single database transaction. A confirmed payment with an unpaid cart (or the reverse) must be impossible,
/// no matter where the process dies.
#[allow(async_fn_in_trait)]
pub trait CheckoutDatabase: Clone + CartManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores a new pending transaction. `tx_ref` is unique; inserting a duplicate surfaces
    /// [`CheckoutError::TransactionAlreadyExists`].
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, CheckoutError>;

    async fn fetch_transaction_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, CheckoutError>;

    /// Atomically: transaction status -> `Completed`, `provider_tx_id` recorded, cart marked paid, and, if the
    /// cart was anonymous, the cart adopts the transaction's customer.
    ///
    /// The status guard is re-checked inside the database transaction: only `Pending` or `Failed` transactions
    /// can complete. An already-`Completed` transaction surfaces as
    /// [`CheckoutError::TransactionModificationNoOp`] so that callers can answer webhook retries with success.
    async fn complete_transaction(&self, tx_ref: &TxRef, provider_tx_id: &str)
        -> Result<Transaction, CheckoutError>;

    /// Sets the transaction status and bumps `updated_at`. Callers run the state machine first; this method
    /// does not re-check it.
    async fn update_transaction_status(
        &self,
        tx_ref: &TxRef,
        status: TransactionStatus,
    ) -> Result<Transaction, CheckoutError>;

    /// The push-payment path (Wave): there is no pending transaction to complete, so insert an
    /// already-`Completed` transaction and mark the cart paid in one atomic step.
    /// Idempotent on `tx_ref`: a replayed webhook surfaces [`CheckoutError::TransactionModificationNoOp`].
    async fn insert_completed_transaction(
        &self,
        tx: NewTransaction,
        provider_tx_id: &str,
    ) -> Result<Transaction, CheckoutError>;

    /// Cancels every `Pending` transaction whose `updated_at` is older than `limit`, returning the affected set.
    async fn expire_transactions_older_than(&self, limit: Duration) -> Result<Vec<Transaction>, CheckoutError>;

    /// Admin search across all transactions.
    async fn search_transactions(&self, filter: TransactionQueryFilter)
        -> Result<Vec<Transaction>, CheckoutError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), CheckoutError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    CartError(#[from] CartApiError),
    #[error("Cannot insert transaction, since it already exists with reference {0}")]
    TransactionAlreadyExists(TxRef),
    #[error("No transaction exists with reference {0}")]
    TransactionNotFound(TxRef),
    #[error("No cart exists with code {0}")]
    CartNotFound(String),
    #[error("The cart {0} has already been paid")]
    CartAlreadyPaid(String),
    #[error("The cart {0} is empty")]
    CartEmpty(String),
    #[error("The requested transaction change would result in a no-op.")]
    TransactionModificationNoOp,
    #[error("A transaction cannot move from {from} to {to}")]
    TransactionModificationForbidden { from: TransactionStatus, to: TransactionStatus },
    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }
}
