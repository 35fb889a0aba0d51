use chrono::Duration;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    api::transaction_objects::TransactionQueryFilter,
    db_types::{NewTransaction, Transaction, TransactionStatus, TxRef},
    traits::CheckoutError,
};

pub async fn insert_transaction(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, CheckoutError> {
    if fetch_transaction_by_ref(&tx.tx_ref, conn).await?.is_some() {
        return Err(CheckoutError::TransactionAlreadyExists(tx.tx_ref));
    }
    let transaction = insert(tx, TransactionStatus::Pending, None, conn).await?;
    debug!("🗃️ Transaction [{}] inserted with id {}", transaction.tx_ref, transaction.id);
    Ok(transaction)
}

async fn insert(
    tx: NewTransaction,
    status: TransactionStatus,
    provider_tx_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Transaction, CheckoutError> {
    let transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (tx_ref, cart_id, customer_id, provider, provider_tx_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(tx.tx_ref)
    .bind(tx.cart_id)
    .bind(tx.customer_id)
    .bind(tx.provider.to_string())
    .bind(provider_tx_id)
    .bind(tx.amount.value())
    .bind(tx.currency)
    .bind(status.to_string())
    .fetch_one(conn)
    .await?;
    Ok(transaction)
}

pub async fn fetch_transaction_by_ref(
    tx_ref: &TxRef,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE tx_ref = $1")
        .bind(tx_ref.as_str())
        .fetch_optional(conn)
        .await
}

/// Moves the transaction into `Completed` and records the provider's transaction id.
///
/// The status guard is part of the statement: only `Pending` or `Failed` rows are touched. Callers check the
/// state machine beforehand, but re-checking here means a racing duplicate confirmation inside its own database
/// transaction still cannot complete the same payment twice.
pub async fn complete_transaction(
    tx_ref: &TxRef,
    provider_tx_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, CheckoutError> {
    let result: Option<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'Completed', provider_tx_id = $1, updated_at = CURRENT_TIMESTAMP
            WHERE tx_ref = $2 AND status IN ('Pending', 'Failed')
            RETURNING *;
        "#,
    )
    .bind(provider_tx_id)
    .bind(tx_ref.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

pub async fn update_transaction_status(
    tx_ref: &TxRef,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Transaction, CheckoutError> {
    let result: Option<Transaction> = sqlx::query_as(
        "UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE tx_ref = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(tx_ref.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| CheckoutError::TransactionNotFound(tx_ref.clone()))
}

/// Inserts an already-completed transaction (the push-payment path).
pub async fn insert_completed(
    tx: NewTransaction,
    provider_tx_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Transaction, CheckoutError> {
    let transaction = insert(tx, TransactionStatus::Completed, Some(provider_tx_id), conn).await?;
    debug!("🗃️ Completed transaction [{}] inserted with id {}", transaction.tx_ref, transaction.id);
    Ok(transaction)
}

pub async fn expire_transactions(
    limit: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, CheckoutError> {
    let rows = sqlx::query_as(
        format!(
            "UPDATE transactions SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP WHERE status = 'Pending' \
             AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(updated_at)) > {} RETURNING *;",
            limit.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_transactions_for_customer(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE customer_id = $1 ORDER BY created_at DESC")
        .bind(customer_id)
        .fetch_all(conn)
        .await
}

/// Fetches transactions according to the criteria in the `TransactionQueryFilter`.
///
/// Results are ordered by `created_at` in ascending order.
pub async fn search_transactions(
    filter: TransactionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, CheckoutError> {
    let mut builder = QueryBuilder::new("SELECT * FROM transactions ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(tx_ref) = filter.tx_ref {
        where_clause.push("tx_ref = ");
        where_clause.push_bind_unseparated(tx_ref.to_string());
    }
    if let Some(customer_id) = filter.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(provider) = filter.provider {
        where_clause.push("provider = ");
        where_clause.push_bind_unseparated(provider.to_string());
    }
    if filter.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            filter.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = filter.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Transaction>();
    let transactions = query.fetch_all(conn).await?;
    Ok(transactions)
}
