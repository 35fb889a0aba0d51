use chrono::Duration;
use log::*;
use shoppit_engine::{db_types::Transaction, events::EventProducers, CheckoutApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the pending-transaction expiry worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// A pending transaction means a shopper was handed off to a provider and never came back (or the provider never
/// called us back). After the configured timeout those are cancelled, so abandoned checkouts do not accumulate
/// and a very late provider confirmation cannot resurrect a cart the shopper has long since re-ordered.
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = CheckoutApi::new(db, producers);
        info!("🕰️ Pending-transaction expiry worker started (timeout: {} min)", timeout.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running pending-transaction expiry job");
            match api.expire_stale_transactions(timeout).await {
                Ok(expired) if expired.is_empty() => {},
                Ok(expired) => {
                    info!("🕰️ {} pending transactions expired", expired.len());
                    debug!("🕰️ Expired transactions: {}", transaction_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running pending-transaction expiry job: {e}");
                },
            }
        }
    })
}

fn transaction_list(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|t| format!("[{}] tx_ref: {} cart: {} provider: {}", t.id, t.tx_ref, t.cart_id, t.provider))
        .collect::<Vec<String>>()
        .join(", ")
}
