//! `CheckoutApi` is the reconciliation heart of the engine. Every path by which a payment provider's answer can
//! reach the system (redirect callback, verification lookup, push webhook, admin action, expiry sweep) funnels
//! through here, and the same three guards apply to all of them:
//!
//! * **duplicates** are absorbed: re-delivering a confirmation for a completed transaction is a no-op that the
//!   HTTP layer reports as success, so providers stop retrying;
//! * **forgeries** are rejected: a confirmation must carry the exact amount and currency we recorded at checkout
//!   time, and must reference a transaction we actually created;
//! * **ordering** is enforced by the transaction state machine (see
//!   [`TransactionStatus::transition_to`][crate::db_types::TransactionStatus::transition_to]).

use std::fmt::Debug;

use chrono::Duration;
use log::*;
use shop_common::Money;
use uuid::Uuid;

use crate::{
    api::transaction_objects::{CheckoutDraft, PaymentConfirmation, TransactionQueryFilter},
    db_types::{NewTransaction, Provider, Transaction, TransactionStatus, Transition, TxRef},
    events::{EventProducers, TransactionCompletedEvent},
    traits::{CheckoutDatabase, CheckoutError},
};

pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B>
where B: CheckoutDatabase
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Open a checkout: price the cart, add the delivery fee, and record a `Pending` transaction with a fresh
    /// reference. The caller then hands the draft to a provider client to obtain the redirect URL.
    ///
    /// The cart must exist, be unpaid and be non-empty. The amount captured here is the amount every later
    /// confirmation will be checked against, regardless of any price changes in between.
    pub async fn begin_checkout(
        &self,
        cart_code: &str,
        provider: Provider,
        currency: &str,
        delivery_fee: Money,
        customer_id: Option<i64>,
    ) -> Result<CheckoutDraft, CheckoutError> {
        let cart = self
            .db
            .fetch_cart_by_code(cart_code)
            .await
            .map_err(CheckoutError::CartError)?
            .ok_or_else(|| CheckoutError::CartNotFound(cart_code.to_string()))?;
        if cart.paid {
            return Err(CheckoutError::CartAlreadyPaid(cart_code.to_string()));
        }
        let cart_total = self.db.cart_total(cart.id).await.map_err(CheckoutError::CartError)?;
        if !cart_total.is_positive() {
            return Err(CheckoutError::CartEmpty(cart_code.to_string()));
        }
        let amount = cart_total + delivery_fee;
        let tx_ref = TxRef::from(Uuid::new_v4().to_string());
        let mut new_tx = NewTransaction::new(tx_ref, cart.id, provider, amount, currency);
        if let Some(id) = customer_id {
            new_tx = new_tx.for_customer(id);
        }
        let transaction = self.db.insert_transaction(new_tx).await?;
        info!(
            "🔄️💰️ Checkout opened: transaction {} for cart {cart_code} via {provider} ({amount} {currency})",
            transaction.tx_ref
        );
        Ok(CheckoutDraft { transaction, cart_total, delivery_fee })
    }

    /// Reconcile a provider confirmation with the stored transaction.
    ///
    /// On a verified success the transaction completes and the cart is marked paid, atomically. On any amount or
    /// currency mismatch the transaction is marked `Failed` (where the state machine allows) and the caller gets
    /// [`CheckoutError::VerificationFailed`]. A forged or tampered callback can never complete a checkout.
    ///
    /// A duplicate confirmation surfaces as [`CheckoutError::TransactionModificationNoOp`]; callers should treat
    /// that as success.
    pub async fn confirm_transaction(
        &self,
        tx_ref: &TxRef,
        confirmation: PaymentConfirmation,
    ) -> Result<Transaction, CheckoutError> {
        let transaction = self
            .db
            .fetch_transaction_by_ref(tx_ref)
            .await?
            .ok_or_else(|| CheckoutError::TransactionNotFound(tx_ref.clone()))?;
        if !confirmation.succeeded {
            debug!("🔄️💰️ Provider reported a failed payment for {tx_ref}");
            return self.transition(&transaction, TransactionStatus::Failed).await;
        }
        match transaction.status.transition_to(TransactionStatus::Completed) {
            Transition::NoOp => {
                info!("🔄️💰️ Transaction {tx_ref} is already completed. Ignoring duplicate confirmation.");
                return Err(CheckoutError::TransactionModificationNoOp);
            },
            Transition::Forbidden => {
                warn!("🔄️💰️ Confirmation for {tx_ref} arrived while the transaction is {}", transaction.status);
                return Err(CheckoutError::TransactionModificationForbidden {
                    from: transaction.status,
                    to: TransactionStatus::Completed,
                });
            },
            Transition::Allowed => {},
        }
        if let Err(reason) = verify_against(&transaction, &confirmation) {
            warn!("🔄️💰️ Verification failed for {tx_ref}: {reason}");
            // Best effort: park the transaction in Failed so the mismatch is visible to admins.
            if transaction.status.transition_to(TransactionStatus::Failed) == Transition::Allowed {
                let _ = self.db.update_transaction_status(tx_ref, TransactionStatus::Failed).await;
            }
            return Err(CheckoutError::VerificationFailed(reason));
        }
        let transaction = self.db.complete_transaction(tx_ref, &confirmation.provider_tx_id).await?;
        info!("🔄️💰️ Transaction {tx_ref} completed. Cart {} is paid.", transaction.cart_id);
        self.call_transaction_completed_hook(&transaction).await;
        Ok(transaction)
    }

    /// Reconcile a push payment (Wave) that references a cart code rather than one of our transaction refs.
    ///
    /// There is no pending transaction to match, so idempotency hangs off the cart and a deterministic
    /// reference: a replayed webhook finds the cart already paid (or the derived `tx_ref` already present) and
    /// becomes a no-op. Amount checking is against the cart total plus delivery fee, the same figure a pull
    /// checkout would have captured.
    pub async fn reconcile_push_payment(
        &self,
        reference: &str,
        provider: Provider,
        currency: &str,
        delivery_fee: Money,
        confirmation: PaymentConfirmation,
    ) -> Result<Transaction, CheckoutError> {
        if !confirmation.succeeded {
            return Err(CheckoutError::VerificationFailed(format!(
                "{provider} did not report a completed payment for reference {reference}"
            )));
        }
        let cart = self
            .db
            .fetch_cart_by_code(reference)
            .await
            .map_err(CheckoutError::CartError)?
            .ok_or_else(|| CheckoutError::CartNotFound(reference.to_string()))?;
        if cart.paid {
            info!("🔄️📱️ Cart {reference} is already paid. Ignoring duplicate {provider} notification.");
            return Err(CheckoutError::TransactionModificationNoOp);
        }
        let cart_total = self.db.cart_total(cart.id).await.map_err(CheckoutError::CartError)?;
        if !cart_total.is_positive() {
            return Err(CheckoutError::CartEmpty(reference.to_string()));
        }
        let expected = cart_total + delivery_fee;
        if confirmation.amount != expected {
            let reason = format!(
                "amount mismatch for cart {reference}: expected {expected}, provider reported {}",
                confirmation.amount
            );
            warn!("🔄️📱️ {reason}");
            return Err(CheckoutError::VerificationFailed(reason));
        }
        if !confirmation.currency.eq_ignore_ascii_case(currency) {
            let reason = format!(
                "currency mismatch for cart {reference}: expected {currency}, provider reported {}",
                confirmation.currency
            );
            warn!("🔄️📱️ {reason}");
            return Err(CheckoutError::VerificationFailed(reason));
        }
        let tx_ref = TxRef::from(format!("{}-{reference}", provider.to_string().to_ascii_lowercase()));
        let mut new_tx = NewTransaction::new(tx_ref, cart.id, provider, expected, currency);
        if let Some(id) = cart.customer_id {
            new_tx = new_tx.for_customer(id);
        }
        let transaction = self.db.insert_completed_transaction(new_tx, &confirmation.provider_tx_id).await?;
        info!("🔄️📱️ Push payment reconciled for cart {reference}: transaction {}", transaction.tx_ref);
        self.call_transaction_completed_hook(&transaction).await;
        Ok(transaction)
    }

    /// Mark a transaction as failed (shopper bailed at the provider, or the provider said no).
    pub async fn fail_transaction(&self, tx_ref: &TxRef, reason: &str) -> Result<Transaction, CheckoutError> {
        info!("🔄️💰️ Marking transaction {tx_ref} as failed: {reason}");
        let transaction = self
            .db
            .fetch_transaction_by_ref(tx_ref)
            .await?
            .ok_or_else(|| CheckoutError::TransactionNotFound(tx_ref.clone()))?;
        self.transition(&transaction, TransactionStatus::Failed).await
    }

    /// Cancel a transaction (shopper used the provider's cancel link, or an admin withdrew it).
    pub async fn cancel_transaction(&self, tx_ref: &TxRef, reason: &str) -> Result<Transaction, CheckoutError> {
        info!("🔄️💰️ Cancelling transaction {tx_ref}: {reason}");
        let transaction = self
            .db
            .fetch_transaction_by_ref(tx_ref)
            .await?
            .ok_or_else(|| CheckoutError::TransactionNotFound(tx_ref.clone()))?;
        self.transition(&transaction, TransactionStatus::Cancelled).await
    }

    /// Cancel every pending transaction that has been sitting untouched for longer than `timeout`.
    /// Driven by the server's expiry worker.
    pub async fn expire_stale_transactions(&self, timeout: Duration) -> Result<Vec<Transaction>, CheckoutError> {
        self.db.expire_transactions_older_than(timeout).await
    }

    pub async fn transaction_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, CheckoutError> {
        self.db.fetch_transaction_by_ref(tx_ref).await
    }

    pub async fn search_transactions(
        &self,
        filter: TransactionQueryFilter,
    ) -> Result<Vec<Transaction>, CheckoutError> {
        self.db.search_transactions(filter).await
    }

    async fn transition(
        &self,
        transaction: &Transaction,
        new_status: TransactionStatus,
    ) -> Result<Transaction, CheckoutError> {
        match transaction.status.transition_to(new_status) {
            Transition::NoOp => Err(CheckoutError::TransactionModificationNoOp),
            Transition::Forbidden => Err(CheckoutError::TransactionModificationForbidden {
                from: transaction.status,
                to: new_status,
            }),
            Transition::Allowed => self.db.update_transaction_status(&transaction.tx_ref, new_status).await,
        }
    }

    async fn call_transaction_completed_hook(&self, transaction: &Transaction) {
        for producer in &self.producers.transaction_completed_producer {
            debug!("🔄️💰️ Notifying transaction-completed subscribers");
            producer.publish_event(TransactionCompletedEvent::new(transaction.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn verify_against(transaction: &Transaction, confirmation: &PaymentConfirmation) -> Result<(), String> {
    if confirmation.amount != transaction.amount {
        return Err(format!(
            "amount mismatch: transaction {} was opened for {}, provider reported {}",
            transaction.tx_ref, transaction.amount, confirmation.amount
        ));
    }
    if !confirmation.currency.eq_ignore_ascii_case(&transaction.currency) {
        return Err(format!(
            "currency mismatch: transaction {} was opened in {}, provider reported {}",
            transaction.tx_ref, transaction.currency, confirmation.currency
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn transaction(status: TransactionStatus) -> Transaction {
        Transaction {
            id: 1,
            tx_ref: TxRef::from("ref-1".to_string()),
            cart_id: 1,
            customer_id: Some(1),
            provider: Provider::Flutterwave,
            provider_tx_id: None,
            amount: Money::from(7000),
            currency: "XOF".to_string(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn confirmation(amount: i64, currency: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            provider_tx_id: "912".to_string(),
            amount: Money::from(amount),
            currency: currency.to_string(),
            succeeded: true,
        }
    }

    #[test]
    fn verification_accepts_exact_match_only() {
        let tx = transaction(TransactionStatus::Pending);
        assert!(verify_against(&tx, &confirmation(7000, "XOF")).is_ok());
        assert!(verify_against(&tx, &confirmation(7000, "xof")).is_ok());
        assert!(verify_against(&tx, &confirmation(6999, "XOF")).is_err());
        assert!(verify_against(&tx, &confirmation(7001, "XOF")).is_err());
        assert!(verify_against(&tx, &confirmation(7000, "USD")).is_err());
    }
}
