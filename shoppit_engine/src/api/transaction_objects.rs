use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::db_types::{Provider, Transaction, TransactionStatus, TxRef};

/// Admin search criteria for transactions. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionQueryFilter {
    pub tx_ref: Option<TxRef>,
    pub customer_id: Option<i64>,
    pub provider: Option<Provider>,
    pub status: Option<Vec<TransactionStatus>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TransactionQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tx_ref.is_none()
            && self.customer_id.is_none()
            && self.provider.is_none()
            && self.status.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }
}

impl Display for TransactionQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(tx_ref) = &self.tx_ref {
            write!(f, "tx_ref: {tx_ref}. ")?;
        }
        if let Some(id) = self.customer_id {
            write!(f, "customer: {id}. ")?;
        }
        if let Some(p) = self.provider {
            write!(f, "provider: {p}. ")?;
        }
        if let Some(statuses) = &self.status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("|");
            write!(f, "status: {s}. ")?;
        }
        if let Some(since) = self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

/// What `begin_checkout` hands back to the HTTP layer: the stored transaction plus the amount breakdown the
/// storefront displays while redirecting.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutDraft {
    pub transaction: Transaction,
    pub cart_total: Money,
    pub delivery_fee: Money,
}

/// A payment provider's authoritative answer about one payment, normalised by the HTTP layer from whatever the
/// provider's verification endpoint or webhook delivered. This is the only evidence reconciliation accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub provider_tx_id: String,
    pub amount: Money,
    pub currency: String,
    pub succeeded: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filter_display_and_emptiness() {
        let filter = TransactionQueryFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.to_string(), "No filters.");
        let filter = filter
            .with_customer_id(7)
            .with_provider(Provider::Wave)
            .with_status(TransactionStatus::Pending)
            .with_status(TransactionStatus::Failed);
        assert!(!filter.is_empty());
        let s = filter.to_string();
        assert!(s.contains("customer: 7"));
        assert!(s.contains("provider: Wave"));
        assert!(s.contains("status: Pending|Failed"));
    }
}
