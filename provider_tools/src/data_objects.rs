use serde::{Deserialize, Serialize};
use shop_common::Money;

/// Everything a provider needs to set up a hosted payment page for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub tx_ref: String,
    pub amount: Money,
    pub currency: String,
    /// Where the provider should send the shopper after the payment attempt.
    pub redirect_url: String,
    pub cancel_url: Option<String>,
    pub customer: ChargeCustomer,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeCustomer {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phonenumber: String,
}

/// A provider's authoritative view of one payment, as returned by its verification or execution endpoint.
/// This is what the reconciliation engine compares against the locally stored transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub provider_tx_id: String,
    pub amount: Money,
    pub currency: String,
    pub succeeded: bool,
    /// Our own reference, as echoed back by the provider. When present, callers must check it against the
    /// transaction being confirmed. Otherwise a valid payment id belonging to a *different* purchase could be
    /// replayed against this one.
    pub reference: Option<String>,
}
