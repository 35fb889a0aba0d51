//! Wire types for the Wave mobile-money webhook.
//!
//! Wave is push-only: there is no initiate leg and no verification endpoint. The shopper pays from their phone,
//! quoting the cart code as the payment reference, and Wave notifies us with a signed webhook. Authenticity is
//! established by the server's HMAC check on the raw request body; this module only describes the payload.

use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::{data_objects::Verification, helpers::parse_provider_amount, ProviderApiError};

pub const WAVE_COMPLETED_STATUS: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveWebhook {
    /// The paying wallet's phone number, E.164.
    pub phone_number: String,
    /// Decimal amount string, e.g. "7000.00".
    pub amount: String,
    /// The payment reference the shopper quoted. By convention this is a cart code.
    pub reference: String,
    pub status: String,
}

impl WaveWebhook {
    pub fn is_completed(&self) -> bool {
        self.status == WAVE_COMPLETED_STATUS
    }

    pub fn amount_in(&self, currency: &str) -> Result<Money, ProviderApiError> {
        parse_provider_amount(&self.amount, currency)
    }

    /// Map the webhook into the verification record the reconciliation engine consumes.
    /// Wave does not carry its own transaction id in the payload, so the payment reference doubles as one.
    pub fn to_verification(&self, currency: &str) -> Result<Verification, ProviderApiError> {
        let amount = self.amount_in(currency)?;
        Ok(Verification {
            provider_tx_id: self.reference.clone(),
            amount,
            currency: currency.to_ascii_uppercase(),
            succeeded: self.is_completed(),
            reference: Some(self.reference.clone()),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn webhook_parses_and_verifies() {
        let raw = r#"{
            "phone_number": "+2250700000000",
            "amount": "7000.00",
            "reference": "ABCD1234",
            "status": "completed"
        }"#;
        let hook: WaveWebhook = serde_json::from_str(raw).unwrap();
        assert!(hook.is_completed());
        let v = hook.to_verification("XOF").unwrap();
        assert_eq!(v.amount, Money::from(7000));
        assert_eq!(v.provider_tx_id, "ABCD1234");
        assert!(v.succeeded);
    }

    #[test]
    fn non_completed_status_is_not_a_success() {
        let hook = WaveWebhook {
            phone_number: "+2250700000000".into(),
            amount: "7000".into(),
            reference: "ABCD1234".into(),
            status: "pending".into(),
        };
        assert!(!hook.to_verification("XOF").unwrap().succeeded);
    }
}
