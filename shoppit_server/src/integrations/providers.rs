//! Glue between the engine's view of a checkout and the provider clients' wire formats.

use provider_tools::{ChargeCustomer, ChargeRequest, Verification};
use shoppit_engine::{
    db_types::{Customer, TxRef},
    transaction_objects::{CheckoutDraft, PaymentConfirmation},
};

use crate::errors::ServerError;

/// Build the charge a provider needs from a freshly opened checkout.
pub fn charge_request_for(
    customer: &Customer,
    draft: &CheckoutDraft,
    redirect_url: String,
    cancel_url: Option<String>,
) -> ChargeRequest {
    ChargeRequest {
        tx_ref: draft.transaction.tx_ref.to_string(),
        amount: draft.transaction.amount,
        currency: draft.transaction.currency.clone(),
        redirect_url,
        cancel_url,
        customer: ChargeCustomer {
            email: customer.email.clone(),
            name: customer.display_name(),
            phonenumber: customer.phone.clone().unwrap_or_default(),
        },
        title: "Shoppit Payment".to_string(),
    }
}

/// Map a provider verification into the evidence record the engine consumes.
///
/// When the provider echoed our reference back, it must match the transaction being confirmed. A mismatch means
/// the caller supplied a payment id that belongs to some *other* purchase, which is exactly the replay trick the
/// reconciliation rules exist to stop.
pub fn confirmation_for(verification: Verification, tx_ref: &TxRef) -> Result<PaymentConfirmation, ServerError> {
    if let Some(reference) = &verification.reference {
        if reference != tx_ref.as_str() {
            return Err(ServerError::PaymentVerificationFailed(format!(
                "the provider's record is for reference {reference}, not {tx_ref}"
            )));
        }
    }
    Ok(PaymentConfirmation {
        provider_tx_id: verification.provider_tx_id,
        amount: verification.amount,
        currency: verification.currency,
        succeeded: verification.succeeded,
    })
}

#[cfg(test)]
mod test {
    use shop_common::Money;

    use super::*;

    fn verification(reference: Option<&str>) -> Verification {
        Verification {
            provider_tx_id: "912".to_string(),
            amount: Money::from(7000),
            currency: "XOF".to_string(),
            succeeded: true,
            reference: reference.map(String::from),
        }
    }

    #[test]
    fn mismatched_references_are_rejected() {
        let tx_ref = TxRef::from("ref-1".to_string());
        assert!(confirmation_for(verification(Some("ref-1")), &tx_ref).is_ok());
        assert!(confirmation_for(verification(None), &tx_ref).is_ok());
        assert!(confirmation_for(verification(Some("someone-elses-ref")), &tx_ref).is_err());
    }
}
