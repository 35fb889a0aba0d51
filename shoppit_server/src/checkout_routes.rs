//----------------------------------------------   Checkout  ----------------------------------------------------
//! The payment-provider surface: opening checkouts, and reconciling the asynchronous answers that come back as
//! redirect callbacks (Flutterwave, PayPal) or signed webhooks (Wave).
//!
//! Two rules shape the handlers here:
//! * Callback endpoints answer a duplicate confirmation with HTTP 200 and a success body. Providers retry
//!   anything else, and a retry storm against an already-completed transaction helps nobody.
//! * No provider's say-so is trusted directly. Flutterwave redirects are re-verified against its `verify`
//!   endpoint; PayPal executions return the amounts PayPal actually captured; Wave webhooks are HMAC-checked at
//!   the middleware and amount-checked against the cart. Everything then funnels through
//!   [`CheckoutApi::confirm_transaction`] or [`CheckoutApi::reconcile_push_payment`].

use actix_web::{web, HttpResponse};
use log::*;
use provider_tools::{wave::WaveWebhook, FlutterwaveApi, PayPalApi};
use shoppit_engine::{
    db_types::{Provider, Role, TxRef},
    traits::{AccountManagement, CheckoutDatabase, CheckoutError},
    AccountApi,
    CheckoutApi,
};

use crate::{
    auth::JwtClaims,
    config::ServerOptions,
    data_objects::{CheckoutRequest, CheckoutResponse, FlutterwaveCallbackParams, JsonResponse, PayPalCallbackParams},
    errors::ServerError,
    integrations::providers::{charge_request_for, confirmation_for},
    route,
};

//------------------------------------------   Initiation  ----------------------------------------------------

route!(flutterwave_checkout => Post "/checkout/flutterwave" impl CheckoutDatabase, AccountManagement where requires [Role::User]);
/// Open a checkout against the card/mobile-money gateway and hand back the hosted payment link.
pub async fn flutterwave_checkout<A>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    options: web::Data<ServerOptions>,
    api: web::Data<CheckoutApi<A>>,
    accounts: web::Data<AccountApi<A>>,
    gateway: web::Data<FlutterwaveApi>,
) -> Result<HttpResponse, ServerError>
where
    A: CheckoutDatabase + AccountManagement,
{
    let cart_code = body.into_inner().cart_code;
    info!("💻️ Flutterwave checkout requested for cart {cart_code} by customer {}", claims.sub);
    let customer = accounts
        .customer_by_id(claims.sub)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("customer {}", claims.sub)))?;
    let draft = api
        .begin_checkout(
            &cart_code,
            Provider::Flutterwave,
            gateway.currency(),
            options.delivery_fee,
            Some(claims.sub),
        )
        .await?;
    let redirect_url = format!("{}/payment-status/", options.frontend_url.trim_end_matches('/'));
    let charge = charge_request_for(&customer, &draft, redirect_url, None);
    let payment_url = match gateway.create_payment_link(&charge).await {
        Ok(url) => url,
        Err(e) => {
            warn!("💻️ Could not create a payment link for {}: {e}", draft.transaction.tx_ref);
            // The pending transaction is left in place; the expiry worker reaps it if the shopper never retries.
            return Err(ServerError::ProviderError(e.to_string()));
        },
    };
    Ok(HttpResponse::Ok().json(CheckoutResponse { payment_url, tx_ref: draft.transaction.tx_ref }))
}

route!(paypal_checkout => Post "/checkout/paypal" impl CheckoutDatabase, AccountManagement where requires [Role::User]);
/// Open a PayPal checkout and hand back the approval URL.
pub async fn paypal_checkout<A>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    options: web::Data<ServerOptions>,
    api: web::Data<CheckoutApi<A>>,
    accounts: web::Data<AccountApi<A>>,
    paypal: web::Data<PayPalApi>,
) -> Result<HttpResponse, ServerError>
where
    A: CheckoutDatabase + AccountManagement,
{
    let cart_code = body.into_inner().cart_code;
    info!("💻️ PayPal checkout requested for cart {cart_code} by customer {}", claims.sub);
    let customer = accounts
        .customer_by_id(claims.sub)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("customer {}", claims.sub)))?;
    let draft = api
        .begin_checkout(&cart_code, Provider::PayPal, paypal.currency(), options.delivery_fee, Some(claims.sub))
        .await?;
    let base = options.frontend_url.trim_end_matches('/');
    let tx_ref = &draft.transaction.tx_ref;
    let return_url = format!("{base}/payment-status?paymentStatus=success&ref={tx_ref}");
    let cancel_url = format!("{base}/payment-status?paymentStatus=cancel&ref={tx_ref}");
    let charge = charge_request_for(&customer, &draft, return_url, Some(cancel_url));
    let payment_url = match paypal.create_payment(&charge).await {
        Ok(url) => url,
        Err(e) => {
            warn!("💻️ Could not create a PayPal payment for {}: {e}", draft.transaction.tx_ref);
            return Err(ServerError::ProviderError(e.to_string()));
        },
    };
    Ok(HttpResponse::Ok().json(CheckoutResponse { payment_url, tx_ref: draft.transaction.tx_ref }))
}

//------------------------------------------   Callbacks  -----------------------------------------------------

route!(flutterwave_callback => Post "/callback/flutterwave" impl CheckoutDatabase);
/// The gateway redirect lands here with `status`, `tx_ref` and `transaction_id` query parameters.
///
/// The redirect itself proves nothing (anyone can craft those query parameters), so a `successful` status is
/// only the cue to ask the gateway's `verify` endpoint for the authoritative record, which is then reconciled
/// against the stored transaction.
pub async fn flutterwave_callback<A: CheckoutDatabase>(
    query: web::Query<FlutterwaveCallbackParams>,
    api: web::Data<CheckoutApi<A>>,
    gateway: web::Data<FlutterwaveApi>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    let tx_ref = params
        .tx_ref
        .ok_or_else(|| ServerError::InvalidRequestPath("tx_ref query parameter is required".to_string()))?;
    debug!("💻️ Flutterwave callback for {tx_ref}: status {:?}", params.status);
    if params.status.as_deref() != Some("successful") {
        record_provider_failure(&api, &tx_ref, "gateway redirect did not report success").await;
        return Ok(HttpResponse::BadRequest().json(JsonResponse::failure("Payment was not successful.")));
    }
    let transaction_id = params
        .transaction_id
        .ok_or_else(|| ServerError::InvalidRequestPath("transaction_id query parameter is required".to_string()))?;
    let verification = gateway.verify_transaction(&transaction_id).await.map_err(|e| {
        warn!("💻️ Could not verify transaction {transaction_id} with the gateway. {e}");
        ServerError::ProviderError(e.to_string())
    })?;
    let confirmation = confirmation_for(verification, &tx_ref)?;
    match api.confirm_transaction(&tx_ref, confirmation).await {
        Ok(_) => Ok(HttpResponse::Ok().json(JsonResponse::success("Payment successful"))),
        Err(CheckoutError::TransactionModificationNoOp) => {
            Ok(HttpResponse::Ok().json(JsonResponse::success("Payment already confirmed.")))
        },
        Err(e) => {
            debug!("💻️ Could not confirm transaction {tx_ref}. {e}");
            Err(e.into())
        },
    }
}

route!(paypal_callback => Post "/callback/paypal" impl CheckoutDatabase);
/// PayPal sends the shopper back with `paymentId` and `PayerID`; our own reference rides along as `ref`.
///
/// Executing the payment is what actually captures the money, and PayPal's response carries the captured amount,
/// which reconciliation checks against the stored transaction. A replayed callback fails the execute call
/// (already done), so the payment is looked up instead and reconciliation absorbs the duplicate.
pub async fn paypal_callback<A: CheckoutDatabase>(
    query: web::Query<PayPalCallbackParams>,
    api: web::Data<CheckoutApi<A>>,
    paypal: web::Data<PayPalApi>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    let tx_ref = params
        .tx_ref
        .ok_or_else(|| ServerError::InvalidRequestPath("ref query parameter is required".to_string()))?;
    if params.payment_status.as_deref() == Some("cancel") {
        info!("💻️ PayPal checkout for {tx_ref} was cancelled by the shopper");
        record_provider_cancellation(&api, &tx_ref, "shopper cancelled at PayPal").await;
        return Ok(HttpResponse::Ok().json(JsonResponse::success("Payment cancelled.")));
    }
    let (payment_id, payer_id) = match (params.payment_id, params.payer_id) {
        (Some(payment_id), Some(payer_id)) => (payment_id, payer_id),
        _ => return Err(ServerError::InvalidRequestPath("paymentId and PayerID are required".to_string())),
    };
    debug!("💻️ PayPal callback for {tx_ref}: payment {payment_id}");
    let verification = match paypal.execute_payment(&payment_id, &payer_id).await {
        Ok(v) => v,
        Err(e) => {
            // Execution fails on replays (the sale is already captured). Fall back to looking the payment up;
            // reconciliation sorts out whether anything is left to do.
            debug!("💻️ Executing PayPal payment {payment_id} failed ({e}); fetching its current state instead");
            paypal.get_payment(&payment_id).await.map_err(|e| {
                warn!("💻️ Could not fetch PayPal payment {payment_id}. {e}");
                ServerError::ProviderError(e.to_string())
            })?
        },
    };
    let confirmation = confirmation_for(verification, &tx_ref)?;
    match api.confirm_transaction(&tx_ref, confirmation).await {
        Ok(_) => Ok(HttpResponse::Ok().json(JsonResponse::success("Payment successful"))),
        Err(CheckoutError::TransactionModificationNoOp) => {
            Ok(HttpResponse::Ok().json(JsonResponse::success("Payment already confirmed.")))
        },
        Err(e) => {
            debug!("💻️ Could not confirm transaction {tx_ref}. {e}");
            Err(e.into())
        },
    }
}

//------------------------------------------   Wave webhook  --------------------------------------------------

route!(wave_webhook => Post "/webhook" impl CheckoutDatabase);
/// Wave's push notification. The HMAC middleware has already authenticated the body by the time this runs.
///
/// Always answers 200: Wave retries on anything else, and every failure mode here (unknown reference, amount
/// mismatch, duplicate) is either permanent or already handled, so a retry can never help.
pub async fn wave_webhook<A: CheckoutDatabase>(
    body: web::Json<WaveWebhook>,
    options: web::Data<ServerOptions>,
    api: web::Data<CheckoutApi<A>>,
) -> HttpResponse {
    let hook = body.into_inner();
    info!("💻️📱️ Wave webhook received for reference {} ({})", hook.reference, hook.status);
    if !hook.is_completed() {
        debug!("💻️📱️ Ignoring Wave webhook with status '{}'", hook.status);
        return HttpResponse::Ok().json(JsonResponse::success("Notification acknowledged."));
    }
    let currency = options.wave_currency.clone();
    let verification = match hook.to_verification(&currency) {
        Ok(v) => v,
        Err(e) => {
            warn!("💻️📱️ Malformed Wave webhook for {}: {e}", hook.reference);
            return HttpResponse::Ok().json(JsonResponse::failure(format!("Malformed notification: {e}")));
        },
    };
    let confirmation = shoppit_engine::transaction_objects::PaymentConfirmation {
        provider_tx_id: verification.provider_tx_id,
        amount: verification.amount,
        currency: verification.currency,
        succeeded: verification.succeeded,
    };
    let result = api
        .reconcile_push_payment(&hook.reference, Provider::Wave, &currency, options.delivery_fee, confirmation)
        .await;
    let response = match result {
        Ok(tx) => {
            info!("💻️📱️ Wave payment reconciled for cart {} as transaction {}", hook.reference, tx.tx_ref);
            JsonResponse::success("Payment reconciled.")
        },
        Err(CheckoutError::TransactionModificationNoOp) => {
            info!("💻️📱️ Cart {} already paid. Duplicate Wave webhook ignored.", hook.reference);
            JsonResponse::success("Payment already reconciled.")
        },
        Err(CheckoutError::CartNotFound(r)) => {
            warn!("💻️📱️ Wave webhook references unknown cart {r}");
            JsonResponse::failure("Unknown payment reference.")
        },
        Err(CheckoutError::VerificationFailed(reason)) => {
            warn!("💻️📱️ Wave payment verification failed: {reason}");
            JsonResponse::failure("Payment verification failed.")
        },
        Err(e) => {
            error!("💻️📱️ Unexpected error reconciling Wave payment for {}: {e}", hook.reference);
            JsonResponse::failure("Unexpected error handling payment.")
        },
    };
    HttpResponse::Ok().json(response)
}

//------------------------------------------   Helpers  -------------------------------------------------------

/// Park the transaction in `Failed` after a provider-reported failure. Errors are logged, not surfaced: the
/// shopper-facing answer is already decided, and a no-op (e.g. the transaction expired in the meantime) is fine.
async fn record_provider_failure<A: CheckoutDatabase>(api: &CheckoutApi<A>, tx_ref: &TxRef, reason: &str) {
    match api.fail_transaction(tx_ref, reason).await {
        Ok(_) | Err(CheckoutError::TransactionModificationNoOp) => {},
        Err(e) => debug!("💻️ Could not mark transaction {tx_ref} as failed: {e}"),
    }
}

async fn record_provider_cancellation<A: CheckoutDatabase>(api: &CheckoutApi<A>, tx_ref: &TxRef, reason: &str) {
    match api.cancel_transaction(tx_ref, reason).await {
        Ok(_) | Err(CheckoutError::TransactionModificationNoOp) => {},
        Err(e) => debug!("💻️ Could not cancel transaction {tx_ref}: {e}"),
    }
}
