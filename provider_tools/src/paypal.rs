use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::*;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    config::PayPalConfig,
    data_objects::{ChargeRequest, Verification},
    helpers::{format_provider_amount, parse_provider_amount},
    ProviderApiError,
};

/// Client for PayPal's classic REST payments API.
///
/// Every call is authenticated with an OAuth2 client-credentials bearer token. Tokens are valid for hours, so the
/// client caches the current one and only re-authenticates when it is within a minute of expiring.
#[derive(Clone)]
pub struct PayPalApi {
    config: PayPalConfig,
    client: Arc<Client>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl PayPalApi {
    pub fn new(config: PayPalConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(Mutex::new(None)) })
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn access_token(&self) -> Result<String, ProviderApiError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.access_token.clone());
            }
            debug!("🅿️ Cached PayPal token is about to expire. Re-authenticating.");
        }
        let url = format!("{}/v1/oauth2/token", self.config.base_url);
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.client_id, Some(self.config.client_secret.reveal()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderApiError::AuthError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderApiError::QueryError { status, message });
        }
        let token: TokenResponse =
            response.json().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        };
        *guard = Some(cached);
        info!("🅿️ Authenticated against PayPal. Token valid for {}s", token.expires_in);
        Ok(token.access_token)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ProviderApiError> {
        let token = self.access_token().await?;
        let url = format!("{}{path}", self.config.base_url);
        trace!("🅿️ Sending REST query: {url}");
        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
            Err(ProviderApiError::QueryError { status, message })
        }
    }

    /// Create a sale payment and return the `approval_url` the shopper must be redirected to.
    pub async fn create_payment(&self, charge: &ChargeRequest) -> Result<String, ProviderApiError> {
        let amount = format_provider_amount(charge.amount, &charge.currency);
        let cancel_url = charge.cancel_url.clone().unwrap_or_else(|| charge.redirect_url.clone());
        let body = json!({
            "intent": "sale",
            "payer": { "payment_method": "paypal" },
            "redirect_urls": {
                "return_url": charge.redirect_url,
                "cancel_url": cancel_url,
            },
            "transactions": [{
                "item_list": {
                    "items": [{
                        "name": "Cart items",
                        "sku": "cart",
                        "price": amount,
                        "currency": charge.currency,
                        "quantity": 1,
                    }]
                },
                "amount": { "total": amount, "currency": charge.currency },
                "description": charge.title,
            }]
        });
        debug!("🅿️ Creating PayPal payment for charge {}", charge.tx_ref);
        let payment: Payment = self.rest_query(Method::POST, "/v1/payments/payment", Some(body)).await?;
        let approval = payment
            .links
            .iter()
            .find(|l| l.rel == "approval_url")
            .map(|l| l.href.clone())
            .ok_or_else(|| ProviderApiError::MissingData("approval_url link".into()))?;
        info!("🅿️ PayPal payment {} created for charge {}", payment.id, charge.tx_ref);
        Ok(approval)
    }

    /// Execute an approved payment and map the result into a [`Verification`].
    /// The sale only counts as succeeded when PayPal reports the payment state as `approved`.
    pub async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
    ) -> Result<Verification, ProviderApiError> {
        let path = format!("/v1/payments/payment/{payment_id}/execute");
        let body = json!({ "payer_id": payer_id });
        debug!("🅿️ Executing PayPal payment {payment_id}");
        let payment: Payment = self.rest_query(Method::POST, &path, Some(body)).await?;
        payment.into_verification()
    }

    /// Look up an existing payment without executing it. Used to re-check state on replayed callbacks.
    pub async fn get_payment(&self, payment_id: &str) -> Result<Verification, ProviderApiError> {
        let path = format!("/v1/payments/payment/{payment_id}");
        let payment: Payment = self.rest_query(Method::GET, &path, None::<()>).await?;
        payment.into_verification()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct Payment {
    id: String,
    state: String,
    #[serde(default)]
    transactions: Vec<PaymentTransaction>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct PaymentTransaction {
    amount: PaymentAmount,
}

#[derive(Debug, Deserialize)]
struct PaymentAmount {
    total: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

impl Payment {
    fn into_verification(self) -> Result<Verification, ProviderApiError> {
        let tx = self
            .transactions
            .first()
            .ok_or_else(|| ProviderApiError::MissingData("payment has no transactions".into()))?;
        let amount = parse_provider_amount(&tx.amount.total, &tx.amount.currency)?;
        Ok(Verification {
            provider_tx_id: self.id,
            amount,
            currency: tx.amount.currency.clone(),
            succeeded: self.state == "approved",
            reference: None,
        })
    }
}

#[cfg(test)]
mod test {
    use shop_common::Money;

    use super::*;

    #[test]
    fn payment_maps_to_verification() {
        let raw = r#"{
            "id": "PAY-123",
            "state": "approved",
            "transactions": [{ "amount": { "total": "25.99", "currency": "USD" } }],
            "links": [
                { "href": "https://paypal.example/approve", "rel": "approval_url", "method": "REDIRECT" }
            ]
        }"#;
        let payment: Payment = serde_json::from_str(raw).unwrap();
        let v = payment.into_verification().unwrap();
        assert_eq!(v.provider_tx_id, "PAY-123");
        assert_eq!(v.amount, Money::from(2599));
        assert_eq!(v.currency, "USD");
        assert!(v.succeeded);
    }

    #[test]
    fn unapproved_payment_is_not_a_success() {
        let raw = r#"{
            "id": "PAY-124",
            "state": "created",
            "transactions": [{ "amount": { "total": "10.00", "currency": "USD" } }]
        }"#;
        let payment: Payment = serde_json::from_str(raw).unwrap();
        let v = payment.into_verification().unwrap();
        assert!(!v.succeeded);
    }

    #[test]
    fn payment_without_transactions_is_an_error() {
        let raw = r#"{ "id": "PAY-125", "state": "approved" }"#;
        let payment: Payment = serde_json::from_str(raw).unwrap();
        assert!(payment.into_verification().is_err());
    }
}
