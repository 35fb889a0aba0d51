use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::FlutterwaveConfig,
    data_objects::{ChargeRequest, Verification},
    helpers::{format_provider_amount, parse_provider_amount},
    ProviderApiError,
};

#[derive(Clone)]
pub struct FlutterwaveApi {
    config: FlutterwaveConfig,
    client: Arc<Client>,
}

impl FlutterwaveApi {
    pub fn new(config: FlutterwaveConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ProviderApiError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("💳️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
            Err(ProviderApiError::QueryError { status, message })
        }
    }

    /// Create a hosted payment page for the given charge and return the link the shopper must be redirected to.
    pub async fn create_payment_link(&self, charge: &ChargeRequest) -> Result<String, ProviderApiError> {
        let payload = FlwChargePayload::from_charge(charge);
        debug!("💳️ Requesting payment link for charge {}", charge.tx_ref);
        let result: FlwResponse<FlwPaymentLink> =
            self.rest_query(Method::POST, "/v3/payments", Some(payload)).await?;
        if result.status != "success" {
            return Err(ProviderApiError::QueryError { status: 200, message: result.message });
        }
        let link = result.data.ok_or_else(|| ProviderApiError::MissingData("payment link".into()))?.link;
        info!("💳️ Payment link created for charge {}", charge.tx_ref);
        Ok(link)
    }

    /// Re-verify a transaction against the gateway. The id is the *provider's* transaction id as delivered in the
    /// redirect callback, not our `tx_ref`.
    pub async fn verify_transaction(&self, provider_tx_id: &str) -> Result<Verification, ProviderApiError> {
        let path = format!("/v3/transactions/{provider_tx_id}/verify");
        debug!("💳️ Verifying provider transaction {provider_tx_id}");
        let result: FlwResponse<FlwVerifyData> = self.rest_query(Method::GET, &path, None::<()>).await?;
        if result.status != "success" {
            return Err(ProviderApiError::QueryError { status: 200, message: result.message });
        }
        let data = result.data.ok_or_else(|| ProviderApiError::MissingData("verification data".into()))?;
        let amount = parse_provider_amount(&data.amount.to_string(), &data.currency)?;
        Ok(Verification {
            provider_tx_id: data.id.to_string(),
            amount,
            currency: data.currency,
            succeeded: data.status == "successful",
            reference: Some(data.tx_ref),
        })
    }
}

#[derive(Debug, Serialize)]
struct FlwChargePayload {
    tx_ref: String,
    amount: String,
    currency: String,
    redirect_url: String,
    customer: FlwCustomer,
    customizations: FlwCustomizations,
}

#[derive(Debug, Serialize)]
struct FlwCustomer {
    email: String,
    name: String,
    phonenumber: String,
}

#[derive(Debug, Serialize)]
struct FlwCustomizations {
    title: String,
}

impl FlwChargePayload {
    fn from_charge(charge: &ChargeRequest) -> Self {
        Self {
            tx_ref: charge.tx_ref.clone(),
            amount: format_provider_amount(charge.amount, &charge.currency),
            currency: charge.currency.clone(),
            redirect_url: charge.redirect_url.clone(),
            customer: FlwCustomer {
                email: charge.customer.email.clone(),
                name: charge.customer.name.clone(),
                phonenumber: charge.customer.phonenumber.clone(),
            },
            customizations: FlwCustomizations { title: charge.title.clone() },
        }
    }
}

#[derive(Debug, Deserialize)]
struct FlwResponse<T> {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FlwPaymentLink {
    link: String,
}

/// The subset of the gateway's verification payload that reconciliation cares about. Amounts come back as JSON
/// numbers or strings depending on the endpoint vintage, so deserialize through `serde_json::Value` semantics.
#[derive(Debug, Deserialize)]
struct FlwVerifyData {
    id: u64,
    tx_ref: String,
    #[serde(deserialize_with = "amount_as_string")]
    amount: AmountString,
    currency: String,
    status: String,
}

#[derive(Debug)]
struct AmountString(String);

impl std::fmt::Display for AmountString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn amount_as_string<'de, D>(deserializer: D) -> Result<AmountString, D::Error>
where D: serde::Deserializer<'de> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(AmountString(s)),
        serde_json::Value::Number(n) => Ok(AmountString(n.to_string())),
        other => Err(serde::de::Error::custom(format!("unexpected amount value: {other}"))),
    }
}

#[cfg(test)]
mod test {
    use shop_common::Money;

    use super::*;

    #[test]
    fn charge_payload_shape() {
        let charge = ChargeRequest {
            tx_ref: "ref-1".into(),
            amount: Money::from(7000),
            currency: "XOF".into(),
            redirect_url: "https://shop.example/payment-status/".into(),
            cancel_url: None,
            customer: crate::ChargeCustomer {
                email: "amina@example.com".into(),
                name: "amina".into(),
                phonenumber: "+2250700000000".into(),
            },
            title: "Shoppit Payment".into(),
        };
        let payload = FlwChargePayload::from_charge(&charge);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["amount"], "7000");
        assert_eq!(json["currency"], "XOF");
        assert_eq!(json["customer"]["phonenumber"], "+2250700000000");
        assert_eq!(json["customizations"]["title"], "Shoppit Payment");
    }

    #[test]
    fn verify_data_accepts_numeric_and_string_amounts() {
        let raw = r#"{"id": 912, "tx_ref": "ref-1", "amount": 7000, "currency": "XOF", "status": "successful"}"#;
        let data: FlwVerifyData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.amount.to_string(), "7000");
        let raw = r#"{"id": 913, "tx_ref": "ref-2", "amount": "25.99", "currency": "USD", "status": "failed"}"#;
        let data: FlwVerifyData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.amount.to_string(), "25.99");
        assert_eq!(data.status, "failed");
    }
}
