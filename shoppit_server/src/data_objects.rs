use std::fmt::Display;

use serde::{Deserialize, Serialize};
use shoppit_engine::db_types::{Role, TxRef};

/// The uniform body for webhook and callback responses. Webhook providers retry on non-2xx answers, so those
/// handlers always answer 200 and put the real outcome in here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdateRequest {
    pub customer_id: i64,
    #[serde(default)]
    pub apply: Vec<Role>,
    #[serde(default)]
    pub revoke: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued on successful registration or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub customer_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub cart_code: String,
    pub product_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartQuery {
    pub cart_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInCartQuery {
    pub cart_code: String,
    pub product_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub item_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteItemRequest {
    pub item_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cart_code: String,
}

/// Handed back by the checkout-initiation endpoints: where to send the shopper, and the reference to quote when
/// they come back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub payment_url: String,
    pub tx_ref: TxRef,
}

/// Query parameters the gateway appends when redirecting the shopper back to us.
#[derive(Debug, Clone, Deserialize)]
pub struct FlutterwaveCallbackParams {
    pub status: Option<String>,
    pub tx_ref: Option<TxRef>,
    pub transaction_id: Option<String>,
}

/// Query parameters PayPal appends to the return URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalCallbackParams {
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    #[serde(rename = "PayerID")]
    pub payer_id: Option<String>,
    #[serde(rename = "ref")]
    pub tx_ref: Option<TxRef>,
    #[serde(rename = "paymentStatus")]
    pub payment_status: Option<String>,
}
