use log::*;
use shop_common::Secret;

const FLUTTERWAVE_BASE_URL: &str = "https://api.flutterwave.com";
const PAYPAL_SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";
const PAYPAL_LIVE_URL: &str = "https://api-m.paypal.com";

#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// The currency carts are charged in when paying through the gateway.
    pub currency: String,
}

impl Default for FlutterwaveConfig {
    fn default() -> Self {
        Self { base_url: FLUTTERWAVE_BASE_URL.into(), secret_key: Secret::default(), currency: "XOF".into() }
    }
}

impl FlutterwaveConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url =
            std::env::var("SHOP_FLUTTERWAVE_BASE_URL").unwrap_or_else(|_| FLUTTERWAVE_BASE_URL.to_string());
        let secret_key = Secret::new(std::env::var("SHOP_FLUTTERWAVE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("SHOP_FLUTTERWAVE_SECRET_KEY not set. Gateway checkouts will be rejected by the provider.");
            String::default()
        }));
        let currency = std::env::var("SHOP_FLUTTERWAVE_CURRENCY").unwrap_or_else(|_| {
            info!("SHOP_FLUTTERWAVE_CURRENCY not set, using XOF as default");
            "XOF".to_string()
        });
        Self { base_url, secret_key, currency }
    }
}

#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub currency: String,
}

impl Default for PayPalConfig {
    fn default() -> Self {
        Self {
            base_url: PAYPAL_SANDBOX_URL.into(),
            client_id: String::default(),
            client_secret: Secret::default(),
            currency: "USD".into(),
        }
    }
}

impl PayPalConfig {
    pub fn new_from_env_or_default() -> Self {
        let mode = std::env::var("SHOP_PAYPAL_MODE").unwrap_or_else(|_| "sandbox".to_string());
        let base_url = match mode.to_ascii_lowercase().as_str() {
            "live" | "production" => PAYPAL_LIVE_URL.to_string(),
            _ => {
                info!("PayPal client running in sandbox mode");
                PAYPAL_SANDBOX_URL.to_string()
            },
        };
        let client_id = std::env::var("SHOP_PAYPAL_CLIENT_ID").unwrap_or_else(|_| {
            warn!("SHOP_PAYPAL_CLIENT_ID not set. PayPal checkouts will be rejected by the provider.");
            String::default()
        });
        let client_secret = Secret::new(std::env::var("SHOP_PAYPAL_CLIENT_SECRET").unwrap_or_else(|_| {
            warn!("SHOP_PAYPAL_CLIENT_SECRET not set. PayPal checkouts will be rejected by the provider.");
            String::default()
        }));
        let currency = std::env::var("SHOP_PAYPAL_CURRENCY").unwrap_or_else(|_| {
            info!("SHOP_PAYPAL_CURRENCY not set, using USD as default");
            "USD".to_string()
        });
        Self { base_url, client_id, client_secret, currency }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MailRelayConfig {
    /// Full URL of the relay's message-submission endpoint.
    pub endpoint: String,
    pub api_key: Secret<String>,
    pub from_address: String,
    /// The storefront base URL, used to build links inside emails.
    pub frontend_url: String,
}

impl MailRelayConfig {
    pub fn new_from_env_or_default() -> Self {
        let endpoint = std::env::var("SHOP_MAIL_RELAY_ENDPOINT").unwrap_or_else(|_| {
            warn!("SHOP_MAIL_RELAY_ENDPOINT not set. Outbound email is disabled.");
            String::default()
        });
        let api_key = Secret::new(std::env::var("SHOP_MAIL_RELAY_API_KEY").unwrap_or_default());
        let from_address = std::env::var("SHOP_MAIL_FROM").unwrap_or_else(|_| "no-reply@shoppit.example".to_string());
        let frontend_url =
            std::env::var("SHOP_FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        Self { endpoint, api_key, from_address, frontend_url }
    }

    pub fn is_enabled(&self) -> bool {
        !self.endpoint.is_empty()
    }
}
