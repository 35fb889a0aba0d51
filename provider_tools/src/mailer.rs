use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::Serialize;

use crate::{config::MailRelayConfig, ProviderApiError};

/// Thin client for the outbound mail relay. Message composition happens here; delivery, templating and bounce
/// handling are the relay's problem.
#[derive(Clone)]
pub struct MailRelayApi {
    config: MailRelayConfig,
    client: Arc<Client>,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

impl MailRelayApi {
    pub fn new(config: MailRelayConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub async fn send_welcome_email(&self, to: &str, username: &str) -> Result<(), ProviderApiError> {
        let text = format!(
            "Hi {username},\n\nThanks for signing up!\n\nBrowse the catalogue at {}/products and happy \
             shopping.\n\nThe Shoppit team",
            self.config.frontend_url.trim_end_matches('/')
        );
        let message =
            OutboundMessage { from: &self.config.from_address, to, subject: "Welcome to Shoppit!", text };
        self.send(&message).await
    }

    async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ProviderApiError> {
        if !self.is_enabled() {
            debug!("📧️ Mail relay is not configured. Dropping message to {}", message.to);
            return Ok(());
        }
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.reveal())
            .json(message)
            .send()
            .await
            .map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            info!("📧️ Mail to {} accepted by the relay", message.to);
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(ProviderApiError::QueryError { status, message })
        }
    }
}
