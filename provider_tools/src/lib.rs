//! HTTP clients for the external services Shoppit talks to during checkout.
//!
//! Three collaborators live here:
//! * [`FlutterwaveApi`] is the card/mobile-money gateway. Checkout creates a hosted payment link, and the redirect
//!   callback is re-verified against the gateway's `verify` endpoint before anything is reconciled locally.
//! * [`PayPalApi`] drives classic REST payments with an OAuth2 client-credentials token that is cached between calls.
//! * [`MailRelayApi`] is the outbound mail relay. The server posts welcome emails to it from an event hook.
//!
//! Wave, the regional mobile-money provider, has no outbound API: it only pushes webhooks. Its wire types live in
//! [`wave`], and transport authenticity (HMAC) is enforced by the server, not here.
//!
//! All clients treat the remote service as an opaque REST API: build a request, send JSON, map the response into a
//! small typed result, and surface everything else as a [`ProviderApiError`].

mod config;
mod error;
mod flutterwave;
mod helpers;
mod mailer;
mod paypal;
pub mod wave;

mod data_objects;

pub use config::{FlutterwaveConfig, MailRelayConfig, PayPalConfig};
pub use data_objects::{ChargeCustomer, ChargeRequest, Verification};
pub use error::ProviderApiError;
pub use flutterwave::FlutterwaveApi;
pub use helpers::currency_scale;
pub use mailer::MailRelayApi;
pub use paypal::PayPalApi;
