use std::{env, io::Write, net::IpAddr};

use chrono::Duration;
use log::*;
use provider_tools::{FlutterwaveConfig, MailRelayConfig, PayPalConfig};
use shop_common::{parse_boolean_flag, Money, Secret};
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8360;
const DEFAULT_DELIVERY_FEE: i64 = 500;
const DEFAULT_PENDING_TX_TIMEOUT: Duration = Duration::hours(2);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The storefront base URL. Payment providers redirect shoppers back to pages under this URL.
    pub frontend_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Flat delivery fee, in minor units, added to every checkout.
    pub delivery_fee: Money,
    /// How long a pending transaction may sit untouched before the expiry worker cancels it.
    pub pending_tx_timeout: Duration,
    pub wave: WaveConfig,
    pub flutterwave: FlutterwaveConfig,
    pub paypal: PayPalConfig,
    pub mail: MailRelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: String::default(),
            frontend_url: "http://localhost:3000".to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            delivery_fee: Money::from(DEFAULT_DELIVERY_FEE),
            pending_tx_timeout: DEFAULT_PENDING_TX_TIMEOUT,
            wave: WaveConfig::default(),
            flutterwave: FlutterwaveConfig::default(),
            paypal: PayPalConfig::default(),
            mail: MailRelayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = env::var("SHOP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}, \
                         instead."
                    );
                    DEFAULT_SHOP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_DATABASE_URL is not set. Please set it to the URL for the shop database.");
            String::default()
        });
        let frontend_url = env::var("SHOP_FRONTEND_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_FRONTEND_URL is not set. Redirect URLs will point at http://localhost:3000.");
            "http://localhost:3000".to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SHOP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SHOP_USE_FORWARDED").ok(), false);
        let delivery_fee = env::var("SHOP_DELIVERY_FEE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SHOP_DELIVERY_FEE. {e}"))
                    .ok()
            })
            .map(Money::from)
            .unwrap_or_else(|| {
                info!("🪛️ SHOP_DELIVERY_FEE is not set. Using the default of {DEFAULT_DELIVERY_FEE} minor units.");
                Money::from(DEFAULT_DELIVERY_FEE)
            });
        let pending_tx_timeout = configure_pending_tx_timeout();
        Self {
            host,
            port,
            database_url,
            frontend_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            delivery_fee,
            pending_tx_timeout,
            wave: WaveConfig::from_env_or_default(),
            flutterwave: FlutterwaveConfig::new_from_env_or_default(),
            paypal: PayPalConfig::new_from_env_or_default(),
            mail: MailRelayConfig::new_from_env_or_default(),
        }
    }
}

fn configure_pending_tx_timeout() -> Duration {
    env::var("SHOP_PENDING_TX_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ SHOP_PENDING_TX_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_PENDING_TX_TIMEOUT.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for SHOP_PENDING_TX_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_PENDING_TX_TIMEOUT)
}

//-------------------------------------------------  WaveConfig  ------------------------------------------------------
/// Configuration for the Wave webhook scope: the HMAC secret the signatures are checked against, and an optional
/// source-IP whitelist.
#[derive(Clone, Debug, Default)]
pub struct WaveConfig {
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, requests against /wave endpoints will be checked against a whitelist of Wave IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
    pub currency: String,
}

impl WaveConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("SHOP_WAVE_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_WAVE_HMAC_SECRET is not set. Please set it to the webhook signing key for Wave.");
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = parse_boolean_flag(env::var("SHOP_WAVE_HMAC_CHECKS").ok(), true);
        let whitelist = env::var("SHOP_WAVE_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ Wave IP whitelist is disabled. If this is not what you want, set SHOP_WAVE_IP_WHITELIST to \
                     a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.parse()
                        .map_err(|e| {
                            warn!("🪛️ Ignoring invalid IP address ({s}) in SHOP_WAVE_IP_WHITELIST: {e}");
                            None::<IpAddr>
                        })
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Wave IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming Wave requests."
                );
            },
            None => {
                info!("🪛️ No Wave IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Wave IP whitelist: {addrs}");
            },
        }
        let currency = env::var("SHOP_WAVE_CURRENCY").unwrap_or_else(|_| {
            info!("🪛️ SHOP_WAVE_CURRENCY not set, using XOF as default");
            "XOF".to_string()
        });
        Self { hmac_secret, hmac_checks, whitelist, currency }
    }
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. DO NOT \
             operate on production like this, since every issued token dies with this process. 🚨️🚨️🚨️"
        );
        let secret: String = {
            let bytes: [u8; 32] = rand::random();
            bytes.iter().fold(String::with_capacity(64), |mut s, b| {
                use std::fmt::Write;
                let _ = write!(s, "{b:02x}");
                s
            })
        };
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = serde_json::json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production \
                         instance, you are doing it wrong! Set the SHOP_JWT_SECRET environment variable instead. \
                         🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("SHOP_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [SHOP_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "SHOP_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//-------------------------------------------------  ServerOptions  ---------------------------------------------------
/// The subset of the server configuration that request handlers need. Kept small, and free of secrets, so it can
/// be passed around as shared application data.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub delivery_fee: Money,
    pub frontend_url: String,
    pub wave_currency: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            delivery_fee: config.delivery_fee,
            frontend_url: config.frontend_url.clone(),
            wave_currency: config.wave.currency.clone(),
        }
    }
}
