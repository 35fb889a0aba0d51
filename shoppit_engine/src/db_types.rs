use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------        TxRef        ---------------------------------------------------------
/// The server-generated reference for a checkout transaction. This is the correlation key we hand to payment
/// providers and expect back in their redirects and webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl FromStr for TxRef {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for TxRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TxRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       Provider       --------------------------------------------------------
/// The payment providers a transaction can be routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Flutterwave,
    PayPal,
    Wave,
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Flutterwave => write!(f, "Flutterwave"),
            Provider::PayPal => write!(f, "PayPal"),
            Provider::Wave => write!(f, "Wave"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flutterwave" => Ok(Self::Flutterwave),
            "paypal" => Ok(Self::PayPal),
            "wave" => Ok(Self::Wave),
            s => Err(ConversionError(format!("Invalid payment provider: {s}"))),
        }
    }
}

impl From<String> for Provider {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid provider in database: {value}. Defaulting to Flutterwave");
            Provider::Flutterwave
        })
    }
}

//--------------------------------------   TransactionStatus   -------------------------------------------------------
/// The four states of a checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created at checkout; the shopper has been handed off to the provider and nothing has been confirmed.
    Pending,
    /// The provider's confirmation was verified and the cart was marked paid. Terminal.
    Completed,
    /// The provider reported a failure, or a confirmation failed verification. A later verified success may
    /// still supersede this.
    Failed,
    /// Abandoned or withdrawn (shopper cancelled, admin intervened, or the pending window lapsed). Terminal.
    Cancelled,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Completed => write!(f, "Completed"),
            TransactionStatus::Failed => write!(f, "Failed"),
            TransactionStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid transaction status in database: {value}. Defaulting to Pending");
            TransactionStatus::Pending
        })
    }
}

/// The outcome of asking whether a status change is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Allowed,
    /// The transaction is already in the requested state. Callers answer "nothing to do" rather than error,
    /// because webhook providers retry on anything that looks like failure.
    NoOp,
    Forbidden,
}

impl TransactionStatus {
    /// The transaction state machine.
    ///
    /// | From \ To  | Pending | Completed | Failed | Cancelled |
    /// |------------|---------|-----------|--------|-----------|
    /// | Pending    | no-op   | ok        | ok     | ok        |
    /// | Failed     | err     | ok        | no-op  | ok        |
    /// | Completed  | err     | no-op     | err    | err       |
    /// | Cancelled  | err     | err       | err    | no-op     |
    ///
    /// `Failed -> Completed` is deliberate: provider notifications can arrive out of order, and a fully verified
    /// success supersedes an earlier transient failure. `Completed` and `Cancelled` are terminal.
    pub fn transition_to(self, new: TransactionStatus) -> Transition {
        use TransactionStatus::*;
        match (self, new) {
            (old, new) if old == new => Transition::NoOp,
            (Pending, Completed | Failed | Cancelled) => Transition::Allowed,
            (Failed, Completed | Cancelled) => Transition::Allowed,
            (_, _) => Transition::Forbidden,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }
}

//--------------------------------------       Product        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Unit price in minor units of the shop currency.
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Money,
}

//--------------------------------------        Cart          --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    /// Client-generated opaque identifier. Anonymous shoppers mint one locally and quote it on every call.
    pub cart_code: String,
    pub customer_id: Option<i64>,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

//--------------------------------------      Customer        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            _ => self.username.clone(),
        }
    }
}

/// Registration payload. The password arrives in plaintext and is hashed before it touches the database.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
}

impl CustomerProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.address.is_none()
    }
}

//--------------------------------------        Role          --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    User,
    ReadAll,
    Write,
    SuperAdmin,
}

pub type Roles = Vec<Role>;

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::ReadAll => write!(f, "read_all"),
            Role::Write => write!(f, "write"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "read_all" => Ok(Self::ReadAll),
            "write" => Ok(Self::Write),
            "super_admin" => Ok(Self::SuperAdmin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid role in database: {value}. Defaulting to user");
            Role::User
        })
    }
}

//--------------------------------------     Transaction      --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub tx_ref: TxRef,
    pub cart_id: i64,
    pub customer_id: Option<i64>,
    pub provider: Provider,
    /// The provider's own id for the payment, recorded at confirmation time.
    pub provider_tx_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub tx_ref: TxRef,
    pub cart_id: i64,
    pub customer_id: Option<i64>,
    pub provider: Provider,
    pub amount: Money,
    pub currency: String,
}

impl NewTransaction {
    pub fn new(tx_ref: TxRef, cart_id: i64, provider: Provider, amount: Money, currency: &str) -> Self {
        Self { tx_ref, cart_id, customer_id: None, provider, amount, currency: currency.to_string() }
    }

    pub fn for_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_table() {
        use TransactionStatus::*;
        assert_eq!(Pending.transition_to(Completed), Transition::Allowed);
        assert_eq!(Pending.transition_to(Failed), Transition::Allowed);
        assert_eq!(Pending.transition_to(Cancelled), Transition::Allowed);
        assert_eq!(Pending.transition_to(Pending), Transition::NoOp);
        assert_eq!(Failed.transition_to(Completed), Transition::Allowed);
        assert_eq!(Failed.transition_to(Cancelled), Transition::Allowed);
        assert_eq!(Failed.transition_to(Pending), Transition::Forbidden);
        assert_eq!(Completed.transition_to(Completed), Transition::NoOp);
        assert_eq!(Completed.transition_to(Failed), Transition::Forbidden);
        assert_eq!(Completed.transition_to(Cancelled), Transition::Forbidden);
        assert_eq!(Cancelled.transition_to(Completed), Transition::Forbidden);
        assert_eq!(Cancelled.transition_to(Cancelled), Transition::NoOp);
    }

    #[test]
    fn roles_round_trip() {
        for role in [Role::User, Role::ReadAll, Role::Write, Role::SuperAdmin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn provider_round_trip() {
        for p in [Provider::Flutterwave, Provider::PayPal, Provider::Wave] {
            assert_eq!(p.to_string().parse::<Provider>().unwrap(), p);
        }
    }
}
