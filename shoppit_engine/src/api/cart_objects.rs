use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::FromRow;

/// The lightweight cart view for badge display: how many items, what total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSummary {
    pub cart_code: String,
    pub num_items: i64,
    pub total: Money,
}

/// One line of a cart, with enough of the product snapshot to render it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: i64,
    pub product_id: i64,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

/// The full cart view returned by `GET /cart`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDetail {
    pub cart_code: String,
    pub items: Vec<CartLine>,
    pub total: Money,
}

impl CartDetail {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
