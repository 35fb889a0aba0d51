use shop_common::Money;

use crate::{
    api::{cart_objects::{CartDetail, CartSummary}, CartApiError},
    db_types::{Cart, CartItem},
};

/// Shopping-cart storage.
///
/// Carts are keyed by a client-generated `cart_code` so that anonymous shoppers can build a cart before they ever
/// authenticate. A paid cart is frozen: every mutating method refuses to touch one.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Get-or-create the cart for `cart_code`, then get-or-create the item for `product_id`.
    /// A newly created item starts at quantity 1; re-adding an existing item leaves its quantity unchanged.
    /// The second return value is `true` when the item was newly created.
    async fn add_item_to_cart(&self, cart_code: &str, product_id: i64) -> Result<(CartItem, bool), CartApiError>;

    async fn item_in_cart(&self, cart_code: &str, product_id: i64) -> Result<bool, CartApiError>;

    async fn fetch_cart_by_code(&self, cart_code: &str) -> Result<Option<Cart>, CartApiError>;

    /// Item count and total for an *unpaid* cart. Paid carts report `None`.
    async fn fetch_cart_summary(&self, cart_code: &str) -> Result<Option<CartSummary>, CartApiError>;

    /// Full cart contents for an *unpaid* cart. Paid carts report `None`.
    async fn fetch_cart_detail(&self, cart_code: &str) -> Result<Option<CartDetail>, CartApiError>;

    /// Set the quantity of an existing cart item. The quantity must be at least 1.
    async fn update_item_quantity(&self, item_id: i64, quantity: i64) -> Result<CartItem, CartApiError>;

    async fn remove_cart_item(&self, item_id: i64) -> Result<(), CartApiError>;

    /// `Σ quantity × product.price` over the cart's rows. Always recomputed, never cached.
    async fn cart_total(&self, cart_id: i64) -> Result<Money, CartApiError>;
}
