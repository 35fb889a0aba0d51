//! Unified API for shopping-cart manipulation.

use std::fmt::Debug;

use log::*;

use crate::{
    api::{
        cart_objects::{CartDetail, CartSummary},
        CartApiError,
    },
    db_types::CartItem,
    traits::CartManagement,
};

pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Add a product to the cart identified by `cart_code`, creating the cart on first use.
    /// Re-adding a product that is already in the cart is a no-op; the quantity is *not* incremented. The
    /// storefront adjusts quantities through [`Self::update_quantity`].
    pub async fn add_item(&self, cart_code: &str, product_id: i64) -> Result<(CartItem, bool), CartApiError> {
        let (item, created) = self.db.add_item_to_cart(cart_code, product_id).await?;
        if created {
            debug!("🛒️ Product {product_id} added to cart {cart_code}");
        } else {
            debug!("🛒️ Product {product_id} was already in cart {cart_code}");
        }
        Ok((item, created))
    }

    pub async fn item_in_cart(&self, cart_code: &str, product_id: i64) -> Result<bool, CartApiError> {
        self.db.item_in_cart(cart_code, product_id).await
    }

    pub async fn summary(&self, cart_code: &str) -> Result<Option<CartSummary>, CartApiError> {
        self.db.fetch_cart_summary(cart_code).await
    }

    pub async fn detail(&self, cart_code: &str) -> Result<Option<CartDetail>, CartApiError> {
        self.db.fetch_cart_detail(cart_code).await
    }

    pub async fn update_quantity(&self, item_id: i64, quantity: i64) -> Result<CartItem, CartApiError> {
        if quantity < 1 {
            return Err(CartApiError::InvalidQuantity(quantity));
        }
        let item = self.db.update_item_quantity(item_id, quantity).await?;
        debug!("🛒️ Cart item {item_id} quantity set to {quantity}");
        Ok(item)
    }

    pub async fn remove_item(&self, item_id: i64) -> Result<(), CartApiError> {
        self.db.remove_cart_item(item_id).await?;
        debug!("🛒️ Cart item {item_id} removed");
        Ok(())
    }
}
