use serde::{Deserialize, Serialize};
use shop_common::Money;

/// Partial product update. `None` fields are left untouched. The slug is immutable: it is the public identity of
/// the product and appears in storefront URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Money>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.image_url.is_none() && self.price.is_none()
    }
}
