use crate::{
    api::CatalogApiError,
    db_types::{NewProduct, Product},
    traits::ProductUpdate,
};

/// Product catalogue storage.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// All products, ordered by creation time.
    async fn fetch_products(&self) -> Result<Vec<Product>, CatalogApiError>;

    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogApiError>;

    /// Inserts a new product. The slug must be unique; a collision surfaces as
    /// [`CatalogApiError::SlugExists`].
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError>;

    /// Applies a partial update to the product with the given slug.
    async fn update_product(&self, slug: &str, update: ProductUpdate) -> Result<Product, CatalogApiError>;
}
