//! Unified API for the product catalogue.

use std::fmt::Debug;

use log::*;

use crate::{
    api::CatalogApiError,
    db_types::{NewProduct, Product},
    traits::{CatalogManagement, ProductUpdate},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn products(&self) -> Result<Vec<Product>, CatalogApiError> {
        self.db.fetch_products().await
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogApiError> {
        self.db.fetch_product_by_slug(slug).await
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, CatalogApiError> {
        let product = self.db.insert_product(product).await?;
        info!("🏷️ Product '{}' added to the catalogue with id {}", product.slug, product.id);
        Ok(product)
    }

    pub async fn update_product(&self, slug: &str, update: ProductUpdate) -> Result<Product, CatalogApiError> {
        if update.is_empty() {
            return Err(CatalogApiError::ProductUpdateNoOp);
        }
        let product = self.db.update_product(slug, update).await?;
        debug!("🏷️ Product '{}' updated", product.slug);
        Ok(product)
    }
}
