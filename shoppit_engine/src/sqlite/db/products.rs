use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    api::CatalogApiError,
    db_types::{NewProduct, Product},
    traits::ProductUpdate,
};

pub async fn fetch_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, CatalogApiError> {
    let products = sqlx::query_as("SELECT * FROM products ORDER BY created_at ASC").fetch_all(conn).await?;
    Ok(products)
}

pub async fn fetch_product_by_slug(
    slug: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, CatalogApiError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE slug = $1").bind(slug).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_product_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn insert_product(
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, CatalogApiError> {
    if fetch_product_by_slug(&product.slug, conn).await?.is_some() {
        return Err(CatalogApiError::SlugExists(product.slug));
    }
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, slug, description, image_url, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.slug)
    .bind(product.description)
    .bind(product.image_url)
    .bind(product.price.value())
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn update_product(
    slug: &str,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Product, CatalogApiError> {
    if update.is_empty() {
        return Err(CatalogApiError::ProductUpdateNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(image_url) = update.image_url {
        set_clause.push("image_url = ");
        set_clause.push_bind_unseparated(image_url);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price.value());
    }
    builder.push(" WHERE slug = ");
    builder.push_bind(slug);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder
        .build()
        .fetch_optional(conn)
        .await?
        .map(|row: SqliteRow| Product::from_row(&row))
        .transpose()?;
    result.ok_or_else(|| CatalogApiError::ProductNotFound(slug.to_string()))
}
