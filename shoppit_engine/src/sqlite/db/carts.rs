use log::debug;
use shop_common::Money;
use sqlx::SqliteConnection;

use crate::{
    api::{
        cart_objects::{CartDetail, CartLine, CartSummary},
        CartApiError,
    },
    db_types::{Cart, CartItem},
    sqlite::db::products,
};

/// Fetches the cart for the given code, creating an empty, anonymous one if none exists yet.
pub async fn fetch_or_create_cart(cart_code: &str, conn: &mut SqliteConnection) -> Result<Cart, CartApiError> {
    if let Some(cart) = fetch_cart_by_code(cart_code, conn).await? {
        return Ok(cart);
    }
    let cart = sqlx::query_as("INSERT INTO carts (cart_code) VALUES ($1) RETURNING *")
        .bind(cart_code)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Created cart {cart_code}");
    Ok(cart)
}

pub async fn fetch_cart_by_code(
    cart_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Cart>, CartApiError> {
    let cart =
        sqlx::query_as("SELECT * FROM carts WHERE cart_code = $1").bind(cart_code).fetch_optional(conn).await?;
    Ok(cart)
}

pub async fn fetch_cart_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, CartApiError> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(cart)
}

/// Get-or-create the cart item for (cart, product). A fresh item starts at quantity 1; an existing item is
/// returned untouched. The cart must be unpaid.
pub async fn add_item(
    cart_code: &str,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(CartItem, bool), CartApiError> {
    let cart = fetch_or_create_cart(cart_code, conn).await?;
    if cart.paid {
        return Err(CartApiError::CartAlreadyPaid(cart_code.to_string()));
    }
    if products::fetch_product_by_id(product_id, conn).await?.is_none() {
        return Err(CartApiError::ProductNotFound(product_id));
    }
    if let Some(item) = fetch_item(cart.id, product_id, conn).await? {
        return Ok((item, false));
    }
    let item = sqlx::query_as("INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, 1) RETURNING *")
        .bind(cart.id)
        .bind(product_id)
        .fetch_one(conn)
        .await?;
    Ok((item, true))
}

async fn fetch_item(
    cart_id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_item_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<CartItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM cart_items WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn item_in_cart(
    cart_code: &str,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, CartApiError> {
    let cart = match fetch_cart_by_code(cart_code, conn).await? {
        Some(cart) => cart,
        None => return Ok(false),
    };
    Ok(fetch_item(cart.id, product_id, conn).await?.is_some())
}

/// Item count and total for the *unpaid* cart with the given code.
pub async fn fetch_cart_summary(
    cart_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CartSummary>, CartApiError> {
    let cart = match fetch_cart_by_code(cart_code, conn).await? {
        Some(cart) if !cart.paid => cart,
        _ => return Ok(None),
    };
    let (num_items, total): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(quantity), 0), COALESCE(SUM(quantity * price), 0)
        FROM cart_items JOIN products ON cart_items.product_id = products.id
        WHERE cart_id = $1
        "#,
    )
    .bind(cart.id)
    .fetch_one(conn)
    .await?;
    Ok(Some(CartSummary { cart_code: cart.cart_code, num_items, total: Money::from(total) }))
}

/// Full cart contents for the *unpaid* cart with the given code.
pub async fn fetch_cart_detail(
    cart_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CartDetail>, CartApiError> {
    let cart = match fetch_cart_by_code(cart_code, conn).await? {
        Some(cart) if !cart.paid => cart,
        _ => return Ok(None),
    };
    let items: Vec<CartLine> = sqlx::query_as(
        r#"
        SELECT
            cart_items.id AS item_id,
            products.id AS product_id,
            products.name AS name,
            products.slug AS slug,
            products.image_url AS image_url,
            products.price AS unit_price,
            cart_items.quantity AS quantity,
            cart_items.quantity * products.price AS subtotal
        FROM cart_items JOIN products ON cart_items.product_id = products.id
        WHERE cart_id = $1
        ORDER BY cart_items.id ASC
        "#,
    )
    .bind(cart.id)
    .fetch_all(conn)
    .await?;
    let total = items.iter().map(|line| line.subtotal).sum();
    Ok(Some(CartDetail { cart_code: cart.cart_code, items, total }))
}

pub async fn update_item_quantity(
    item_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, CartApiError> {
    guard_item_cart_unpaid(item_id, conn).await?;
    let item: Option<CartItem> =
        sqlx::query_as("UPDATE cart_items SET quantity = $1 WHERE id = $2 RETURNING *")
            .bind(quantity)
            .bind(item_id)
            .fetch_optional(conn)
            .await?;
    item.ok_or(CartApiError::ItemNotFound(item_id))
}

pub async fn remove_cart_item(item_id: i64, conn: &mut SqliteConnection) -> Result<(), CartApiError> {
    guard_item_cart_unpaid(item_id, conn).await?;
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(item_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(CartApiError::ItemNotFound(item_id));
    }
    Ok(())
}

/// `Σ quantity × price` over the cart's rows.
pub async fn cart_total(cart_id: i64, conn: &mut SqliteConnection) -> Result<Money, CartApiError> {
    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(quantity * price), 0)
        FROM cart_items JOIN products ON cart_items.product_id = products.id
        WHERE cart_id = $1
        "#,
    )
    .bind(cart_id)
    .fetch_one(conn)
    .await?;
    Ok(Money::from(total))
}

/// Marks the cart as paid. If the cart is anonymous and a customer id is supplied, the cart adopts that customer.
/// Callers are expected to run this inside the same transaction that completes the payment.
pub async fn mark_cart_paid(
    cart_id: i64,
    customer_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<(), CartApiError> {
    sqlx::query(
        r#"
        UPDATE carts
        SET paid = 1, customer_id = COALESCE(customer_id, $1), updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(customer_id)
    .bind(cart_id)
    .execute(conn)
    .await?;
    Ok(())
}

async fn guard_item_cart_unpaid(item_id: i64, conn: &mut SqliteConnection) -> Result<(), CartApiError> {
    let item = fetch_item_by_id(item_id, conn).await?.ok_or(CartApiError::ItemNotFound(item_id))?;
    let cart = fetch_cart_by_id(item.cart_id, conn).await?;
    match cart {
        Some(cart) if cart.paid => Err(CartApiError::CartAlreadyPaid(cart.cart_code)),
        _ => Ok(()),
    }
}
