use shop_common::Money;
use shoppit_engine::{
    db_types::NewProduct,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    CartApi,
    CartApiError,
    CatalogApi,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn product(name: &str, slug: &str, price: i64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        image_url: None,
        price: Money::from(price),
    }
}

#[tokio::test]
async fn catalogue_and_cart_flow() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let cart = CartApi::new(db.clone());

    let shirt = catalog.add_product(product("Wax shirt", "wax-shirt", 5000)).await.unwrap();
    let sandals = catalog.add_product(product("Sandals", "sandals", 1500)).await.unwrap();
    assert_eq!(catalog.products().await.unwrap().len(), 2);
    assert!(catalog.product_by_slug("wax-shirt").await.unwrap().is_some());
    assert!(catalog.product_by_slug("no-such-thing").await.unwrap().is_none());

    // Duplicate slugs are rejected
    let dup = catalog.add_product(product("Another shirt", "wax-shirt", 100)).await;
    assert!(matches!(dup, Err(shoppit_engine::CatalogApiError::SlugExists(_))));

    // First add creates the cart and the item at quantity 1
    let (item, created) = cart.add_item("CART-1", shirt.id).await.unwrap();
    assert!(created);
    assert_eq!(item.quantity, 1);

    // Re-adding the same product is a no-op
    let (item_again, created) = cart.add_item("CART-1", shirt.id).await.unwrap();
    assert!(!created);
    assert_eq!(item_again.id, item.id);
    assert_eq!(item_again.quantity, 1);

    let (_, created) = cart.add_item("CART-1", sandals.id).await.unwrap();
    assert!(created);

    assert!(cart.item_in_cart("CART-1", shirt.id).await.unwrap());
    assert!(!cart.item_in_cart("CART-1", 9999).await.unwrap());
    assert!(!cart.item_in_cart("NO-SUCH-CART", shirt.id).await.unwrap());

    let summary = cart.summary("CART-1").await.unwrap().unwrap();
    assert_eq!(summary.num_items, 2);
    assert_eq!(summary.total, Money::from(6500));

    let updated = cart.update_quantity(item.id, 3).await.unwrap();
    assert_eq!(updated.quantity, 3);
    let summary = cart.summary("CART-1").await.unwrap().unwrap();
    assert_eq!(summary.num_items, 4);
    assert_eq!(summary.total, Money::from(16500));

    let detail = cart.detail("CART-1").await.unwrap().unwrap();
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.total, Money::from(16500));
    let shirt_line = detail.items.iter().find(|l| l.slug == "wax-shirt").unwrap();
    assert_eq!(shirt_line.quantity, 3);
    assert_eq!(shirt_line.subtotal, Money::from(15000));

    cart.remove_item(item.id).await.unwrap();
    let detail = cart.detail("CART-1").await.unwrap().unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.total, Money::from(1500));
}

#[tokio::test]
async fn unknown_products_and_items_are_reported() {
    let db = new_db().await;
    let cart = CartApi::new(db.clone());
    let err = cart.add_item("CART-2", 404).await.unwrap_err();
    assert!(matches!(err, CartApiError::ProductNotFound(404)));
    let err = cart.update_quantity(404, 2).await.unwrap_err();
    assert!(matches!(err, CartApiError::ItemNotFound(404)));
    let err = cart.update_quantity(1, 0).await.unwrap_err();
    assert!(matches!(err, CartApiError::InvalidQuantity(0)));
    let err = cart.remove_item(404).await.unwrap_err();
    assert!(matches!(err, CartApiError::ItemNotFound(404)));
    assert!(cart.summary("NO-SUCH-CART").await.unwrap().is_none());
    assert!(cart.detail("NO-SUCH-CART").await.unwrap().is_none());
}

#[tokio::test]
async fn registration_and_login() {
    let db = new_db().await;
    let accounts = AccountApi::new(db.clone(), EventProducers::default());
    let new_customer = shoppit_engine::db_types::NewCustomer {
        username: "amina".to_string(),
        email: "amina@example.com".to_string(),
        password: "s3cret pass".to_string(),
        first_name: Some("Amina".to_string()),
        last_name: None,
        phone: Some("+2250700000000".to_string()),
        city: Some("Abidjan".to_string()),
        state: None,
    };
    let customer = accounts.register(new_customer.clone()).await.unwrap();
    assert_eq!(customer.username, "amina");

    // New customers get the user role
    let auth = shoppit_engine::AuthApi::new(db.clone());
    let roles = auth.roles_for_customer(customer.id).await.unwrap();
    assert_eq!(roles, vec![shoppit_engine::db_types::Role::User]);

    // Duplicate usernames and emails are rejected
    let dup = accounts.register(new_customer.clone()).await.unwrap_err();
    assert!(matches!(dup, shoppit_engine::AccountApiError::DuplicateUsername(_)));
    let mut other = new_customer.clone();
    other.username = "amina2".to_string();
    let dup = accounts.register(other).await.unwrap_err();
    assert!(matches!(dup, shoppit_engine::AccountApiError::DuplicateEmail(_)));

    // Login accepts the right password and rejects everything else, with an indistinguishable error
    let logged_in = accounts.login("amina", "s3cret pass").await.unwrap();
    assert_eq!(logged_in.id, customer.id);
    let wrong_pass = accounts.login("amina", "wrong").await.unwrap_err();
    let no_user = accounts.login("nobody", "s3cret pass").await.unwrap_err();
    assert_eq!(wrong_pass.to_string(), no_user.to_string());

    // Profile updates only touch supplied fields
    let update = shoppit_engine::db_types::CustomerProfileUpdate {
        city: Some("Bouaké".to_string()),
        address: Some("Rue 12".to_string()),
        ..Default::default()
    };
    let updated = accounts.update_profile(customer.id, update).await.unwrap();
    assert_eq!(updated.city.as_deref(), Some("Bouaké"));
    assert_eq!(updated.address.as_deref(), Some("Rue 12"));
    assert_eq!(updated.first_name.as_deref(), Some("Amina"));
    assert_eq!(updated.phone.as_deref(), Some("+2250700000000"));
}

#[tokio::test]
async fn role_management() {
    use shoppit_engine::db_types::Role;
    let db = new_db().await;
    let accounts = AccountApi::new(db.clone(), EventProducers::default());
    let auth = shoppit_engine::AuthApi::new(db.clone());
    let customer = accounts
        .register(shoppit_engine::db_types::NewCustomer {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "pw".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            city: None,
            state: None,
        })
        .await
        .unwrap();

    assert!(auth.check_customer_has_roles(customer.id, &[Role::User]).await.is_ok());
    assert!(auth.check_customer_has_roles(customer.id, &[Role::User, Role::Write]).await.is_err());

    auth.assign_roles(customer.id, &[Role::Write, Role::ReadAll]).await.unwrap();
    assert!(auth.check_customer_has_roles(customer.id, &[Role::User, Role::Write, Role::ReadAll]).await.is_ok());

    // Granting an already-held role is a no-op
    auth.assign_roles(customer.id, &[Role::Write]).await.unwrap();

    let removed = auth.remove_roles(customer.id, &[Role::Write, Role::SuperAdmin]).await.unwrap();
    assert_eq!(removed, 1);
    assert!(auth.check_customer_has_roles(customer.id, &[Role::Write]).await.is_err());
}
