use mockall::mock;
use shop_common::Money;
use shoppit_engine::{
    api::{
        cart_objects::{CartDetail, CartSummary},
        AccountApiError,
        AuthApiError,
        CartApiError,
        CatalogApiError,
    },
    db_types::{Cart, CartItem, Customer, CustomerProfileUpdate, NewCustomer, NewProduct, Product, Role, Roles, Transaction},
    traits::{AccountManagement, AuthManagement, CartManagement, CatalogManagement, ProductUpdate},
};

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, AccountApiError>;
        async fn fetch_customer_by_id(&self, id: i64) -> Result<Option<Customer>, AccountApiError>;
        async fn fetch_customer_by_username(&self, username: &str) -> Result<Option<Customer>, AccountApiError>;
        async fn verify_credentials(&self, username: &str, password: &str) -> Result<Customer, AccountApiError>;
        async fn update_customer_profile(&self, id: i64, update: CustomerProfileUpdate) -> Result<Customer, AccountApiError>;
        async fn fetch_transactions_for_customer(&self, customer_id: i64) -> Result<Vec<Transaction>, AccountApiError>;
    }
}

mock! {
    pub AuthManager {}
    impl AuthManagement for AuthManager {
        async fn fetch_roles_for_customer(&self, customer_id: i64) -> Result<Roles, AuthApiError>;
        async fn check_customer_has_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;
        async fn assign_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;
        async fn remove_roles(&self, customer_id: i64, roles: &[Role]) -> Result<u64, AuthApiError>;
    }
}

mock! {
    pub CartManager {}
    impl CartManagement for CartManager {
        async fn add_item_to_cart(&self, cart_code: &str, product_id: i64) -> Result<(CartItem, bool), CartApiError>;
        async fn item_in_cart(&self, cart_code: &str, product_id: i64) -> Result<bool, CartApiError>;
        async fn fetch_cart_by_code(&self, cart_code: &str) -> Result<Option<Cart>, CartApiError>;
        async fn fetch_cart_summary(&self, cart_code: &str) -> Result<Option<CartSummary>, CartApiError>;
        async fn fetch_cart_detail(&self, cart_code: &str) -> Result<Option<CartDetail>, CartApiError>;
        async fn update_item_quantity(&self, item_id: i64, quantity: i64) -> Result<CartItem, CartApiError>;
        async fn remove_cart_item(&self, item_id: i64) -> Result<(), CartApiError>;
        async fn cart_total(&self, cart_id: i64) -> Result<Money, CartApiError>;
    }
}

mock! {
    pub CatalogManager {}
    impl CatalogManagement for CatalogManager {
        async fn fetch_products(&self) -> Result<Vec<Product>, CatalogApiError>;
        async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogApiError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError>;
        async fn update_product(&self, slug: &str, update: ProductUpdate) -> Result<Product, CatalogApiError>;
    }
}

pub fn test_customer(id: i64, username: &str) -> Customer {
    use chrono::Utc;
    Customer {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        first_name: None,
        last_name: None,
        phone: None,
        city: None,
        state: None,
        address: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
