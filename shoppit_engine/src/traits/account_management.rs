use crate::{
    api::AccountApiError,
    db_types::{Customer, CustomerProfileUpdate, NewCustomer, Transaction},
};

/// Customer account storage. Password hashes never leave this layer: callers hand over plaintext once (at
/// registration or login) and only ever get profile data back.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Creates the customer and grants the `user` role. Username and email must both be unique.
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, AccountApiError>;

    async fn fetch_customer_by_id(&self, id: i64) -> Result<Option<Customer>, AccountApiError>;

    async fn fetch_customer_by_username(&self, username: &str) -> Result<Option<Customer>, AccountApiError>;

    /// Checks a username/password pair. Unknown usernames and wrong passwords both surface as
    /// [`AccountApiError::InvalidCredentials`]; the error never says which half was wrong.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Customer, AccountApiError>;

    async fn update_customer_profile(
        &self,
        id: i64,
        update: CustomerProfileUpdate,
    ) -> Result<Customer, AccountApiError>;

    /// The customer's checkout transactions, newest first.
    async fn fetch_transactions_for_customer(&self, customer_id: i64) -> Result<Vec<Transaction>, AccountApiError>;
}
