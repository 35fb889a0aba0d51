use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A customer with username '{0}' already exists")]
    DuplicateUsername(String),
    #[error("A customer with email '{0}' already exists")]
    DuplicateEmail(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Customer {0} does not exist")]
    CustomerNotFound(i64),
    #[error("The requested profile change would result in a no-op.")]
    ProfileUpdateNoOp,
}

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Customer not found")]
    CustomerNotFound,
    #[error("Customer is missing {0} of the required roles")]
    RoleNotAllowed(usize),
}

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No product exists with slug '{0}'")]
    ProductNotFound(String),
    #[error("A product with slug '{0}' already exists")]
    SlugExists(String),
    #[error("The requested product change would result in a no-op.")]
    ProductUpdateNoOp,
}

#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No cart exists with code {0}")]
    CartNotFound(String),
    #[error("No product exists with id {0}")]
    ProductNotFound(i64),
    #[error("No cart item exists with id {0}")]
    ItemNotFound(i64),
    #[error("The cart {0} has already been paid and can no longer be changed")]
    CartAlreadyPaid(String),
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
}

macro_rules! from_sqlx {
    ($($err:ty),+) => {
        $(impl From<sqlx::Error> for $err {
            fn from(e: sqlx::Error) -> Self {
                Self::DatabaseError(e.to_string())
            }
        })+
    };
}

from_sqlx!(AccountApiError, AuthApiError, CatalogApiError, CartApiError);
