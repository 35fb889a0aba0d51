use crate::{
    api::AuthApiError,
    db_types::{Role, Roles},
};

/// Role storage for access control.
#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    async fn fetch_roles_for_customer(&self, customer_id: i64) -> Result<Roles, AuthApiError>;

    /// Succeeds only when the customer holds *every* requested role.
    async fn check_customer_has_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;

    /// Grants roles. Granting a role the customer already holds is a no-op.
    async fn assign_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;

    /// Revokes roles. Returns the number of roles actually removed.
    async fn remove_roles(&self, customer_id: i64, roles: &[Role]) -> Result<u64, AuthApiError>;
}
