//! Unified API for role management and access-control checks.

use std::fmt::Debug;

use log::*;

use crate::{
    api::AuthApiError,
    db_types::{Role, Roles},
    traits::AuthManagement,
};

pub struct AuthApi<B> {
    db: B,
}

impl<B> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi")
    }
}

impl<B> AuthApi<B>
where B: AuthManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn roles_for_customer(&self, customer_id: i64) -> Result<Roles, AuthApiError> {
        self.db.fetch_roles_for_customer(customer_id).await
    }

    /// Succeeds only when the customer holds every one of `roles`.
    pub async fn check_customer_has_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        self.db.check_customer_has_roles(customer_id, roles).await
    }

    pub async fn assign_roles(&self, customer_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        self.db.assign_roles(customer_id, roles).await?;
        info!("🔑️ Roles {roles:?} assigned to customer {customer_id}");
        Ok(())
    }

    pub async fn remove_roles(&self, customer_id: i64, roles: &[Role]) -> Result<u64, AuthApiError> {
        let removed = self.db.remove_roles(customer_id, roles).await?;
        info!("🔑️ {removed} roles revoked from customer {customer_id}");
        Ok(removed)
    }
}
