//! Unified API for customer accounts.

use std::fmt::Debug;

use log::*;

use crate::{
    api::AccountApiError,
    db_types::{Customer, CustomerProfileUpdate, NewCustomer, Transaction},
    events::{CustomerRegisteredEvent, EventProducers},
    traits::AccountManagement,
};

pub struct AccountApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi")
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Register a new customer. On success, a [`CustomerRegisteredEvent`] is published (the server hooks the
    /// welcome email onto it).
    pub async fn register(&self, new_customer: NewCustomer) -> Result<Customer, AccountApiError> {
        let customer = self.db.create_customer(new_customer).await?;
        info!("👤️ Customer '{}' registered with id {}", customer.username, customer.id);
        for producer in &self.producers.customer_registered_producer {
            producer.publish_event(CustomerRegisteredEvent::new(customer.clone())).await;
        }
        Ok(customer)
    }

    /// Check a username/password pair and return the matching customer.
    pub async fn login(&self, username: &str, password: &str) -> Result<Customer, AccountApiError> {
        let customer = self.db.verify_credentials(username, password).await?;
        debug!("👤️ Customer '{}' logged in", customer.username);
        Ok(customer)
    }

    pub async fn customer_by_id(&self, id: i64) -> Result<Option<Customer>, AccountApiError> {
        self.db.fetch_customer_by_id(id).await
    }

    pub async fn update_profile(
        &self,
        id: i64,
        update: CustomerProfileUpdate,
    ) -> Result<Customer, AccountApiError> {
        if update.is_empty() {
            return Err(AccountApiError::ProfileUpdateNoOp);
        }
        let customer = self.db.update_customer_profile(id, update).await?;
        debug!("👤️ Customer {} updated their profile", customer.id);
        Ok(customer)
    }

    pub async fn transactions_for_customer(&self, customer_id: i64) -> Result<Vec<Transaction>, AccountApiError> {
        self.db.fetch_transactions_for_customer(customer_id).await
    }
}
