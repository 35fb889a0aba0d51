use serde::{Deserialize, Serialize};

use crate::db_types::{Customer, Transaction};

/// A checkout transaction was verified and completed; the associated cart is now paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCompletedEvent {
    pub transaction: Transaction,
}

impl TransactionCompletedEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}

/// A new customer account was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRegisteredEvent {
    pub customer: Customer,
}

impl CustomerRegisteredEvent {
    pub fn new(customer: Customer) -> Self {
        Self { customer }
    }
}
