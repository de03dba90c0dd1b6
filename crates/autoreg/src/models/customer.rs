//! Commerce customer records.

use serde::{Deserialize, Serialize};

use autoreg_core::{AccountId, CustomerId, Email};

/// A commerce customer: an email address with its orders and, optionally,
/// the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub name: String,
    pub account_id: Option<AccountId>,
}

/// Fields for creating a customer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: Email,
    pub name: String,
    pub account_id: Option<AccountId>,
}
