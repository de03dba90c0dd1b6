//! Records exchanged with the host platform.
//!
//! # Models
//!
//! - `order` - Orders, buyer info and the persisted payment meta
//! - `account` - Accounts and account creation parameters
//! - `customer` - Commerce customer records

pub mod account;
pub mod customer;
pub mod order;

pub use account::{Account, AccountProfile, NewAccount};
pub use customer::{Customer, NewCustomer};
pub use order::{Address, BuyerInfo, Order, PaymentMeta};

/// Metadata keys written by the handler.
///
/// These match the keys the host's commerce plugin reads, so existing
/// reports and account pages pick up the linked records.
pub mod keys {
    /// Order meta: the linked account id.
    pub const PAYMENT_USER_ID: &str = "_edd_payment_user_id";
    /// Order meta: the full payment record, including the buyer info copy.
    pub const PAYMENT_META: &str = "_edd_payment_meta";
    /// Account meta: billing address captured at checkout.
    pub const USER_ADDRESS: &str = "_edd_user_address";
    /// Account meta: marker set while an account awaits email verification.
    pub const PENDING_VERIFICATION: &str = "_edd_pending_verification";
}
