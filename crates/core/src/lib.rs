//! Autoreg Core - Shared domain types.
//!
//! Types used by the auto-registration handler and by hosts that embed it:
//! email addresses, record identifiers, login names, roles and the checkout
//! form selection.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no mail
//! transport. Hosts can depend on it without pulling in the handler.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, usernames and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
