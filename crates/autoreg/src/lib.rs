//! Automatic account registration for guest checkouts.
//!
//! When a buyer completes a purchase without an account, the handler creates
//! one from their checkout details, links it to the order and the customer
//! record, and announces it so a credential-setup email goes out. Checkout
//! itself never shows a registration form.
//!
//! # Wiring
//!
//! ```text
//! HostHooks  --order created-->  AutoRegistrationHandler
//!                                    |  AccountStore / OrderStore / CustomerStore
//!                                    v
//!                             AutoRegisterEvents --account created--> WelcomeNotifier
//!                                                                        |
//!                                                                        v
//!                                                           SmtpCredentialMailer
//! ```
//!
//! Host services come in through [`platform::Platform`]; [`memory`] has
//! in-memory versions of all of them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod hooks;
pub mod mailer;
pub mod memory;
pub mod models;
pub mod notify;
pub mod password;
pub mod platform;

pub use config::{AutoRegisterConfig, ConfigError};
pub use events::{AccountAutoCreated, AccountArgsFilter, AccountCreatedListener, AutoRegisterEvents};
pub use handler::{AutoRegistrationHandler, Outcome, SkipReason};
pub use hooks::HostHooks;
pub use notify::{CredentialSetupNotifier, WelcomeNotifier};
pub use platform::{Platform, PlatformError};

/// Crate version, for logs and `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
