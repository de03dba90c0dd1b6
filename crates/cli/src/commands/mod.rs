//! Subcommand implementations.

pub mod config;
pub mod email;
pub mod simulate;
