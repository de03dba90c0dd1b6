//! Autoreg CLI - configuration checks, dry runs and test email.
//!
//! # Usage
//!
//! ```bash
//! # Validate the environment configuration
//! autoreg check-config
//!
//! # Run a guest order through the handler without side effects
//! autoreg simulate -e jane.doe@example.com --first-name Jane --last-name Doe
//!
//! # Deliver a credential-setup email over the configured SMTP relay
//! autoreg send-test-email --to jane@example.com --login jane
//! ```
//!
//! Log verbosity follows `RUST_LOG`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "autoreg")]
#[command(author, version = autoreg::VERSION, about = "Automatic checkout registration tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configuration and print it with secrets redacted
    CheckConfig,
    /// Run a guest order through the handler against in-memory stores
    Simulate {
        /// Buyer email address
        #[arg(short, long)]
        email: String,

        /// Buyer first name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Buyer last name
        #[arg(long, default_value = "")]
        last_name: String,

        /// Login that already exists (repeatable)
        #[arg(long)]
        taken: Vec<String>,

        /// Disable guest checkout in the simulated store
        #[arg(long)]
        no_guest_checkout: bool,

        /// Generated password length
        #[arg(
            long,
            default_value_t = autoreg::password::DEFAULT_PASSWORD_LENGTH,
            value_parser = parse_password_length
        )]
        password_length: usize,
    },
    /// Send a credential-setup email for a throwaway account
    SendTestEmail {
        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Login shown in the message
        #[arg(short, long)]
        login: String,
    },
}

/// Accept only lengths the handler would use unchanged.
fn parse_password_length(raw: &str) -> Result<usize, String> {
    use autoreg::password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

    let len: usize = raw.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    if (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        Ok(len)
    } else {
        Err(format!(
            "must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}"
        ))
    }
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "autoreg=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::CheckConfig => {
            commands::config::check()?;
        }
        Commands::Simulate {
            email,
            first_name,
            last_name,
            taken,
            no_guest_checkout,
            password_length,
        } => {
            commands::simulate::run(commands::simulate::Scenario {
                email,
                first_name,
                last_name,
                taken,
                guest_checkout: !no_guest_checkout,
                password_length,
            })
            .await?;
        }
        Commands::SendTestEmail { to, login } => {
            commands::email::send_test(&to, &login).await?;
        }
    }
    Ok(())
}
