//! GurutvaPay command-line client
//!
//! Thin wrapper over [`GurutvapayClient`] for manual checks against the
//! gateway. Configuration comes from `GURUTVAPAY__*` environment variables
//! (or a `.env` file); decoded responses are printed as JSON on stdout.
//!
//! ## Usage
//!
//! ```bash
//! gurutvapay login
//! gurutvapay create-payment order.json
//! gurutvapay status ORD1
//! gurutvapay list --limit 20 --page 0
//! gurutvapay verify-webhook --payload body.json --signature sha256=ab12...
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use gurutvapay::config::{AppConfig, ValidationError};
use gurutvapay::{GatewayError, GurutvapayClient, PaymentGateway, PaymentOrder, WebhookVerifier};

#[derive(Parser)]
#[command(name = "gurutvapay")]
#[command(about = "GurutvaPay payment gateway client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with password-grant credentials and cache the access token
    Login {
        /// Overrides GURUTVAPAY__GATEWAY__USERNAME
        #[arg(long)]
        username: Option<String>,

        /// Overrides GURUTVAPAY__GATEWAY__PASSWORD
        #[arg(long)]
        password: Option<String>,
    },

    /// Initiate a payment from a JSON order file
    CreatePayment {
        /// Path to the order JSON
        #[arg(value_name = "ORDER_FILE")]
        order: PathBuf,
    },

    /// Look up the status of a transaction
    Status {
        #[arg(value_name = "MERCHANT_ORDER_ID")]
        merchant_order_id: String,
    },

    /// List recent transactions
    List {
        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    /// Check a webhook payload against its signature
    VerifyWebhook {
        /// File holding the exact request body
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,

        /// Signature header value, with or without the `sha256=` prefix
        #[arg(long)]
        signature: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match run(cli.command, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ran but the answer was negative.
async fn run(command: Commands, config: AppConfig) -> Result<bool, CliError> {
    config.validate()?;

    let connect = || GurutvapayClient::new(config.gateway.clone());

    let output = match command {
        Commands::Login { username, password } => {
            let client = connect()?;
            let configured = client.config().password_credentials();
            let username = username
                .or_else(|| configured.map(|(u, _)| u.to_string()))
                .ok_or_else(|| CliError::Usage("No username given".to_string()))?;
            let password = password
                .or_else(|| configured.map(|(_, p)| p.to_string()))
                .ok_or_else(|| CliError::Usage("No password given".to_string()))?;

            let token = client.login(&username, &password).await?;
            json!({
                "environment": client.config().environment.cache_key(),
                "expires_at": token.expires_at(),
            })
        }
        Commands::CreatePayment { order } => {
            let contents = tokio::fs::read_to_string(order).await?;
            let order: PaymentOrder = serde_json::from_str(&contents)?;
            connect()?.create_payment(&order).await?.raw
        }
        Commands::Status { merchant_order_id } => {
            connect()?.transaction_status(&merchant_order_id).await?
        }
        Commands::List { limit, page } => connect()?.transaction_list(limit, page).await?,
        Commands::VerifyWebhook { payload, signature } => {
            let secret = config.gateway.webhook_secret.clone().ok_or_else(|| {
                CliError::Usage("GURUTVAPAY__GATEWAY__WEBHOOK_SECRET is not set".to_string())
            })?;
            let body = tokio::fs::read(payload).await?;
            let valid = WebhookVerifier::from_secret(secret).verify(&body, &signature);
            print_json(&json!({ "valid": valid }))?;
            return Ok(valid);
        }
    };

    print_json(&output)?;
    Ok(true)
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
