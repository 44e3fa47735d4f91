//! Kawn CLI - session store migrations and merchant tooling.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! kawn migrate
//!
//! # See which store a host maps to
//! kawn tenant resolve shop1.kawn.com
//!
//! # Import or export a catalog spreadsheet
//! kawn import products catalog.xlsx --token "$TOKEN"
//! kawn export categories --out categories.xlsx
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kawn_admin::api::MerchantToken;

mod commands;

use commands::catalog::Entity;

#[derive(Parser)]
#[command(name = "kawn")]
#[command(author, version, about = "Kawn storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the session store table
    Migrate,
    /// Inspect tenant resolution
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Import a categories or products spreadsheet
    Import {
        entity: Entity,

        /// Path to an .xlsx, .xls or .ods file
        file: PathBuf,

        /// Merchant bearer token
        #[arg(long, env = "KAWN_MERCHANT_TOKEN", hide_env_values = true)]
        token: String,

        /// Write failed rows to this workbook
        #[arg(long)]
        errors: Option<PathBuf>,
    },
    /// Export categories or products to a spreadsheet
    Export {
        entity: Entity,

        /// Merchant bearer token
        #[arg(long, env = "KAWN_MERCHANT_TOKEN", hide_env_values = true)]
        token: String,

        /// Output path (defaults to `<entity>.xlsx`)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Resolve a host to its tenant
    Resolve {
        /// Host header value, e.g. `shop1.kawn.com`
        host: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Tenant { action } => match action {
            TenantAction::Resolve { host } => {
                let resolution = commands::tenant::resolve(&host)?;
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            }
        },
        Commands::Import {
            entity,
            file,
            token,
            errors,
        } => {
            let token = MerchantToken::new(token);
            let report =
                commands::catalog::import(entity, &file, &token, errors.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Export { entity, token, out } => {
            let token = MerchantToken::new(token);
            let path = commands::catalog::export(entity, &token, out).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
