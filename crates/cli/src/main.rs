//! Shekels CLI - operator tools over the account and catalog files.
//!
//! # Usage
//!
//! ```bash
//! # List accounts (claimed only with --claimed)
//! shekels-cli accounts list
//!
//! # Credit Shekels
//! shekels-cli accounts grant --id <uuid> --amount 25
//!
//! # Make an officer
//! shekels-cli accounts promote --id <uuid>
//!
//! # Sign an account out everywhere
//! shekels-cli accounts revoke-sessions --id <uuid>
//!
//! # Validate store.json
//! shekels-cli catalog check
//!
//! # Generate a signing or bump key
//! shekels-cli secret generate --length 48
//! ```
//!
//! Commands read `SHEKELS_DATA_DIR` (or `--data-dir`) and write through the
//! same stores as the server, so edits are atomic.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shekels_core::AccountId;
use shekels_server::config::{ACCOUNTS_FILE, CATALOG_FILE};
use shekels_server::store::{AccountStore, CatalogStore};

mod commands;

#[derive(Parser)]
#[command(name = "shekels-cli")]
#[command(author, version, about = "Shekels operator tools")]
struct Cli {
    /// Directory holding users.json and store.json
    #[arg(long, global = true, env = "SHEKELS_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },
    /// Inspect the shop catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Generate secrets
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand)]
enum AccountsAction {
    /// List accounts, richest first
    List {
        /// Only accounts with a claimed name
        #[arg(long)]
        claimed: bool,
    },
    /// Add Shekels to an account
    Grant {
        #[arg(long)]
        id: AccountId,
        #[arg(long)]
        amount: u64,
    },
    /// Give an account officer rights
    Promote {
        #[arg(long)]
        id: AccountId,
    },
    /// Drop every session of an account
    RevokeSessions {
        #[arg(long)]
        id: AccountId,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Validate the catalog and list what can be bought
    Check,
}

#[derive(Subcommand)]
enum SecretAction {
    /// Print a random key suitable for SHEKELS_SIGNING_KEY
    Generate {
        #[arg(long, default_value_t = 48)]
        length: usize,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = AccountStore::file(cli.data_dir.join(ACCOUNTS_FILE));

    match cli.command {
        Commands::Accounts { action } => match action {
            AccountsAction::List { claimed } => {
                commands::accounts::list(&accounts, claimed).await?;
            }
            AccountsAction::Grant { id, amount } => {
                commands::accounts::grant(&accounts, id, amount).await?;
            }
            AccountsAction::Promote { id } => commands::accounts::promote(&accounts, id).await?,
            AccountsAction::RevokeSessions { id } => {
                commands::accounts::revoke_sessions(&accounts, id).await?;
            }
        },
        Commands::Catalog {
            action: CatalogAction::Check,
        } => {
            let catalog = CatalogStore::file(cli.data_dir.join(CATALOG_FILE));
            commands::catalog::check(&catalog, chrono::Utc::now()).await?;
        }
        Commands::Secret {
            action: SecretAction::Generate { length },
        } => {
            #[allow(clippy::print_stdout)]
            {
                println!("{}", commands::secret::generate(length));
            }
        }
    }
    Ok(())
}
