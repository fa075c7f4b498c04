//! Contacts CLI - Database migrations and seed data.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! contacts-cli migrate
//!
//! # Load the sample contacts (skipped when the table has rows)
//! contacts-cli seed
//! contacts-cli seed --file path/to/contacts.yaml
//! ```
//!
//! Both commands read the `CONTACTS_DB_*` variables used by the API server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "contacts-cli")]
#[command(author, version, about = "Contacts API CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with sample contacts
    Seed {
        /// YAML file with the contacts to load (defaults to the shipped samples)
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[tokio::main]
async fn main() {
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
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            commands::seed::run(file.as_deref()).await?;
        }
    }
    Ok(())
}
