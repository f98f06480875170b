//! Kredit CLI - Invoice-based spending tracker
//!
//! Usage:
//!   kredit init                                  Initialize database
//!   kredit users add --username U --password P   Create a user
//!   kredit seed-categories                       Backfill default categories
//!   kredit serve --port 5000                     Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt).await
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UsersAction::List) => commands::cmd_users_list(&db),
                Some(UsersAction::Add { username, password }) => {
                    commands::cmd_users_add(&db, &username, &password)
                }
            }
        }
        Commands::SeedCategories => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_seed_categories(&db)
        }
    }
}
