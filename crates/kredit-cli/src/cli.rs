//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kredit - Turn invoices into categorized spendings
#[derive(Parser)]
#[command(name = "kredit")]
#[command(about = "Self-hosted invoice-based spending tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "kredit.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set KREDIT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage users (list, add)
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Give every user without categories the default set
    SeedCategories,
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users with their category counts
    List,

    /// Create a user
    Add {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Plain-text password (stored as an Argon2 hash)
        #[arg(short, long)]
        password: String,
    },
}
