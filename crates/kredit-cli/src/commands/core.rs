//! Core commands and shared utilities

use std::path::Path;

use anyhow::{Context, Result};
use kredit_core::db::Database;

/// Open the database, honoring `--no-encrypt`
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let seeded = db
        .backfill_default_categories()
        .context("Failed to seed default categories")?;
    if seeded > 0 {
        println!("   Seeded default categories for {} user(s)", seeded);
    }

    let encrypted = db
        .is_encrypted()
        .context("Failed to check encryption status")?;
    if encrypted {
        println!("   🔒 Encryption: ENABLED");
    } else if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   ⚠️  Encryption: NOT ACTIVE (SQLCipher unavailable)");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a user: kredit users add --username alice --password secret");
    println!("  2. Start the API: kredit serve");

    Ok(())
}

pub fn cmd_seed_categories(db: &Database) -> Result<()> {
    let seeded = db
        .backfill_default_categories()
        .context("Failed to seed default categories")?;

    if seeded == 0 {
        println!("All users already have categories.");
    } else {
        println!("✅ Seeded default categories for {} user(s)", seeded);
    }

    Ok(())
}
