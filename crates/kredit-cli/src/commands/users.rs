//! User management commands

use anyhow::{Context, Result};
use kredit_core::db::Database;

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users().context("Failed to list users")?;

    if users.is_empty() {
        println!("No users yet. Create one with: kredit users add --username NAME --password PASS");
        return Ok(());
    }

    println!("{:<6} {:<24} {:>10}", "ID", "Username", "Categories");
    println!("{}", "-".repeat(42));
    for user in users {
        let categories = db.list_categories(user.id)?.len();
        println!("{:<6} {:<24} {:>10}", user.id, user.username, categories);
    }

    Ok(())
}

pub fn cmd_users_add(db: &Database, username: &str, password: &str) -> Result<()> {
    let user_id = db
        .create_user(username, password)
        .with_context(|| format!("Failed to create user '{}'", username))?;

    println!("✅ Created user '{}' (id {})", username, user_id);
    println!("   Default categories are added on first login.");

    Ok(())
}
