//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, no_encrypt: bool) -> Result<()> {
    println!("🚀 Starting Kredit web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let db = open_db(db_path, no_encrypt)?;

    let seeded = db.backfill_default_categories()?;
    if seeded > 0 {
        println!("   Seeded default categories for {} user(s)", seeded);
    }

    let config = kredit_server::ServerConfig::from_env();
    if config.allowed_origins.is_empty() {
        println!("   🌐 CORS: same-origin only");
    } else {
        println!("   🌐 CORS: {}", config.allowed_origins.join(", "));
    }
    println!("   🔒 Authentication: bearer token (POST /auth/login)");
    println!();

    kredit_server::serve_with_config(db, host, port, config).await
}
