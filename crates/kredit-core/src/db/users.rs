//! Credential store

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

/// Hash a password using argon2 with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC hash string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_at_str: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create a user with a freshly hashed password
    pub fn create_user(&self, username: &str, password: &str) -> Result<i64> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidData("Username is required".into()));
        }
        if password.is_empty() {
            return Err(Error::InvalidData("Password is required".into()));
        }

        if self.get_user_by_username(username)?.is_some() {
            return Err(Error::DuplicateUser(username.to_string()));
        }

        let password_hash = hash_password(password)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?, ?)",
            params![username, password_hash],
        )?;
        let id = conn.last_insert_rowid();

        info!(user_id = id, username = %username, "Created user");
        Ok(id)
    }

    /// Look up a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, username, password_hash, created_at FROM users ORDER BY id")?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Verify a username/password pair
    ///
    /// Returns `None` for an unknown user or a wrong password; callers must not
    /// distinguish the two.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = match self.get_user_by_username(username)? {
            Some(user) => user,
            None => return Ok(None),
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}
