//! Category operations: default seeding, create, list, reassign-then-delete

use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::{info, warn};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Category, DeleteCategoryResult, DEFAULT_CATEGORIES, OTHER_CATEGORY};

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
    })
}

impl Database {
    /// Seed the default categories for a user who owns none (idempotent)
    ///
    /// Returns the number of categories created.
    pub fn ensure_default_categories(&self, user_id: i64) -> Result<usize> {
        let mut conn = self.conn()?;
        // Take the write lock before counting so concurrent first logins serialize
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM categories WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        if existing > 0 {
            return Ok(0);
        }

        {
            let mut stmt = tx.prepare("INSERT INTO categories (name, user_id) VALUES (?, ?)")?;
            for name in DEFAULT_CATEGORIES {
                stmt.execute(params![name, user_id])?;
            }
        }
        tx.commit()?;

        info!(user_id, count = DEFAULT_CATEGORIES.len(), "Seeded default categories");
        Ok(DEFAULT_CATEGORIES.len())
    }

    /// Seed defaults for every user that has no categories yet
    ///
    /// Returns the number of users that were seeded.
    pub fn backfill_default_categories(&self) -> Result<usize> {
        let user_ids: Vec<i64> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT u.id FROM users u
                WHERE NOT EXISTS (SELECT 1 FROM categories c WHERE c.user_id = u.id)
                ORDER BY u.id
                "#,
            )?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids
        };

        let mut seeded = 0;
        for user_id in user_ids {
            if self.ensure_default_categories(user_id)? > 0 {
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    /// Create a category for a user
    pub fn create_category(&self, user_id: i64, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Name is required".into()));
        }

        if self.get_category_by_name(user_id, name)?.is_some() {
            return Err(Error::DuplicateCategory(name.to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (name, user_id) VALUES (?, ?)",
            params![name, user_id],
        )
        .map_err(|e| match e {
            // Lost a race with a concurrent insert of the same name
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::DuplicateCategory(name.to_string())
            }
            other => Error::Database(other),
        })?;

        Ok(Category {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            user_id,
        })
    }

    /// List a user's categories in creation order
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, user_id FROM categories WHERE user_id = ? ORDER BY id")?;

        let categories = stmt
            .query_map(params![user_id], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a category by ID, scoped to its owner
    pub fn get_category(&self, user_id: i64, category_id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, user_id FROM categories WHERE id = ? AND user_id = ?",
                params![category_id, user_id],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Get a category by exact name, scoped to its owner
    pub fn get_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, user_id FROM categories WHERE user_id = ? AND name = ?",
                params![user_id, name],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Delete a category, moving its spendings to the user's "Other" category
    ///
    /// The reassignment and the delete commit together or not at all.
    pub fn delete_category(&self, user_id: i64, category_id: i64) -> Result<DeleteCategoryResult> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let category = tx
            .query_row(
                "SELECT id, name, user_id FROM categories WHERE id = ? AND user_id = ?",
                params![category_id, user_id],
                row_to_category,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Category {}", category_id)))?;

        if category.is_fallback() {
            return Err(Error::ProtectedCategory);
        }

        let attached: i64 = tx.query_row(
            "SELECT COUNT(*) FROM spendings WHERE category_id = ?",
            params![category_id],
            |row| row.get(0),
        )?;

        let mut spendings_moved = 0;
        if attached > 0 {
            let other_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM categories WHERE user_id = ? AND name = ?",
                    params![user_id, OTHER_CATEGORY],
                    |row| row.get(0),
                )
                .optional()?;

            let other_id = match other_id {
                Some(id) => id,
                None => {
                    warn!(user_id, category_id, "Fallback category missing, refusing delete");
                    return Err(Error::MissingFallback(user_id));
                }
            };

            spendings_moved = tx.execute(
                "UPDATE spendings SET category_id = ? WHERE category_id = ?",
                params![other_id, category_id],
            )?;
        }

        tx.execute(
            "DELETE FROM categories WHERE id = ? AND user_id = ?",
            params![category_id, user_id],
        )?;
        tx.commit()?;

        info!(
            user_id,
            category_id,
            spendings_moved,
            "Deleted category"
        );

        Ok(DeleteCategoryResult {
            deleted_category_id: category_id,
            spendings_moved,
        })
    }
}
