//! Spending operations: batch insert, month queries, category reassignment

use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, OptionalExtension, ToSql};
use tracing::{debug, info};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{MonthFilter, NewSpending, Spending, OTHER_CATEGORY};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Columns in the order `row_to_spending` reads them
const SPENDING_COLUMNS: &str = r#"
    s.id, s.name, s.date, s.amount, s.category_id,
    COALESCE(c.name, 'Other') AS category_name,
    s.import_date, s.invoice_id, s.user_id
"#;

fn row_to_spending(row: &rusqlite::Row) -> rusqlite::Result<Spending> {
    let date_str: String = row.get(2)?;
    let import_date_str: String = row.get(6)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Spending {
        id: row.get(0)?,
        name: row.get(1)?,
        date,
        amount: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        import_date: parse_datetime(&import_date_str),
        invoice_id: row.get(7)?,
        user_id: row.get(8)?,
    })
}

impl Database {
    /// Insert a batch of spendings in one transaction
    ///
    /// Returns the stored rows with their category names resolved.
    pub fn insert_spendings(&self, spendings: &[NewSpending]) -> Result<Vec<Spending>> {
        if spendings.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut stored = Vec::with_capacity(spendings.len());
        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO spendings (id, name, date, amount, category_id, import_date, invoice_id, user_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            let mut category_name = tx.prepare("SELECT name FROM categories WHERE id = ?")?;

            for s in spendings {
                if s.amount < 0.0 {
                    return Err(Error::InvalidData(format!(
                        "Negative amount {} for '{}'",
                        s.amount, s.name
                    )));
                }

                insert.execute(params![
                    s.id,
                    s.name,
                    s.date.format(DATE_FORMAT).to_string(),
                    s.amount,
                    s.category_id,
                    format_datetime(&s.import_date),
                    s.invoice_id,
                    s.user_id,
                ])?;

                let name: Option<String> = match s.category_id {
                    Some(id) => category_name
                        .query_row(params![id], |row| row.get(0))
                        .optional()?,
                    None => None,
                };

                stored.push(Spending {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    date: s.date,
                    amount: s.amount,
                    category_id: s.category_id,
                    category_name: name.unwrap_or_else(|| OTHER_CATEGORY.to_string()),
                    import_date: s.import_date,
                    invoice_id: s.invoice_id,
                    user_id: s.user_id,
                });
            }
        }
        tx.commit()?;

        debug!(count = stored.len(), "Inserted spendings");
        Ok(stored)
    }

    /// List a user's spendings, newest first, optionally limited to one month
    pub fn list_spendings(&self, user_id: i64, month: Option<&MonthFilter>) -> Result<Vec<Spending>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {} FROM spendings s LEFT JOIN categories c ON s.category_id = c.id WHERE s.user_id = ?",
            SPENDING_COLUMNS
        );
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];

        if let Some(filter) = month {
            sql.push_str(" AND s.date >= ? AND s.date < ?");
            params_vec.push(Box::new(filter.start().format(DATE_FORMAT).to_string()));
            params_vec.push(Box::new(filter.end().format(DATE_FORMAT).to_string()));
        }

        sql.push_str(" ORDER BY s.date DESC, s.import_date DESC, s.id");

        let mut stmt = conn.prepare(&sql)?;
        let spendings = stmt
            .query_map(params_from_iter(params_vec.iter()), row_to_spending)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(spendings)
    }

    /// Get a spending by ID, scoped to its owner
    pub fn get_spending(&self, user_id: i64, spending_id: &str) -> Result<Option<Spending>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM spendings s LEFT JOIN categories c ON s.category_id = c.id WHERE s.id = ? AND s.user_id = ?",
            SPENDING_COLUMNS
        );
        let spending = conn
            .query_row(&sql, params![spending_id, user_id], row_to_spending)
            .optional()?;
        Ok(spending)
    }

    /// Move one spending to the named category
    pub fn reassign_spending(
        &self,
        user_id: i64,
        spending_id: &str,
        category_name: &str,
    ) -> Result<Spending> {
        if self.get_spending(user_id, spending_id)?.is_none() {
            return Err(Error::NotFound(format!("Spending {}", spending_id)));
        }

        let category = self
            .get_category_by_name(user_id, category_name)?
            .ok_or_else(|| Error::NotFound(format!("Category '{}'", category_name)))?;

        {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE spendings SET category_id = ? WHERE id = ? AND user_id = ?",
                params![category.id, spending_id, user_id],
            )?;
        }

        self.get_spending(user_id, spending_id)?
            .ok_or_else(|| Error::NotFound(format!("Spending {}", spending_id)))
    }

    /// Move many spendings to the named category
    ///
    /// Ids that do not exist or belong to another user are skipped. Returns
    /// the number of rows actually updated.
    pub fn reassign_spendings(
        &self,
        user_id: i64,
        spending_ids: &[String],
        category_name: &str,
    ) -> Result<usize> {
        let category = self
            .get_category_by_name(user_id, category_name)?
            .ok_or_else(|| Error::NotFound(format!("Category '{}'", category_name)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut updated = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE spendings SET category_id = ? WHERE id = ? AND user_id = ?")?;
            for id in spending_ids {
                updated += stmt.execute(params![category.id, id, user_id])?;
            }
        }
        tx.commit()?;

        info!(
            user_id,
            requested = spending_ids.len(),
            updated,
            category = %category.name,
            "Bulk reassigned spendings"
        );
        Ok(updated)
    }

    /// Count the spendings extracted from one invoice
    pub fn count_spendings_for_invoice(&self, invoice_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM spendings WHERE invoice_id = ?",
            params![invoice_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
