//! Invoice metadata operations

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{format_datetime, now_utc, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Invoice;

fn row_to_invoice(row: &rusqlite::Row) -> rusqlite::Result<Invoice> {
    let upload_date_str: String = row.get(2)?;
    Ok(Invoice {
        id: row.get(0)?,
        filename: row.get(1)?,
        upload_date: parse_datetime(&upload_date_str),
        user_id: row.get(3)?,
    })
}

impl Database {
    /// Record an uploaded invoice file (committed immediately)
    pub fn create_invoice(&self, user_id: i64, filename: &str) -> Result<Invoice> {
        if filename.trim().is_empty() {
            return Err(Error::InvalidData("Invoice filename is required".into()));
        }

        let upload_date = now_utc();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO invoices (filename, upload_date, user_id) VALUES (?, ?, ?)",
            params![filename, format_datetime(&upload_date), user_id],
        )?;
        let id = conn.last_insert_rowid();

        debug!(invoice_id = id, user_id, filename = %filename, "Stored invoice");

        Ok(Invoice {
            id,
            filename: filename.to_string(),
            upload_date,
            user_id,
        })
    }

    /// Get an invoice by ID, scoped to its owner
    pub fn get_invoice(&self, user_id: i64, invoice_id: i64) -> Result<Option<Invoice>> {
        let conn = self.conn()?;
        let invoice = conn
            .query_row(
                "SELECT id, filename, upload_date, user_id FROM invoices WHERE id = ? AND user_id = ?",
                params![invoice_id, user_id],
                row_to_invoice,
            )
            .optional()?;
        Ok(invoice)
    }

    /// List a user's invoices, newest first
    pub fn list_invoices(&self, user_id: i64) -> Result<Vec<Invoice>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, upload_date, user_id FROM invoices WHERE user_id = ? ORDER BY upload_date DESC, id DESC",
        )?;

        let invoices = stmt
            .query_map(params![user_id], row_to_invoice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(invoices)
    }
}
