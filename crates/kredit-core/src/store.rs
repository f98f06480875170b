//! Store interfaces used by the ingestion workflow
//!
//! `Database` implements all three. Tests and alternative backends can supply
//! their own implementations; the workflow never issues SQL itself.

use crate::db::Database;
use crate::error::Result;
use crate::models::{Category, Invoice, NewSpending, Spending};

pub trait CategoryStore {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>>;
    fn get_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>>;
}

pub trait InvoiceStore {
    /// Persist the invoice record; must be durable when this returns
    fn create_invoice(&self, user_id: i64, filename: &str) -> Result<Invoice>;
}

pub trait SpendingStore {
    /// Persist a batch atomically
    fn insert_spendings(&self, spendings: &[NewSpending]) -> Result<Vec<Spending>>;
}

impl CategoryStore for Database {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        Database::list_categories(self, user_id)
    }

    fn get_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>> {
        Database::get_category_by_name(self, user_id, name)
    }
}

impl InvoiceStore for Database {
    fn create_invoice(&self, user_id: i64, filename: &str) -> Result<Invoice> {
        Database::create_invoice(self, user_id, filename)
    }
}

impl SpendingStore for Database {
    fn insert_spendings(&self, spendings: &[NewSpending]) -> Result<Vec<Spending>> {
        Database::insert_spendings(self, spendings)
    }
}
