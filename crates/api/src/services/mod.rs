//! Write-side services shared by the handlers.
//!
//! Each service function validates its input, applies the change through the
//! domain aggregate inside one database transaction and records the command
//! in the audit trail before committing.

pub mod account_charges;
pub mod account_tx;
pub mod accounts;
pub mod charges;
pub mod import;
pub mod products;
pub mod transactions;

use chrono::{NaiveDate, Utc};

/// The business date used for "today" checks (future-date rules, maturity).
pub fn business_date() -> NaiveDate {
    Utc::now().date_naive()
}
