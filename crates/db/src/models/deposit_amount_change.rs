//! Recurring deposit installment amount changes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use savings_core::recurring_deposit::DepositAmountChange;
use savings_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct DepositAmountChangeRow {
    pub id: DbId,
    pub account_id: DbId,
    pub effective_date: NaiveDate,
    pub deposit_amount: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<DepositAmountChangeRow> for DepositAmountChange {
    fn from(row: DepositAmountChangeRow) -> Self {
        Self {
            id: Some(row.id),
            effective_date: row.effective_date,
            deposit_amount: row.deposit_amount,
        }
    }
}
