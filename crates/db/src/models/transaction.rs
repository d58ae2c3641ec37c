//! Account transactions (`savings_account_transactions` table).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use savings_core::account::Transaction;
use savings_core::enums::TransactionType;
use savings_core::error::CoreResult;
use savings_core::types::{DbId, Timestamp};

use super::stored_enum;

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: DbId,
    pub account_id: DbId,
    pub transaction_type: i32,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub running_balance: Decimal,
    pub is_reversed: bool,
    pub is_manual: bool,
    pub account_charge_id: Option<DbId>,
    pub hold_transaction_id: Option<DbId>,
    pub note: Option<String>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TransactionRow {
    pub fn into_transaction(self) -> CoreResult<Transaction> {
        Ok(Transaction {
            id: Some(self.id),
            transaction_type: stored_enum(
                "transactionType",
                self.transaction_type,
                TransactionType::try_from_id,
            )?,
            date: self.transaction_date,
            amount: self.amount,
            running_balance: self.running_balance,
            reversed: self.is_reversed,
            is_manual: self.is_manual,
            account_charge_id: self.account_charge_id,
            hold_transaction_id: self.hold_transaction_id,
            note: self.note,
        })
    }
}
