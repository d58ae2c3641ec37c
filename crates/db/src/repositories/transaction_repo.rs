//! Repository for the `savings_account_transactions` table.

use sqlx::{PgConnection, PgPool};
use savings_core::account::Transaction;
use savings_core::types::DbId;

use crate::models::transaction::TransactionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, account_id, transaction_type, transaction_date, amount, \
                       running_balance, is_reversed, is_manual, account_charge_id, \
                       hold_transaction_id, note, created_by, created_at, updated_at";

pub struct TransactionRepo;

impl TransactionRepo {
    /// All transactions of an account in insertion order.
    pub async fn list_for_account(
        conn: &mut PgConnection,
        account_id: DbId,
    ) -> Result<Vec<TransactionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM savings_account_transactions WHERE account_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, TransactionRow>(&query)
            .bind(account_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        account_id: DbId,
        id: DbId,
    ) -> Result<Option<TransactionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM savings_account_transactions WHERE id = $1 AND account_id = $2"
        );
        sqlx::query_as::<_, TransactionRow>(&query)
            .bind(id)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist the in-memory transaction list: insert unsaved entries
    /// (assigning their IDs) and rewrite the mutable columns of the rest.
    pub async fn sync(
        conn: &mut PgConnection,
        account_id: DbId,
        transactions: &mut [Transaction],
        created_by: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        for tx in transactions.iter_mut() {
            match tx.id {
                Some(id) => {
                    sqlx::query(
                        "UPDATE savings_account_transactions SET
                            transaction_date = $3, amount = $4, running_balance = $5,
                            is_reversed = $6, note = $7
                         WHERE id = $1 AND account_id = $2",
                    )
                    .bind(id)
                    .bind(account_id)
                    .bind(tx.date)
                    .bind(tx.amount)
                    .bind(tx.running_balance)
                    .bind(tx.reversed)
                    .bind(&tx.note)
                    .execute(&mut *conn)
                    .await?;
                }
                None => {
                    let id: DbId = sqlx::query_scalar(
                        "INSERT INTO savings_account_transactions
                            (account_id, transaction_type, transaction_date, amount,
                             running_balance, is_reversed, is_manual, account_charge_id,
                             hold_transaction_id, note, created_by)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                         RETURNING id",
                    )
                    .bind(account_id)
                    .bind(tx.transaction_type.id())
                    .bind(tx.date)
                    .bind(tx.amount)
                    .bind(tx.running_balance)
                    .bind(tx.reversed)
                    .bind(tx.is_manual)
                    .bind(tx.account_charge_id)
                    .bind(tx.hold_transaction_id)
                    .bind(&tx.note)
                    .bind(created_by)
                    .fetch_one(&mut *conn)
                    .await?;
                    tx.id = Some(id);
                }
            }
        }
        Ok(())
    }
}
