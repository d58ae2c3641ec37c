//! Repository for the `recurring_deposit_amount_changes` table.

use sqlx::PgConnection;
use savings_core::recurring_deposit::DepositAmountChange;
use savings_core::types::DbId;

use crate::models::deposit_amount_change::DepositAmountChangeRow;

const COLUMNS: &str = "id, account_id, effective_date, deposit_amount, created_at, updated_at";

pub struct DepositAmountChangeRepo;

impl DepositAmountChangeRepo {
    pub async fn list_for_account(
        conn: &mut PgConnection,
        account_id: DbId,
    ) -> Result<Vec<DepositAmountChangeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM recurring_deposit_amount_changes
             WHERE account_id = $1 ORDER BY effective_date, id"
        );
        sqlx::query_as::<_, DepositAmountChangeRow>(&query)
            .bind(account_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Drop changes that were superseded in memory and insert the ones
    /// that have no ID yet.
    pub async fn sync(
        conn: &mut PgConnection,
        account_id: DbId,
        changes: &mut [DepositAmountChange],
    ) -> Result<(), sqlx::Error> {
        let kept: Vec<DbId> = changes.iter().filter_map(|c| c.id).collect();
        sqlx::query(
            "DELETE FROM recurring_deposit_amount_changes WHERE account_id = $1 AND NOT (id = ANY($2))",
        )
        .bind(account_id)
        .bind(&kept)
        .execute(&mut *conn)
        .await?;

        for change in changes.iter_mut().filter(|c| c.id.is_none()) {
            let id: DbId = sqlx::query_scalar(
                "INSERT INTO recurring_deposit_amount_changes (account_id, effective_date, deposit_amount)
                 VALUES ($1, $2, $3)
                 RETURNING id",
            )
            .bind(account_id)
            .bind(change.effective_date)
            .bind(change.deposit_amount)
            .fetch_one(&mut *conn)
            .await?;
            change.id = Some(id);
        }
        Ok(())
    }
}
