//! Repository for the `savings_account_charges` table.

use sqlx::PgConnection;
use savings_core::charges::AccountCharge;
use savings_core::types::DbId;

use crate::models::account_charge::AccountChargeRow;
use crate::models::to_i32;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, account_id, charge_id, name, charge_time_type, \
                       charge_calculation_type, percentage, amount, amount_paid, amount_waived, \
                       amount_outstanding, due_date, fee_on_month, fee_on_day, fee_interval, \
                       penalty, active, paid, waived, inactivated_on, created_at, updated_at";

pub struct AccountChargeRepo;

impl AccountChargeRepo {
    pub async fn list_for_account(
        conn: &mut PgConnection,
        account_id: DbId,
    ) -> Result<Vec<AccountChargeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM savings_account_charges WHERE account_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, AccountChargeRow>(&query)
            .bind(account_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Persist the in-memory charge list: delete rows no longer present,
    /// update saved charges and insert new ones (assigning their IDs).
    pub async fn sync(
        conn: &mut PgConnection,
        account_id: DbId,
        charges: &mut [AccountCharge],
    ) -> Result<(), sqlx::Error> {
        let kept: Vec<DbId> = charges.iter().filter_map(|c| c.id).collect();
        sqlx::query("DELETE FROM savings_account_charges WHERE account_id = $1 AND NOT (id = ANY($2))")
            .bind(account_id)
            .bind(&kept)
            .execute(&mut *conn)
            .await?;

        for charge in charges.iter_mut() {
            match charge.id {
                Some(id) => {
                    sqlx::query(
                        "UPDATE savings_account_charges SET
                            percentage = $3, amount = $4, amount_paid = $5, amount_waived = $6,
                            amount_outstanding = $7, due_date = $8, active = $9, paid = $10,
                            waived = $11, inactivated_on = $12
                         WHERE id = $1 AND account_id = $2",
                    )
                    .bind(id)
                    .bind(account_id)
                    .bind(charge.percentage)
                    .bind(charge.amount)
                    .bind(charge.amount_paid)
                    .bind(charge.amount_waived)
                    .bind(charge.amount_outstanding)
                    .bind(charge.due_date)
                    .bind(charge.active)
                    .bind(charge.paid)
                    .bind(charge.waived)
                    .bind(charge.inactivated_on)
                    .execute(&mut *conn)
                    .await?;
                }
                None => {
                    let id: DbId = sqlx::query_scalar(
                        "INSERT INTO savings_account_charges
                            (account_id, charge_id, name, charge_time_type, charge_calculation_type,
                             percentage, amount, amount_paid, amount_waived, amount_outstanding,
                             due_date, fee_on_month, fee_on_day, fee_interval, penalty, active,
                             paid, waived, inactivated_on)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                                 $15, $16, $17, $18, $19)
                         RETURNING id",
                    )
                    .bind(account_id)
                    .bind(charge.charge_id)
                    .bind(&charge.name)
                    .bind(charge.time_type.id())
                    .bind(charge.calculation_type.id())
                    .bind(charge.percentage)
                    .bind(charge.amount)
                    .bind(charge.amount_paid)
                    .bind(charge.amount_waived)
                    .bind(charge.amount_outstanding)
                    .bind(charge.due_date)
                    .bind(to_i32(charge.fee_on_month))
                    .bind(to_i32(charge.fee_on_day))
                    .bind(charge.fee_interval)
                    .bind(charge.penalty)
                    .bind(charge.active)
                    .bind(charge.paid)
                    .bind(charge.waived)
                    .bind(charge.inactivated_on)
                    .fetch_one(&mut *conn)
                    .await?;
                    charge.id = Some(id);
                }
            }
        }
        Ok(())
    }
}
