//! Repository for the `charges` table.

use sqlx::{PgConnection, PgPool};
use savings_core::charges::ChargeDefinition;
use savings_core::types::DbId;

use crate::models::charge::Charge;
use crate::models::to_i32;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, currency_code, amount, charge_time_type, \
                       charge_calculation_type, active, penalty, fee_on_month, fee_on_day, \
                       fee_interval, created_at, updated_at";

/// Provides CRUD operations for charge definitions.
pub struct ChargeRepo;

impl ChargeRepo {
    /// Insert a validated definition, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        def: &ChargeDefinition,
    ) -> Result<Charge, sqlx::Error> {
        let query = format!(
            "INSERT INTO charges
                (name, currency_code, amount, charge_time_type, charge_calculation_type,
                 active, penalty, fee_on_month, fee_on_day, fee_interval)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Charge>(&query)
            .bind(&def.name)
            .bind(&def.currency_code)
            .bind(def.amount)
            .bind(def.charge_time_type.id())
            .bind(def.charge_calculation_type.id())
            .bind(def.active)
            .bind(def.penalty)
            .bind(to_i32(def.fee_on_month))
            .bind(to_i32(def.fee_on_day))
            .bind(def.fee_interval)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Charge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM charges WHERE id = $1");
        sqlx::query_as::<_, Charge>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Definitions with the given IDs, in ID order. Missing IDs are skipped.
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Charge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM charges WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Charge>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Charge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM charges ORDER BY name");
        sqlx::query_as::<_, Charge>(&query).fetch_all(pool).await
    }

    /// Overwrite the mutable columns of a definition with `def`.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        def: &ChargeDefinition,
    ) -> Result<Option<Charge>, sqlx::Error> {
        let query = format!(
            "UPDATE charges SET
                name = $2, amount = $3, active = $4, penalty = $5,
                fee_on_month = $6, fee_on_day = $7, fee_interval = $8
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Charge>(&query)
            .bind(id)
            .bind(&def.name)
            .bind(def.amount)
            .bind(def.active)
            .bind(def.penalty)
            .bind(to_i32(def.fee_on_month))
            .bind(to_i32(def.fee_on_day))
            .bind(def.fee_interval)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Delete a definition. Returns `true` if a row was removed.
    ///
    /// Fails with a foreign-key violation while products or accounts use it.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM charges WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
