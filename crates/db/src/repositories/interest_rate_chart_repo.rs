//! Repository for the `interest_rate_charts` and `interest_rate_slabs` tables.

use sqlx::{PgConnection, PgPool};
use savings_core::fixed_deposit::InterestRateChart;
use savings_core::types::DbId;

use crate::models::interest_rate_chart::{InterestRateChartRow, InterestRateSlabRow};

const CHART_COLUMNS: &str =
    "id, product_id, name, description, from_date, end_date, created_at, updated_at";

const SLAB_COLUMNS: &str = "id, chart_id, description, period_type, from_period, to_period, \
                            amount_range_from, amount_range_to, annual_interest_rate, \
                            created_at, updated_at";

/// Charts are always written as a whole set per product.
pub struct InterestRateChartRepo;

impl InterestRateChartRepo {
    /// Chart and slab rows for a product, charts ordered by `from_date`.
    pub async fn list_rows(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<(Vec<InterestRateChartRow>, Vec<InterestRateSlabRow>), sqlx::Error> {
        let query = format!(
            "SELECT {CHART_COLUMNS} FROM interest_rate_charts
             WHERE product_id = $1 ORDER BY from_date, id"
        );
        let charts = sqlx::query_as::<_, InterestRateChartRow>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await?;

        let query = format!(
            "SELECT {SLAB_COLUMNS} FROM interest_rate_slabs
             WHERE chart_id IN (SELECT id FROM interest_rate_charts WHERE product_id = $1)
             ORDER BY id"
        );
        let slabs = sqlx::query_as::<_, InterestRateSlabRow>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await?;
        Ok((charts, slabs))
    }

    /// Replace every chart of a product with `charts`.
    pub async fn replace_for_product(
        conn: &mut PgConnection,
        product_id: DbId,
        charts: &[InterestRateChart],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM interest_rate_charts WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for chart in charts {
            let chart_id: DbId = sqlx::query_scalar(
                "INSERT INTO interest_rate_charts (product_id, name, description, from_date, end_date)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(product_id)
            .bind(&chart.name)
            .bind(&chart.description)
            .bind(chart.from_date)
            .bind(chart.end_date)
            .fetch_one(&mut *conn)
            .await?;

            for slab in &chart.slabs {
                sqlx::query(
                    "INSERT INTO interest_rate_slabs
                        (chart_id, description, period_type, from_period, to_period,
                         amount_range_from, amount_range_to, annual_interest_rate)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(chart_id)
                .bind(&slab.description)
                .bind(slab.period_type.map(|p| p.id()))
                .bind(slab.from_period)
                .bind(slab.to_period)
                .bind(slab.amount_range_from)
                .bind(slab.amount_range_to)
                .bind(slab.annual_interest_rate)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }
}
