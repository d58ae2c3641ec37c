//! Interest rate charts and their slabs, owned by deposit products.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use savings_core::enums::PeriodFrequency;
use savings_core::error::CoreResult;
use savings_core::fixed_deposit::{InterestRateChart, InterestRateSlab};
use savings_core::types::{DbId, Timestamp};

use super::stored_opt_enum;

/// A row from the `interest_rate_charts` table.
#[derive(Debug, Clone, FromRow)]
pub struct InterestRateChartRow {
    pub id: DbId,
    pub product_id: DbId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub from_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `interest_rate_slabs` table.
#[derive(Debug, Clone, FromRow)]
pub struct InterestRateSlabRow {
    pub id: DbId,
    pub chart_id: DbId,
    pub description: Option<String>,
    pub period_type: Option<i32>,
    pub from_period: Option<i32>,
    pub to_period: Option<i32>,
    pub amount_range_from: Option<Decimal>,
    pub amount_range_to: Option<Decimal>,
    pub annual_interest_rate: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl InterestRateSlabRow {
    pub fn into_slab(self) -> CoreResult<InterestRateSlab> {
        Ok(InterestRateSlab {
            id: Some(self.id),
            description: self.description,
            period_type: stored_opt_enum("periodType", self.period_type, PeriodFrequency::try_from_id)?,
            from_period: self.from_period,
            to_period: self.to_period,
            amount_range_from: self.amount_range_from,
            amount_range_to: self.amount_range_to,
            annual_interest_rate: self.annual_interest_rate,
        })
    }
}

impl InterestRateChartRow {
    /// Assemble the domain chart from this row and its slab rows.
    pub fn into_chart(self, slabs: Vec<InterestRateSlabRow>) -> CoreResult<InterestRateChart> {
        let slabs = slabs
            .into_iter()
            .filter(|s| s.chart_id == self.id)
            .map(InterestRateSlabRow::into_slab)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(InterestRateChart {
            id: Some(self.id),
            name: self.name,
            description: self.description,
            from_date: self.from_date,
            end_date: self.end_date,
            slabs,
        })
    }
}

/// Assemble charts from the row sets returned by
/// [`InterestRateChartRepo::list_rows`](crate::repositories::InterestRateChartRepo::list_rows).
pub fn assemble_charts(
    charts: Vec<InterestRateChartRow>,
    slabs: Vec<InterestRateSlabRow>,
) -> CoreResult<Vec<InterestRateChart>> {
    charts
        .into_iter()
        .map(|chart| chart.into_chart(slabs.clone()))
        .collect()
}
