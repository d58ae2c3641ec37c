//! Savings, fixed deposit and recurring deposit product definitions.

use savings_core::charges::ChargeDefinition;
use savings_core::enums::DepositAccountType;
use savings_core::error::{CoreError, CoreResult};
use savings_core::fixed_deposit::InterestRateChart;
use savings_core::types::DbId;
use savings_db::models::interest_rate_chart::assemble_charts;
use savings_db::models::product::{ChargeRef, CreateProduct, SavingsProduct, UpdateProduct};
use savings_db::repositories::{ChargeRepo, InterestRateChartRepo, ProductRepo};
use sqlx::{PgConnection, PgPool};

use crate::commands::{self, CommandProcessingResult, CommandWrapper};
use crate::error::AppResult;
use crate::views::ProductData;

/// Not-found label for products of `deposit_type`.
pub fn product_noun(deposit_type: DepositAccountType) -> &'static str {
    match deposit_type {
        DepositAccountType::Savings => "SavingsProduct",
        DepositAccountType::FixedDeposit => "FixedDepositProduct",
        DepositAccountType::RecurringDeposit => "RecurringDepositProduct",
    }
}

pub async fn find_product(
    pool: &PgPool,
    deposit_type: DepositAccountType,
    id: DbId,
) -> AppResult<SavingsProduct> {
    Ok(ProductRepo::find_by_id(pool, deposit_type, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: product_noun(deposit_type),
            id,
        })?)
}

/// Interest rate charts of a product, oldest first.
pub async fn product_charts(pool: &PgPool, product_id: DbId) -> AppResult<Vec<InterestRateChart>> {
    let (charts, slabs) = InterestRateChartRepo::list_rows(pool, product_id).await?;
    Ok(assemble_charts(charts, slabs)?)
}

/// Charge definitions attached to a product.
pub async fn product_charges(pool: &PgPool, product_id: DbId) -> AppResult<Vec<ChargeDefinition>> {
    let ids = ProductRepo::list_charge_ids(pool, product_id).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let charges = ChargeRepo::find_many(pool, &ids).await?;
    Ok(charges
        .iter()
        .map(|c| c.to_definition())
        .collect::<CoreResult<Vec<_>>>()?)
}

pub async fn product_view(pool: &PgPool, product: &SavingsProduct) -> AppResult<ProductData> {
    let deposit_type = product.deposit_type()?;
    let charts = if deposit_type == DepositAccountType::Savings {
        Vec::new()
    } else {
        product_charts(pool, product.id).await?
    };
    let charges = product_charges(pool, product.id).await?;
    Ok(ProductData::build(product, charts, charges)?)
}

fn validate_charts(deposit_type: DepositAccountType, charts: &[InterestRateChart]) -> CoreResult<()> {
    if deposit_type == DepositAccountType::Savings && !charts.is_empty() {
        return Err(CoreError::Validation(
            "charts are only supported on fixed and recurring deposit products".into(),
        ));
    }
    charts.iter().try_for_each(InterestRateChart::validate)
}

/// Resolve `refs` to charge ids, checking each exists and shares the
/// product currency.
async fn resolve_charges(pool: &PgPool, refs: &[ChargeRef], currency: &str) -> AppResult<Vec<DbId>> {
    let ids: Vec<DbId> = refs.iter().map(|r| r.id).collect();
    if ids.is_empty() {
        return Ok(ids);
    }
    let found = ChargeRepo::find_many(pool, &ids).await?;
    for id in &ids {
        let charge = found
            .iter()
            .find(|c| c.id == *id)
            .ok_or(CoreError::NotFound { entity: "Charge", id: *id })?;
        if !charge.currency_code.eq_ignore_ascii_case(currency) {
            return Err(CoreError::rule(
                "savingsproduct.charge.currency.mismatch",
                format!(
                    "Charge {} uses currency {} but the product uses {currency}",
                    charge.id, charge.currency_code
                ),
            )
            .into());
        }
    }
    Ok(ids)
}

fn validate_product(product: &SavingsProduct) -> CoreResult<()> {
    product.terms()?.validate()?;
    if product.deposit_type()? != DepositAccountType::Savings {
        product.deposit_terms()?.validate()?;
    }
    Ok(())
}

pub async fn create_product(
    pool: &PgPool,
    deposit_type: DepositAccountType,
    command: &CommandWrapper,
    input: &CreateProduct,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    if input.name.trim().is_empty() || input.short_name.trim().is_empty() {
        return Err(CoreError::Validation("name and shortName are required".into()).into());
    }
    if input.currency_code.trim().len() != 3 {
        return Err(CoreError::Validation("currencyCode must be a 3-letter ISO code".into()).into());
    }
    if !(0..=6).contains(&input.digits_after_decimal) {
        return Err(CoreError::Validation("digitsAfterDecimal must be between 0 and 6".into()).into());
    }
    input.terms.validate()?;
    if deposit_type != DepositAccountType::Savings {
        input.deposit_terms.validate()?;
    }
    validate_charts(deposit_type, &input.charts)?;
    let charge_ids = resolve_charges(pool, &input.charges, &input.currency_code).await?;

    let mut tx = pool.begin().await?;
    let product = ProductRepo::create(&mut tx, deposit_type, input).await?;
    write_children(&mut tx, product.id, Some(&input.charts), Some(&charge_ids)).await?;
    let result = CommandProcessingResult::resource(product.id);
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(product_id = product.id, deposit_type = ?deposit_type, "Product created");
    Ok(result)
}

pub async fn update_product(
    pool: &PgPool,
    deposit_type: DepositAccountType,
    id: DbId,
    command: &CommandWrapper,
    input: &UpdateProduct,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let existing = find_product(pool, deposit_type, id).await?;
    if let Some(charts) = &input.charts {
        validate_charts(deposit_type, charts)?;
    }
    let charge_ids = match &input.charges {
        Some(refs) => Some(resolve_charges(pool, refs, &existing.currency_code).await?),
        None => None,
    };

    let mut tx = pool.begin().await?;
    let product = ProductRepo::update(&mut tx, deposit_type, id, input)
        .await?
        .ok_or(CoreError::NotFound {
            entity: product_noun(deposit_type),
            id,
        })?;
    validate_product(&product)?;
    write_children(&mut tx, id, input.charts.as_deref(), charge_ids.as_deref()).await?;

    let mut result = CommandProcessingResult::resource(id);
    if let Some(changes) = command.json.as_object() {
        result.changes = changes.clone();
    }
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(product_id = id, "Product updated");
    Ok(result)
}

pub async fn delete_product(
    pool: &PgPool,
    deposit_type: DepositAccountType,
    id: DbId,
    command: &CommandWrapper,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut tx = pool.begin().await?;
    if !ProductRepo::delete(&mut tx, deposit_type, id).await? {
        return Err(CoreError::NotFound {
            entity: product_noun(deposit_type),
            id,
        }
        .into());
    }
    let result = CommandProcessingResult::resource(id);
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(product_id = id, "Product deleted");
    Ok(result)
}

async fn write_children(
    conn: &mut PgConnection,
    product_id: DbId,
    charts: Option<&[InterestRateChart]>,
    charge_ids: Option<&[DbId]>,
) -> AppResult<()> {
    if let Some(charts) = charts {
        InterestRateChartRepo::replace_for_product(conn, product_id, charts).await?;
    }
    if let Some(ids) = charge_ids {
        ProductRepo::set_charges(conn, product_id, ids).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn chart() -> InterestRateChart {
        InterestRateChart {
            id: None,
            name: Some("Standard".into()),
            description: None,
            from_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            slabs: Vec::new(),
        }
    }

    #[test]
    fn savings_products_take_no_charts() {
        assert!(validate_charts(DepositAccountType::Savings, &[]).is_ok());
        assert!(validate_charts(DepositAccountType::Savings, &[chart()]).is_err());
        assert!(validate_charts(DepositAccountType::FixedDeposit, &[chart()]).is_ok());
    }

    #[test]
    fn charts_are_validated() {
        let mut bad = chart();
        bad.end_date = NaiveDate::from_ymd_opt(2023, 1, 1);
        assert!(validate_charts(DepositAccountType::RecurringDeposit, &[bad]).is_err());
    }
}
