//! Repository for the `savings_products` and `product_charges` tables.
//!
//! Every query is scoped by `deposit_type` so a fixed deposit product is
//! never visible through the savings product endpoints and vice versa.

use sqlx::{PgConnection, PgPool};
use savings_core::enums::DepositAccountType;
use savings_core::types::DbId;

use crate::models::product::{CreateProduct, SavingsProduct, UpdateProduct};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, deposit_type, name, short_name, description, currency_code, currency_digits, \
    in_multiples_of, nominal_annual_interest_rate, interest_compounding_period_type, \
    interest_posting_period_type, interest_calculation_type, \
    interest_calculation_days_in_year_type, min_required_opening_balance, \
    lockin_period_frequency, lockin_period_frequency_type, withdrawal_fee_for_transfers, \
    allow_overdraft, overdraft_limit, enforce_min_required_balance, min_required_balance, \
    min_balance_for_interest_calculation, withhold_tax, tax_rate, min_deposit_amount, \
    max_deposit_amount, default_deposit_amount, min_deposit_term, min_deposit_term_type, \
    max_deposit_term, max_deposit_term_type, in_multiples_of_deposit_term, \
    in_multiples_of_deposit_term_type, pre_closure_penal_applicable, \
    pre_closure_penal_interest, pre_closure_penal_interest_on_type, is_mandatory_deposit, \
    allow_withdrawal, adjust_advance_towards_future_payments, created_at, updated_at";

/// Provides CRUD operations for products.
pub struct ProductRepo;

impl ProductRepo {
    /// Insert a new product, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        input: &CreateProduct,
    ) -> Result<SavingsProduct, sqlx::Error> {
        let terms = &input.terms;
        let deposit = &input.deposit_terms;
        let query = format!(
            "INSERT INTO savings_products (
                deposit_type, name, short_name, description, currency_code, currency_digits,
                in_multiples_of, nominal_annual_interest_rate, interest_compounding_period_type,
                interest_posting_period_type, interest_calculation_type,
                interest_calculation_days_in_year_type, min_required_opening_balance,
                lockin_period_frequency, lockin_period_frequency_type,
                withdrawal_fee_for_transfers, allow_overdraft, overdraft_limit,
                enforce_min_required_balance, min_required_balance,
                min_balance_for_interest_calculation, withhold_tax, tax_rate,
                min_deposit_amount, max_deposit_amount, default_deposit_amount,
                min_deposit_term, min_deposit_term_type, max_deposit_term, max_deposit_term_type,
                in_multiples_of_deposit_term, in_multiples_of_deposit_term_type,
                pre_closure_penal_applicable, pre_closure_penal_interest,
                pre_closure_penal_interest_on_type, is_mandatory_deposit, allow_withdrawal,
                adjust_advance_towards_future_payments)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                     $31, $32, $33, $34, $35, COALESCE($36, FALSE), COALESCE($37, FALSE),
                     COALESCE($38, TRUE))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SavingsProduct>(&query)
            .bind(deposit_type.id())
            .bind(&input.name)
            .bind(&input.short_name)
            .bind(&input.description)
            .bind(&input.currency_code)
            .bind(input.digits_after_decimal)
            .bind(input.in_multiples_of)
            .bind(terms.nominal_annual_interest_rate)
            .bind(terms.interest_compounding_period_type.id())
            .bind(terms.interest_posting_period_type.id())
            .bind(terms.interest_calculation_type.id())
            .bind(terms.interest_calculation_days_in_year_type.id())
            .bind(terms.min_required_opening_balance)
            .bind(terms.lockin_period_frequency)
            .bind(terms.lockin_period_frequency_type.map(|f| f.id()))
            .bind(terms.withdrawal_fee_for_transfers)
            .bind(terms.allow_overdraft)
            .bind(terms.overdraft_limit)
            .bind(terms.enforce_min_required_balance)
            .bind(terms.min_required_balance)
            .bind(terms.min_balance_for_interest_calculation)
            .bind(terms.withhold_tax)
            .bind(terms.tax_rate)
            .bind(deposit.min_deposit_amount)
            .bind(deposit.max_deposit_amount)
            .bind(deposit.default_deposit_amount)
            .bind(deposit.min_deposit_term)
            .bind(deposit.min_deposit_term_type_id.map(|f| f.id()))
            .bind(deposit.max_deposit_term)
            .bind(deposit.max_deposit_term_type_id.map(|f| f.id()))
            .bind(deposit.in_multiples_of_deposit_term)
            .bind(deposit.in_multiples_of_deposit_term_type_id.map(|f| f.id()))
            .bind(deposit.pre_closure_penal_applicable)
            .bind(deposit.pre_closure_penal_interest)
            .bind(deposit.pre_closure_penal_interest_on_type_id.map(|t| t.id()))
            .bind(input.is_mandatory_deposit)
            .bind(input.allow_withdrawal)
            .bind(input.adjust_advance_towards_future_payments)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a product of the given deposit type by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        deposit_type: DepositAccountType,
        id: DbId,
    ) -> Result<Option<SavingsProduct>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM savings_products WHERE id = $1 AND deposit_type = $2");
        sqlx::query_as::<_, SavingsProduct>(&query)
            .bind(id)
            .bind(deposit_type.id())
            .fetch_optional(pool)
            .await
    }

    /// List products of one deposit type ordered by name.
    pub async fn list(
        pool: &PgPool,
        deposit_type: DepositAccountType,
    ) -> Result<Vec<SavingsProduct>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM savings_products WHERE deposit_type = $1 ORDER BY name"
        );
        sqlx::query_as::<_, SavingsProduct>(&query)
            .bind(deposit_type.id())
            .fetch_all(pool)
            .await
    }

    /// Update a product. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no product of this deposit type has the given `id`.
    pub async fn update(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        id: DbId,
        input: &UpdateProduct,
    ) -> Result<Option<SavingsProduct>, sqlx::Error> {
        let query = format!(
            "UPDATE savings_products SET
                name = COALESCE($3, name),
                short_name = COALESCE($4, short_name),
                description = COALESCE($5, description),
                in_multiples_of = COALESCE($6, in_multiples_of),
                nominal_annual_interest_rate = COALESCE($7, nominal_annual_interest_rate),
                interest_compounding_period_type = COALESCE($8, interest_compounding_period_type),
                interest_posting_period_type = COALESCE($9, interest_posting_period_type),
                interest_calculation_type = COALESCE($10, interest_calculation_type),
                interest_calculation_days_in_year_type =
                    COALESCE($11, interest_calculation_days_in_year_type),
                min_required_opening_balance = COALESCE($12, min_required_opening_balance),
                lockin_period_frequency = COALESCE($13, lockin_period_frequency),
                lockin_period_frequency_type = COALESCE($14, lockin_period_frequency_type),
                withdrawal_fee_for_transfers = COALESCE($15, withdrawal_fee_for_transfers),
                allow_overdraft = COALESCE($16, allow_overdraft),
                overdraft_limit = COALESCE($17, overdraft_limit),
                enforce_min_required_balance = COALESCE($18, enforce_min_required_balance),
                min_required_balance = COALESCE($19, min_required_balance),
                min_balance_for_interest_calculation =
                    COALESCE($20, min_balance_for_interest_calculation),
                withhold_tax = COALESCE($21, withhold_tax),
                tax_rate = COALESCE($22, tax_rate),
                min_deposit_amount = COALESCE($23, min_deposit_amount),
                max_deposit_amount = COALESCE($24, max_deposit_amount),
                default_deposit_amount = COALESCE($25, default_deposit_amount),
                min_deposit_term = COALESCE($26, min_deposit_term),
                min_deposit_term_type = COALESCE($27, min_deposit_term_type),
                max_deposit_term = COALESCE($28, max_deposit_term),
                max_deposit_term_type = COALESCE($29, max_deposit_term_type),
                in_multiples_of_deposit_term = COALESCE($30, in_multiples_of_deposit_term),
                in_multiples_of_deposit_term_type =
                    COALESCE($31, in_multiples_of_deposit_term_type),
                pre_closure_penal_applicable = COALESCE($32, pre_closure_penal_applicable),
                pre_closure_penal_interest = COALESCE($33, pre_closure_penal_interest),
                pre_closure_penal_interest_on_type =
                    COALESCE($34, pre_closure_penal_interest_on_type),
                is_mandatory_deposit = COALESCE($35, is_mandatory_deposit),
                allow_withdrawal = COALESCE($36, allow_withdrawal),
                adjust_advance_towards_future_payments =
                    COALESCE($37, adjust_advance_towards_future_payments)
             WHERE id = $1 AND deposit_type = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SavingsProduct>(&query)
            .bind(id)
            .bind(deposit_type.id())
            .bind(&input.name)
            .bind(&input.short_name)
            .bind(&input.description)
            .bind(input.in_multiples_of)
            .bind(input.nominal_annual_interest_rate)
            .bind(input.interest_compounding_period_type.map(|v| v.id()))
            .bind(input.interest_posting_period_type.map(|v| v.id()))
            .bind(input.interest_calculation_type.map(|v| v.id()))
            .bind(input.interest_calculation_days_in_year_type.map(|v| v.id()))
            .bind(input.min_required_opening_balance)
            .bind(input.lockin_period_frequency)
            .bind(input.lockin_period_frequency_type.map(|v| v.id()))
            .bind(input.withdrawal_fee_for_transfers)
            .bind(input.allow_overdraft)
            .bind(input.overdraft_limit)
            .bind(input.enforce_min_required_balance)
            .bind(input.min_required_balance)
            .bind(input.min_balance_for_interest_calculation)
            .bind(input.withhold_tax)
            .bind(input.tax_rate)
            .bind(input.min_deposit_amount)
            .bind(input.max_deposit_amount)
            .bind(input.default_deposit_amount)
            .bind(input.min_deposit_term)
            .bind(input.min_deposit_term_type_id.map(|v| v.id()))
            .bind(input.max_deposit_term)
            .bind(input.max_deposit_term_type_id.map(|v| v.id()))
            .bind(input.in_multiples_of_deposit_term)
            .bind(input.in_multiples_of_deposit_term_type_id.map(|v| v.id()))
            .bind(input.pre_closure_penal_applicable)
            .bind(input.pre_closure_penal_interest)
            .bind(input.pre_closure_penal_interest_on_type_id.map(|v| v.id()))
            .bind(input.is_mandatory_deposit)
            .bind(input.allow_withdrawal)
            .bind(input.adjust_advance_towards_future_payments)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Delete a product. Returns `true` if a row was removed.
    ///
    /// Fails with a foreign-key violation while accounts still reference it.
    pub async fn delete(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM savings_products WHERE id = $1 AND deposit_type = $2")
            .bind(id)
            .bind(deposit_type.id())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Product charges
    // -----------------------------------------------------------------------

    /// Replace the charges attached to a product.
    pub async fn set_charges(
        conn: &mut PgConnection,
        product_id: DbId,
        charge_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM product_charges WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        if charge_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO product_charges (product_id, charge_id)
             SELECT $1, UNNEST($2::BIGINT[])
             ON CONFLICT (product_id, charge_id) DO NOTHING",
        )
        .bind(product_id)
        .bind(charge_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// IDs of the charges attached to a product.
    pub async fn list_charge_ids(pool: &PgPool, product_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT charge_id FROM product_charges WHERE product_id = $1 ORDER BY charge_id",
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }
}
