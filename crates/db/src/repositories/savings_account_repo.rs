//! Repository for the `savings_accounts` table and the account aggregate.
//!
//! Aggregate loads and saves take `&mut PgConnection` so that a command
//! can lock, mutate and persist an account inside one transaction.

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgConnection, PgPool, Postgres, Row};
use savings_core::account::SavingsAccount;
use savings_core::enums::{AccountStatus, DepositAccountType};
use savings_core::types::DbId;

use crate::models::account::{AccountParts, AccountState, SavingsAccountRow};
use crate::repositories::{AccountChargeRepo, DepositAmountChangeRepo, TransactionRepo};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Writable columns, in the order [`bind_state`] binds them.
const STATE_COLUMNS: &str = "\
    external_id, client_id, group_id, product_id, field_officer_id, deposit_type, status, \
    sub_status, currency_code, currency_digits, in_multiples_of, \
    nominal_annual_interest_rate, interest_compounding_period_type, \
    interest_posting_period_type, interest_calculation_type, \
    interest_calculation_days_in_year_type, min_required_opening_balance, \
    lockin_period_frequency, lockin_period_frequency_type, withdrawal_fee_for_transfers, \
    allow_overdraft, overdraft_limit, enforce_min_required_balance, min_required_balance, \
    min_balance_for_interest_calculation, withhold_tax, tax_rate, \
    submitted_on, approved_on, rejected_on, withdrawn_on, activated_on, closed_on, \
    lockin_until, on_hold_amount, \
    total_deposits, total_withdrawals, total_interest_posted, total_interest_earned, \
    total_withdrawal_fees, total_annual_fees, total_fee_charges, total_withhold_tax, \
    account_balance, available_balance, last_interest_calculation_date, \
    deposit_amount, deposit_period, deposit_period_frequency, maturity_date, maturity_amount, \
    on_account_closure, transfer_to_savings_id, min_deposit_amount, max_deposit_amount, \
    default_deposit_amount, min_deposit_term, min_deposit_term_type, max_deposit_term, \
    max_deposit_term_type, in_multiples_of_deposit_term, in_multiples_of_deposit_term_type, \
    pre_closure_penal_applicable, pre_closure_penal_interest, \
    pre_closure_penal_interest_on_type, interest_chart, \
    recurring_frequency, recurring_frequency_type, expected_first_deposit_on, \
    is_mandatory_deposit, allow_withdrawal, adjust_advance_towards_future_payments";

const META_COLUMNS: &str = "id, account_no, version, created_by, created_at, updated_at";

/// Columns a list `orderBy` may name, as `(wire name, column)` pairs.
pub const ORDER_BY_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("accountNo", "account_no"),
    ("externalId", "external_id"),
    ("clientId", "client_id"),
    ("productId", "product_id"),
    ("status", "status"),
    ("submittedOnDate", "submitted_on"),
    ("activatedOnDate", "activated_on"),
    ("accountBalance", "account_balance"),
];

fn select_columns() -> String {
    format!("{META_COLUMNS}, {STATE_COLUMNS}")
}

fn state_column_count() -> usize {
    STATE_COLUMNS.split(',').count()
}

/// `$start, $start+1, ...` for `count` parameters.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_state<'q>(
    q: Query<'q, Postgres, PgArguments>,
    s: &'q AccountState,
) -> Query<'q, Postgres, PgArguments> {
    q.bind(&s.external_id)
        .bind(s.client_id)
        .bind(s.group_id)
        .bind(s.product_id)
        .bind(s.field_officer_id)
        .bind(s.deposit_type)
        .bind(s.status)
        .bind(s.sub_status)
        .bind(&s.currency_code)
        .bind(s.currency_digits)
        .bind(s.in_multiples_of)
        .bind(s.nominal_annual_interest_rate)
        .bind(s.interest_compounding_period_type)
        .bind(s.interest_posting_period_type)
        .bind(s.interest_calculation_type)
        .bind(s.interest_calculation_days_in_year_type)
        .bind(s.min_required_opening_balance)
        .bind(s.lockin_period_frequency)
        .bind(s.lockin_period_frequency_type)
        .bind(s.withdrawal_fee_for_transfers)
        .bind(s.allow_overdraft)
        .bind(s.overdraft_limit)
        .bind(s.enforce_min_required_balance)
        .bind(s.min_required_balance)
        .bind(s.min_balance_for_interest_calculation)
        .bind(s.withhold_tax)
        .bind(s.tax_rate)
        .bind(s.submitted_on)
        .bind(s.approved_on)
        .bind(s.rejected_on)
        .bind(s.withdrawn_on)
        .bind(s.activated_on)
        .bind(s.closed_on)
        .bind(s.lockin_until)
        .bind(s.on_hold_amount)
        .bind(s.total_deposits)
        .bind(s.total_withdrawals)
        .bind(s.total_interest_posted)
        .bind(s.total_interest_earned)
        .bind(s.total_withdrawal_fees)
        .bind(s.total_annual_fees)
        .bind(s.total_fee_charges)
        .bind(s.total_withhold_tax)
        .bind(s.account_balance)
        .bind(s.available_balance)
        .bind(s.last_interest_calculation_date)
        .bind(s.deposit_amount)
        .bind(s.deposit_period)
        .bind(s.deposit_period_frequency)
        .bind(s.maturity_date)
        .bind(s.maturity_amount)
        .bind(s.on_account_closure)
        .bind(s.transfer_to_savings_id)
        .bind(s.min_deposit_amount)
        .bind(s.max_deposit_amount)
        .bind(s.default_deposit_amount)
        .bind(s.min_deposit_term)
        .bind(s.min_deposit_term_type)
        .bind(s.max_deposit_term)
        .bind(s.max_deposit_term_type)
        .bind(s.in_multiples_of_deposit_term)
        .bind(s.in_multiples_of_deposit_term_type)
        .bind(s.pre_closure_penal_applicable)
        .bind(s.pre_closure_penal_interest)
        .bind(s.pre_closure_penal_interest_on_type)
        .bind(&s.interest_chart)
        .bind(s.recurring_frequency)
        .bind(s.recurring_frequency_type)
        .bind(s.expected_first_deposit_on)
        .bind(s.is_mandatory_deposit)
        .bind(s.allow_withdrawal)
        .bind(s.adjust_advance_towards_future_payments)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filters and paging for account lists. `order_by` must already be a
/// whitelisted column from [`ORDER_BY_COLUMNS`].
#[derive(Debug, Clone)]
pub struct AccountListFilter {
    pub deposit_type: DepositAccountType,
    pub external_id: Option<String>,
    pub client_id: Option<DbId>,
    pub status: Option<AccountStatus>,
    pub order_by: &'static str,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}

enum BindValue {
    BigInt(i64),
    Int(i32),
    Text(String),
}

/// Build the WHERE clause for an account list.
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
fn build_account_filter(filter: &AccountListFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions = vec!["deposit_type = $1".to_string()];
    let mut bind_values = vec![BindValue::Int(filter.deposit_type.id())];
    let mut bind_idx = 2u32;

    if let Some(ref external_id) = filter.external_id {
        conditions.push(format!("external_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(external_id.clone()));
    }

    if let Some(client_id) = filter.client_id {
        conditions.push(format!("client_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(client_id));
    }

    if let Some(status) = filter.status {
        conditions.push(format!("status = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Int(status.id()));
    }

    (format!("WHERE {}", conditions.join(" AND ")), bind_values, bind_idx)
}

fn bind_filter_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Int(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
        }
    }
    q
}

fn bind_filter_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, Postgres, i64, PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, Postgres, i64, PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Int(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
        }
    }
    q
}

// ---------------------------------------------------------------------------
// SavingsAccountRepo
// ---------------------------------------------------------------------------

pub struct SavingsAccountRepo;

impl SavingsAccountRepo {
    /// Insert a newly submitted account and its children. Sets `id`,
    /// `account_no` and child IDs on `account`.
    pub async fn insert(
        conn: &mut PgConnection,
        account: &mut SavingsAccount,
        created_by: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        let state = AccountState::from_account(account);
        let count = state_column_count();
        let sql = format!(
            "INSERT INTO savings_accounts ({STATE_COLUMNS}, created_by)
             VALUES ({}, ${})
             RETURNING id, account_no",
            placeholders(1, count),
            count + 1
        );
        let row = bind_state(sqlx::query(&sql), &state)
            .bind(created_by)
            .fetch_one(&mut *conn)
            .await?;
        let id: DbId = row.try_get("id")?;
        account.id = Some(id);
        account.account_no = row.try_get("account_no")?;
        Self::sync_children(conn, id, account, created_by).await?;
        Ok(id)
    }

    /// Persist a mutated aggregate.
    ///
    /// Returns `false` without writing anything when the stored version no
    /// longer matches `account.version` (another command got there first).
    pub async fn save(
        conn: &mut PgConnection,
        account: &mut SavingsAccount,
        user_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let Some(id) = account.id else {
            return Err(sqlx::Error::RowNotFound);
        };
        let state = AccountState::from_account(account);
        let count = state_column_count();
        let sql = format!(
            "UPDATE savings_accounts SET ({STATE_COLUMNS}, version) = ({}, version + 1)
             WHERE id = ${} AND version = ${}",
            placeholders(1, count),
            count + 1,
            count + 2
        );
        let result = bind_state(sqlx::query(&sql), &state)
            .bind(id)
            .bind(account.version)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        account.version += 1;
        Self::sync_children(conn, id, account, user_id).await?;
        Ok(true)
    }

    async fn sync_children(
        conn: &mut PgConnection,
        id: DbId,
        account: &mut SavingsAccount,
        user_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        AccountChargeRepo::sync(conn, id, &mut account.charges).await?;
        TransactionRepo::sync(conn, id, &mut account.transactions, user_id).await?;
        if let Some(recurring) = account.deposit.as_mut().and_then(|d| d.recurring.as_mut()) {
            DepositAmountChangeRepo::sync(conn, id, &mut recurring.amount_changes).await?;
        }
        Ok(())
    }

    /// Find an account row of the given deposit type.
    pub async fn find_row(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        id: DbId,
        for_update: bool,
    ) -> Result<Option<SavingsAccountRow>, sqlx::Error> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let query = format!(
            "SELECT {} FROM savings_accounts WHERE id = $1 AND deposit_type = $2{lock}",
            select_columns()
        );
        sqlx::query_as::<_, SavingsAccountRow>(&query)
            .bind(id)
            .bind(deposit_type.id())
            .fetch_optional(&mut *conn)
            .await
    }

    /// Load the account row and every child row.
    pub async fn load(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        id: DbId,
    ) -> Result<Option<AccountParts>, sqlx::Error> {
        Self::load_parts(conn, deposit_type, id, false).await
    }

    /// Like [`Self::load`] but takes a row lock on the account until the
    /// surrounding transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        id: DbId,
    ) -> Result<Option<AccountParts>, sqlx::Error> {
        Self::load_parts(conn, deposit_type, id, true).await
    }

    async fn load_parts(
        conn: &mut PgConnection,
        deposit_type: DepositAccountType,
        id: DbId,
        for_update: bool,
    ) -> Result<Option<AccountParts>, sqlx::Error> {
        let Some(row) = Self::find_row(conn, deposit_type, id, for_update).await? else {
            return Ok(None);
        };
        let transactions = TransactionRepo::list_for_account(conn, id).await?;
        let charges = AccountChargeRepo::list_for_account(conn, id).await?;
        let amount_changes = if deposit_type == DepositAccountType::RecurringDeposit {
            DepositAmountChangeRepo::list_for_account(conn, id).await?
        } else {
            Vec::new()
        };
        Ok(Some(AccountParts {
            row,
            transactions,
            charges,
            amount_changes,
        }))
    }

    /// List account rows matching `filter`.
    pub async fn list(
        pool: &PgPool,
        filter: &AccountListFilter,
    ) -> Result<Vec<SavingsAccountRow>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_account_filter(filter);
        let direction = if filter.descending { "DESC" } else { "ASC" };
        let query = format!(
            "SELECT {} FROM savings_accounts {where_clause} \
             ORDER BY {} {direction}, id {direction} \
             LIMIT ${bind_idx} OFFSET ${}",
            select_columns(),
            filter.order_by,
            bind_idx + 1
        );
        let q = bind_filter_values(sqlx::query_as::<_, SavingsAccountRow>(&query), &bind_values);
        q.bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Count account rows matching `filter` (ignores paging).
    pub async fn count(pool: &PgPool, filter: &AccountListFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_account_filter(filter);
        let query = format!("SELECT COUNT(*)::BIGINT FROM savings_accounts {where_clause}");
        let q = bind_filter_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }

    /// IDs of accounts in `status` of any of `deposit_types`, for batch jobs.
    pub async fn list_ids_by_status(
        pool: &PgPool,
        deposit_types: &[DepositAccountType],
        status: AccountStatus,
    ) -> Result<Vec<(DbId, i32)>, sqlx::Error> {
        let types: Vec<i32> = deposit_types.iter().map(|t| t.id()).collect();
        sqlx::query_as(
            "SELECT id, deposit_type FROM savings_accounts
             WHERE status = $1 AND deposit_type = ANY($2)
             ORDER BY id",
        )
        .bind(status.id())
        .bind(&types)
        .fetch_all(pool)
        .await
    }

    /// Delete an account and its children. Returns `true` if a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM savings_accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
