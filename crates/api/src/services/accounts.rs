//! Account applications and lifecycle commands for all three account kinds.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use savings_core::account::{NewAccount, PostingConfig, SavingsAccount, SavingsTerms};
use savings_core::charges::{AccountCharge, ChargeOverrides};
use savings_core::commands::AccountCommand;
use savings_core::enums::{
    DaysInYear, DepositAccountType, InterestCalculationType, InterestCompoundingPeriod,
    InterestPostingPeriod, OnAccountClosure, PeriodFrequency,
};
use savings_core::error::{CoreError, CoreResult};
use savings_core::fixed_deposit::{active_chart, DepositClosure, DepositDetails, InterestRateChart};
use savings_core::recurring_deposit::RecurringDetails;
use savings_core::types::DbId;
use savings_db::models::product::SavingsProduct;
use savings_db::repositories::{ChargeRepo, SavingsAccountRepo};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::PgConnection;

use crate::commands::{self, CommandProcessingResult, CommandWrapper};
use crate::error::AppResult;
use crate::kinds::account_noun;
use crate::services::account_tx::{lock_account, save_account, AccountTx};
use crate::services::business_date;
use crate::services::products::{find_product, product_charges, product_charts};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Per-account overrides of the product's interest and balance terms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsInput {
    pub nominal_annual_interest_rate: Option<Decimal>,
    pub interest_compounding_period_type: Option<InterestCompoundingPeriod>,
    pub interest_posting_period_type: Option<InterestPostingPeriod>,
    pub interest_calculation_type: Option<InterestCalculationType>,
    pub interest_calculation_days_in_year_type: Option<DaysInYear>,
    pub min_required_opening_balance: Option<Decimal>,
    pub lockin_period_frequency: Option<i32>,
    pub lockin_period_frequency_type: Option<PeriodFrequency>,
    pub withdrawal_fee_for_transfers: Option<bool>,
    pub allow_overdraft: Option<bool>,
    pub overdraft_limit: Option<Decimal>,
    pub enforce_min_required_balance: Option<bool>,
    pub min_required_balance: Option<Decimal>,
    pub min_balance_for_interest_calculation: Option<Decimal>,
    #[serde(rename = "withHoldTax")]
    pub withhold_tax: Option<bool>,
    pub tax_rate: Option<Decimal>,
}

impl TermsInput {
    pub fn apply_to(&self, terms: &mut SavingsTerms) {
        macro_rules! set {
            ($($field:ident),+) => {
                $( if let Some(value) = self.$field { terms.$field = value; } )+
            };
        }
        macro_rules! set_opt {
            ($($field:ident),+) => {
                $( if self.$field.is_some() { terms.$field = self.$field; } )+
            };
        }
        set!(
            nominal_annual_interest_rate,
            interest_compounding_period_type,
            interest_posting_period_type,
            interest_calculation_type,
            interest_calculation_days_in_year_type,
            withdrawal_fee_for_transfers,
            allow_overdraft,
            enforce_min_required_balance,
            withhold_tax
        );
        set_opt!(
            min_required_opening_balance,
            lockin_period_frequency,
            lockin_period_frequency_type,
            overdraft_limit,
            min_required_balance,
            min_balance_for_interest_calculation,
            tax_rate
        );
    }
}

/// Deposit term fields of fixed and recurring deposit applications.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInput {
    pub deposit_amount: Option<Decimal>,
    pub deposit_period: Option<i32>,
    pub deposit_period_frequency_id: Option<PeriodFrequency>,
    pub on_account_closure_id: Option<OnAccountClosure>,
    pub transfer_to_savings_id: Option<DbId>,
    pub mandatory_recommended_deposit_amount: Option<Decimal>,
    pub recurring_frequency: Option<i32>,
    pub recurring_frequency_type: Option<PeriodFrequency>,
    pub expected_first_deposit_on_date: Option<NaiveDate>,
    pub is_mandatory_deposit: Option<bool>,
    pub allow_withdrawal: Option<bool>,
    pub adjust_advance_towards_future_payments: Option<bool>,
}

impl DepositInput {
    pub fn is_empty(&self) -> bool {
        self.deposit_amount.is_none()
            && self.deposit_period.is_none()
            && self.deposit_period_frequency_id.is_none()
            && self.on_account_closure_id.is_none()
            && self.transfer_to_savings_id.is_none()
            && self.mandatory_recommended_deposit_amount.is_none()
            && self.recurring_frequency.is_none()
            && self.recurring_frequency_type.is_none()
            && self.expected_first_deposit_on_date.is_none()
            && self.is_mandatory_deposit.is_none()
            && self.allow_withdrawal.is_none()
            && self.adjust_advance_towards_future_payments.is_none()
    }
}

/// A charge requested on a new application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeInput {
    pub charge_id: DbId,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub fee_on_month: Option<u32>,
    pub fee_on_day: Option<u32>,
    pub fee_interval: Option<i32>,
}

impl ChargeInput {
    pub fn overrides(&self) -> ChargeOverrides {
        ChargeOverrides {
            amount: self.amount,
            due_date: self.due_date,
            fee_on_month: self.fee_on_month,
            fee_on_day: self.fee_on_day,
            fee_interval: self.fee_interval,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAccount {
    pub client_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub product_id: DbId,
    pub field_officer_id: Option<DbId>,
    pub external_id: Option<String>,
    pub submitted_on_date: NaiveDate,
    #[serde(flatten)]
    pub terms: TermsInput,
    #[serde(flatten)]
    pub deposit: DepositInput,
    #[serde(default)]
    pub charges: Vec<ChargeInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyAccount {
    pub external_id: Option<String>,
    pub field_officer_id: Option<DbId>,
    #[serde(flatten)]
    pub terms: TermsInput,
    #[serde(flatten)]
    pub deposit: DepositInput,
}

/// `PUT ?command=updateWithHoldTax` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithholdTaxUpdate {
    #[serde(rename = "withHoldTax")]
    pub withhold_tax: bool,
    pub tax_rate: Option<Decimal>,
}

/// Body of `POST /{accounts}/{id}?command=...`. Each command reads the
/// fields it needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCommandBody {
    pub approved_on_date: Option<NaiveDate>,
    pub rejected_on_date: Option<NaiveDate>,
    pub withdrawn_on_date: Option<NaiveDate>,
    pub activated_on_date: Option<NaiveDate>,
    pub closed_on_date: Option<NaiveDate>,
    #[serde(default)]
    pub withdraw_balance: bool,
    #[serde(default = "default_true")]
    pub post_interest_validation_on_closure: bool,
    pub to_savings_officer_id: Option<DbId>,
    pub on_account_closure_id: Option<OnAccountClosure>,
    pub to_savings_account_id: Option<DbId>,
    pub mandatory_recommended_deposit_amount: Option<Decimal>,
    pub effective_date: Option<NaiveDate>,
    pub note: Option<String>,
}

fn default_true() -> bool {
    true
}

fn required<T>(value: Option<T>, field: &str) -> CoreResult<T> {
    value.ok_or_else(|| CoreError::Validation(format!("{field} is required")))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Load an account without locking it.
pub async fn load_account(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
) -> AppResult<SavingsAccount> {
    let mut conn = state.pool.acquire().await?;
    let parts = SavingsAccountRepo::load(&mut conn, deposit_type, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: account_noun(deposit_type),
            id,
        })?;
    let mut account = parts.into_account()?;
    account.posting_config = state.config.posting;
    Ok(account)
}

/// Payout preview for a premature closure on `closedOnDate`.
pub async fn premature_amount(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
    body: &AccountCommandBody,
) -> AppResult<Value> {
    let account = load_account(state, deposit_type, id).await?;
    let closed_on = required(body.closed_on_date, "closedOnDate")?;
    let amount = account.calculate_premature_amount(closed_on, business_date())?;
    Ok(json!({
        "accountId": id,
        "closedOnDate": closed_on,
        "maturityAmount": amount,
        "onAccountClosureOptions": closure_options(true),
    }))
}

/// Data needed to close a deposit: projected payout and closure options.
pub fn close_template(account: &SavingsAccount) -> AppResult<Value> {
    let details = account.deposit_details()?;
    Ok(json!({
        "accountId": account.id,
        "accountNo": account.account_no,
        "status": account.status,
        "maturityDate": details.maturity_date,
        "maturityAmount": details.maturity_amount,
        "accountBalance": account.summary.account_balance,
        "onAccountClosureOptions": closure_options(false),
    }))
}

fn closure_options(premature: bool) -> Vec<savings_core::enums::EnumOption> {
    OnAccountClosure::ALL
        .iter()
        .filter(|o| !(premature && **o == OnAccountClosure::Reinvest))
        .map(|o| o.option())
        .collect()
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

/// Build deposit details from the product, the request and any details the
/// account already has.
fn build_deposit_details(
    deposit_type: DepositAccountType,
    product: &SavingsProduct,
    input: &DepositInput,
    chart: Option<InterestRateChart>,
    existing: Option<&DepositDetails>,
) -> CoreResult<DepositDetails> {
    let terms = product.deposit_terms()?;
    let is_recurring = deposit_type == DepositAccountType::RecurringDeposit;

    let requested_amount = if is_recurring {
        input
            .mandatory_recommended_deposit_amount
            .or(input.deposit_amount)
    } else {
        input.deposit_amount
    };
    let deposit_amount = required(
        requested_amount
            .or(existing.map(|d| d.deposit_amount))
            .or(terms.default_deposit_amount),
        if is_recurring {
            "mandatoryRecommendedDepositAmount"
        } else {
            "depositAmount"
        },
    )?;
    let deposit_period = required(
        input
            .deposit_period
            .or(existing.map(|d| d.deposit_period)),
        "depositPeriod",
    )?;
    let deposit_period_frequency = required(
        input
            .deposit_period_frequency_id
            .or(existing.map(|d| d.deposit_period_frequency)),
        "depositPeriodFrequencyId",
    )?;

    let recurring = if is_recurring {
        let previous = existing.and_then(|d| d.recurring.as_ref());
        let recurring = RecurringDetails {
            recurring_frequency: required(
                input
                    .recurring_frequency
                    .or(previous.map(|r| r.recurring_frequency)),
                "recurringFrequency",
            )?,
            recurring_frequency_type: required(
                input
                    .recurring_frequency_type
                    .or(previous.map(|r| r.recurring_frequency_type)),
                "recurringFrequencyType",
            )?,
            expected_first_deposit_on: input
                .expected_first_deposit_on_date
                .or(previous.and_then(|r| r.expected_first_deposit_on)),
            is_mandatory_deposit: input
                .is_mandatory_deposit
                .or(previous.map(|r| r.is_mandatory_deposit))
                .unwrap_or(product.is_mandatory_deposit),
            allow_withdrawal: input
                .allow_withdrawal
                .or(previous.map(|r| r.allow_withdrawal))
                .unwrap_or(product.allow_withdrawal),
            adjust_advance_towards_future_payments: input
                .adjust_advance_towards_future_payments
                .or(previous.map(|r| r.adjust_advance_towards_future_payments))
                .unwrap_or(product.adjust_advance_towards_future_payments),
            amount_changes: previous.map(|r| r.amount_changes.clone()).unwrap_or_default(),
        };
        recurring.validate()?;
        Some(recurring)
    } else {
        None
    };

    Ok(DepositDetails {
        terms,
        deposit_amount,
        deposit_period,
        deposit_period_frequency,
        maturity_date: None,
        maturity_amount: None,
        on_account_closure: input
            .on_account_closure_id
            .or(existing.and_then(|d| d.on_account_closure)),
        transfer_to_savings_id: input
            .transfer_to_savings_id
            .or(existing.and_then(|d| d.transfer_to_savings_id)),
        chart: chart.or_else(|| existing.and_then(|d| d.chart.clone())),
        recurring,
    })
}

/// Attach the requested charges plus the product's own charges.
async fn attach_charges(
    state: &AppState,
    account: &mut SavingsAccount,
    requested: &[ChargeInput],
) -> AppResult<()> {
    for input in requested {
        let charge = ChargeRepo::find_by_id(&state.pool, input.charge_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Charge",
                id: input.charge_id,
            })?;
        let def = charge.to_definition()?;
        check_currency(account, &def.currency_code)?;
        account.add_charge(AccountCharge::from_definition(&def, input.overrides())?)?;
    }
    for def in product_charges(&state.pool, account.product_id).await? {
        if requested.iter().any(|r| Some(r.charge_id) == def.id) || !def.active {
            continue;
        }
        check_currency(account, &def.currency_code)?;
        account.add_charge(AccountCharge::from_definition(&def, ChargeOverrides::default())?)?;
    }
    Ok(())
}

pub fn check_currency(account: &SavingsAccount, currency_code: &str) -> CoreResult<()> {
    if !account.currency.code.eq_ignore_ascii_case(currency_code) {
        return Err(CoreError::rule(
            "savingsaccountcharge.currency.mismatch",
            format!(
                "Charge currency {currency_code} does not match account currency {}",
                account.currency.code
            ),
        ));
    }
    Ok(())
}

/// Submit a new application.
pub async fn submit(
    state: &AppState,
    deposit_type: DepositAccountType,
    command: &CommandWrapper,
    input: &SubmitAccount,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut account = new_application(state, deposit_type, input).await?;
    let mut tx = state.pool.begin().await?;
    let result = insert_application(&mut tx, &mut account, command, user_id).await?;
    tx.commit().await?;

    tracing::info!(
        account_id = ?account.id,
        account_no = %account.account_no,
        deposit_type = ?deposit_type,
        "Account application submitted"
    );
    Ok(result)
}

/// Build a submitted application from the product and the request.
pub(crate) async fn new_application(
    state: &AppState,
    deposit_type: DepositAccountType,
    input: &SubmitAccount,
) -> AppResult<SavingsAccount> {
    let today = business_date();
    let product = find_product(&state.pool, deposit_type, input.product_id).await?;

    let mut terms = product.terms()?;
    input.terms.apply_to(&mut terms);
    let mut account = SavingsAccount::submit(
        NewAccount {
            client_id: input.client_id,
            group_id: input.group_id,
            product_id: product.id,
            field_officer_id: input.field_officer_id,
            external_id: input.external_id.clone(),
            submitted_on: input.submitted_on_date,
            deposit_type,
            currency: product.currency(),
            terms,
        },
        today,
    )?;
    account.posting_config = state.config.posting;

    if deposit_type != DepositAccountType::Savings {
        let charts = product_charts(&state.pool, product.id).await?;
        let chart = active_chart(&charts, input.submitted_on_date).cloned();
        let details = build_deposit_details(deposit_type, &product, &input.deposit, chart, None)?;
        account.attach_deposit(details)?;
    }
    attach_charges(state, &mut account, &input.charges).await?;
    Ok(account)
}

/// Insert a new application and record its `CREATE` command on `conn`.
pub(crate) async fn insert_application(
    conn: &mut PgConnection,
    account: &mut SavingsAccount,
    command: &CommandWrapper,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    SavingsAccountRepo::insert(&mut *conn, account, Some(user_id)).await?;
    let result = CommandProcessingResult::for_account(account);
    commands::record(conn, command, &result, user_id).await?;
    Ok(result)
}

/// Approve or activate an application on an already open transaction, so
/// several lifecycle steps can commit together.
pub(crate) async fn advance_application(
    conn: &mut PgConnection,
    posting: PostingConfig,
    deposit_type: DepositAccountType,
    id: DbId,
    action: AccountCommand,
    command: &CommandWrapper,
    body: &AccountCommandBody,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let today = business_date();
    let mut account = lock_account(&mut *conn, deposit_type, id, posting).await?;
    let (field, date) = match action {
        AccountCommand::Approve => {
            let date = required(body.approved_on_date, "approvedOnDate")?;
            account.approve(date, today)?;
            ("approvedOnDate", date)
        }
        AccountCommand::Activate => {
            let date = required(body.activated_on_date, "activatedOnDate")?;
            if deposit_type == DepositAccountType::Savings {
                account.activate(date, today)?;
            } else {
                account.activate_deposit(date, today)?;
            }
            ("activatedOnDate", date)
        }
        other => {
            return Err(CoreError::Validation(format!(
                "{} cannot be applied to a new application",
                other.action()
            ))
            .into());
        }
    };
    save_account(&mut *conn, &mut account, user_id).await?;
    let result = CommandProcessingResult::for_account(&account)
        .with_change(field, json!(date))
        .with_change("status", json!(account.status));
    commands::record(conn, command, &result, user_id).await?;
    Ok(result)
}

/// Modify a pending application.
pub async fn modify(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
    command: &CommandWrapper,
    input: &ModifyAccount,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut uow = AccountTx::begin(state, deposit_type, id).await?;

    let mut terms = uow.account.terms.clone();
    input.terms.apply_to(&mut terms);
    uow.account.modify_application(terms)?;
    if let Some(external_id) = &input.external_id {
        uow.account.external_id = Some(external_id.clone());
    }
    if let Some(officer) = input.field_officer_id {
        uow.account.field_officer_id = Some(officer);
    }
    if deposit_type != DepositAccountType::Savings && !input.deposit.is_empty() {
        let product = find_product(&state.pool, deposit_type, uow.account.product_id).await?;
        let details = build_deposit_details(
            deposit_type,
            &product,
            &input.deposit,
            None,
            uow.account.deposit.as_ref(),
        )?;
        uow.account.attach_deposit(details)?;
    }

    let changes = command.json.as_object().cloned().unwrap_or_default();
    let (_, result) = uow
        .commit(command, user_id, move |account| CommandProcessingResult {
            changes,
            ..CommandProcessingResult::for_account(account)
        })
        .await?;
    tracing::info!(account_id = id, "Account application modified");
    Ok(result)
}

pub async fn update_withhold_tax(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
    command: &CommandWrapper,
    input: &WithholdTaxUpdate,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut uow = AccountTx::begin(state, deposit_type, id).await?;
    uow.account
        .update_withhold_tax(input.withhold_tax, input.tax_rate)?;
    let (_, result) = uow
        .commit(command, user_id, |account| {
            CommandProcessingResult::for_account(account)
                .with_change("withHoldTax", account.terms.withhold_tax)
                .with_change("taxRate", json!(account.terms.tax_rate))
        })
        .await?;
    Ok(result)
}

/// Delete a pending application.
pub async fn delete(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
    command: &CommandWrapper,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut tx = state.pool.begin().await?;
    let account = lock_account(&mut tx, deposit_type, id, state.config.posting).await?;
    account.ensure_deletable()?;
    SavingsAccountRepo::delete(&mut tx, id).await?;
    let result = CommandProcessingResult::for_account(&account);
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(account_id = id, "Account application deleted");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Lifecycle commands
// ---------------------------------------------------------------------------

/// Apply a lifecycle command. `calculatePrematureAmount` is a read and is
/// served by [`premature_amount`].
pub async fn run_command(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
    action: AccountCommand,
    command: &CommandWrapper,
    body: &AccountCommandBody,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let today = business_date();
    let mut uow = AccountTx::begin(state, deposit_type, id).await?;
    let mut changes = Map::new();
    let mut closure: Option<(NaiveDate, DepositClosure)> = None;
    let account = &mut uow.account;

    match action {
        AccountCommand::Reject => {
            let date = required(body.rejected_on_date, "rejectedOnDate")?;
            account.reject(date, today)?;
            changes.insert("rejectedOnDate".into(), json!(date));
        }
        AccountCommand::WithdrawnByApplicant => {
            let date = required(body.withdrawn_on_date, "withdrawnOnDate")?;
            account.withdraw_application(date, today)?;
            changes.insert("withdrawnOnDate".into(), json!(date));
        }
        AccountCommand::Approve => {
            let date = required(body.approved_on_date, "approvedOnDate")?;
            account.approve(date, today)?;
            changes.insert("approvedOnDate".into(), json!(date));
        }
        AccountCommand::UndoApproval => account.undo_approval()?,
        AccountCommand::Activate => {
            let date = required(body.activated_on_date, "activatedOnDate")?;
            if deposit_type == DepositAccountType::Savings {
                account.activate(date, today)?;
            } else {
                account.activate_deposit(date, today)?;
            }
            changes.insert("activatedOnDate".into(), json!(date));
        }
        AccountCommand::CalculateInterest => {
            let earned = account.calculate_interest(today)?;
            changes.insert("totalInterestEarned".into(), json!(earned));
        }
        AccountCommand::PostInterest => {
            account.post_interest(today, false)?;
            changes.insert(
                "totalInterestPosted".into(),
                json!(account.summary.total_interest_posted),
            );
        }
        AccountCommand::ApplyAnnualFees => {
            let applied = account.apply_annual_fees(today)?;
            changes.insert("annualFeesApplied".into(), json!(applied.len()));
        }
        AccountCommand::Close => {
            let date = required(body.closed_on_date, "closedOnDate")?;
            if deposit_type == DepositAccountType::Savings {
                account.close(
                    date,
                    body.withdraw_balance,
                    body.post_interest_validation_on_closure,
                    today,
                )?;
            } else {
                let on_closure = required(body.on_account_closure_id, "onAccountClosureId")?;
                account.mature(today)?;
                let paid =
                    account.close_matured(date, on_closure, body.to_savings_account_id, today)?;
                closure = Some((date, paid));
            }
            changes.insert("closedOnDate".into(), json!(date));
        }
        AccountCommand::AssignSavingsOfficer => {
            let officer = required(body.to_savings_officer_id, "toSavingsOfficerId")?;
            account.assign_officer(officer)?;
            changes.insert("savingsOfficerId".into(), json!(officer));
        }
        AccountCommand::UnassignSavingsOfficer => account.unassign_officer()?,
        AccountCommand::BlockDebit => account.block_debits()?,
        AccountCommand::UnblockDebit => account.unblock_debits()?,
        AccountCommand::BlockCredit => account.block_credits()?,
        AccountCommand::UnblockCredit => account.unblock_credits()?,
        AccountCommand::Block => account.block()?,
        AccountCommand::Unblock => account.unblock()?,
        AccountCommand::PrematureClose => {
            let date = required(body.closed_on_date, "closedOnDate")?;
            let on_closure = required(body.on_account_closure_id, "onAccountClosureId")?;
            let paid = account.premature_close(date, on_closure, body.to_savings_account_id, today)?;
            changes.insert("closedOnDate".into(), json!(date));
            closure = Some((date, paid));
        }
        AccountCommand::CalculatePrematureAmount => {
            return Err(CoreError::Validation(
                "calculatePrematureAmount does not change the account".into(),
            )
            .into());
        }
        AccountCommand::UpdateDepositAmount => {
            let amount = required(
                body.mandatory_recommended_deposit_amount,
                "mandatoryRecommendedDepositAmount",
            )?;
            let effective = body.effective_date.unwrap_or(today);
            account.update_deposit_amount(amount, effective, today)?;
            changes.insert("mandatoryRecommendedDepositAmount".into(), json!(amount));
            changes.insert("effectiveDate".into(), json!(effective));
        }
    }
    changes.insert("status".into(), json!(uow.account.status));

    let mut payout_index = None;
    if let Some((closed_on, paid)) = closure {
        payout_index = paid.payout_index;
        settle_closure(state, &mut uow, closed_on, &paid, today, user_id, &mut changes).await?;
    }

    let (_, result) = uow
        .commit(command, user_id, move |account| CommandProcessingResult {
            changes,
            sub_resource_id: payout_index.and_then(|i| account.transactions[i].id),
            ..CommandProcessingResult::for_account(account)
        })
        .await?;

    tracing::info!(
        account_id = id,
        command = ?action,
        "Account command applied"
    );
    Ok(result)
}

/// Move the proceeds of a closed deposit to their destination inside the
/// same transaction.
async fn settle_closure(
    state: &AppState,
    uow: &mut AccountTx,
    closed_on: NaiveDate,
    closure: &DepositClosure,
    today: NaiveDate,
    user_id: DbId,
    changes: &mut Map<String, Value>,
) -> AppResult<()> {
    if closure.amount <= Decimal::ZERO {
        return Ok(());
    }
    match closure.on_closure {
        OnAccountClosure::TransferToSavings => {
            let target_id = required(closure.transfer_to_savings_id, "toSavingsAccountId")?;
            let source = uow.account.account_no.clone();
            let conn = uow.conn();
            let mut target =
                lock_account(conn, DepositAccountType::Savings, target_id, state.config.posting)
                    .await?;
            let index = target.deposit(closed_on, closure.amount, today)?;
            target.transactions[index].note = Some(format!("Transfer from deposit account {source}"));
            save_account(conn, &mut target, user_id).await?;
            changes.insert("transferredToSavingsId".into(), json!(target_id));
            tracing::info!(
                target_id,
                amount = %closure.amount,
                "Deposit proceeds transferred to savings"
            );
        }
        OnAccountClosure::Reinvest => {
            let mut renewed = uow.account.reinvest(closure.amount, closed_on)?;
            let new_id = SavingsAccountRepo::insert(uow.conn(), &mut renewed, Some(user_id)).await?;
            changes.insert("reinvestedDepositAccountId".into(), json!(new_id));
            tracing::info!(new_id, amount = %closure.amount, "Deposit reinvested");
        }
        OnAccountClosure::WithdrawDeposit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn terms() -> SavingsTerms {
        serde_json::from_value(json!({
            "nominalAnnualInterestRate": 4,
            "interestCompoundingPeriodType": 1,
            "interestPostingPeriodType": 4,
            "interestCalculationType": 1,
            "interestCalculationDaysInYearType": 365,
            "minRequiredOpeningBalance": 100
        }))
        .unwrap()
    }

    #[test]
    fn terms_input_overrides_only_present_fields() {
        let input: TermsInput = serde_json::from_value(json!({
            "nominalAnnualInterestRate": 6.5,
            "withHoldTax": true,
            "taxRate": 10
        }))
        .unwrap();
        let mut t = terms();
        input.apply_to(&mut t);
        assert_eq!(t.nominal_annual_interest_rate, Decimal::new(65, 1));
        assert!(t.withhold_tax);
        assert_eq!(t.tax_rate, Some(Decimal::from(10)));
        assert_eq!(t.min_required_opening_balance, Some(Decimal::from(100)));
        assert_eq!(t.interest_posting_period_type, InterestPostingPeriod::Monthly);
    }

    #[test]
    fn submit_body_reads_flattened_terms_and_deposit_fields() {
        let body: SubmitAccount = serde_json::from_value(json!({
            "clientId": 1,
            "productId": 2,
            "submittedOnDate": "2024-01-01",
            "nominalAnnualInterestRate": 3,
            "depositAmount": 1000,
            "depositPeriod": 12,
            "depositPeriodFrequencyId": 2,
            "charges": [{"chargeId": 9, "amount": 5}]
        }))
        .unwrap();
        assert_eq!(body.terms.nominal_annual_interest_rate, Some(Decimal::from(3)));
        assert_eq!(body.deposit.deposit_period, Some(12));
        assert_eq!(body.deposit.deposit_period_frequency_id, Some(PeriodFrequency::Months));
        assert_eq!(body.charges.len(), 1);
        assert!(!body.deposit.is_empty());
    }

    #[test]
    fn command_body_defaults() {
        let body: AccountCommandBody = serde_json::from_value(json!({})).unwrap();
        assert!(body.post_interest_validation_on_closure);
        assert!(!body.withdraw_balance);
        assert!(required(body.approved_on_date, "approvedOnDate").is_err());
    }

    #[test]
    fn premature_closure_options_exclude_reinvest() {
        let premature = closure_options(true);
        assert!(premature
            .iter()
            .all(|o| o.id != OnAccountClosure::Reinvest.id()));
        assert_eq!(closure_options(false).len(), OnAccountClosure::ALL.len());
    }
}
