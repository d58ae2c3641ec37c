//! Savings, fixed deposit and recurring deposit accounts.
//!
//! An account is stored as one `savings_accounts` row plus its
//! transactions, charges and (recurring deposits) amount changes.
//! [`AccountState`] holds every column the aggregate writes, so insert
//! and update bind the same list.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use savings_core::account::{AccountSummary, PostingConfig, SavingsAccount, SavingsTerms};
use savings_core::enums::{
    AccountStatus, AccountSubStatus, DaysInYear, DepositAccountType, InterestCalculationType,
    InterestCompoundingPeriod, InterestPostingPeriod, OnAccountClosure, PeriodFrequency,
    PreClosurePenalInterestOn,
};
use savings_core::error::CoreResult;
use savings_core::fixed_deposit::{DepositDetails, DepositTerms, InterestRateChart};
use savings_core::recurring_deposit::RecurringDetails;
use savings_core::types::{Currency, DbId, Timestamp};

use super::account_charge::AccountChargeRow;
use super::deposit_amount_change::DepositAmountChangeRow;
use super::transaction::TransactionRow;
use super::{stored_enum, stored_opt_enum};

/// Writable columns of `savings_accounts`.
#[derive(Debug, Clone, FromRow)]
pub struct AccountState {
    pub external_id: Option<String>,
    pub client_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub product_id: DbId,
    pub field_officer_id: Option<DbId>,
    pub deposit_type: i32,
    pub status: i32,
    pub sub_status: i32,
    pub currency_code: String,
    pub currency_digits: i32,
    pub in_multiples_of: Option<i32>,
    pub nominal_annual_interest_rate: Decimal,
    pub interest_compounding_period_type: i32,
    pub interest_posting_period_type: i32,
    pub interest_calculation_type: i32,
    pub interest_calculation_days_in_year_type: i32,
    pub min_required_opening_balance: Option<Decimal>,
    pub lockin_period_frequency: Option<i32>,
    pub lockin_period_frequency_type: Option<i32>,
    pub withdrawal_fee_for_transfers: bool,
    pub allow_overdraft: bool,
    pub overdraft_limit: Option<Decimal>,
    pub enforce_min_required_balance: bool,
    pub min_required_balance: Option<Decimal>,
    pub min_balance_for_interest_calculation: Option<Decimal>,
    pub withhold_tax: bool,
    pub tax_rate: Option<Decimal>,
    pub submitted_on: NaiveDate,
    pub approved_on: Option<NaiveDate>,
    pub rejected_on: Option<NaiveDate>,
    pub withdrawn_on: Option<NaiveDate>,
    pub activated_on: Option<NaiveDate>,
    pub closed_on: Option<NaiveDate>,
    pub lockin_until: Option<NaiveDate>,
    pub on_hold_amount: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub total_interest_posted: Decimal,
    pub total_interest_earned: Decimal,
    pub total_withdrawal_fees: Decimal,
    pub total_annual_fees: Decimal,
    pub total_fee_charges: Decimal,
    pub total_withhold_tax: Decimal,
    pub account_balance: Decimal,
    pub available_balance: Decimal,
    pub last_interest_calculation_date: Option<NaiveDate>,
    pub deposit_amount: Option<Decimal>,
    pub deposit_period: Option<i32>,
    pub deposit_period_frequency: Option<i32>,
    pub maturity_date: Option<NaiveDate>,
    pub maturity_amount: Option<Decimal>,
    pub on_account_closure: Option<i32>,
    pub transfer_to_savings_id: Option<DbId>,
    pub min_deposit_amount: Option<Decimal>,
    pub max_deposit_amount: Option<Decimal>,
    pub default_deposit_amount: Option<Decimal>,
    pub min_deposit_term: Option<i32>,
    pub min_deposit_term_type: Option<i32>,
    pub max_deposit_term: Option<i32>,
    pub max_deposit_term_type: Option<i32>,
    pub in_multiples_of_deposit_term: Option<i32>,
    pub in_multiples_of_deposit_term_type: Option<i32>,
    pub pre_closure_penal_applicable: bool,
    pub pre_closure_penal_interest: Option<Decimal>,
    pub pre_closure_penal_interest_on_type: Option<i32>,
    /// Snapshot of the product chart taken at submission.
    pub interest_chart: Option<Json<InterestRateChart>>,
    pub recurring_frequency: Option<i32>,
    pub recurring_frequency_type: Option<i32>,
    pub expected_first_deposit_on: Option<NaiveDate>,
    pub is_mandatory_deposit: bool,
    pub allow_withdrawal: bool,
    pub adjust_advance_towards_future_payments: bool,
}

/// A full row from the `savings_accounts` table.
#[derive(Debug, Clone, FromRow)]
pub struct SavingsAccountRow {
    pub id: DbId,
    pub account_no: String,
    pub version: i32,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[sqlx(flatten)]
    pub state: AccountState,
}

/// An account row with every child row, ready to assemble.
#[derive(Debug, Clone)]
pub struct AccountParts {
    pub row: SavingsAccountRow,
    pub transactions: Vec<TransactionRow>,
    pub charges: Vec<AccountChargeRow>,
    pub amount_changes: Vec<DepositAmountChangeRow>,
}

impl AccountState {
    /// Flatten an aggregate into its column values.
    pub fn from_account(account: &SavingsAccount) -> Self {
        let terms = &account.terms;
        let summary = &account.summary;
        let deposit = account.deposit.as_ref();
        let deposit_terms = deposit.map(|d| &d.terms);
        let recurring = deposit.and_then(|d| d.recurring.as_ref());
        Self {
            external_id: account.external_id.clone(),
            client_id: account.client_id,
            group_id: account.group_id,
            product_id: account.product_id,
            field_officer_id: account.field_officer_id,
            deposit_type: account.deposit_type.id(),
            status: account.status.id(),
            sub_status: account.sub_status.id(),
            currency_code: account.currency.code.clone(),
            currency_digits: i32::try_from(account.currency.digits).unwrap_or(2),
            in_multiples_of: account.currency.in_multiples_of,
            nominal_annual_interest_rate: terms.nominal_annual_interest_rate,
            interest_compounding_period_type: terms.interest_compounding_period_type.id(),
            interest_posting_period_type: terms.interest_posting_period_type.id(),
            interest_calculation_type: terms.interest_calculation_type.id(),
            interest_calculation_days_in_year_type: terms.interest_calculation_days_in_year_type.id(),
            min_required_opening_balance: terms.min_required_opening_balance,
            lockin_period_frequency: terms.lockin_period_frequency,
            lockin_period_frequency_type: terms.lockin_period_frequency_type.map(|f| f.id()),
            withdrawal_fee_for_transfers: terms.withdrawal_fee_for_transfers,
            allow_overdraft: terms.allow_overdraft,
            overdraft_limit: terms.overdraft_limit,
            enforce_min_required_balance: terms.enforce_min_required_balance,
            min_required_balance: terms.min_required_balance,
            min_balance_for_interest_calculation: terms.min_balance_for_interest_calculation,
            withhold_tax: terms.withhold_tax,
            tax_rate: terms.tax_rate,
            submitted_on: account.submitted_on,
            approved_on: account.approved_on,
            rejected_on: account.rejected_on,
            withdrawn_on: account.withdrawn_on,
            activated_on: account.activated_on,
            closed_on: account.closed_on,
            lockin_until: account.lockin_until,
            on_hold_amount: account.on_hold_amount,
            total_deposits: summary.total_deposits,
            total_withdrawals: summary.total_withdrawals,
            total_interest_posted: summary.total_interest_posted,
            total_interest_earned: summary.total_interest_earned,
            total_withdrawal_fees: summary.total_withdrawal_fees,
            total_annual_fees: summary.total_annual_fees,
            total_fee_charges: summary.total_fee_charges,
            total_withhold_tax: summary.total_withhold_tax,
            account_balance: summary.account_balance,
            available_balance: summary.available_balance,
            last_interest_calculation_date: summary.last_interest_calculation_date,
            deposit_amount: deposit.map(|d| d.deposit_amount),
            deposit_period: deposit.map(|d| d.deposit_period),
            deposit_period_frequency: deposit.map(|d| d.deposit_period_frequency.id()),
            maturity_date: deposit.and_then(|d| d.maturity_date),
            maturity_amount: deposit.and_then(|d| d.maturity_amount),
            on_account_closure: deposit.and_then(|d| d.on_account_closure).map(|c| c.id()),
            transfer_to_savings_id: deposit.and_then(|d| d.transfer_to_savings_id),
            min_deposit_amount: deposit_terms.and_then(|t| t.min_deposit_amount),
            max_deposit_amount: deposit_terms.and_then(|t| t.max_deposit_amount),
            default_deposit_amount: deposit_terms.and_then(|t| t.default_deposit_amount),
            min_deposit_term: deposit_terms.and_then(|t| t.min_deposit_term),
            min_deposit_term_type: deposit_terms
                .and_then(|t| t.min_deposit_term_type_id)
                .map(|f| f.id()),
            max_deposit_term: deposit_terms.and_then(|t| t.max_deposit_term),
            max_deposit_term_type: deposit_terms
                .and_then(|t| t.max_deposit_term_type_id)
                .map(|f| f.id()),
            in_multiples_of_deposit_term: deposit_terms.and_then(|t| t.in_multiples_of_deposit_term),
            in_multiples_of_deposit_term_type: deposit_terms
                .and_then(|t| t.in_multiples_of_deposit_term_type_id)
                .map(|f| f.id()),
            pre_closure_penal_applicable: deposit_terms
                .is_some_and(|t| t.pre_closure_penal_applicable),
            pre_closure_penal_interest: deposit_terms.and_then(|t| t.pre_closure_penal_interest),
            pre_closure_penal_interest_on_type: deposit_terms
                .and_then(|t| t.pre_closure_penal_interest_on_type_id)
                .map(|t| t.id()),
            interest_chart: deposit.and_then(|d| d.chart.clone()).map(Json),
            recurring_frequency: recurring.map(|r| r.recurring_frequency),
            recurring_frequency_type: recurring.map(|r| r.recurring_frequency_type.id()),
            expected_first_deposit_on: recurring.and_then(|r| r.expected_first_deposit_on),
            is_mandatory_deposit: recurring.is_some_and(|r| r.is_mandatory_deposit),
            allow_withdrawal: recurring.is_some_and(|r| r.allow_withdrawal),
            adjust_advance_towards_future_payments: recurring
                .map_or(true, |r| r.adjust_advance_towards_future_payments),
        }
    }

    fn terms(&self) -> CoreResult<SavingsTerms> {
        Ok(SavingsTerms {
            nominal_annual_interest_rate: self.nominal_annual_interest_rate,
            interest_compounding_period_type: stored_enum(
                "interestCompoundingPeriodType",
                self.interest_compounding_period_type,
                InterestCompoundingPeriod::try_from_id,
            )?,
            interest_posting_period_type: stored_enum(
                "interestPostingPeriodType",
                self.interest_posting_period_type,
                InterestPostingPeriod::try_from_id,
            )?,
            interest_calculation_type: stored_enum(
                "interestCalculationType",
                self.interest_calculation_type,
                InterestCalculationType::try_from_id,
            )?,
            interest_calculation_days_in_year_type: stored_enum(
                "interestCalculationDaysInYearType",
                self.interest_calculation_days_in_year_type,
                DaysInYear::try_from_id,
            )?,
            min_required_opening_balance: self.min_required_opening_balance,
            lockin_period_frequency: self.lockin_period_frequency,
            lockin_period_frequency_type: stored_opt_enum(
                "lockinPeriodFrequencyType",
                self.lockin_period_frequency_type,
                PeriodFrequency::try_from_id,
            )?,
            withdrawal_fee_for_transfers: self.withdrawal_fee_for_transfers,
            allow_overdraft: self.allow_overdraft,
            overdraft_limit: self.overdraft_limit,
            enforce_min_required_balance: self.enforce_min_required_balance,
            min_required_balance: self.min_required_balance,
            min_balance_for_interest_calculation: self.min_balance_for_interest_calculation,
            withhold_tax: self.withhold_tax,
            tax_rate: self.tax_rate,
        })
    }

    fn deposit_details(&self, deposit_type: DepositAccountType) -> CoreResult<Option<DepositDetails>> {
        if deposit_type == DepositAccountType::Savings {
            return Ok(None);
        }
        let terms = DepositTerms {
            min_deposit_amount: self.min_deposit_amount,
            max_deposit_amount: self.max_deposit_amount,
            default_deposit_amount: self.default_deposit_amount,
            min_deposit_term: self.min_deposit_term,
            min_deposit_term_type_id: stored_opt_enum(
                "minDepositTermTypeId",
                self.min_deposit_term_type,
                PeriodFrequency::try_from_id,
            )?,
            max_deposit_term: self.max_deposit_term,
            max_deposit_term_type_id: stored_opt_enum(
                "maxDepositTermTypeId",
                self.max_deposit_term_type,
                PeriodFrequency::try_from_id,
            )?,
            in_multiples_of_deposit_term: self.in_multiples_of_deposit_term,
            in_multiples_of_deposit_term_type_id: stored_opt_enum(
                "inMultiplesOfDepositTermTypeId",
                self.in_multiples_of_deposit_term_type,
                PeriodFrequency::try_from_id,
            )?,
            pre_closure_penal_applicable: self.pre_closure_penal_applicable,
            pre_closure_penal_interest: self.pre_closure_penal_interest,
            pre_closure_penal_interest_on_type_id: stored_opt_enum(
                "preClosurePenalInterestOnTypeId",
                self.pre_closure_penal_interest_on_type,
                PreClosurePenalInterestOn::try_from_id,
            )?,
        };
        let recurring = if deposit_type == DepositAccountType::RecurringDeposit {
            Some(RecurringDetails {
                recurring_frequency: self.recurring_frequency.unwrap_or(1),
                recurring_frequency_type: stored_enum(
                    "recurringFrequencyType",
                    self.recurring_frequency_type
                        .unwrap_or(PeriodFrequency::Months.id()),
                    PeriodFrequency::try_from_id,
                )?,
                expected_first_deposit_on: self.expected_first_deposit_on,
                is_mandatory_deposit: self.is_mandatory_deposit,
                allow_withdrawal: self.allow_withdrawal,
                adjust_advance_towards_future_payments: self.adjust_advance_towards_future_payments,
                amount_changes: Vec::new(),
            })
        } else {
            None
        };
        Ok(Some(DepositDetails {
            terms,
            deposit_amount: self.deposit_amount.unwrap_or_default(),
            deposit_period: self.deposit_period.unwrap_or_default(),
            deposit_period_frequency: stored_enum(
                "depositPeriodFrequencyId",
                self.deposit_period_frequency
                    .unwrap_or(PeriodFrequency::Months.id()),
                PeriodFrequency::try_from_id,
            )?,
            maturity_date: self.maturity_date,
            maturity_amount: self.maturity_amount,
            on_account_closure: stored_opt_enum(
                "onAccountClosureId",
                self.on_account_closure,
                OnAccountClosure::try_from_id,
            )?,
            transfer_to_savings_id: self.transfer_to_savings_id,
            chart: self.interest_chart.clone().map(|chart| chart.0),
            recurring,
        }))
    }
}

impl SavingsAccountRow {
    /// The account without child collections. The summary comes from the
    /// stored columns, which is what list endpoints show.
    pub fn into_header(self) -> CoreResult<SavingsAccount> {
        let state = self.state;
        let deposit_type =
            stored_enum("depositType", state.deposit_type, DepositAccountType::try_from_id)?;
        Ok(SavingsAccount {
            id: Some(self.id),
            account_no: self.account_no,
            external_id: state.external_id.clone(),
            client_id: state.client_id,
            group_id: state.group_id,
            product_id: state.product_id,
            field_officer_id: state.field_officer_id,
            deposit_type,
            status: stored_enum("status", state.status, AccountStatus::try_from_id)?,
            sub_status: stored_enum("subStatus", state.sub_status, AccountSubStatus::try_from_id)?,
            currency: Currency {
                code: state.currency_code.clone(),
                digits: u32::try_from(state.currency_digits).unwrap_or(2),
                in_multiples_of: state.in_multiples_of,
            },
            terms: state.terms()?,
            submitted_on: state.submitted_on,
            approved_on: state.approved_on,
            rejected_on: state.rejected_on,
            withdrawn_on: state.withdrawn_on,
            activated_on: state.activated_on,
            closed_on: state.closed_on,
            lockin_until: state.lockin_until,
            on_hold_amount: state.on_hold_amount,
            transactions: Vec::new(),
            charges: Vec::new(),
            deposit: state.deposit_details(deposit_type)?,
            summary: AccountSummary {
                total_deposits: state.total_deposits,
                total_withdrawals: state.total_withdrawals,
                total_interest_posted: state.total_interest_posted,
                total_interest_earned: state.total_interest_earned,
                total_withdrawal_fees: state.total_withdrawal_fees,
                total_annual_fees: state.total_annual_fees,
                total_fee_charges: state.total_fee_charges,
                total_withhold_tax: state.total_withhold_tax,
                account_balance: state.account_balance,
                available_balance: state.available_balance,
                last_interest_calculation_date: state.last_interest_calculation_date,
            },
            posting_config: PostingConfig::default(),
            version: self.version,
        })
    }
}

impl AccountParts {
    /// Assemble the full aggregate and recompute balances from its transactions.
    pub fn into_account(self) -> CoreResult<SavingsAccount> {
        let mut account = self.row.into_header()?;
        account.transactions = self
            .transactions
            .into_iter()
            .map(TransactionRow::into_transaction)
            .collect::<CoreResult<_>>()?;
        account.charges = self
            .charges
            .into_iter()
            .map(AccountChargeRow::into_charge)
            .collect::<CoreResult<_>>()?;
        if let Some(recurring) = account.deposit.as_mut().and_then(|d| d.recurring.as_mut()) {
            recurring.amount_changes = self.amount_changes.into_iter().map(Into::into).collect();
        }
        account.recalculate();
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use savings_core::account::NewAccount;

    fn submitted() -> SavingsAccount {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let new = NewAccount {
            client_id: Some(10),
            group_id: None,
            product_id: 3,
            field_officer_id: None,
            external_id: Some("EXT-1".into()),
            submitted_on: today,
            deposit_type: DepositAccountType::Savings,
            currency: Currency::new("USD", 2),
            terms: SavingsTerms {
                nominal_annual_interest_rate: dec!(5),
                interest_compounding_period_type: InterestCompoundingPeriod::Daily,
                interest_posting_period_type: InterestPostingPeriod::Monthly,
                interest_calculation_type: InterestCalculationType::DailyBalance,
                interest_calculation_days_in_year_type: DaysInYear::Days365,
                min_required_opening_balance: Some(dec!(100)),
                lockin_period_frequency: None,
                lockin_period_frequency_type: None,
                withdrawal_fee_for_transfers: false,
                allow_overdraft: false,
                overdraft_limit: None,
                enforce_min_required_balance: false,
                min_required_balance: None,
                min_balance_for_interest_calculation: None,
                withhold_tax: false,
                tax_rate: None,
            },
        };
        SavingsAccount::submit(new, today).unwrap()
    }

    fn row_for(account: &SavingsAccount) -> SavingsAccountRow {
        SavingsAccountRow {
            id: 42,
            account_no: "000000042".into(),
            version: 3,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            state: AccountState::from_account(account),
        }
    }

    #[test]
    fn header_restores_flattened_state() {
        let account = submitted();
        let restored = row_for(&account).into_header().unwrap();
        assert_eq!(restored.id, Some(42));
        assert_eq!(restored.version, 3);
        assert_eq!(restored.terms, account.terms);
        assert_eq!(restored.status, AccountStatus::SubmittedAndPendingApproval);
        assert_eq!(restored.external_id.as_deref(), Some("EXT-1"));
        assert!(restored.deposit.is_none());
    }

    #[test]
    fn corrupt_status_is_an_internal_error() {
        let mut row = row_for(&submitted());
        row.state.status = 999;
        let err = row.into_header().unwrap_err();
        assert!(matches!(err, savings_core::error::CoreError::Internal(_)));
    }
}
