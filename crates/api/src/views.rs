//! Response shapes for accounts, transactions, charges and products.
//!
//! Domain aggregates are not serialized directly; these views flatten them
//! into the camelCase JSON clients expect, with every coded enum rendered as
//! `{ "id", "code", "value" }`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use savings_core::account::{AccountSummary, SavingsAccount, SavingsTerms, Transaction};
use savings_core::charges::{AccountCharge, ChargeDefinition};
use savings_core::commands::ChargeStatusFilter;
use savings_core::enums::{
    AccountStatus, AccountSubStatus, ChargeCalculationType, ChargeTimeType, DaysInYear,
    DepositAccountType, InterestCalculationType, InterestCompoundingPeriod,
    InterestPostingPeriod, OnAccountClosure, PeriodFrequency, PreClosurePenalInterestOn,
};
use savings_core::error::CoreResult;
use savings_core::fixed_deposit::{DepositTerms, InterestRateChart};
use savings_core::recurring_deposit::DepositAmountChange;
use savings_core::types::{Currency, DbId};
use savings_db::models::product::SavingsProduct;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};

/// Serialize a view into a JSON value.
pub fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::InternalError(e.to_string()))
}

/// Insert `key` into a JSON object; no-op for other values.
pub fn insert(target: &mut Value, key: &str, value: Value) {
    if let Value::Object(map) = target {
        map.insert(key.to_string(), value);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyData {
    pub code: String,
    pub decimal_places: u32,
    pub in_multiples_of: Option<i32>,
}

impl From<&Currency> for CurrencyData {
    fn from(currency: &Currency) -> Self {
        Self {
            code: currency.code.clone(),
            decimal_places: currency.digits,
            in_multiples_of: currency.in_multiples_of,
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    pub submitted_on_date: NaiveDate,
    pub approved_on_date: Option<NaiveDate>,
    pub activated_on_date: Option<NaiveDate>,
    pub rejected_on_date: Option<NaiveDate>,
    pub withdrawn_on_date: Option<NaiveDate>,
    pub closed_on_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringData<'a> {
    pub mandatory_recommended_deposit_amount: Decimal,
    pub recurring_frequency: i32,
    pub recurring_frequency_type: PeriodFrequency,
    pub expected_first_deposit_on_date: Option<NaiveDate>,
    pub is_mandatory_deposit: bool,
    pub allow_withdrawal: bool,
    pub adjust_advance_towards_future_payments: bool,
    pub deposit_amount_changes: &'a [DepositAmountChange],
    pub total_overdue_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositData<'a> {
    pub deposit_amount: Decimal,
    pub deposit_period: i32,
    pub deposit_period_frequency: PeriodFrequency,
    pub maturity_date: Option<NaiveDate>,
    pub maturity_amount: Option<Decimal>,
    pub on_account_closure: Option<OnAccountClosure>,
    pub transfer_to_savings_id: Option<DbId>,
    pub min_deposit_amount: Option<Decimal>,
    pub max_deposit_amount: Option<Decimal>,
    pub pre_closure_penal_applicable: bool,
    pub pre_closure_penal_interest: Option<Decimal>,
    pub pre_closure_penal_interest_on_type: Option<PreClosurePenalInterestOn>,
    pub account_chart: Option<&'a InterestRateChart>,
    #[serde(flatten)]
    pub recurring: Option<RecurringData<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData<'a> {
    pub id: Option<DbId>,
    pub account_no: &'a str,
    pub external_id: Option<&'a str>,
    pub client_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub product_id: DbId,
    pub field_officer_id: Option<DbId>,
    pub deposit_type: DepositAccountType,
    pub status: AccountStatus,
    pub sub_status: AccountSubStatus,
    pub currency: CurrencyData,
    #[serde(flatten)]
    pub terms: &'a SavingsTerms,
    pub timeline: TimelineData,
    pub lockin_until_date: Option<NaiveDate>,
    pub savings_amount_on_hold: Decimal,
    pub summary: &'a AccountSummary,
    pub version: i32,
    #[serde(flatten)]
    pub deposit: Option<DepositData<'a>>,
}

impl<'a> AccountData<'a> {
    pub fn new(account: &'a SavingsAccount, today: NaiveDate) -> Self {
        let deposit = account.deposit.as_ref().map(|details| DepositData {
            deposit_amount: details.deposit_amount,
            deposit_period: details.deposit_period,
            deposit_period_frequency: details.deposit_period_frequency,
            maturity_date: details.maturity_date,
            maturity_amount: details.maturity_amount,
            on_account_closure: details.on_account_closure,
            transfer_to_savings_id: details.transfer_to_savings_id,
            min_deposit_amount: details.terms.min_deposit_amount,
            max_deposit_amount: details.terms.max_deposit_amount,
            pre_closure_penal_applicable: details.terms.pre_closure_penal_applicable,
            pre_closure_penal_interest: details.terms.pre_closure_penal_interest,
            pre_closure_penal_interest_on_type: details.terms.pre_closure_penal_interest_on_type_id,
            account_chart: details.chart.as_ref(),
            recurring: details.recurring.as_ref().map(|r| RecurringData {
                mandatory_recommended_deposit_amount: r.amount_on(details.deposit_amount, today),
                recurring_frequency: r.recurring_frequency,
                recurring_frequency_type: r.recurring_frequency_type,
                expected_first_deposit_on_date: r.expected_first_deposit_on,
                is_mandatory_deposit: r.is_mandatory_deposit,
                allow_withdrawal: r.allow_withdrawal,
                adjust_advance_towards_future_payments: r.adjust_advance_towards_future_payments,
                deposit_amount_changes: &r.amount_changes,
                total_overdue_amount: account
                    .is_active()
                    .then(|| account.total_overdue(today).ok())
                    .flatten(),
            }),
        });

        Self {
            id: account.id,
            account_no: &account.account_no,
            external_id: account.external_id.as_deref(),
            client_id: account.client_id,
            group_id: account.group_id,
            product_id: account.product_id,
            field_officer_id: account.field_officer_id,
            deposit_type: account.deposit_type,
            status: account.status,
            sub_status: account.sub_status,
            currency: CurrencyData::from(&account.currency),
            terms: &account.terms,
            timeline: TimelineData {
                submitted_on_date: account.submitted_on,
                approved_on_date: account.approved_on,
                activated_on_date: account.activated_on,
                rejected_on_date: account.rejected_on,
                withdrawn_on_date: account.withdrawn_on,
                closed_on_date: account.closed_on,
            },
            lockin_until_date: account.lockin_until,
            savings_amount_on_hold: account.on_hold_amount,
            summary: &account.summary,
            version: account.version,
            deposit,
        }
    }
}

pub fn account_json(account: &SavingsAccount, today: NaiveDate) -> AppResult<Value> {
    to_json(&AccountData::new(account, today))
}

// ---------------------------------------------------------------------------
// Transactions and account charges
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData<'a> {
    pub account_id: Option<DbId>,
    pub account_no: &'a str,
    #[serde(flatten)]
    pub transaction: &'a Transaction,
    pub currency: CurrencyData,
}

impl<'a> TransactionData<'a> {
    pub fn new(account: &'a SavingsAccount, transaction: &'a Transaction) -> Self {
        Self {
            account_id: account.id,
            account_no: &account.account_no,
            transaction,
            currency: CurrencyData::from(&account.currency),
        }
    }
}

/// Transactions newest first, the order statements are read in.
pub fn transactions_json(account: &SavingsAccount) -> AppResult<Value> {
    let items: Vec<TransactionData<'_>> = account
        .ordered_indices()
        .into_iter()
        .rev()
        .map(|i| TransactionData::new(account, &account.transactions[i]))
        .collect();
    to_json(&items)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountChargeData<'a> {
    pub account_id: Option<DbId>,
    #[serde(flatten)]
    pub charge: &'a AccountCharge,
    pub currency: CurrencyData,
}

impl<'a> AccountChargeData<'a> {
    pub fn new(account: &'a SavingsAccount, charge: &'a AccountCharge) -> Self {
        Self {
            account_id: account.id,
            charge,
            currency: CurrencyData::from(&account.currency),
        }
    }
}

pub fn charges_json(account: &SavingsAccount, filter: ChargeStatusFilter) -> AppResult<Value> {
    let items: Vec<AccountChargeData<'_>> = account
        .charges
        .iter()
        .filter(|c| filter.matches(c.active))
        .map(|c| AccountChargeData::new(account, c))
        .collect();
    to_json(&items)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringProductData {
    pub is_mandatory_deposit: bool,
    pub allow_withdrawal: bool,
    pub adjust_advance_towards_future_payments: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub id: DbId,
    pub name: String,
    pub short_name: String,
    pub description: Option<String>,
    pub deposit_type: DepositAccountType,
    pub currency: CurrencyData,
    #[serde(flatten)]
    pub terms: SavingsTerms,
    #[serde(flatten)]
    pub deposit_terms: Option<DepositTerms>,
    #[serde(flatten)]
    pub recurring: Option<RecurringProductData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<InterestRateChart>>,
    pub charges: Vec<ChargeDefinition>,
}

impl ProductData {
    pub fn build(
        product: &SavingsProduct,
        charts: Vec<InterestRateChart>,
        charges: Vec<ChargeDefinition>,
    ) -> CoreResult<Self> {
        let deposit_type = product.deposit_type()?;
        let is_deposit = deposit_type != DepositAccountType::Savings;
        Ok(Self {
            id: product.id,
            name: product.name.clone(),
            short_name: product.short_name.clone(),
            description: product.description.clone(),
            deposit_type,
            currency: CurrencyData::from(&product.currency()),
            terms: product.terms()?,
            deposit_terms: if is_deposit {
                Some(product.deposit_terms()?)
            } else {
                None
            },
            recurring: (deposit_type == DepositAccountType::RecurringDeposit).then(|| {
                RecurringProductData {
                    is_mandatory_deposit: product.is_mandatory_deposit,
                    allow_withdrawal: product.allow_withdrawal,
                    adjust_advance_towards_future_payments: product
                        .adjust_advance_towards_future_payments,
                }
            }),
            charts: is_deposit.then_some(charts),
            charges,
        })
    }
}

// ---------------------------------------------------------------------------
// Template option lists
// ---------------------------------------------------------------------------

/// Option lists for the interest and deposit term fields of `deposit_type`.
pub fn term_options(deposit_type: DepositAccountType) -> Map<String, Value> {
    let mut options = Map::new();
    options.insert(
        "interestCompoundingPeriodTypeOptions".into(),
        json!(InterestCompoundingPeriod::options()),
    );
    options.insert(
        "interestPostingPeriodTypeOptions".into(),
        json!(InterestPostingPeriod::options()),
    );
    options.insert(
        "interestCalculationTypeOptions".into(),
        json!(InterestCalculationType::options()),
    );
    options.insert(
        "interestCalculationDaysInYearTypeOptions".into(),
        json!(DaysInYear::options()),
    );
    options.insert(
        "lockinPeriodFrequencyTypeOptions".into(),
        json!(PeriodFrequency::options()),
    );
    if deposit_type != DepositAccountType::Savings {
        options.insert(
            "periodFrequencyTypeOptions".into(),
            json!(PeriodFrequency::options()),
        );
        options.insert(
            "preClosurePenalInterestOnTypeOptions".into(),
            json!(PreClosurePenalInterestOn::options()),
        );
        options.insert(
            "onAccountClosureOptions".into(),
            json!(OnAccountClosure::options()),
        );
    }
    options
}

/// Option lists for charge definitions.
pub fn charge_options() -> Map<String, Value> {
    let mut options = Map::new();
    options.insert(
        "chargeTimeTypeOptions".into(),
        json!(ChargeTimeType::options()),
    );
    options.insert(
        "chargeCalculationTypeOptions".into(),
        json!(ChargeCalculationType::options()),
    );
    options
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use savings_core::account::NewAccount;
    use savings_core::enums::TransactionType;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account() -> SavingsAccount {
        let terms: SavingsTerms = serde_json::from_value(json!({
            "nominalAnnualInterestRate": 5,
            "interestCompoundingPeriodType": 1,
            "interestPostingPeriodType": 4,
            "interestCalculationType": 1,
            "interestCalculationDaysInYearType": 365
        }))
        .unwrap();
        let today = date(2024, 1, 1);
        let mut account = SavingsAccount::submit(
            NewAccount {
                client_id: Some(3),
                group_id: None,
                product_id: 1,
                field_officer_id: None,
                external_id: Some("ext-1".into()),
                submitted_on: today,
                deposit_type: DepositAccountType::Savings,
                currency: Currency::new("USD", 2),
                terms,
            },
            today,
        )
        .unwrap();
        account.id = Some(11);
        account.account_no = "000000011".into();
        account
    }

    #[test]
    fn account_view_flattens_terms_and_renders_enums() {
        let value = account_json(&account(), date(2024, 1, 1)).unwrap();
        assert_eq!(value["id"], json!(11));
        assert_eq!(value["accountNo"], json!("000000011"));
        assert_eq!(value["status"]["id"], json!(100));
        assert_eq!(value["depositType"]["id"], json!(100));
        assert_eq!(value["currency"]["code"], json!("USD"));
        assert_eq!(value["interestPostingPeriodType"]["id"], json!(4));
        assert_eq!(value["timeline"]["submittedOnDate"], json!("2024-01-01"));
        assert!(value.get("depositAmount").is_none());
    }

    #[test]
    fn transactions_are_listed_newest_first() {
        let mut acct = account();
        let day = date(2024, 1, 1);
        acct.approve(day, day).unwrap();
        acct.activate(day, day).unwrap();
        acct.deposit(day, dec!(100), date(2024, 1, 5)).unwrap();
        acct.deposit(date(2024, 1, 3), dec!(50), date(2024, 1, 5)).unwrap();

        let value = transactions_json(&acct).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["date"], json!("2024-01-03"));
        assert_eq!(items[0]["accountId"], json!(11));
        assert_eq!(
            items[1]["transactionType"]["id"],
            json!(TransactionType::Deposit.id())
        );
    }

    #[test]
    fn deposit_term_options_only_for_deposits() {
        assert!(!term_options(DepositAccountType::Savings).contains_key("onAccountClosureOptions"));
        assert!(term_options(DepositAccountType::FixedDeposit).contains_key("onAccountClosureOptions"));
    }
}
