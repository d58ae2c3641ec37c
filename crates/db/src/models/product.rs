//! Savings, fixed deposit and recurring deposit products.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::FromRow;
use savings_core::account::SavingsTerms;
use savings_core::enums::{
    DaysInYear, DepositAccountType, InterestCalculationType, InterestCompoundingPeriod,
    InterestPostingPeriod, PeriodFrequency, PreClosurePenalInterestOn,
};
use savings_core::error::CoreResult;
use savings_core::fixed_deposit::{DepositTerms, InterestRateChart};
use savings_core::types::{Currency, DbId, Timestamp};

use super::{stored_enum, stored_opt_enum};

/// A row from the `savings_products` table.
#[derive(Debug, Clone, FromRow)]
pub struct SavingsProduct {
    pub id: DbId,
    pub deposit_type: i32,
    pub name: String,
    pub short_name: String,
    pub description: Option<String>,
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
    pub is_mandatory_deposit: bool,
    pub allow_withdrawal: bool,
    pub adjust_advance_towards_future_payments: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SavingsProduct {
    pub fn deposit_type(&self) -> CoreResult<DepositAccountType> {
        stored_enum("depositType", self.deposit_type, DepositAccountType::try_from_id)
    }

    pub fn currency(&self) -> Currency {
        Currency {
            code: self.currency_code.clone(),
            digits: u32::try_from(self.currency_digits).unwrap_or(2),
            in_multiples_of: self.in_multiples_of,
        }
    }

    /// Default terms copied onto accounts opened from this product.
    pub fn terms(&self) -> CoreResult<SavingsTerms> {
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

    /// Deposit terms; all `None` for plain savings products.
    pub fn deposit_terms(&self) -> CoreResult<DepositTerms> {
        Ok(DepositTerms {
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
        })
    }
}

/// `{"id": n}` reference used by product `charges` arrays.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChargeRef {
    pub id: DbId,
}

fn default_digits() -> i32 {
    2
}

/// DTO for creating a product of any deposit type.
///
/// Savings terms and deposit terms are flattened so the request body is a
/// single object, as clients send it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub short_name: String,
    pub description: Option<String>,
    pub currency_code: String,
    #[serde(default = "default_digits")]
    pub digits_after_decimal: i32,
    pub in_multiples_of: Option<i32>,
    #[serde(flatten)]
    pub terms: SavingsTerms,
    #[serde(flatten)]
    pub deposit_terms: DepositTerms,
    pub is_mandatory_deposit: Option<bool>,
    pub allow_withdrawal: Option<bool>,
    pub adjust_advance_towards_future_payments: Option<bool>,
    #[serde(default)]
    pub charts: Vec<InterestRateChart>,
    #[serde(default)]
    pub charges: Vec<ChargeRef>,
}

/// DTO for updating a product. All fields are optional; `charts` and
/// `charges`, when present, replace the existing sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub in_multiples_of: Option<i32>,
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
    pub min_deposit_amount: Option<Decimal>,
    pub max_deposit_amount: Option<Decimal>,
    #[serde(rename = "depositAmount")]
    pub default_deposit_amount: Option<Decimal>,
    pub min_deposit_term: Option<i32>,
    pub min_deposit_term_type_id: Option<PeriodFrequency>,
    pub max_deposit_term: Option<i32>,
    pub max_deposit_term_type_id: Option<PeriodFrequency>,
    pub in_multiples_of_deposit_term: Option<i32>,
    pub in_multiples_of_deposit_term_type_id: Option<PeriodFrequency>,
    pub pre_closure_penal_applicable: Option<bool>,
    pub pre_closure_penal_interest: Option<Decimal>,
    pub pre_closure_penal_interest_on_type_id: Option<PreClosurePenalInterestOn>,
    pub is_mandatory_deposit: Option<bool>,
    pub allow_withdrawal: Option<bool>,
    pub adjust_advance_towards_future_payments: Option<bool>,
    pub charts: Option<Vec<InterestRateChart>>,
    pub charges: Option<Vec<ChargeRef>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_product_reads_flattened_terms() {
        let body = serde_json::json!({
            "name": "Passbook",
            "shortName": "PB",
            "currencyCode": "USD",
            "nominalAnnualInterestRate": 5,
            "interestCompoundingPeriodType": 1,
            "interestPostingPeriodType": 4,
            "interestCalculationType": 1,
            "interestCalculationDaysInYearType": 365,
            "minDepositAmount": "100",
            "charges": [{"id": 3}]
        });
        let input: CreateProduct = serde_json::from_value(body).unwrap();
        assert_eq!(input.digits_after_decimal, 2);
        assert_eq!(input.terms.nominal_annual_interest_rate, Decimal::from(5));
        assert_eq!(
            input.terms.interest_posting_period_type,
            InterestPostingPeriod::Monthly
        );
        assert_eq!(input.deposit_terms.min_deposit_amount, Some(Decimal::from(100)));
        assert_eq!(input.charges[0].id, 3);
        assert!(input.charts.is_empty());
    }
}
