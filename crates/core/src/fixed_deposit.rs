//! Term deposits: product deposit limits, interest rate charts, maturity
//! and the premature / matured closure flows. Recurring deposits reuse all
//! of this and add an installment schedule (see `recurring_deposit`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{SavingsAccount, SavingsTerms, Transaction};
use crate::enums::{
    AccountStatus, DepositAccountType, OnAccountClosure, PeriodFrequency, PreClosurePenalInterestOn,
    TransactionType,
};
use crate::error::{CoreError, CoreResult};
use crate::interest::{self, BalanceMovement};
use crate::recurring_deposit::RecurringDetails;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Interest rate charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRateSlab {
    #[serde(default)]
    pub id: Option<DbId>,
    pub description: Option<String>,
    pub period_type: Option<PeriodFrequency>,
    pub from_period: Option<i32>,
    pub to_period: Option<i32>,
    pub amount_range_from: Option<Decimal>,
    pub amount_range_to: Option<Decimal>,
    pub annual_interest_rate: Decimal,
}

impl InterestRateSlab {
    fn matches(&self, amount: Decimal, start: NaiveDate, end: NaiveDate) -> bool {
        let period_ok = match self.period_type {
            Some(period_type) => {
                let units = period_type.units_between(start, end);
                self.from_period.map_or(true, |from| units >= from)
                    && self.to_period.map_or(true, |to| units <= to)
            }
            None => true,
        };
        let amount_ok = self.amount_range_from.map_or(true, |from| amount >= from)
            && self.amount_range_to.map_or(true, |to| amount <= to);
        period_ok && amount_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRateChart {
    #[serde(default)]
    pub id: Option<DbId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub from_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default, rename = "chartSlabs")]
    pub slabs: Vec<InterestRateSlab>,
}

impl InterestRateChart {
    pub fn validate(&self) -> CoreResult<()> {
        if self.end_date.is_some_and(|end| end < self.from_date) {
            return Err(CoreError::Validation(
                "interest rate chart endDate cannot be before fromDate".into(),
            ));
        }
        for slab in &self.slabs {
            if slab.annual_interest_rate < Decimal::ZERO {
                return Err(CoreError::Validation(
                    "annualInterestRate must be zero or greater".into(),
                ));
            }
            if let (Some(from), Some(to)) = (slab.from_period, slab.to_period) {
                if to < from {
                    return Err(CoreError::Validation("toPeriod cannot be before fromPeriod".into()));
                }
            }
            if slab.from_period.is_some() && slab.period_type.is_none() {
                return Err(CoreError::Validation(
                    "periodType is required when fromPeriod is given".into(),
                ));
            }
            if let (Some(from), Some(to)) = (slab.amount_range_from, slab.amount_range_to) {
                if to < from {
                    return Err(CoreError::Validation(
                        "amountRangeTo cannot be below amountRangeFrom".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.from_date <= date && self.end_date.map_or(true, |end| date <= end)
    }

    /// Rate of the most specific slab matching a deposit of `amount` held
    /// from `start` to `end`. Zero when nothing matches.
    pub fn applicable_rate(&self, amount: Decimal, start: NaiveDate, end: NaiveDate) -> Decimal {
        self.slabs
            .iter()
            .filter(|s| s.matches(amount, start, end))
            .max_by_key(|s| {
                (
                    s.from_period.unwrap_or(i32::MIN),
                    s.amount_range_from.unwrap_or(Decimal::MIN),
                )
            })
            .map(|s| s.annual_interest_rate)
            .unwrap_or(Decimal::ZERO)
    }
}

/// The chart in effect on `date`, if any.
pub fn active_chart(charts: &[InterestRateChart], date: NaiveDate) -> Option<&InterestRateChart> {
    charts
        .iter()
        .filter(|c| c.is_active_on(date))
        .max_by_key(|c| c.from_date)
}

// ---------------------------------------------------------------------------
// Product deposit terms
// ---------------------------------------------------------------------------

/// Deposit limits defined on fixed and recurring deposit products.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositTerms {
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
    #[serde(default)]
    pub pre_closure_penal_applicable: bool,
    pub pre_closure_penal_interest: Option<Decimal>,
    pub pre_closure_penal_interest_on_type_id: Option<PreClosurePenalInterestOn>,
}

/// A fixed reference date for comparing terms of different frequencies.
fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

impl DepositTerms {
    pub fn validate(&self) -> CoreResult<()> {
        if let (Some(min), Some(max)) = (self.min_deposit_amount, self.max_deposit_amount) {
            if max < min {
                return Err(CoreError::Validation(
                    "maxDepositAmount cannot be below minDepositAmount".into(),
                ));
            }
        }
        if let Some(default) = self.default_deposit_amount {
            self.check_amount(default)?;
        }
        let Some(min_term) = self.min_deposit_term else {
            return Err(CoreError::Validation("minDepositTerm is required".into()));
        };
        let Some(min_type) = self.min_deposit_term_type_id else {
            return Err(CoreError::Validation("minDepositTermTypeId is required".into()));
        };
        if min_term <= 0 {
            return Err(CoreError::Validation("minDepositTerm must be greater than zero".into()));
        }
        if let (Some(max), Some(max_type)) = (self.max_deposit_term, self.max_deposit_term_type_id) {
            let start = reference_date();
            if max_type.add_to(start, max) < min_type.add_to(start, min_term) {
                return Err(CoreError::Validation(
                    "maxDepositTerm cannot be shorter than minDepositTerm".into(),
                ));
            }
        }
        if self.pre_closure_penal_applicable
            && !self
                .pre_closure_penal_interest
                .is_some_and(|rate| rate >= Decimal::ZERO)
        {
            return Err(CoreError::Validation(
                "preClosurePenalInterest is required when pre-closure penalty applies".into(),
            ));
        }
        Ok(())
    }

    pub fn check_amount(&self, amount: Decimal) -> CoreResult<()> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation("depositAmount must be greater than zero".into()));
        }
        if self.min_deposit_amount.is_some_and(|min| amount < min) {
            return Err(CoreError::rule(
                "deposit.amount.less.than.min",
                format!("Deposit amount {amount} is below the product minimum"),
            ));
        }
        if self.max_deposit_amount.is_some_and(|max| amount > max) {
            return Err(CoreError::rule(
                "deposit.amount.greater.than.max",
                format!("Deposit amount {amount} is above the product maximum"),
            ));
        }
        Ok(())
    }

    pub fn check_term(&self, period: i32, frequency: PeriodFrequency) -> CoreResult<()> {
        if period <= 0 {
            return Err(CoreError::Validation("depositPeriod must be greater than zero".into()));
        }
        let start = reference_date();
        let end = frequency.add_to(start, period);
        if let (Some(min), Some(min_type)) = (self.min_deposit_term, self.min_deposit_term_type_id) {
            if end < min_type.add_to(start, min) {
                return Err(CoreError::rule(
                    "deposit.period.less.than.min",
                    "Deposit period is shorter than the product minimum term",
                ));
            }
        }
        if let (Some(max), Some(max_type)) = (self.max_deposit_term, self.max_deposit_term_type_id) {
            if end > max_type.add_to(start, max) {
                return Err(CoreError::rule(
                    "deposit.period.greater.than.max",
                    "Deposit period is longer than the product maximum term",
                ));
            }
        }
        if let (Some(step), Some(step_type)) = (
            self.in_multiples_of_deposit_term,
            self.in_multiples_of_deposit_term_type_id,
        ) {
            let min_end = match (self.min_deposit_term, self.min_deposit_term_type_id) {
                (Some(min), Some(min_type)) => min_type.add_to(start, min),
                _ => start,
            };
            let extra = step_type.units_between(min_end, end);
            if step > 0 && (extra % step != 0 || step_type.add_to(min_end, extra) != end) {
                return Err(CoreError::rule(
                    "deposit.period.not.multiple.of.term",
                    format!("Deposit period must grow in multiples of {step} {}", step_type.value()),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Account deposit details
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DepositDetails {
    pub terms: DepositTerms,
    /// Fixed deposits: the principal. Recurring deposits: the mandatory
    /// installment amount.
    pub deposit_amount: Decimal,
    pub deposit_period: i32,
    pub deposit_period_frequency: PeriodFrequency,
    pub maturity_date: Option<NaiveDate>,
    pub maturity_amount: Option<Decimal>,
    pub on_account_closure: Option<OnAccountClosure>,
    pub transfer_to_savings_id: Option<DbId>,
    pub chart: Option<InterestRateChart>,
    pub recurring: Option<RecurringDetails>,
}

/// Money leaving a deposit account on closure and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositClosure {
    pub payout_index: Option<usize>,
    pub amount: Decimal,
    pub on_closure: OnAccountClosure,
    pub transfer_to_savings_id: Option<DbId>,
}

impl SavingsAccount {
    pub fn deposit_details(&self) -> CoreResult<&DepositDetails> {
        self.deposit.as_ref().ok_or_else(|| {
            CoreError::Internal(format!("account {:?} has no deposit details", self.id))
        })
    }

    fn deposit_details_mut(&mut self) -> CoreResult<&mut DepositDetails> {
        let id = self.id;
        self.deposit
            .as_mut()
            .ok_or_else(|| CoreError::Internal(format!("account {id:?} has no deposit details")))
    }

    /// Date the deposit term runs from.
    pub fn deposit_start_date(&self) -> NaiveDate {
        let expected_first = self
            .deposit
            .as_ref()
            .and_then(|d| d.recurring.as_ref())
            .and_then(|r| r.expected_first_deposit_on);
        match self.deposit_type {
            DepositAccountType::RecurringDeposit => expected_first
                .or(self.activated_on)
                .unwrap_or(self.submitted_on),
            _ => self.activated_on.unwrap_or(self.submitted_on),
        }
    }

    /// Attach deposit details to a freshly submitted deposit account and
    /// derive its rate and maturity.
    pub fn attach_deposit(&mut self, details: DepositDetails) -> CoreResult<()> {
        details.terms.check_amount(details.deposit_amount)?;
        details
            .terms
            .check_term(details.deposit_period, details.deposit_period_frequency)?;
        if details.on_account_closure == Some(OnAccountClosure::TransferToSavings)
            && details.transfer_to_savings_id.is_none()
        {
            return Err(CoreError::Validation(
                "transferToSavingsId is required when transferring to savings on closure".into(),
            ));
        }
        self.deposit = Some(details);
        self.refresh_maturity()
    }

    /// Recompute the chart rate, maturity date and projected maturity amount.
    pub fn refresh_maturity(&mut self) -> CoreResult<()> {
        let start = self.deposit_start_date();
        let details = self.deposit_details()?;
        let deposit_amount = details.deposit_amount;
        let maturity = details
            .deposit_period_frequency
            .add_to(start, details.deposit_period);
        let chart_rate = details
            .chart
            .as_ref()
            .map(|chart| chart.applicable_rate(deposit_amount, start, maturity));
        if let Some(rate) = chart_rate {
            self.terms.nominal_annual_interest_rate = rate;
        }
        let movements = match self.deposit_type {
            DepositAccountType::RecurringDeposit => self
                .projected_installments(start, maturity)?
                .into_iter()
                .map(|(date, amount)| BalanceMovement { date, amount })
                .collect(),
            _ => vec![BalanceMovement {
                date: start,
                amount: deposit_amount,
            }],
        };
        let principal: Decimal = movements.iter().map(|m| m.amount).sum();
        let last_day = maturity.pred_opt().unwrap_or(maturity);
        let periods = interest::calculate(
            &self.interest_settings(),
            &movements,
            start,
            last_day,
            &self.currency,
        );
        let amount = principal + interest::total_interest(&periods);

        let details = self.deposit_details_mut()?;
        details.maturity_date = Some(maturity);
        details.maturity_amount = Some(amount);
        Ok(())
    }

    /// Activate a term deposit. Fixed deposits receive their principal on
    /// the activation date.
    pub fn activate_deposit(&mut self, activated_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        self.activate(activated_on, today)?;
        if self.deposit_type == DepositAccountType::FixedDeposit {
            let amount = self.deposit_details()?.deposit_amount;
            self.push(Transaction::new(TransactionType::Deposit, activated_on, amount));
            self.recalculate();
        }
        self.refresh_maturity()
    }

    fn require_deposit_type(&self, action: &str) -> CoreResult<()> {
        if self.deposit_type == DepositAccountType::Savings {
            return Err(self.rule(
                &format!("{action}.not.a.deposit.account"),
                "Operation is only supported on fixed and recurring deposits",
            ));
        }
        Ok(())
    }

    /// Rate applied on premature closure: the chart rate for the relevant
    /// term less the pre-closure penalty, never below zero.
    pub fn premature_rate(&self, closed_on: NaiveDate) -> CoreResult<Decimal> {
        let details = self.deposit_details()?;
        let start = self.deposit_start_date();
        let maturity = details.maturity_date.unwrap_or(closed_on);
        let on_type = details
            .terms
            .pre_closure_penal_interest_on_type_id
            .unwrap_or(PreClosurePenalInterestOn::WholeTerm);
        let base = match &details.chart {
            Some(chart) => {
                let end = match on_type {
                    PreClosurePenalInterestOn::WholeTerm => maturity,
                    PreClosurePenalInterestOn::TillPrematureWithdrawal => closed_on,
                };
                chart.applicable_rate(details.deposit_amount, start, end)
            }
            None => self.terms.nominal_annual_interest_rate,
        };
        let penalty = if details.terms.pre_closure_penal_applicable {
            details.terms.pre_closure_penal_interest.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        Ok((base - penalty).max(Decimal::ZERO))
    }

    fn validate_premature_close(&self, closed_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        self.require_deposit_type("prematureclose")?;
        self.require_status(AccountStatus::Active, "prematureclose")?;
        self.validate_closure_date(closed_on, today)?;
        if self.lockin_until.is_some_and(|until| closed_on < until) {
            return Err(self.rule(
                "prematureclose.within.lockin.period",
                "Deposit cannot be closed within the lock-in period",
            ));
        }
        if self
            .deposit_details()?
            .maturity_date
            .is_some_and(|maturity| closed_on > maturity)
        {
            return Err(self.rule(
                "prematureclose.after.maturity.date",
                "Premature closure date cannot be after the maturity date",
            ));
        }
        Ok(())
    }

    /// Re-post all interest at the penal rate up to `closed_on`.
    fn repost_at_premature_rate(&mut self, closed_on: NaiveDate) -> CoreResult<()> {
        self.terms.nominal_annual_interest_rate = self.premature_rate(closed_on)?;
        for tx in self.transactions.iter_mut().filter(|t| {
            !t.reversed
                && matches!(
                    t.transaction_type,
                    TransactionType::InterestPosting | TransactionType::WithholdTax
                )
        }) {
            tx.reversed = true;
        }
        self.apply_interest_postings(closed_on, true, false);
        self.recalculate();
        Ok(())
    }

    /// Amount that would be paid out on premature closure at `closed_on`.
    pub fn calculate_premature_amount(&self, closed_on: NaiveDate, today: NaiveDate) -> CoreResult<Decimal> {
        self.validate_premature_close(closed_on, today)?;
        let mut preview = self.clone();
        preview.repost_at_premature_rate(closed_on)?;
        Ok(preview.summary.account_balance.max(Decimal::ZERO))
    }

    pub fn premature_close(
        &mut self,
        closed_on: NaiveDate,
        on_closure: OnAccountClosure,
        transfer_to_savings_id: Option<DbId>,
        today: NaiveDate,
    ) -> CoreResult<DepositClosure> {
        self.validate_premature_close(closed_on, today)?;
        if on_closure == OnAccountClosure::Reinvest {
            return Err(self.rule(
                "prematureclose.reinvest.not.allowed",
                "Premature closure cannot reinvest the deposit",
            ));
        }
        self.repost_at_premature_rate(closed_on)?;
        let closure = self.pay_out(closed_on, on_closure, transfer_to_savings_id)?;
        self.status = AccountStatus::PrematureClosed;
        self.closed_on = Some(closed_on);
        Ok(closure)
    }

    fn pay_out(
        &mut self,
        date: NaiveDate,
        on_closure: OnAccountClosure,
        transfer_to_savings_id: Option<DbId>,
    ) -> CoreResult<DepositClosure> {
        let target = match on_closure {
            OnAccountClosure::TransferToSavings => {
                let target = transfer_to_savings_id
                    .or_else(|| self.deposit.as_ref().and_then(|d| d.transfer_to_savings_id));
                if target.is_none() {
                    return Err(CoreError::Validation(
                        "toSavingsAccountId is required to transfer on closure".into(),
                    ));
                }
                target
            }
            _ => None,
        };
        if self.on_hold_amount > Decimal::ZERO {
            return Err(self.rule(
                "close.amount.on.hold",
                "Account has funds on hold; release them before closing",
            ));
        }
        let amount = self.summary.account_balance.max(Decimal::ZERO);
        let payout_index = self.pay_out_balance(date)?;
        if let (Some(index), Some(target)) = (payout_index, target) {
            self.transactions[index].note = Some(format!("Transfer to savings account {target}"));
        }
        Ok(DepositClosure {
            payout_index,
            amount,
            on_closure,
            transfer_to_savings_id: target,
        })
    }

    /// Mark an active deposit as matured once its maturity date has been
    /// reached, posting the remaining interest. Returns `false` when not due.
    pub fn mature(&mut self, today: NaiveDate) -> CoreResult<bool> {
        self.require_deposit_type("mature")?;
        if !self.is_active() {
            return Ok(false);
        }
        let Some(maturity) = self.deposit_details()?.maturity_date else {
            return Ok(false);
        };
        if maturity > today {
            return Ok(false);
        }
        let last_day = maturity.pred_opt().unwrap_or(maturity);
        self.apply_interest_postings(last_day, true, false);
        self.recalculate();
        self.status = AccountStatus::Matured;
        Ok(true)
    }

    /// Close a matured deposit according to `on_closure`.
    pub fn close_matured(
        &mut self,
        closed_on: NaiveDate,
        on_closure: OnAccountClosure,
        transfer_to_savings_id: Option<DbId>,
        today: NaiveDate,
    ) -> CoreResult<DepositClosure> {
        self.require_deposit_type("close")?;
        self.require_status(AccountStatus::Matured, "close")?;
        self.validate_closure_date(closed_on, today)?;
        if self
            .deposit_details()?
            .maturity_date
            .is_some_and(|maturity| closed_on < maturity)
        {
            return Err(self.rule(
                "close.date.before.maturity.date",
                "Closing date cannot be before the maturity date",
            ));
        }
        let closure = self.pay_out(closed_on, on_closure, transfer_to_savings_id)?;
        self.status = AccountStatus::Closed;
        self.closed_on = Some(closed_on);
        Ok(closure)
    }

    /// A new active fixed deposit funded with `amount` on `on`, carrying
    /// this deposit's product and terms.
    pub fn reinvest(&self, amount: Decimal, on: NaiveDate) -> CoreResult<SavingsAccount> {
        let details = self.deposit_details()?;
        let mut terms: SavingsTerms = self.terms.clone();
        terms.min_required_opening_balance = None;
        terms.lockin_period_frequency = None;
        terms.lockin_period_frequency_type = None;

        let mut account = self.clone();
        account.id = None;
        account.account_no = String::new();
        account.external_id = None;
        account.deposit_type = DepositAccountType::FixedDeposit;
        account.status = AccountStatus::Active;
        account.sub_status = crate::enums::AccountSubStatus::None;
        account.terms = terms;
        account.submitted_on = on;
        account.approved_on = Some(on);
        account.activated_on = Some(on);
        account.rejected_on = None;
        account.withdrawn_on = None;
        account.closed_on = None;
        account.lockin_until = None;
        account.on_hold_amount = Decimal::ZERO;
        account.transactions = vec![Transaction::new(TransactionType::Deposit, on, amount)];
        account.charges = Vec::new();
        account.version = 0;
        account.deposit = Some(DepositDetails {
            deposit_amount: amount,
            maturity_date: None,
            maturity_amount: None,
            on_account_closure: Some(OnAccountClosure::WithdrawDeposit),
            recurring: None,
            ..details.clone()
        });
        account.summary = Default::default();
        account.recalculate();
        account.refresh_maturity()?;
        Ok(account)
    }
}
