//! Charge definitions and the charges applied to individual accounts.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{SavingsAccount, Transaction};
use crate::enums::{AccountStatus, ChargeCalculationType, ChargeTimeType, TransactionType};
use crate::error::{CoreError, CoreResult};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A reusable fee definition (`/charges`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeDefinition {
    #[serde(default)]
    pub id: Option<DbId>,
    pub name: String,
    pub currency_code: String,
    pub amount: Decimal,
    pub charge_time_type: ChargeTimeType,
    pub charge_calculation_type: ChargeCalculationType,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub penalty: bool,
    /// Annual fees: month (1..=12) and day the fee falls due each year.
    pub fee_on_month: Option<u32>,
    pub fee_on_day: Option<u32>,
    /// Monthly fees: months between charges.
    pub fee_interval: Option<i32>,
}

fn default_true() -> bool {
    true
}

impl ChargeDefinition {
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("name is required".into()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(CoreError::Validation("amount must be greater than zero".into()));
        }
        if self.charge_calculation_type == ChargeCalculationType::PercentOfAmount
            && self.charge_time_type != ChargeTimeType::WithdrawalFee
        {
            return Err(CoreError::rule(
                "charge.calculation.type.percentage.allowed.only.for.withdrawal.fee",
                "Percentage calculation is only supported for withdrawal fees",
            ));
        }
        match self.charge_time_type {
            ChargeTimeType::AnnualFee => validate_month_day(self.fee_on_month, self.fee_on_day)?,
            ChargeTimeType::MonthlyFee => {
                if !self.fee_interval.is_some_and(|n| (1..=12).contains(&n)) {
                    return Err(CoreError::Validation(
                        "feeInterval between 1 and 12 is required for monthly fees".into(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn validate_month_day(month: Option<u32>, day: Option<u32>) -> CoreResult<()> {
    match (month, day) {
        // 2000 is a leap year, so Feb 29 is accepted.
        (Some(m), Some(d)) if NaiveDate::from_ymd_opt(2000, m, d).is_some() => Ok(()),
        _ => Err(CoreError::Validation(
            "feeOnMonthDay with a valid month and day is required for annual fees".into(),
        )),
    }
}

/// First date on or after `from` that falls on `month`/`day`.
pub fn next_annual_date(from: NaiveDate, month: u32, day: u32) -> NaiveDate {
    let candidate = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day)
            .or_else(|| NaiveDate::from_ymd_opt(year, month, 28))
            .unwrap_or(from)
    };
    let this_year = candidate(from.year());
    if this_year >= from {
        this_year
    } else {
        candidate(from.year() + 1)
    }
}

// ---------------------------------------------------------------------------
// Account charges
// ---------------------------------------------------------------------------

/// A charge attached to one account, with its payment state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCharge {
    pub id: Option<DbId>,
    pub charge_id: DbId,
    pub name: String,
    pub time_type: ChargeTimeType,
    pub calculation_type: ChargeCalculationType,
    /// Percent of the withdrawal for percentage fees.
    pub percentage: Option<Decimal>,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub amount_waived: Decimal,
    pub amount_outstanding: Decimal,
    pub due_date: Option<NaiveDate>,
    pub fee_on_month: Option<u32>,
    pub fee_on_day: Option<u32>,
    pub fee_interval: Option<i32>,
    pub penalty: bool,
    pub active: bool,
    pub paid: bool,
    pub waived: bool,
    pub inactivated_on: Option<NaiveDate>,
}

/// Caller overrides when attaching a charge to an account.
#[derive(Debug, Clone, Default)]
pub struct ChargeOverrides {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub fee_on_month: Option<u32>,
    pub fee_on_day: Option<u32>,
    pub fee_interval: Option<i32>,
}

impl AccountCharge {
    pub fn from_definition(def: &ChargeDefinition, overrides: ChargeOverrides) -> CoreResult<Self> {
        let Some(charge_id) = def.id else {
            return Err(CoreError::Internal("charge definition has no id".into()));
        };
        if !def.active {
            return Err(CoreError::rule(
                "savingsaccountcharge.charge.is.inactive",
                format!("Charge '{}' is not active", def.name),
            ));
        }
        let amount = overrides.amount.unwrap_or(def.amount);
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation("amount must be greater than zero".into()));
        }
        let fee_on_month = overrides.fee_on_month.or(def.fee_on_month);
        let fee_on_day = overrides.fee_on_day.or(def.fee_on_day);
        if def.charge_time_type == ChargeTimeType::AnnualFee {
            validate_month_day(fee_on_month, fee_on_day)?;
        }
        if def.charge_time_type == ChargeTimeType::SpecifiedDueDate && overrides.due_date.is_none() {
            return Err(CoreError::Validation(
                "dueDate is required for specified due date charges".into(),
            ));
        }
        let percentage = (def.charge_calculation_type == ChargeCalculationType::PercentOfAmount)
            .then_some(amount);
        Ok(Self {
            id: None,
            charge_id,
            name: def.name.clone(),
            time_type: def.charge_time_type,
            calculation_type: def.charge_calculation_type,
            percentage,
            amount,
            amount_paid: Decimal::ZERO,
            amount_waived: Decimal::ZERO,
            amount_outstanding: amount,
            due_date: overrides.due_date,
            fee_on_month,
            fee_on_day,
            fee_interval: overrides.fee_interval.or(def.fee_interval),
            penalty: def.penalty,
            active: true,
            paid: false,
            waived: false,
            inactivated_on: None,
        })
    }

    fn is_recurring(&self) -> bool {
        matches!(self.time_type, ChargeTimeType::AnnualFee | ChargeTimeType::MonthlyFee)
    }

    pub fn is_settled(&self) -> bool {
        self.paid || self.waived
    }

    pub fn has_payments(&self) -> bool {
        self.amount_paid > Decimal::ZERO || self.amount_waived > Decimal::ZERO
    }

    fn refresh_outstanding(&mut self) {
        self.amount_outstanding =
            (self.amount - self.amount_paid - self.amount_waived).max(Decimal::ZERO);
        self.paid = self.amount_outstanding.is_zero() && self.amount_paid > Decimal::ZERO;
    }

    /// Record a payment. Recurring charges roll to their next due date once
    /// fully paid.
    pub fn record_payment(&mut self, amount: Decimal) {
        self.amount_paid += amount;
        self.refresh_outstanding();
        if self.paid && self.is_recurring() && self.active {
            self.roll_forward();
        }
    }

    /// Take back a payment. `from_earlier_period` marks a payment that
    /// completed a period the charge has since rolled past: the due date
    /// steps back and payments made since then fill the reopened period.
    pub fn undo_payment(&mut self, amount: Decimal, from_earlier_period: bool) {
        if self.time_type == ChargeTimeType::WithdrawalFee {
            self.amount_paid = (self.amount_paid - amount).max(Decimal::ZERO);
            return;
        }
        if !(from_earlier_period && self.is_recurring()) {
            self.amount_paid = (self.amount_paid - amount).max(Decimal::ZERO);
            self.refresh_outstanding();
            return;
        }
        let carried = self.amount_paid;
        self.roll_back();
        self.amount_paid = (self.amount - amount).max(Decimal::ZERO);
        self.amount_waived = Decimal::ZERO;
        self.refresh_outstanding();
        let refill = carried.min(self.amount_outstanding);
        if refill > Decimal::ZERO {
            self.record_payment(refill);
        }
        self.amount_paid += carried - refill;
        self.refresh_outstanding();
    }

    fn step(&self) -> Option<Months> {
        match self.time_type {
            ChargeTimeType::AnnualFee => Some(Months::new(12)),
            ChargeTimeType::MonthlyFee => {
                Some(Months::new(self.fee_interval.unwrap_or(1).max(1) as u32))
            }
            _ => None,
        }
    }

    fn roll_forward(&mut self) {
        if let (Some(due), Some(step)) = (self.due_date, self.step()) {
            self.due_date = due.checked_add_months(step);
            self.amount_paid = Decimal::ZERO;
            self.amount_waived = Decimal::ZERO;
            self.refresh_outstanding();
        }
    }

    fn roll_back(&mut self) {
        if let (Some(due), Some(step)) = (self.due_date, self.step()) {
            self.due_date = due.checked_sub_months(step);
        }
    }

    /// Fee for a withdrawal of `withdrawal` (flat or percent of the amount).
    pub fn withdrawal_fee(&self, withdrawal: Decimal) -> Decimal {
        match (self.calculation_type, self.percentage) {
            (ChargeCalculationType::PercentOfAmount, Some(percent)) => {
                withdrawal * percent / Decimal::ONE_HUNDRED
            }
            _ => self.amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Charge operations on the account aggregate
// ---------------------------------------------------------------------------

impl SavingsAccount {
    pub fn charge(&self, charge_id: DbId) -> CoreResult<&AccountCharge> {
        self.charges
            .iter()
            .find(|c| c.id == Some(charge_id))
            .ok_or(CoreError::NotFound {
                entity: "SavingsAccountCharge",
                id: charge_id,
            })
    }

    fn charge_mut(&mut self, charge_id: DbId) -> CoreResult<&mut AccountCharge> {
        self.charges
            .iter_mut()
            .find(|c| c.id == Some(charge_id))
            .ok_or(CoreError::NotFound {
                entity: "SavingsAccountCharge",
                id: charge_id,
            })
    }

    /// Attach a charge. Returns its index in `charges`.
    pub fn add_charge(&mut self, mut charge: AccountCharge) -> CoreResult<usize> {
        if self.status.is_closed() {
            return Err(self.rule(
                "charge.account.is.closed",
                "Charges cannot be added to a closed account",
            ));
        }
        if matches!(
            charge.time_type,
            ChargeTimeType::AnnualFee | ChargeTimeType::WithdrawalFee
        ) && self
            .charges
            .iter()
            .any(|c| c.active && c.time_type == charge.time_type)
        {
            return Err(self.rule(
                "charge.duplicate.fee",
                format!("Account already has an active {} charge", charge.time_type.value()),
            ));
        }
        if let (Some(due), Some(activated)) = (charge.due_date, self.activated_on) {
            if charge.time_type == ChargeTimeType::SpecifiedDueDate && due < activated {
                return Err(self.rule(
                    "charge.due.date.before.activation",
                    "Charge due date cannot be before the activation date",
                ));
            }
        }
        if self.status == AccountStatus::Active && charge.due_date.is_none() {
            if let Some(activated) = self.activated_on {
                schedule_from(&mut charge, activated);
            }
        }
        self.charges.push(charge);
        Ok(self.charges.len() - 1)
    }

    /// Give recurring charges their first due date.
    pub(crate) fn schedule_recurring_fees(&mut self, activated_on: NaiveDate) {
        for charge in self.charges.iter_mut().filter(|c| c.due_date.is_none()) {
            schedule_from(charge, activated_on);
        }
    }

    pub fn update_charge(
        &mut self,
        charge_id: DbId,
        amount: Option<Decimal>,
        due_date: Option<NaiveDate>,
    ) -> CoreResult<()> {
        let entity = self.entity_code();
        let charge = self.charge_mut(charge_id)?;
        if charge.has_payments() || charge.is_settled() {
            return Err(CoreError::rule(
                &format!("{entity}.charge.update.paid.charge"),
                "A charge with payments or waivers cannot be updated",
            ));
        }
        if let Some(amount) = amount {
            if amount <= Decimal::ZERO {
                return Err(CoreError::Validation("amount must be greater than zero".into()));
            }
            charge.amount = amount;
            if charge.calculation_type == ChargeCalculationType::PercentOfAmount {
                charge.percentage = Some(amount);
            }
        }
        if due_date.is_some() {
            charge.due_date = due_date;
        }
        charge.refresh_outstanding();
        Ok(())
    }

    /// Detach an unpaid charge. Returns the removed charge.
    pub fn remove_charge(&mut self, charge_id: DbId) -> CoreResult<AccountCharge> {
        let charge = self.charge(charge_id)?;
        if charge.has_payments() || charge.is_settled() {
            return Err(self.rule(
                "charge.delete.paid.charge",
                "A charge with payments or waivers cannot be deleted",
            ));
        }
        let index = self
            .charges
            .iter()
            .position(|c| c.id == Some(charge_id))
            .unwrap_or_default();
        Ok(self.charges.remove(index))
    }

    /// Pay `amount` towards a charge. Returns the transaction index.
    pub fn pay_charge(
        &mut self,
        charge_id: DbId,
        amount: Decimal,
        date: NaiveDate,
        today: NaiveDate,
    ) -> CoreResult<usize> {
        self.require_status(AccountStatus::Active, "paycharge")?;
        if date > today {
            return Err(self.rule(
                "charge.transaction.date.cannot.be.a.future.date",
                "Charge payment date cannot be in the future",
            ));
        }
        if self.activated_on.is_some_and(|activated| date < activated) {
            return Err(self.rule(
                "charge.transaction.date.before.activation",
                "Charge payment date cannot be before the activation date",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation("amount must be greater than zero".into()));
        }
        let charge = self.charge(charge_id)?;
        if !charge.active {
            return Err(self.rule("charge.is.inactive", "Charge is not active"));
        }
        if charge.time_type == ChargeTimeType::WithdrawalFee {
            return Err(self.rule(
                "charge.withdrawal.fee.cannot.be.paid",
                "Withdrawal fees are collected with withdrawals",
            ));
        }
        if amount > charge.amount_outstanding {
            return Err(self.rule(
                "charge.amount.exceeds.outstanding",
                format!(
                    "Payment {amount} exceeds the outstanding amount {}",
                    charge.amount_outstanding
                ),
            ));
        }
        let index = self.settle_charge(charge_id, amount, date)?;
        self.recalculate();
        self.validate_balance()?;
        Ok(index)
    }

    /// Debit the account for a charge payment without balance validation.
    pub(crate) fn settle_charge(
        &mut self,
        charge_id: DbId,
        amount: Decimal,
        date: NaiveDate,
    ) -> CoreResult<usize> {
        let charge = self.charge_mut(charge_id)?;
        let tx_type = match charge.time_type {
            ChargeTimeType::AnnualFee => TransactionType::AnnualFee,
            ChargeTimeType::WithdrawalFee => TransactionType::WithdrawalFee,
            _ => TransactionType::PayCharge,
        };
        charge.record_payment(amount);
        let mut tx = Transaction::new(tx_type, date, amount);
        tx.account_charge_id = Some(charge_id);
        Ok(self.push(tx))
    }

    /// Whether the payment at `index` completed a period of its charge that
    /// later payments or waivers have moved past.
    pub(crate) fn paid_in_earlier_period(&self, index: usize) -> bool {
        let Some(charge_id) = self.transactions[index].account_charge_id else {
            return false;
        };
        let Ok(charge) = self.charge(charge_id) else {
            return false;
        };
        if !charge.is_recurring() || charge.amount <= Decimal::ZERO {
            return false;
        }
        let mut filled = Decimal::ZERO;
        let mut closed = 0usize;
        let mut target_period = None;
        for (i, tx) in self.transactions.iter().enumerate() {
            let settles = tx.transaction_type.is_fee()
                || tx.transaction_type == TransactionType::WaiveCharges;
            if tx.reversed || !settles || tx.account_charge_id != Some(charge_id) {
                continue;
            }
            if i == index {
                target_period = Some(closed);
            }
            filled += tx.amount;
            if filled >= charge.amount {
                closed += 1;
                filled = Decimal::ZERO;
            }
        }
        target_period.is_some_and(|period| period < closed)
    }

    /// Collect every active withdrawal fee for a withdrawal of `amount`.
    pub(crate) fn apply_withdrawal_fees(&mut self, date: NaiveDate, amount: Decimal) -> CoreResult<()> {
        let fees: Vec<(DbId, Decimal)> = self
            .charges
            .iter()
            .filter(|c| c.active && c.time_type == ChargeTimeType::WithdrawalFee)
            .filter_map(|c| c.id.map(|id| (id, self.currency.round(c.withdrawal_fee(amount)))))
            .filter(|(_, fee)| *fee > Decimal::ZERO)
            .collect();
        for (charge_id, fee) in fees {
            self.settle_charge(charge_id, fee, date)?;
        }
        Ok(())
    }

    /// Waive the outstanding amount. Returns the (non-monetary) transaction index.
    pub fn waive_charge(&mut self, charge_id: DbId, today: NaiveDate) -> CoreResult<usize> {
        if self.status.is_closed() {
            return Err(self.rule("charge.account.is.closed", "Account is closed"));
        }
        let charge = self.charge(charge_id)?;
        if charge.time_type == ChargeTimeType::WithdrawalFee {
            return Err(self.rule(
                "charge.withdrawal.fee.cannot.be.waived",
                "Withdrawal fees cannot be waived",
            ));
        }
        if charge.is_settled() || charge.amount_outstanding.is_zero() {
            return Err(self.rule("charge.already.settled", "Charge is already paid or waived"));
        }
        let charge = self.charge_mut(charge_id)?;
        let waived = charge.amount_outstanding;
        let date = charge.due_date.unwrap_or(today).min(today);
        charge.amount_waived += waived;
        charge.refresh_outstanding();
        charge.waived = true;
        if charge.is_recurring() && charge.active {
            charge.waived = false;
            charge.roll_forward();
        }
        let mut tx = Transaction::new(TransactionType::WaiveCharges, date, waived);
        tx.account_charge_id = Some(charge_id);
        let index = self.push(tx);
        self.recalculate();
        Ok(index)
    }

    pub fn inactivate_charge(&mut self, charge_id: DbId, date: NaiveDate) -> CoreResult<()> {
        let entity = self.entity_code();
        let charge = self.charge_mut(charge_id)?;
        if !charge.active {
            return Err(CoreError::rule(
                &format!("{entity}.charge.already.inactive"),
                "Charge is already inactive",
            ));
        }
        charge.active = false;
        charge.inactivated_on = Some(date);
        Ok(())
    }

    /// Pay every annual fee falling due on or before `today`, one
    /// transaction per missed year. Returns the new transaction indices.
    pub fn apply_annual_fees(&mut self, today: NaiveDate) -> CoreResult<Vec<usize>> {
        self.require_status(AccountStatus::Active, "applyannualfees")?;
        let mut indices = Vec::new();
        let ids: Vec<DbId> = self
            .charges
            .iter()
            .filter(|c| c.active && c.time_type == ChargeTimeType::AnnualFee)
            .filter_map(|c| c.id)
            .collect();
        for charge_id in ids {
            loop {
                let charge = self.charge(charge_id)?;
                let Some(due) = charge.due_date.filter(|due| *due <= today) else {
                    break;
                };
                let outstanding = charge.amount_outstanding;
                if outstanding.is_zero() {
                    break;
                }
                indices.push(self.settle_charge(charge_id, outstanding, due)?);
            }
        }
        self.recalculate();
        self.validate_balance()?;
        Ok(indices)
    }
}

fn schedule_from(charge: &mut AccountCharge, activated_on: NaiveDate) {
    charge.due_date = match charge.time_type {
        ChargeTimeType::AnnualFee => match (charge.fee_on_month, charge.fee_on_day) {
            (Some(m), Some(d)) => Some(next_annual_date(activated_on, m, d)),
            _ => None,
        },
        ChargeTimeType::MonthlyFee => {
            let interval = charge.fee_interval.unwrap_or(1).max(1) as u32;
            activated_on.checked_add_months(Months::new(interval))
        }
        _ => charge.due_date,
    };
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::account::tests::{active_account, assign_ids, date, terms};

    fn definition(time_type: ChargeTimeType, calc: ChargeCalculationType, amount: Decimal) -> ChargeDefinition {
        ChargeDefinition {
            id: Some(10),
            name: "Fee".into(),
            currency_code: "USD".into(),
            amount,
            charge_time_type: time_type,
            charge_calculation_type: calc,
            active: true,
            penalty: false,
            fee_on_month: None,
            fee_on_day: None,
            fee_interval: None,
        }
    }

    fn attach(account: &mut SavingsAccount, def: &ChargeDefinition, overrides: ChargeOverrides) -> DbId {
        let index = account
            .add_charge(AccountCharge::from_definition(def, overrides).unwrap())
            .unwrap();
        let id = 100 + index as DbId;
        account.charges[index].id = Some(id);
        id
    }

    #[test]
    fn definition_validation() {
        let mut def = definition(ChargeTimeType::AnnualFee, ChargeCalculationType::Flat, dec!(5));
        assert_matches!(def.validate(), Err(CoreError::Validation(_)));
        def.fee_on_month = Some(2);
        def.fee_on_day = Some(30);
        assert_matches!(def.validate(), Err(CoreError::Validation(_)));
        def.fee_on_day = Some(29);
        assert!(def.validate().is_ok());

        let pct = definition(
            ChargeTimeType::SpecifiedDueDate,
            ChargeCalculationType::PercentOfAmount,
            dec!(1),
        );
        assert_matches!(pct.validate(), Err(CoreError::DomainRule { .. }));
    }

    #[test]
    fn next_annual_date_rolls_to_next_year() {
        assert_eq!(next_annual_date(date(2024, 3, 1), 2, 15), date(2025, 2, 15));
        assert_eq!(next_annual_date(date(2024, 1, 1), 2, 15), date(2024, 2, 15));
        assert_eq!(next_annual_date(date(2025, 1, 1), 2, 29), date(2025, 2, 28));
    }

    #[test]
    fn flat_withdrawal_fee_is_collected() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        let def = definition(ChargeTimeType::WithdrawalFee, ChargeCalculationType::Flat, dec!(2));
        attach(&mut account, &def, ChargeOverrides::default());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        account.withdraw(date(2024, 1, 3), dec!(50), true, today).unwrap();
        assert_eq!(account.summary.total_withdrawal_fees, dec!(2));
        assert_eq!(account.summary.account_balance, dec!(48));
    }

    #[test]
    fn percent_withdrawal_fee_uses_withdrawal_amount() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        let def = definition(
            ChargeTimeType::WithdrawalFee,
            ChargeCalculationType::PercentOfAmount,
            dec!(1.5),
        );
        attach(&mut account, &def, ChargeOverrides::default());
        account.deposit(date(2024, 1, 2), dec!(1000), today).unwrap();
        account.withdraw(date(2024, 1, 3), dec!(200), true, today).unwrap();
        assert_eq!(account.summary.total_withdrawal_fees, dec!(3.00));
    }

    #[test]
    fn modified_withdrawal_collects_its_fee_again() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        let def = definition(
            ChargeTimeType::WithdrawalFee,
            ChargeCalculationType::PercentOfAmount,
            dec!(1.5),
        );
        attach(&mut account, &def, ChargeOverrides::default());
        account.deposit(date(2024, 1, 2), dec!(1000), today).unwrap();
        let index = account.withdraw(date(2024, 1, 3), dec!(200), true, today).unwrap();
        assign_ids(&mut account);
        let id = account.transactions[index].id.unwrap();

        account
            .adjust_transaction(id, date(2024, 1, 4), dec!(400), today)
            .unwrap();
        assert!(account.transactions[index + 1].reversed);
        assert_eq!(account.summary.total_withdrawal_fees, dec!(6.00));
        assert_eq!(account.summary.account_balance, dec!(594.00));
    }

    #[test]
    fn specified_due_date_charge_pay_and_limits() {
        let today = date(2024, 1, 20);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        let def = definition(ChargeTimeType::SpecifiedDueDate, ChargeCalculationType::Flat, dec!(10));
        assert_matches!(
            AccountCharge::from_definition(&def, ChargeOverrides::default()),
            Err(CoreError::Validation(_))
        );
        let id = attach(
            &mut account,
            &def,
            ChargeOverrides {
                due_date: Some(date(2024, 1, 15)),
                ..Default::default()
            },
        );
        assert!(account.clone().pay_charge(id, dec!(11), today, today).is_err());
        account.pay_charge(id, dec!(4), today, today).unwrap();
        assert_eq!(account.charge(id).unwrap().amount_outstanding, dec!(6));
        account.pay_charge(id, dec!(6), today, today).unwrap();
        assert!(account.charge(id).unwrap().paid);
        assert_eq!(account.summary.total_fee_charges, dec!(10));
        assert_eq!(account.summary.account_balance, dec!(90));

        assert!(account.update_charge(id, Some(dec!(20)), None).is_err());
        assert!(account.remove_charge(id).is_err());
    }

    #[test]
    fn undo_charge_payment_restores_outstanding() {
        let today = date(2024, 1, 20);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        let def = definition(ChargeTimeType::SpecifiedDueDate, ChargeCalculationType::Flat, dec!(10));
        let id = attach(
            &mut account,
            &def,
            ChargeOverrides {
                due_date: Some(date(2024, 1, 15)),
                ..Default::default()
            },
        );
        let index = account.pay_charge(id, dec!(10), today, today).unwrap();
        assign_ids(&mut account);
        let tx_id = account.transactions[index].id.unwrap();
        account.undo_transaction(tx_id).unwrap();
        let charge = account.charge(id).unwrap();
        assert!(!charge.paid);
        assert_eq!(charge.amount_outstanding, dec!(10));
        assert_eq!(account.summary.account_balance, dec!(100));
    }

    #[test]
    fn undoing_a_paid_period_reopens_it_despite_later_payments() {
        let today = date(2024, 3, 5);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(100), date(2024, 1, 1)).unwrap();
        let mut def = definition(ChargeTimeType::AnnualFee, ChargeCalculationType::Flat, dec!(5));
        def.fee_on_month = Some(3);
        def.fee_on_day = Some(1);
        let id = attach(&mut account, &def, ChargeOverrides::default());
        let applied = account.apply_annual_fees(date(2024, 3, 1)).unwrap();
        // Part of next year's fee paid early.
        account.pay_charge(id, dec!(2), today, today).unwrap();
        assert_eq!(account.charge(id).unwrap().due_date, Some(date(2025, 3, 1)));

        assign_ids(&mut account);
        let fee_tx = account.transactions[applied[0]].id.unwrap();
        account.undo_transaction(fee_tx).unwrap();

        let charge = account.charge(id).unwrap();
        assert_eq!(charge.due_date, Some(date(2024, 3, 1)));
        assert_eq!(charge.amount_paid, dec!(2));
        assert_eq!(charge.amount_outstanding, dec!(3));
        assert!(!charge.paid);
        assert_eq!(account.summary.account_balance, dec!(98));
    }

    #[test]
    fn annual_fee_applies_once_per_year_and_rolls() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(100), date(2024, 1, 1)).unwrap();
        let mut def = definition(ChargeTimeType::AnnualFee, ChargeCalculationType::Flat, dec!(5));
        def.fee_on_month = Some(3);
        def.fee_on_day = Some(1);
        let id = attach(&mut account, &def, ChargeOverrides::default());
        assert_eq!(account.charge(id).unwrap().due_date, Some(date(2024, 3, 1)));

        assert!(account.apply_annual_fees(date(2024, 2, 1)).unwrap().is_empty());
        let applied = account.apply_annual_fees(date(2025, 3, 1)).unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(account.summary.total_annual_fees, dec!(10));
        assert_eq!(account.charge(id).unwrap().due_date, Some(date(2026, 3, 1)));
        assert_eq!(account.transactions[applied[0]].transaction_type, TransactionType::AnnualFee);
    }

    #[test]
    fn duplicate_annual_fee_rejected() {
        let mut account = active_account(terms());
        let mut def = definition(ChargeTimeType::AnnualFee, ChargeCalculationType::Flat, dec!(5));
        def.fee_on_month = Some(3);
        def.fee_on_day = Some(1);
        attach(&mut account, &def, ChargeOverrides::default());
        let second = AccountCharge::from_definition(&def, ChargeOverrides::default()).unwrap();
        assert_matches!(account.add_charge(second), Err(CoreError::DomainRule { .. }));
    }

    #[test]
    fn waive_and_inactivate() {
        let today = date(2024, 1, 20);
        let mut account = active_account(terms());
        let def = definition(ChargeTimeType::SpecifiedDueDate, ChargeCalculationType::Flat, dec!(10));
        let id = attach(
            &mut account,
            &def,
            ChargeOverrides {
                due_date: Some(date(2024, 1, 15)),
                ..Default::default()
            },
        );
        let index = account.waive_charge(id, today).unwrap();
        assert_eq!(account.transactions[index].transaction_type, TransactionType::WaiveCharges);
        assert_eq!(account.summary.account_balance, dec!(0));
        let charge = account.charge(id).unwrap();
        assert!(charge.waived);
        assert_eq!(charge.amount_outstanding, dec!(0));
        assert!(account.waive_charge(id, today).is_err());

        account.inactivate_charge(id, today).unwrap();
        assert!(!account.charge(id).unwrap().active);
        assert!(account.inactivate_charge(id, today).is_err());
    }

    #[test]
    fn activation_fee_is_paid_on_activation() {
        let mut t = terms();
        t.min_required_opening_balance = Some(dec!(100));
        let today = date(2024, 1, 1);
        let mut account =
            SavingsAccount::submit(crate::account::tests::new_account(t), today).unwrap();
        let def = definition(ChargeTimeType::SavingsActivation, ChargeCalculationType::Flat, dec!(3));
        attach(&mut account, &def, ChargeOverrides::default());
        account.approve(today, today).unwrap();
        account.activate(today, today).unwrap();
        assert_eq!(account.summary.account_balance, dec!(97));
        assert_eq!(account.summary.total_fee_charges, dec!(3));
    }
}
