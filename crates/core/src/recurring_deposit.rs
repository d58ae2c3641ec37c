//! Recurring deposits: installment schedule, deposit allocation and
//! mandatory amount changes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::SavingsAccount;
use crate::enums::{AccountStatus, DepositAccountType, PeriodFrequency, TransactionType};
use crate::error::{CoreError, CoreResult};
use crate::fixed_deposit::DepositDetails;
use crate::types::DbId;

/// A new mandatory installment amount taking effect on `effective_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAmountChange {
    #[serde(default)]
    pub id: Option<DbId>,
    pub effective_date: NaiveDate,
    pub deposit_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecurringDetails {
    pub recurring_frequency: i32,
    pub recurring_frequency_type: PeriodFrequency,
    pub expected_first_deposit_on: Option<NaiveDate>,
    pub is_mandatory_deposit: bool,
    pub allow_withdrawal: bool,
    pub adjust_advance_towards_future_payments: bool,
    pub amount_changes: Vec<DepositAmountChange>,
}

impl RecurringDetails {
    pub fn validate(&self) -> CoreResult<()> {
        if self.recurring_frequency <= 0 {
            return Err(CoreError::Validation(
                "recurringFrequency must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Installment amount due on `date`: the latest change effective on or
    /// before it, else `base`.
    pub fn amount_on(&self, base: Decimal, date: NaiveDate) -> Decimal {
        self.amount_changes
            .iter()
            .filter(|c| c.effective_date <= date)
            .max_by_key(|c| c.effective_date)
            .map(|c| c.deposit_amount)
            .unwrap_or(base)
    }

    /// Due dates from `start`, every `recurring_frequency` units, strictly
    /// before `maturity`.
    pub fn installment_dates(&self, start: NaiveDate, maturity: NaiveDate) -> Vec<NaiveDate> {
        let step = self.recurring_frequency.max(1);
        let mut dates = Vec::new();
        let mut n = 0;
        loop {
            let due = self.recurring_frequency_type.add_to(start, n * step);
            if due >= maturity || (n > 0 && dates.last() == Some(&due)) {
                break;
            }
            dates.push(due);
            n += 1;
        }
        dates
    }
}

/// One scheduled recurring deposit and how much of it has been paid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub installment: u32,
    pub due_date: NaiveDate,
    pub deposit_amount: Decimal,
    pub deposit_amount_completed: Decimal,
    pub deposit_amount_outstanding: Decimal,
    pub obligations_met: bool,
    pub obligations_met_on_date: Option<NaiveDate>,
}

impl SavingsAccount {
    fn recurring_parts(&self) -> CoreResult<(&DepositDetails, &RecurringDetails)> {
        if self.deposit_type != DepositAccountType::RecurringDeposit {
            return Err(self.rule(
                "not.a.recurring.deposit",
                "Operation is only supported on recurring deposits",
            ));
        }
        let details = self.deposit_details()?;
        let recurring = details.recurring.as_ref().ok_or_else(|| {
            CoreError::Internal(format!("account {:?} has no recurring details", self.id))
        })?;
        Ok((details, recurring))
    }

    /// `(due date, amount)` for every installment between `start` and `maturity`.
    pub(crate) fn projected_installments(
        &self,
        start: NaiveDate,
        maturity: NaiveDate,
    ) -> CoreResult<Vec<(NaiveDate, Decimal)>> {
        let (details, recurring) = self.recurring_parts()?;
        Ok(recurring
            .installment_dates(start, maturity)
            .into_iter()
            .map(|due| (due, recurring.amount_on(details.deposit_amount, due)))
            .collect())
    }

    /// The installment schedule with deposits allocated in date order.
    /// Without `adjust_advance_towards_future_payments` a deposit only
    /// covers overdue installments and the next one due.
    pub fn installment_schedule(&self) -> CoreResult<Vec<Installment>> {
        let (details, recurring) = self.recurring_parts()?;
        let start = self.deposit_start_date();
        let maturity = details
            .maturity_date
            .unwrap_or_else(|| details.deposit_period_frequency.add_to(start, details.deposit_period));
        let adjust_advance = recurring.adjust_advance_towards_future_payments;

        let mut schedule: Vec<Installment> = self
            .projected_installments(start, maturity)?
            .into_iter()
            .enumerate()
            .map(|(i, (due_date, amount))| Installment {
                installment: i as u32 + 1,
                due_date,
                deposit_amount: amount,
                deposit_amount_completed: Decimal::ZERO,
                deposit_amount_outstanding: amount,
                obligations_met: false,
                obligations_met_on_date: None,
            })
            .collect();

        for i in self.ordered_indices() {
            let tx = &self.transactions[i];
            if tx.reversed || tx.transaction_type != TransactionType::Deposit {
                continue;
            }
            let next_due = schedule.iter().position(|s| s.due_date >= tx.date);
            let mut remaining = tx.amount;
            for (index, slot) in schedule.iter_mut().enumerate() {
                if remaining.is_zero() {
                    break;
                }
                if !adjust_advance && next_due.is_some_and(|n| index > n) {
                    break;
                }
                if slot.deposit_amount_outstanding.is_zero() {
                    continue;
                }
                let paid = remaining.min(slot.deposit_amount_outstanding);
                remaining -= paid;
                slot.deposit_amount_completed += paid;
                slot.deposit_amount_outstanding -= paid;
                if slot.deposit_amount_outstanding.is_zero() {
                    slot.obligations_met = true;
                    slot.obligations_met_on_date = Some(tx.date);
                }
            }
        }
        Ok(schedule)
    }

    /// Outstanding amount of installments due on or before `today`.
    pub fn total_overdue(&self, today: NaiveDate) -> CoreResult<Decimal> {
        Ok(self
            .installment_schedule()?
            .iter()
            .filter(|s| s.due_date <= today)
            .map(|s| s.deposit_amount_outstanding)
            .sum())
    }

    /// Deposit into a recurring deposit; not allowed after maturity.
    pub fn recurring_deposit(&mut self, date: NaiveDate, amount: Decimal, today: NaiveDate) -> CoreResult<usize> {
        let (details, _) = self.recurring_parts()?;
        if details.maturity_date.is_some_and(|maturity| date >= maturity) {
            return Err(self.rule(
                "deposit.date.on.or.after.maturity",
                "Deposits are not accepted on or after the maturity date",
            ));
        }
        self.deposit(date, amount, today)
    }

    /// Withdraw from a recurring deposit when the product allows it.
    pub fn recurring_withdrawal(
        &mut self,
        date: NaiveDate,
        amount: Decimal,
        today: NaiveDate,
    ) -> CoreResult<usize> {
        let (_, recurring) = self.recurring_parts()?;
        if !recurring.allow_withdrawal {
            return Err(self.rule(
                "withdrawal.not.allowed",
                "Withdrawals are not allowed on this recurring deposit",
            ));
        }
        self.withdraw(date, amount, true, today)
    }

    /// Change the mandatory installment amount from `effective_date` on.
    pub fn update_deposit_amount(
        &mut self,
        amount: Decimal,
        effective_date: NaiveDate,
        today: NaiveDate,
    ) -> CoreResult<()> {
        let (details, _) = self.recurring_parts()?;
        details.terms.check_amount(amount)?;
        if !matches!(
            self.status,
            AccountStatus::SubmittedAndPendingApproval | AccountStatus::Approved | AccountStatus::Active
        ) {
            return Err(self.rule(
                "updatedepositamount.invalid.account.status",
                "Deposit amount can only be changed on open accounts",
            ));
        }
        if effective_date < today {
            return Err(self.rule(
                "updatedepositamount.effective.date.in.past",
                "Effective date cannot be before today",
            ));
        }
        if let Some(recurring) = self.deposit.as_mut().and_then(|d| d.recurring.as_mut()) {
            recurring
                .amount_changes
                .retain(|c| c.effective_date != effective_date);
            recurring.amount_changes.push(DepositAmountChange {
                id: None,
                effective_date,
                deposit_amount: amount,
            });
        }
        self.refresh_maturity()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::account::tests::{assign_ids, date, new_account, terms};
    use crate::fixed_deposit::tests::deposit_terms;

    fn recurring(adjust_advance: bool, allow_withdrawal: bool) -> RecurringDetails {
        RecurringDetails {
            recurring_frequency: 1,
            recurring_frequency_type: PeriodFrequency::Months,
            expected_first_deposit_on: Some(date(2024, 1, 1)),
            is_mandatory_deposit: true,
            allow_withdrawal,
            adjust_advance_towards_future_payments: adjust_advance,
            amount_changes: Vec::new(),
        }
    }

    fn active_recurring(adjust_advance: bool, allow_withdrawal: bool) -> SavingsAccount {
        let today = date(2024, 1, 1);
        let mut new = new_account(terms());
        new.deposit_type = DepositAccountType::RecurringDeposit;
        let mut account = SavingsAccount::submit(new, today).unwrap();
        account.id = Some(9);
        account
            .attach_deposit(DepositDetails {
                terms: deposit_terms(),
                deposit_amount: dec!(100),
                deposit_period: 12,
                deposit_period_frequency: PeriodFrequency::Months,
                maturity_date: None,
                maturity_amount: None,
                on_account_closure: None,
                transfer_to_savings_id: None,
                chart: None,
                recurring: Some(recurring(adjust_advance, allow_withdrawal)),
            })
            .unwrap();
        account.approve(today, today).unwrap();
        account.activate_deposit(today, today).unwrap();
        account
    }

    #[test]
    fn schedule_runs_monthly_until_maturity() {
        let account = active_recurring(false, false);
        let schedule = account.installment_schedule().unwrap();
        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule[0].due_date, date(2024, 1, 1));
        assert_eq!(schedule[11].due_date, date(2024, 12, 1));
        assert_eq!(account.summary.account_balance, dec!(0));
        assert_eq!(
            account.deposit_details().unwrap().maturity_date,
            Some(date(2025, 1, 1))
        );
    }

    #[test]
    fn advance_payment_needs_adjust_flag() {
        let today = date(2024, 2, 1);
        let mut strict = active_recurring(false, false);
        strict.recurring_deposit(date(2024, 1, 1), dec!(100), today).unwrap();
        strict.recurring_deposit(date(2024, 2, 1), dec!(250), today).unwrap();
        let schedule = strict.installment_schedule().unwrap();
        assert!(schedule[1].obligations_met);
        assert_eq!(schedule[2].deposit_amount_completed, dec!(0));

        let mut flexible = active_recurring(true, false);
        flexible.recurring_deposit(date(2024, 1, 1), dec!(100), today).unwrap();
        flexible.recurring_deposit(date(2024, 2, 1), dec!(250), today).unwrap();
        let schedule = flexible.installment_schedule().unwrap();
        assert!(schedule[2].obligations_met);
        assert_eq!(schedule[3].deposit_amount_completed, dec!(50));
        assert_eq!(schedule[3].obligations_met_on_date, None);
    }

    #[test]
    fn late_deposit_covers_overdue_installments_first() {
        let today = date(2024, 3, 15);
        let mut account = active_recurring(false, false);
        account.recurring_deposit(date(2024, 3, 15), dec!(250), today).unwrap();
        let schedule = account.installment_schedule().unwrap();
        assert!(schedule[0].obligations_met);
        assert!(schedule[1].obligations_met);
        assert_eq!(schedule[2].deposit_amount_completed, dec!(50));
        assert_eq!(schedule[0].obligations_met_on_date, Some(date(2024, 3, 15)));
        assert_eq!(account.total_overdue(today).unwrap(), dec!(50));
    }

    #[test]
    fn amount_change_applies_to_later_installments() {
        let mut account = active_recurring(false, false);
        let before = account.deposit_details().unwrap().maturity_amount.unwrap();
        account
            .update_deposit_amount(dec!(200), date(2024, 7, 1), date(2024, 3, 1))
            .unwrap();
        let schedule = account.installment_schedule().unwrap();
        assert_eq!(schedule[5].deposit_amount, dec!(100));
        assert_eq!(schedule[6].deposit_amount, dec!(200));
        let after = account.deposit_details().unwrap().maturity_amount.unwrap();
        assert!(after > before + dec!(600));
    }

    #[test]
    fn projected_maturity_includes_interest() {
        let account = active_recurring(false, false);
        let maturity = account.deposit_details().unwrap().maturity_amount.unwrap();
        assert!(maturity > dec!(1200) && maturity < dec!(1300));
    }

    #[test]
    fn withdrawal_requires_permission_and_deposit_stops_at_maturity() {
        let today = date(2024, 3, 1);
        let mut account = active_recurring(false, false);
        account.recurring_deposit(date(2024, 1, 1), dec!(100), today).unwrap();
        assert_matches!(
            account.recurring_withdrawal(date(2024, 2, 1), dec!(10), today),
            Err(CoreError::DomainRule { ref code, .. }) if code.ends_with("withdrawal.not.allowed")
        );
        let mut open = active_recurring(false, true);
        open.recurring_deposit(date(2024, 1, 1), dec!(100), today).unwrap();
        open.recurring_withdrawal(date(2024, 2, 1), dec!(10), today).unwrap();
        assert_eq!(open.summary.account_balance, dec!(90));

        assert!(account
            .recurring_deposit(date(2025, 1, 1), dec!(100), date(2025, 2, 1))
            .is_err());
    }

    #[test]
    fn modify_cannot_move_a_deposit_past_maturity() {
        let today = date(2025, 2, 1);
        let mut account = active_recurring(false, false);
        let index = account.recurring_deposit(date(2024, 1, 1), dec!(100), today).unwrap();
        assign_ids(&mut account);
        let id = account.transactions[index].id.unwrap();
        assert_matches!(
            account.adjust_transaction(id, date(2025, 1, 1), dec!(100), today),
            Err(CoreError::DomainRule { ref code, .. }) if code.ends_with("deposit.date.on.or.after.maturity")
        );
    }
}
