//! Savings account aggregate: lifecycle state machine, monetary
//! transactions, holds, balance validation, interest posting and closure.
//!
//! The aggregate is loaded whole (account, transactions, charges), mutated
//! by one operation and persisted by the caller. When an operation returns
//! an error the aggregate may be partially modified and must be discarded.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::charges::AccountCharge;
use crate::enums::{
    AccountStatus, AccountSubStatus, ChargeTimeType, DaysInYear, DepositAccountType,
    InterestCalculationType, InterestCompoundingPeriod, InterestPostingPeriod, PeriodFrequency,
    TransactionType,
};
use crate::error::{CoreError, CoreResult};
use crate::fixed_deposit::DepositDetails;
use crate::interest::{self, BalanceMovement, InterestSettings, PostingPeriodInterest};
use crate::types::{Currency, DbId};

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// Interest and balance rules shared by products and the accounts opened
/// from them. Accounts take a copy at submission and may override it
/// until approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsTerms {
    /// Fixed and recurring deposits take their rate from the interest chart.
    #[serde(default)]
    pub nominal_annual_interest_rate: Decimal,
    pub interest_compounding_period_type: InterestCompoundingPeriod,
    pub interest_posting_period_type: InterestPostingPeriod,
    pub interest_calculation_type: InterestCalculationType,
    pub interest_calculation_days_in_year_type: DaysInYear,
    pub min_required_opening_balance: Option<Decimal>,
    pub lockin_period_frequency: Option<i32>,
    pub lockin_period_frequency_type: Option<PeriodFrequency>,
    #[serde(default)]
    pub withdrawal_fee_for_transfers: bool,
    #[serde(default)]
    pub allow_overdraft: bool,
    pub overdraft_limit: Option<Decimal>,
    #[serde(default)]
    pub enforce_min_required_balance: bool,
    pub min_required_balance: Option<Decimal>,
    pub min_balance_for_interest_calculation: Option<Decimal>,
    #[serde(default, rename = "withHoldTax")]
    pub withhold_tax: bool,
    /// Percent withheld from posted interest when `withhold_tax` is set.
    pub tax_rate: Option<Decimal>,
}

impl SavingsTerms {
    pub fn validate(&self) -> CoreResult<()> {
        if self.nominal_annual_interest_rate < Decimal::ZERO {
            return Err(CoreError::Validation(
                "nominalAnnualInterestRate must be zero or greater".into(),
            ));
        }
        for (field, value) in [
            ("minRequiredOpeningBalance", self.min_required_opening_balance),
            ("overdraftLimit", self.overdraft_limit),
            ("minRequiredBalance", self.min_required_balance),
            (
                "minBalanceForInterestCalculation",
                self.min_balance_for_interest_calculation,
            ),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(CoreError::Validation(format!(
                    "{field} must be zero or greater"
                )));
            }
        }
        match (self.lockin_period_frequency, self.lockin_period_frequency_type) {
            (Some(n), Some(_)) if n < 0 => {
                return Err(CoreError::Validation(
                    "lockinPeriodFrequency must be zero or greater".into(),
                ))
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(CoreError::Validation(
                    "lockinPeriodFrequency and lockinPeriodFrequencyType must be given together"
                        .into(),
                ))
            }
            _ => {}
        }
        if self.withhold_tax {
            match self.tax_rate {
                Some(rate) if rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED => {}
                _ => {
                    return Err(CoreError::Validation(
                        "taxRate between 0 and 100 is required when withHoldTax is enabled"
                            .into(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn overdraft_floor(&self) -> Decimal {
        if self.allow_overdraft {
            -self.overdraft_limit.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    fn enforced_min_balance(&self) -> Decimal {
        if self.enforce_min_required_balance {
            self.min_required_balance.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

/// Institution-wide interest posting settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingConfig {
    pub financial_year_beginning_month: u32,
    pub post_at_period_end: bool,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            financial_year_beginning_month: 1,
            post_at_period_end: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Transactions and summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Option<DbId>,
    pub transaction_type: TransactionType,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub running_balance: Decimal,
    pub reversed: bool,
    /// Posted by an explicit `postInterestAsOn` request.
    pub is_manual: bool,
    /// Account charge paid or waived by this transaction.
    pub account_charge_id: Option<DbId>,
    /// For releases: the hold transaction being released.
    pub hold_transaction_id: Option<DbId>,
    pub note: Option<String>,
}

impl Transaction {
    pub fn new(transaction_type: TransactionType, date: NaiveDate, amount: Decimal) -> Self {
        Self {
            id: None,
            transaction_type,
            date,
            amount,
            running_balance: Decimal::ZERO,
            reversed: false,
            is_manual: false,
            account_charge_id: None,
            hold_transaction_id: None,
            note: None,
        }
    }

    /// Balance effect: positive for credits, negative for debits, zero otherwise.
    pub fn signed_amount(&self) -> Decimal {
        if self.reversed {
            Decimal::ZERO
        } else if self.transaction_type.is_credit() {
            self.amount
        } else if self.transaction_type.is_debit() {
            -self.amount
        } else {
            Decimal::ZERO
        }
    }

    fn is_monetary(&self) -> bool {
        self.transaction_type.is_credit() || self.transaction_type.is_debit()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
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
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Everything needed to submit a new application.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub client_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub product_id: DbId,
    pub field_officer_id: Option<DbId>,
    pub external_id: Option<String>,
    pub submitted_on: NaiveDate,
    pub deposit_type: DepositAccountType,
    pub currency: Currency,
    pub terms: SavingsTerms,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavingsAccount {
    pub id: Option<DbId>,
    pub account_no: String,
    pub external_id: Option<String>,
    pub client_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub product_id: DbId,
    pub field_officer_id: Option<DbId>,
    pub deposit_type: DepositAccountType,
    pub status: AccountStatus,
    pub sub_status: AccountSubStatus,
    pub currency: Currency,
    pub terms: SavingsTerms,
    pub submitted_on: NaiveDate,
    pub approved_on: Option<NaiveDate>,
    pub rejected_on: Option<NaiveDate>,
    pub withdrawn_on: Option<NaiveDate>,
    pub activated_on: Option<NaiveDate>,
    pub closed_on: Option<NaiveDate>,
    pub lockin_until: Option<NaiveDate>,
    pub on_hold_amount: Decimal,
    pub transactions: Vec<Transaction>,
    pub charges: Vec<AccountCharge>,
    pub deposit: Option<DepositDetails>,
    pub summary: AccountSummary,
    pub posting_config: PostingConfig,
    pub version: i32,
}

fn not_future(field: &str, date: NaiveDate, today: NaiveDate) -> CoreResult<()> {
    if date > today {
        return Err(CoreError::rule(
            &format!("savingsaccount.{field}.cannot.be.a.future.date"),
            format!("{field} date {date} cannot be in the future"),
        ));
    }
    Ok(())
}

impl SavingsAccount {
    /// Submit a new application (status: submitted and pending approval).
    pub fn submit(new: NewAccount, today: NaiveDate) -> CoreResult<Self> {
        match (new.client_id, new.group_id) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(CoreError::Validation(
                    "exactly one of clientId or groupId is required".into(),
                ))
            }
        }
        not_future("submittedon", new.submitted_on, today)?;
        new.terms.validate()?;

        let mut account = Self {
            id: None,
            account_no: String::new(),
            external_id: new.external_id,
            client_id: new.client_id,
            group_id: new.group_id,
            product_id: new.product_id,
            field_officer_id: new.field_officer_id,
            deposit_type: new.deposit_type,
            status: AccountStatus::SubmittedAndPendingApproval,
            sub_status: AccountSubStatus::None,
            currency: new.currency,
            terms: new.terms,
            submitted_on: new.submitted_on,
            approved_on: None,
            rejected_on: None,
            withdrawn_on: None,
            activated_on: None,
            closed_on: None,
            lockin_until: None,
            on_hold_amount: Decimal::ZERO,
            transactions: Vec::new(),
            charges: Vec::new(),
            deposit: None,
            summary: AccountSummary::default(),
            posting_config: PostingConfig::default(),
            version: 0,
        };
        account.recalculate();
        Ok(account)
    }

    /// Entity label used in error codes (`savingsaccount`, `fixeddepositaccount`...).
    pub fn entity_code(&self) -> &'static str {
        match self.deposit_type {
            DepositAccountType::Savings => "savingsaccount",
            DepositAccountType::FixedDeposit => "fixeddepositaccount",
            DepositAccountType::RecurringDeposit => "recurringdepositaccount",
        }
    }

    pub(crate) fn rule(&self, suffix: &str, message: impl Into<String>) -> CoreError {
        CoreError::rule(&format!("{}.{suffix}", self.entity_code()), message)
    }

    pub(crate) fn require_status(&self, expected: AccountStatus, action: &str) -> CoreResult<()> {
        if self.status != expected {
            return Err(self.rule(
                &format!("{action}.invalid.account.status"),
                format!(
                    "Cannot {action}: account is {} (expected {})",
                    self.status.value(),
                    expected.value()
                ),
            ));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    // -----------------------------------------------------------------------
    // Application lifecycle
    // -----------------------------------------------------------------------

    /// Replace the terms of a pending application.
    pub fn modify_application(&mut self, terms: SavingsTerms) -> CoreResult<()> {
        self.require_status(AccountStatus::SubmittedAndPendingApproval, "modify")?;
        terms.validate()?;
        self.terms = terms;
        if self.deposit.is_some() {
            self.refresh_maturity()?;
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> CoreResult<()> {
        self.require_status(AccountStatus::SubmittedAndPendingApproval, "delete")
    }

    pub fn approve(&mut self, approved_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        self.require_status(AccountStatus::SubmittedAndPendingApproval, "approve")?;
        not_future("approvedon", approved_on, today)?;
        if approved_on < self.submitted_on {
            return Err(self.rule(
                "approve.date.cannot.be.before.submittal.date",
                format!(
                    "Approval date {approved_on} cannot be before submittal date {}",
                    self.submitted_on
                ),
            ));
        }
        self.status = AccountStatus::Approved;
        self.approved_on = Some(approved_on);
        Ok(())
    }

    pub fn undo_approval(&mut self) -> CoreResult<()> {
        self.require_status(AccountStatus::Approved, "undoapproval")?;
        self.status = AccountStatus::SubmittedAndPendingApproval;
        self.approved_on = None;
        Ok(())
    }

    pub fn reject(&mut self, rejected_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        self.require_status(AccountStatus::SubmittedAndPendingApproval, "reject")?;
        not_future("rejectedon", rejected_on, today)?;
        if rejected_on < self.submitted_on {
            return Err(self.rule(
                "reject.date.cannot.be.before.submittal.date",
                "Rejection date cannot be before submittal date",
            ));
        }
        self.status = AccountStatus::Rejected;
        self.rejected_on = Some(rejected_on);
        self.closed_on = Some(rejected_on);
        Ok(())
    }

    pub fn withdraw_application(&mut self, withdrawn_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        self.require_status(AccountStatus::SubmittedAndPendingApproval, "withdrawnByApplicant")?;
        not_future("withdrawnon", withdrawn_on, today)?;
        if withdrawn_on < self.submitted_on {
            return Err(self.rule(
                "withdrawn.date.cannot.be.before.submittal.date",
                "Withdrawal date cannot be before submittal date",
            ));
        }
        self.status = AccountStatus::WithdrawnByApplicant;
        self.withdrawn_on = Some(withdrawn_on);
        self.closed_on = Some(withdrawn_on);
        Ok(())
    }

    /// Activate an approved account: sets the lock-in date, deposits the
    /// minimum opening balance and collects activation charges.
    pub fn activate(&mut self, activated_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        self.require_status(AccountStatus::Approved, "activate")?;
        not_future("activatedon", activated_on, today)?;
        if self.approved_on.is_some_and(|approved| activated_on < approved) {
            return Err(self.rule(
                "activate.date.cannot.be.before.approval.date",
                "Activation date cannot be before approval date",
            ));
        }
        self.status = AccountStatus::Active;
        self.activated_on = Some(activated_on);
        self.lockin_until = match (
            self.terms.lockin_period_frequency,
            self.terms.lockin_period_frequency_type,
        ) {
            (Some(n), Some(freq)) if n > 0 => Some(freq.add_to(activated_on, n)),
            _ => None,
        };

        if let Some(opening) = self
            .terms
            .min_required_opening_balance
            .filter(|v| *v > Decimal::ZERO)
        {
            self.push(Transaction::new(TransactionType::Deposit, activated_on, opening));
        }

        self.schedule_recurring_fees(activated_on);
        let activation_fees: Vec<DbId> = self
            .charges
            .iter()
            .filter(|c| c.active && c.time_type == ChargeTimeType::SavingsActivation)
            .filter_map(|c| c.id)
            .collect();
        for charge_id in activation_fees {
            let outstanding = self.charge(charge_id)?.amount_outstanding;
            if outstanding > Decimal::ZERO {
                self.settle_charge(charge_id, outstanding, activated_on)?;
            }
        }

        self.recalculate();
        self.validate_running_balance()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Officer assignment and sub-status blocks
    // -----------------------------------------------------------------------

    pub fn assign_officer(&mut self, officer_id: DbId) -> CoreResult<()> {
        if self.status.is_closed() {
            return Err(self.rule("assign.officer.account.closed", "Account is closed"));
        }
        if self.field_officer_id == Some(officer_id) {
            return Err(self.rule(
                "assign.officer.same.as.current",
                "Officer is already assigned to this account",
            ));
        }
        self.field_officer_id = Some(officer_id);
        Ok(())
    }

    pub fn unassign_officer(&mut self) -> CoreResult<()> {
        if self.field_officer_id.is_none() {
            return Err(self.rule(
                "unassign.officer.not.assigned",
                "Account has no savings officer",
            ));
        }
        self.field_officer_id = None;
        Ok(())
    }

    pub fn block(&mut self) -> CoreResult<()> {
        self.require_status(AccountStatus::Active, "block")?;
        if self.sub_status == AccountSubStatus::Block {
            return Err(self.rule("account.already.blocked", "Account is already blocked"));
        }
        self.sub_status = AccountSubStatus::Block;
        Ok(())
    }

    pub fn unblock(&mut self) -> CoreResult<()> {
        if self.sub_status != AccountSubStatus::Block {
            return Err(self.rule("account.not.blocked", "Account is not blocked"));
        }
        self.sub_status = AccountSubStatus::None;
        Ok(())
    }

    pub fn block_credits(&mut self) -> CoreResult<()> {
        self.require_status(AccountStatus::Active, "blockCredit")?;
        self.sub_status = match self.sub_status {
            AccountSubStatus::BlockDebit => AccountSubStatus::Block,
            AccountSubStatus::Block | AccountSubStatus::BlockCredit => {
                return Err(self.rule(
                    "credits.already.blocked",
                    "Credits are already blocked on this account",
                ))
            }
            _ => AccountSubStatus::BlockCredit,
        };
        Ok(())
    }

    pub fn unblock_credits(&mut self) -> CoreResult<()> {
        self.sub_status = match self.sub_status {
            AccountSubStatus::Block => AccountSubStatus::BlockDebit,
            AccountSubStatus::BlockCredit => AccountSubStatus::None,
            _ => {
                return Err(self.rule(
                    "credits.not.blocked",
                    "Credits are not blocked on this account",
                ))
            }
        };
        Ok(())
    }

    pub fn block_debits(&mut self) -> CoreResult<()> {
        self.require_status(AccountStatus::Active, "blockDebit")?;
        self.sub_status = match self.sub_status {
            AccountSubStatus::BlockCredit => AccountSubStatus::Block,
            AccountSubStatus::Block | AccountSubStatus::BlockDebit => {
                return Err(self.rule(
                    "debits.already.blocked",
                    "Debits are already blocked on this account",
                ))
            }
            _ => AccountSubStatus::BlockDebit,
        };
        Ok(())
    }

    pub fn unblock_debits(&mut self) -> CoreResult<()> {
        self.sub_status = match self.sub_status {
            AccountSubStatus::Block => AccountSubStatus::BlockCredit,
            AccountSubStatus::BlockDebit => AccountSubStatus::None,
            _ => {
                return Err(self.rule(
                    "debits.not.blocked",
                    "Debits are not blocked on this account",
                ))
            }
        };
        Ok(())
    }

    pub fn update_withhold_tax(&mut self, withhold_tax: bool, tax_rate: Option<Decimal>) -> CoreResult<()> {
        if self.status.is_closed() {
            return Err(self.rule("update.withhold.tax.account.closed", "Account is closed"));
        }
        let mut terms = self.terms.clone();
        terms.withhold_tax = withhold_tax;
        if tax_rate.is_some() {
            terms.tax_rate = tax_rate;
        }
        terms.validate()?;
        self.terms = terms;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Monetary transactions
    // -----------------------------------------------------------------------

    fn validate_transaction(
        &self,
        kind: &str,
        date: NaiveDate,
        amount: Decimal,
        today: NaiveDate,
    ) -> CoreResult<()> {
        if !self.is_active() {
            return Err(self.rule(
                "transaction.account.is.not.active",
                format!("{kind} is not allowed: account is not active"),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation("transactionAmount must be greater than zero".into()));
        }
        if !self.currency.is_multiple(amount) {
            return Err(self.rule(
                "transaction.amount.not.in.multiples",
                format!(
                    "transactionAmount must be a multiple of {}",
                    self.currency.in_multiples_of.unwrap_or_default()
                ),
            ));
        }
        not_future("transaction", date, today)?;
        if self.activated_on.is_some_and(|activated| date < activated) {
            return Err(self.rule(
                "transaction.before.activation.date",
                "Transaction date cannot be before the activation date",
            ));
        }
        Ok(())
    }

    /// Record a deposit. Returns the index of the new transaction.
    pub fn deposit(&mut self, date: NaiveDate, amount: Decimal, today: NaiveDate) -> CoreResult<usize> {
        self.validate_transaction("deposit", date, amount, today)?;
        if self.sub_status.blocks_credit() {
            return Err(self.rule(
                "transaction.credits.blocked",
                "Credit transactions are blocked on this account",
            ));
        }
        let index = self.push(Transaction::new(TransactionType::Deposit, date, amount));
        self.repost_interest_from(date)?;
        self.recalculate();
        Ok(index)
    }

    /// Record a withdrawal, collecting any withdrawal fees when `apply_fees`.
    pub fn withdraw(
        &mut self,
        date: NaiveDate,
        amount: Decimal,
        apply_fees: bool,
        today: NaiveDate,
    ) -> CoreResult<usize> {
        self.validate_transaction("withdrawal", date, amount, today)?;
        if self.sub_status.blocks_debit() {
            return Err(self.rule(
                "transaction.debits.blocked",
                "Debit transactions are blocked on this account",
            ));
        }
        if self.lockin_until.is_some_and(|until| date < until) {
            return Err(self.rule(
                "withdrawal.within.lockin.period",
                "Withdrawals are not allowed within the lock-in period",
            ));
        }
        let index = self.push(Transaction::new(TransactionType::Withdrawal, date, amount));
        if apply_fees {
            self.apply_withdrawal_fees(date, amount)?;
        }
        self.repost_interest_from(date)?;
        self.recalculate();
        self.validate_balance()?;
        Ok(index)
    }

    /// Place `amount` on hold. Held funds cannot be withdrawn.
    pub fn hold_amount(&mut self, date: NaiveDate, amount: Decimal, today: NaiveDate) -> CoreResult<usize> {
        self.validate_transaction("holdAmount", date, amount, today)?;
        let index = self.push(Transaction::new(TransactionType::AmountHold, date, amount));
        self.on_hold_amount += amount;
        self.recalculate();
        self.validate_balance()?;
        Ok(index)
    }

    /// Release a previous hold in full.
    pub fn release_amount(&mut self, hold_id: DbId, today: NaiveDate) -> CoreResult<usize> {
        if !self.is_active() {
            return Err(self.rule(
                "transaction.account.is.not.active",
                "Release is not allowed: account is not active",
            ));
        }
        let hold = self
            .transactions
            .iter()
            .find(|t| t.id == Some(hold_id))
            .ok_or(CoreError::NotFound {
                entity: "SavingsAccountTransaction",
                id: hold_id,
            })?;
        if hold.transaction_type != TransactionType::AmountHold || hold.reversed {
            return Err(self.rule(
                "release.transaction.not.a.hold",
                "Only active hold transactions can be released",
            ));
        }
        let released = self
            .transactions
            .iter()
            .any(|t| t.hold_transaction_id == Some(hold_id) && !t.reversed);
        if released {
            return Err(self.rule(
                "release.amount.already.released",
                "This hold has already been released",
            ));
        }
        let amount = hold.amount;
        let mut release = Transaction::new(TransactionType::AmountRelease, today, amount);
        release.hold_transaction_id = Some(hold_id);
        let index = self.push(release);
        self.on_hold_amount -= amount;
        self.recalculate();
        Ok(index)
    }

    /// Reverse a transaction and re-validate the account history.
    pub fn undo_transaction(&mut self, transaction_id: DbId) -> CoreResult<()> {
        if !self.is_active() {
            return Err(self.rule(
                "transaction.account.is.not.active",
                "Undo is not allowed: account is not active",
            ));
        }
        let index = self.transaction_index(transaction_id)?;
        self.undo_at(index)
    }

    fn undo_at(&mut self, index: usize) -> CoreResult<()> {
        let tx = &self.transactions[index];
        if tx.reversed {
            return Err(self.rule(
                "undo.transaction.already.reversed",
                "Transaction is already reversed",
            ));
        }
        match tx.transaction_type {
            TransactionType::Deposit
            | TransactionType::Withdrawal
            | TransactionType::WithdrawalFee
            | TransactionType::AnnualFee
            | TransactionType::PayCharge => {}
            other => {
                return Err(self.rule(
                    "undo.transaction.type.not.allowed",
                    format!("{} transactions cannot be undone", other.value()),
                ))
            }
        }
        let (date, amount, charge_id, tx_type) =
            (tx.date, tx.amount, tx.account_charge_id, tx.transaction_type);
        let earlier_period = tx_type.is_fee() && self.paid_in_earlier_period(index);
        self.transactions[index].reversed = true;

        if let (true, Some(charge_id)) = (tx_type.is_fee(), charge_id) {
            if let Some(charge) = self.charges.iter_mut().find(|c| c.id == Some(charge_id)) {
                charge.undo_payment(amount, earlier_period);
            }
        }

        self.repost_interest_from(date)?;
        self.recalculate();
        self.validate_balance()?;
        Ok(())
    }

    /// Replace a deposit or withdrawal with a new amount and date. The
    /// replacement goes through the same rules as a new deposit or
    /// withdrawal; a withdrawal fee collected right after the original
    /// withdrawal is reversed and collected again.
    pub fn adjust_transaction(
        &mut self,
        transaction_id: DbId,
        date: NaiveDate,
        amount: Decimal,
        today: NaiveDate,
    ) -> CoreResult<usize> {
        if !self.is_active() {
            return Err(self.rule(
                "transaction.account.is.not.active",
                "Modify is not allowed: account is not active",
            ));
        }
        let index = self.transaction_index(transaction_id)?;
        let (tx_type, original_date) = {
            let tx = &self.transactions[index];
            (tx.transaction_type, tx.date)
        };
        if !matches!(tx_type, TransactionType::Deposit | TransactionType::Withdrawal) {
            return Err(self.rule(
                "adjust.transaction.type.not.allowed",
                "Only deposits and withdrawals can be modified",
            ));
        }
        self.undo_at(index)?;
        let fee_index = index + 1;
        let fee_follows = self.transactions.get(fee_index).is_some_and(|fee| {
            fee.transaction_type == TransactionType::WithdrawalFee
                && !fee.reversed
                && fee.date == original_date
        });
        if tx_type == TransactionType::Withdrawal && fee_follows {
            self.undo_at(fee_index)?;
        }

        let recurring = self.deposit_type == DepositAccountType::RecurringDeposit;
        match (tx_type, recurring) {
            (TransactionType::Deposit, true) => self.recurring_deposit(date, amount, today),
            (TransactionType::Deposit, false) => self.deposit(date, amount, today),
            (_, true) => self.recurring_withdrawal(date, amount, today),
            (_, false) => self.withdraw(date, amount, true, today),
        }
    }

    // -----------------------------------------------------------------------
    // Interest
    // -----------------------------------------------------------------------

    pub fn interest_settings(&self) -> InterestSettings {
        InterestSettings {
            nominal_annual_rate: self.terms.nominal_annual_interest_rate,
            compounding: self.terms.interest_compounding_period_type,
            posting: self.terms.interest_posting_period_type,
            calculation: self.terms.interest_calculation_type,
            days_in_year: self.terms.interest_calculation_days_in_year_type,
            min_balance_for_interest: self.terms.min_balance_for_interest_calculation,
            financial_year_beginning_month: self.posting_config.financial_year_beginning_month,
            post_at_period_end: self.posting_config.post_at_period_end,
            withhold_tax_rate: self
                .terms
                .withhold_tax
                .then(|| self.terms.tax_rate.unwrap_or(Decimal::ZERO)),
            manual_posting_dates: self.manual_posting_dates(),
        }
    }

    fn manual_posting_dates(&self) -> Vec<NaiveDate> {
        self.transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::InterestPosting)
            .filter(|t| t.is_manual && !t.reversed)
            .map(|t| t.date)
            .collect()
    }

    /// Principal movements that earn interest (postings and tax excluded).
    pub fn interest_movements(&self) -> Vec<BalanceMovement> {
        self.transactions
            .iter()
            .filter(|t| !t.reversed && t.is_monetary())
            .filter(|t| {
                !matches!(
                    t.transaction_type,
                    TransactionType::InterestPosting | TransactionType::WithholdTax
                )
            })
            .map(|t| BalanceMovement {
                date: t.date,
                amount: t.signed_amount(),
            })
            .collect()
    }

    /// Interest per posting period from activation through `up_to`.
    pub fn interest_periods(&self, up_to: NaiveDate) -> Vec<PostingPeriodInterest> {
        let Some(start) = self.activated_on else {
            return Vec::new();
        };
        interest::calculate(
            &self.interest_settings(),
            &self.interest_movements(),
            start,
            up_to,
            &self.currency,
        )
    }

    /// Refresh the earned-interest figure without posting anything.
    pub fn calculate_interest(&mut self, up_to: NaiveDate) -> CoreResult<Decimal> {
        if !self.is_active() {
            return Err(self.rule(
                "calculateinterest.account.is.not.active",
                "Interest can only be calculated on active accounts",
            ));
        }
        let earned = interest::total_interest(&self.interest_periods(up_to));
        self.summary.total_interest_earned = earned;
        self.summary.last_interest_calculation_date = Some(up_to);
        Ok(earned)
    }

    /// Post interest for every completed period through `up_to` (and the
    /// trailing partial period when `include_partial`). Existing postings
    /// whose amount changed are reversed and re-posted.
    pub fn post_interest(&mut self, up_to: NaiveDate, include_partial: bool) -> CoreResult<()> {
        if !self.is_active() {
            return Err(self.rule(
                "postinterest.account.is.not.active",
                "Interest can only be posted on active accounts",
            ));
        }
        self.apply_interest_postings(up_to, include_partial, false);
        self.recalculate();
        self.validate_balance()
    }

    /// User-initiated posting as of a chosen date (`postInterestAsOn`).
    pub fn post_interest_as_on(&mut self, as_on: NaiveDate, today: NaiveDate) -> CoreResult<usize> {
        if !self.is_active() {
            return Err(self.rule(
                "postinterest.account.is.not.active",
                "Interest can only be posted on active accounts",
            ));
        }
        not_future("transaction", as_on, today)?;
        if self.activated_on.is_some_and(|activated| as_on < activated) {
            return Err(self.rule(
                "postinterest.date.before.activation",
                "Interest posting date cannot be before the activation date",
            ));
        }
        if self.last_transaction_date().is_some_and(|last| as_on < last) {
            return Err(self.rule(
                "postinterest.date.before.last.transaction",
                "Interest posting date cannot be before the last transaction date",
            ));
        }
        self.apply_interest_postings(as_on, true, true);
        self.recalculate();
        let index = self
            .transactions
            .iter()
            .rposition(|t| t.transaction_type == TransactionType::InterestPosting && !t.reversed)
            .ok_or_else(|| self.rule("postinterest.no.interest.earned", "No interest to post"))?;
        Ok(index)
    }

    pub(crate) fn apply_interest_postings(&mut self, up_to: NaiveDate, include_partial: bool, manual: bool) {
        let periods = self.interest_periods(up_to);
        let manual_dates = self.manual_posting_dates();
        // (posting date, interest, tax, manual); partial periods post on their
        // last day and earlier manual postings keep their date.
        let postable: Vec<(NaiveDate, Decimal, Decimal, bool)> = periods
            .iter()
            .filter_map(|p| {
                if p.is_complete && p.posting_date <= up_to {
                    Some((p.posting_date, p.interest, p.tax, false))
                } else if manual_dates.contains(&p.to) {
                    Some((p.to, p.interest, p.tax, true))
                } else if include_partial {
                    Some((p.to, p.interest, p.tax, manual))
                } else {
                    None
                }
            })
            .collect();

        // Postings inside the window that no longer line up with a period are stale.
        let posting_dates: Vec<NaiveDate> = postable.iter().map(|p| p.0).collect();
        let stale: Vec<NaiveDate> = self
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::InterestPosting && !t.reversed)
            .filter(|t| t.date <= up_to && !posting_dates.contains(&t.date))
            .map(|t| t.date)
            .collect();
        for date in stale {
            self.reverse_interest_posting(date);
        }

        for (posting_date, amount, tax, is_manual) in postable {
            let existing = self.transactions.iter().find(|t| {
                t.transaction_type == TransactionType::InterestPosting
                    && !t.reversed
                    && t.date == posting_date
            });
            match existing {
                Some(tx) if tx.amount == amount => continue,
                Some(_) => self.reverse_interest_posting(posting_date),
                None => {}
            }
            if amount <= Decimal::ZERO {
                continue;
            }
            let mut posting = Transaction::new(TransactionType::InterestPosting, posting_date, amount);
            posting.is_manual = is_manual;
            self.push(posting);
            if tax > Decimal::ZERO {
                self.push(Transaction::new(TransactionType::WithholdTax, posting_date, tax));
            }
        }
        self.summary.total_interest_earned = interest::total_interest(&periods);
        self.summary.last_interest_calculation_date = Some(up_to);
    }

    fn reverse_interest_posting(&mut self, date: NaiveDate) {
        for tx in self.transactions.iter_mut().filter(|t| {
            t.date == date
                && !t.reversed
                && matches!(
                    t.transaction_type,
                    TransactionType::InterestPosting | TransactionType::WithholdTax
                )
        }) {
            tx.reversed = true;
        }
    }

    /// Re-post interest when a change lands on or before an existing posting.
    fn repost_interest_from(&mut self, date: NaiveDate) -> CoreResult<()> {
        let last_posting = self
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::InterestPosting && !t.reversed)
            .max_by_key(|t| t.date)
            .map(|t| (t.date, t.is_manual));
        let Some((last_date, manual)) = last_posting.filter(|(last, _)| *last >= date) else {
            return Ok(());
        };
        self.apply_interest_postings(last_date, manual, manual);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Closure
    // -----------------------------------------------------------------------

    /// Close an active savings account. With `withdraw_balance` the
    /// remaining balance is paid out first; the balance must end at zero.
    pub fn close(
        &mut self,
        closed_on: NaiveDate,
        withdraw_balance: bool,
        post_interest: bool,
        today: NaiveDate,
    ) -> CoreResult<Option<usize>> {
        self.require_status(AccountStatus::Active, "close")?;
        self.validate_closure_date(closed_on, today)?;
        if self.lockin_until.is_some_and(|until| closed_on < until) {
            return Err(self.rule(
                "close.within.lockin.period",
                "Account cannot be closed within the lock-in period",
            ));
        }
        if self.on_hold_amount > Decimal::ZERO {
            return Err(self.rule(
                "close.amount.on.hold",
                "Account has funds on hold; release them before closing",
            ));
        }
        if post_interest {
            self.apply_interest_postings(closed_on, true, false);
            self.recalculate();
        }
        let payout = if withdraw_balance {
            self.pay_out_balance(closed_on)?
        } else {
            None
        };
        if !self.summary.account_balance.is_zero() {
            return Err(self.rule(
                "close.results.in.balance.not.zero",
                "Account balance must be zero before closing",
            ));
        }
        self.status = AccountStatus::Closed;
        self.closed_on = Some(closed_on);
        Ok(payout)
    }

    pub(crate) fn validate_closure_date(&self, closed_on: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        not_future("closedon", closed_on, today)?;
        if self.activated_on.is_some_and(|activated| closed_on < activated) {
            return Err(self.rule(
                "close.date.before.activation.date",
                "Closing date cannot be before the activation date",
            ));
        }
        if self.last_transaction_date().is_some_and(|last| closed_on < last) {
            return Err(self.rule(
                "close.date.before.last.transaction",
                "Closing date cannot be before the last transaction date",
            ));
        }
        Ok(())
    }

    /// Withdraw the full positive balance on `date`, bypassing lock-in and
    /// minimum-balance rules. Returns the payout transaction index.
    pub(crate) fn pay_out_balance(&mut self, date: NaiveDate) -> CoreResult<Option<usize>> {
        self.recalculate();
        let balance = self.summary.account_balance;
        if balance <= Decimal::ZERO {
            return Ok(None);
        }
        let index = self.push(Transaction::new(TransactionType::Withdrawal, date, balance));
        self.recalculate();
        Ok(Some(index))
    }

    // -----------------------------------------------------------------------
    // Balances
    // -----------------------------------------------------------------------

    /// Append a transaction, returning its index.
    pub(crate) fn push(&mut self, tx: Transaction) -> usize {
        self.transactions.push(tx);
        self.transactions.len() - 1
    }

    fn transaction_index(&self, id: DbId) -> CoreResult<usize> {
        self.transactions
            .iter()
            .position(|t| t.id == Some(id))
            .ok_or(CoreError::NotFound {
                entity: "SavingsAccountTransaction",
                id,
            })
    }

    /// Indices of transactions in posting order (date, then insertion).
    pub fn ordered_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.transactions.len()).collect();
        indices.sort_by_key(|i| self.transactions[*i].date);
        indices
    }

    pub fn last_transaction_date(&self) -> Option<NaiveDate> {
        self.transactions
            .iter()
            .filter(|t| !t.reversed && t.is_monetary())
            .map(|t| t.date)
            .max()
    }

    /// Recompute running balances and the summary.
    pub fn recalculate(&mut self) {
        let mut running = Decimal::ZERO;
        let mut summary = AccountSummary {
            total_interest_earned: self.summary.total_interest_earned,
            last_interest_calculation_date: self.summary.last_interest_calculation_date,
            ..AccountSummary::default()
        };
        for i in self.ordered_indices() {
            let tx = &mut self.transactions[i];
            running += tx.signed_amount();
            tx.running_balance = if tx.reversed { Decimal::ZERO } else { running };
            if tx.reversed {
                continue;
            }
            match tx.transaction_type {
                TransactionType::Deposit => summary.total_deposits += tx.amount,
                TransactionType::Withdrawal => summary.total_withdrawals += tx.amount,
                TransactionType::InterestPosting => summary.total_interest_posted += tx.amount,
                TransactionType::WithdrawalFee => summary.total_withdrawal_fees += tx.amount,
                TransactionType::AnnualFee => summary.total_annual_fees += tx.amount,
                TransactionType::PayCharge => summary.total_fee_charges += tx.amount,
                TransactionType::WithholdTax => summary.total_withhold_tax += tx.amount,
                _ => {}
            }
        }
        summary.account_balance = running;
        summary.available_balance = running - self.on_hold_amount
            - self.terms.enforced_min_balance()
            - self.terms.overdraft_floor();
        if summary.total_interest_earned < summary.total_interest_posted {
            summary.total_interest_earned = summary.total_interest_posted;
        }
        self.summary = summary;
    }

    /// Reject any point in the history where the balance drops below the
    /// overdraft floor.
    pub fn validate_running_balance(&self) -> CoreResult<Decimal> {
        let floor = self.terms.overdraft_floor();
        let mut running = Decimal::ZERO;
        for i in self.ordered_indices() {
            let tx = &self.transactions[i];
            running += tx.signed_amount();
            if running < floor {
                return Err(self.rule(
                    "transaction.insufficient.account.balance",
                    format!("Insufficient account balance on {}", tx.date),
                ));
            }
        }
        Ok(running)
    }

    /// History check plus: the final balance covers holds and the enforced
    /// minimum balance.
    pub fn validate_balance(&self) -> CoreResult<()> {
        let running = self.validate_running_balance()?;
        let available = running - self.on_hold_amount - self.terms.enforced_min_balance();
        if available < self.terms.overdraft_floor() {
            return Err(self.rule(
                "transaction.insufficient.account.balance",
                "Insufficient account balance: holds and minimum balance must remain covered",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn terms() -> SavingsTerms {
        SavingsTerms {
            nominal_annual_interest_rate: dec!(10),
            interest_compounding_period_type: InterestCompoundingPeriod::Monthly,
            interest_posting_period_type: InterestPostingPeriod::Monthly,
            interest_calculation_type: InterestCalculationType::DailyBalance,
            interest_calculation_days_in_year_type: DaysInYear::Days365,
            min_required_opening_balance: None,
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
        }
    }

    pub fn new_account(terms: SavingsTerms) -> NewAccount {
        NewAccount {
            client_id: Some(1),
            group_id: None,
            product_id: 1,
            field_officer_id: None,
            external_id: None,
            submitted_on: date(2024, 1, 1),
            deposit_type: DepositAccountType::Savings,
            currency: Currency::new("USD", 2),
            terms,
        }
    }

    /// Submitted, approved and activated on 2024-01-01.
    pub fn active_account(terms: SavingsTerms) -> SavingsAccount {
        let today = date(2024, 1, 1);
        let mut account = SavingsAccount::submit(new_account(terms), today).unwrap();
        account.id = Some(1);
        account.approve(today, today).unwrap();
        account.activate(today, today).unwrap();
        account
    }

    /// Give unsaved transactions ids, as persistence would.
    pub fn assign_ids(account: &mut SavingsAccount) {
        let mut next = account.transactions.iter().filter_map(|t| t.id).max().unwrap_or(0);
        for tx in account.transactions.iter_mut().filter(|t| t.id.is_none()) {
            next += 1;
            tx.id = Some(next);
        }
    }

    fn assert_rule(err: CoreError, suffix: &str) {
        assert_matches!(err, CoreError::DomainRule { ref code, .. } if code.ends_with(suffix), "got {err:?}");
    }

    #[test]
    fn submit_requires_exactly_one_owner() {
        let mut new = new_account(terms());
        new.group_id = Some(7);
        assert_matches!(
            SavingsAccount::submit(new, date(2024, 1, 1)),
            Err(CoreError::Validation(_))
        );
        let mut new = new_account(terms());
        new.client_id = None;
        assert_matches!(
            SavingsAccount::submit(new, date(2024, 1, 1)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn submit_rejects_future_date() {
        let new = new_account(terms());
        let err = SavingsAccount::submit(new, date(2023, 12, 31)).unwrap_err();
        assert_rule(err, "submittedon.cannot.be.a.future.date");
    }

    #[test]
    fn lifecycle_state_machine() {
        let today = date(2024, 2, 1);
        let mut account = SavingsAccount::submit(new_account(terms()), today).unwrap();
        assert_eq!(account.status, AccountStatus::SubmittedAndPendingApproval);

        assert_rule(
            account.activate(today, today).unwrap_err(),
            "activate.invalid.account.status",
        );
        assert_rule(
            account.approve(date(2023, 12, 1), today).unwrap_err(),
            "approve.date.cannot.be.before.submittal.date",
        );

        account.approve(date(2024, 1, 10), today).unwrap();
        assert_eq!(account.status, AccountStatus::Approved);
        account.undo_approval().unwrap();
        assert_eq!(account.status, AccountStatus::SubmittedAndPendingApproval);
        assert_eq!(account.approved_on, None);

        account.approve(date(2024, 1, 10), today).unwrap();
        assert_rule(
            account.activate(date(2024, 1, 5), today).unwrap_err(),
            "activate.date.cannot.be.before.approval.date",
        );
        account.activate(date(2024, 1, 15), today).unwrap();
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.activated_on, Some(date(2024, 1, 15)));
    }

    #[test]
    fn reject_and_withdraw_only_from_submitted() {
        let today = date(2024, 1, 5);
        let mut account = SavingsAccount::submit(new_account(terms()), today).unwrap();
        account.reject(today, today).unwrap();
        assert_eq!(account.status, AccountStatus::Rejected);
        assert!(account.withdraw_application(today, today).is_err());

        let mut account = SavingsAccount::submit(new_account(terms()), today).unwrap();
        account.withdraw_application(today, today).unwrap();
        assert_eq!(account.status, AccountStatus::WithdrawnByApplicant);
        assert_eq!(account.closed_on, Some(today));
    }

    #[test]
    fn activation_deposits_min_opening_balance_and_sets_lockin() {
        let mut t = terms();
        t.min_required_opening_balance = Some(dec!(250));
        t.lockin_period_frequency = Some(1);
        t.lockin_period_frequency_type = Some(PeriodFrequency::Months);
        let account = active_account(t);
        assert_eq!(account.summary.account_balance, dec!(250));
        assert_eq!(account.lockin_until, Some(date(2024, 2, 1)));
        assert_eq!(account.transactions[0].transaction_type, TransactionType::Deposit);
    }

    #[test]
    fn deposit_and_withdraw_update_balances() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(500), date(2024, 1, 10)).unwrap();
        account
            .withdraw(date(2024, 1, 3), dec!(200), true, date(2024, 1, 10))
            .unwrap();
        assert_eq!(account.summary.account_balance, dec!(300));
        assert_eq!(account.summary.total_deposits, dec!(500));
        assert_eq!(account.summary.total_withdrawals, dec!(200));
        assert_eq!(account.transactions[1].running_balance, dec!(300));
    }

    #[test]
    fn transaction_validations() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        assert_matches!(
            account.deposit(date(2024, 1, 2), dec!(0), today),
            Err(CoreError::Validation(_))
        );
        assert_rule(
            account.deposit(date(2024, 1, 11), dec!(10), today).unwrap_err(),
            "transaction.cannot.be.a.future.date",
        );
        assert_rule(
            account.deposit(date(2023, 12, 31), dec!(10), today).unwrap_err(),
            "transaction.before.activation.date",
        );
    }

    #[test]
    fn withdrawal_beyond_balance_fails() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        assert_rule(
            account.withdraw(date(2024, 1, 3), dec!(150), false, today).unwrap_err(),
            "transaction.insufficient.account.balance",
        );
    }

    #[test]
    fn backdated_withdrawal_checks_running_balance() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 5), dec!(100), today).unwrap();
        // Balance is 100 today but was zero on the 3rd.
        assert_rule(
            account.withdraw(date(2024, 1, 3), dec!(50), false, today).unwrap_err(),
            "transaction.insufficient.account.balance",
        );
    }

    #[test]
    fn overdraft_allows_negative_balance_up_to_limit() {
        let today = date(2024, 1, 10);
        let mut t = terms();
        t.allow_overdraft = true;
        t.overdraft_limit = Some(dec!(100));
        let mut account = active_account(t);
        account.withdraw(date(2024, 1, 2), dec!(80), false, today).unwrap();
        assert_eq!(account.summary.account_balance, dec!(-80));
        assert!(account.withdraw(date(2024, 1, 3), dec!(30), false, today).is_err());
    }

    #[test]
    fn enforced_min_balance_blocks_withdrawal() {
        let today = date(2024, 1, 10);
        let mut t = terms();
        t.enforce_min_required_balance = true;
        t.min_required_balance = Some(dec!(50));
        let mut account = active_account(t);
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        assert!(account.withdraw(date(2024, 1, 3), dec!(60), false, today).is_err());
        let mut account = active_account(account.terms.clone());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        account.withdraw(date(2024, 1, 3), dec!(50), false, today).unwrap();
        assert_eq!(account.summary.available_balance, dec!(0));
    }

    #[test]
    fn lockin_blocks_withdrawals() {
        let mut t = terms();
        t.min_required_opening_balance = Some(dec!(100));
        t.lockin_period_frequency = Some(2);
        t.lockin_period_frequency_type = Some(PeriodFrequency::Weeks);
        let mut account = active_account(t);
        assert_rule(
            account
                .withdraw(date(2024, 1, 10), dec!(10), false, date(2024, 1, 20))
                .unwrap_err(),
            "withdrawal.within.lockin.period",
        );
        account
            .withdraw(date(2024, 1, 15), dec!(10), false, date(2024, 1, 20))
            .unwrap();
    }

    #[test]
    fn sub_status_algebra() {
        let mut account = active_account(terms());
        account.block_credits().unwrap();
        assert_eq!(account.sub_status, AccountSubStatus::BlockCredit);
        account.block_debits().unwrap();
        assert_eq!(account.sub_status, AccountSubStatus::Block);
        assert!(account.block().is_err());
        account.unblock_credits().unwrap();
        assert_eq!(account.sub_status, AccountSubStatus::BlockDebit);
        assert!(account.unblock_credits().is_err());
        account.unblock_debits().unwrap();
        assert_eq!(account.sub_status, AccountSubStatus::None);
        account.block().unwrap();
        account.unblock().unwrap();
        assert_eq!(account.sub_status, AccountSubStatus::None);
    }

    #[test]
    fn blocked_credits_reject_deposits() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.block_credits().unwrap();
        assert_rule(
            account.deposit(date(2024, 1, 2), dec!(10), today).unwrap_err(),
            "transaction.credits.blocked",
        );
    }

    #[test]
    fn holds_reduce_available_balance_and_release_once() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        let hold = account.hold_amount(date(2024, 1, 3), dec!(60), today).unwrap();
        assign_ids(&mut account);
        assert_eq!(account.summary.available_balance, dec!(40));
        assert!(account
            .clone()
            .withdraw(date(2024, 1, 4), dec!(50), false, today)
            .is_err());

        let hold_id = account.transactions[hold].id.unwrap();
        account.release_amount(hold_id, today).unwrap();
        assign_ids(&mut account);
        assert_eq!(account.on_hold_amount, dec!(0));
        assert_eq!(account.summary.available_balance, dec!(100));
        assert_rule(
            account.release_amount(hold_id, today).unwrap_err(),
            "release.amount.already.released",
        );
    }

    #[test]
    fn undo_deposit_that_funded_withdrawal_fails() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        account.withdraw(date(2024, 1, 3), dec!(80), false, today).unwrap();
        assign_ids(&mut account);
        let deposit_id = account.transactions[0].id.unwrap();
        assert_rule(
            account.undo_transaction(deposit_id).unwrap_err(),
            "transaction.insufficient.account.balance",
        );
    }

    #[test]
    fn undo_and_adjust() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        assign_ids(&mut account);
        let id = account.transactions[0].id.unwrap();

        let new_index = account
            .adjust_transaction(id, date(2024, 1, 4), dec!(150), today)
            .unwrap();
        assert!(account.transactions[0].reversed);
        assert_eq!(account.transactions[new_index].amount, dec!(150));
        assert_eq!(account.summary.account_balance, dec!(150));

        assert_rule(
            account.undo_transaction(id).unwrap_err(),
            "undo.transaction.already.reversed",
        );
    }

    #[test]
    fn modify_cannot_move_a_withdrawal_into_lockin() {
        let today = date(2024, 1, 20);
        let mut t = terms();
        t.min_required_opening_balance = Some(dec!(100));
        t.lockin_period_frequency = Some(2);
        t.lockin_period_frequency_type = Some(PeriodFrequency::Weeks);
        let mut account = active_account(t);
        let index = account.withdraw(date(2024, 1, 16), dec!(10), false, today).unwrap();
        assign_ids(&mut account);
        let id = account.transactions[index].id.unwrap();
        assert_rule(
            account
                .adjust_transaction(id, date(2024, 1, 5), dec!(10), today)
                .unwrap_err(),
            "withdrawal.within.lockin.period",
        );
    }

    #[test]
    fn modify_respects_blocked_debits_and_credits() {
        let today = date(2024, 1, 10);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 2), dec!(100), today).unwrap();
        account.withdraw(date(2024, 1, 3), dec!(50), false, today).unwrap();
        assign_ids(&mut account);
        let deposit_id = account.transactions[0].id.unwrap();
        let withdrawal_id = account.transactions[1].id.unwrap();

        let mut debits_blocked = account.clone();
        debits_blocked.block_debits().unwrap();
        assert_rule(
            debits_blocked
                .adjust_transaction(withdrawal_id, date(2024, 1, 3), dec!(90), today)
                .unwrap_err(),
            "transaction.debits.blocked",
        );

        let mut credits_blocked = account.clone();
        credits_blocked.undo_transaction(withdrawal_id).unwrap();
        credits_blocked.block_credits().unwrap();
        assert_rule(
            credits_blocked
                .adjust_transaction(deposit_id, date(2024, 1, 2), dec!(120), today)
                .unwrap_err(),
            "transaction.credits.blocked",
        );

        account
            .adjust_transaction(withdrawal_id, date(2024, 1, 3), dec!(90), today)
            .unwrap();
        assert_eq!(account.summary.account_balance, dec!(10));
    }

    #[test]
    fn posts_interest_for_completed_periods_only() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        account.post_interest(date(2024, 2, 15), false).unwrap();
        let postings: Vec<&Transaction> = account
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::InterestPosting)
            .collect();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].date, date(2024, 1, 31));
        assert_eq!(postings[0].amount, dec!(8.49));
        assert_eq!(account.summary.account_balance, dec!(1008.49));

        // Posting again is idempotent.
        account.post_interest(date(2024, 2, 15), false).unwrap();
        assert_eq!(account.summary.total_interest_posted, dec!(8.49));
    }

    #[test]
    fn backdated_deposit_reposts_interest() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        account.post_interest(date(2024, 2, 1), false).unwrap();
        account.deposit(date(2024, 1, 16), dec!(1000), date(2024, 2, 1)).unwrap();

        let active: Vec<&Transaction> = account
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::InterestPosting && !t.reversed)
            .collect();
        assert_eq!(active.len(), 1);
        // 1000 for 31 days plus 1000 for 16 days.
        assert_eq!(active[0].amount, dec!(12.88));
        assert!(account
            .transactions
            .iter()
            .any(|t| t.transaction_type == TransactionType::InterestPosting && t.reversed));
    }

    #[test]
    fn withholds_tax_on_posted_interest() {
        let mut t = terms();
        t.withhold_tax = true;
        t.tax_rate = Some(dec!(10));
        let mut account = active_account(t);
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        account.post_interest(date(2024, 1, 31), false).unwrap();
        assert_eq!(account.summary.total_withhold_tax, dec!(0.85));
        assert_eq!(account.summary.account_balance, dec!(1007.64));
    }

    #[test]
    fn post_interest_as_on_posts_partial_period() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        let index = account
            .post_interest_as_on(date(2024, 1, 15), date(2024, 1, 20))
            .unwrap();
        assert_eq!(account.transactions[index].date, date(2024, 1, 15));
        assert!(account.transactions[index].is_manual);

        // The regular run keeps the manual posting and posts the rest of
        // the month on top of it: 4.11 for 1-15 and 4.40 for 16-31.
        account.post_interest(date(2024, 1, 31), false).unwrap();
        assert!(!account.transactions[index].reversed);
        assert_eq!(account.summary.total_interest_posted, dec!(8.51));
    }

    #[test]
    fn regular_posting_keeps_manual_posting_after_withdrawal() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        account.post_interest(date(2024, 2, 1), false).unwrap();
        let manual = account
            .post_interest_as_on(date(2024, 2, 10), date(2024, 2, 10))
            .unwrap();
        assert_eq!(account.transactions[manual].amount, dec!(2.76));
        assert_eq!(account.summary.account_balance, dec!(1011.25));

        account
            .withdraw(date(2024, 2, 11), dec!(1011.25), false, date(2024, 2, 11))
            .unwrap();
        account.post_interest(date(2024, 2, 20), false).unwrap();

        assert!(!account.transactions[manual].reversed);
        assert_eq!(account.summary.account_balance, dec!(0));
        assert!(account.validate_balance().is_ok());
    }

    #[test]
    fn post_interest_rejects_a_negative_result() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        account.post_interest(date(2024, 1, 31), false).unwrap();
        // Drain the balance including interest, then shrink the rate so the
        // repost lowers the January posting below what was withdrawn.
        account
            .withdraw(date(2024, 2, 1), dec!(1008.49), false, date(2024, 2, 1))
            .unwrap();
        account.terms.nominal_annual_interest_rate = dec!(5);
        for tx in account
            .transactions
            .iter_mut()
            .filter(|t| t.transaction_type == TransactionType::InterestPosting)
        {
            tx.reversed = true;
        }
        assert_rule(
            account.post_interest(date(2024, 1, 31), false).unwrap_err(),
            "transaction.insufficient.account.balance",
        );
    }

    #[test]
    fn close_with_balance_payout() {
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 1), dec!(1000), date(2024, 1, 1)).unwrap();
        let payout = account
            .close(date(2024, 1, 31), true, true, date(2024, 2, 1))
            .unwrap();
        assert!(payout.is_some());
        assert_eq!(account.status, AccountStatus::Closed);
        assert_eq!(account.summary.account_balance, dec!(0));
        assert_eq!(account.summary.total_interest_posted, dec!(8.49));
    }

    #[test]
    fn close_rejects_date_before_last_transaction_and_holds() {
        let today = date(2024, 1, 20);
        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 10), dec!(100), today).unwrap();
        assert_rule(
            account.close(date(2024, 1, 5), true, false, today).unwrap_err(),
            "close.date.before.last.transaction",
        );

        let mut account = active_account(terms());
        account.deposit(date(2024, 1, 10), dec!(100), today).unwrap();
        account.hold_amount(date(2024, 1, 11), dec!(10), today).unwrap();
        assert_rule(
            account.close(date(2024, 1, 12), true, false, today).unwrap_err(),
            "close.amount.on.hold",
        );
    }
}
