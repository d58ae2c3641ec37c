//! Monetary transactions on savings and recurring deposit accounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use savings_core::account::SavingsAccount;
use savings_core::commands::TransactionCommand;
use savings_core::enums::DepositAccountType;
use savings_core::error::{CoreError, CoreResult};
use savings_core::types::DbId;
use serde::Deserialize;
use serde_json::json;

use crate::commands::{CommandProcessingResult, CommandWrapper};
use crate::error::AppResult;
use crate::services::account_tx::AccountTx;
use crate::services::business_date;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    pub transaction_date: Option<NaiveDate>,
    pub transaction_amount: Option<Decimal>,
    pub note: Option<String>,
}

impl TransactionBody {
    fn date(&self) -> CoreResult<NaiveDate> {
        self.transaction_date
            .ok_or_else(|| CoreError::Validation("transactionDate is required".into()))
    }

    fn amount(&self) -> CoreResult<Decimal> {
        self.transaction_amount
            .ok_or_else(|| CoreError::Validation("transactionAmount is required".into()))
    }
}

/// Result naming the transaction at `index` (or `fallback`) as the resource.
fn transaction_result(
    account: &SavingsAccount,
    index: Option<usize>,
    fallback: Option<DbId>,
) -> CommandProcessingResult {
    let mut result = CommandProcessingResult::for_account(account);
    result.resource_id = index
        .and_then(|i| account.transactions.get(i))
        .and_then(|t| t.id)
        .or(fallback);
    result
}

/// Post a new transaction (`deposit`, `withdrawal`, `postInterestAsOn`,
/// `holdAmount`).
pub async fn create(
    state: &AppState,
    deposit_type: DepositAccountType,
    account_id: DbId,
    action: TransactionCommand,
    command: &CommandWrapper,
    body: &TransactionBody,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let today = business_date();
    let recurring = deposit_type == DepositAccountType::RecurringDeposit;
    let mut uow = AccountTx::begin(state, deposit_type, account_id).await?;
    let account = &mut uow.account;

    let index = match action {
        TransactionCommand::Deposit if recurring => {
            account.recurring_deposit(body.date()?, body.amount()?, today)?
        }
        TransactionCommand::Deposit => account.deposit(body.date()?, body.amount()?, today)?,
        TransactionCommand::Withdrawal if recurring => {
            account.recurring_withdrawal(body.date()?, body.amount()?, today)?
        }
        TransactionCommand::Withdrawal => {
            account.withdraw(body.date()?, body.amount()?, true, today)?
        }
        TransactionCommand::PostInterestAsOn => account.post_interest_as_on(body.date()?, today)?,
        TransactionCommand::HoldAmount => {
            account.hold_amount(body.date()?, body.amount()?, today)?
        }
        TransactionCommand::Undo
        | TransactionCommand::Modify
        | TransactionCommand::ReleaseAmount => {
            return Err(CoreError::Validation(format!(
                "{} applies to an existing transaction",
                action.action()
            ))
            .into());
        }
    };
    if let Some(note) = &body.note {
        account.transactions[index].note = Some(note.clone());
    }
    let balance = account.summary.account_balance;

    let (_, result) = uow
        .commit(command, user_id, |account| {
            transaction_result(account, Some(index), None)
                .with_change("accountBalance", json!(balance))
        })
        .await?;

    tracing::info!(
        account_id,
        transaction_id = ?result.resource_id,
        action = action.action(),
        "Transaction posted"
    );
    Ok(result)
}

/// Undo, modify or release an existing transaction.
pub async fn adjust(
    state: &AppState,
    deposit_type: DepositAccountType,
    account_id: DbId,
    transaction_id: DbId,
    action: TransactionCommand,
    command: &CommandWrapper,
    body: &TransactionBody,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let today = business_date();
    let mut uow = AccountTx::begin(state, deposit_type, account_id).await?;
    let account = &mut uow.account;

    let index = match action {
        TransactionCommand::Undo => {
            account.undo_transaction(transaction_id)?;
            None
        }
        TransactionCommand::Modify => Some(account.adjust_transaction(
            transaction_id,
            body.date()?,
            body.amount()?,
            today,
        )?),
        TransactionCommand::ReleaseAmount => Some(account.release_amount(transaction_id, today)?),
        TransactionCommand::Deposit
        | TransactionCommand::Withdrawal
        | TransactionCommand::PostInterestAsOn
        | TransactionCommand::HoldAmount => {
            return Err(CoreError::Validation(format!(
                "{} creates a new transaction",
                action.action()
            ))
            .into());
        }
    };
    if let (Some(index), Some(note)) = (index, &body.note) {
        account.transactions[index].note = Some(note.clone());
    }

    let (_, result) = uow
        .commit(command, user_id, |account| {
            transaction_result(account, index, Some(transaction_id))
                .with_sub_resource(index.map(|_| transaction_id))
                .with_change("accountBalance", json!(account.summary.account_balance))
        })
        .await?;

    tracing::info!(
        account_id,
        transaction_id,
        action = action.action(),
        "Transaction adjusted"
    );
    Ok(result)
}
