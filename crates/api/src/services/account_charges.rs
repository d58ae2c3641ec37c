//! Charges attached to individual accounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use savings_core::charges::AccountCharge;
use savings_core::commands::ChargeCommand;
use savings_core::enums::DepositAccountType;
use savings_core::types::DbId;
use serde::Deserialize;
use serde_json::json;

use crate::commands::{CommandProcessingResult, CommandWrapper};
use crate::error::AppResult;
use crate::services::account_tx::AccountTx;
use crate::services::accounts::{check_currency, ChargeInput};
use crate::services::business_date;
use crate::services::charges::find_charge;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountCharge {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

/// Body of `paycharge`, `waive` and `inactivate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeCommandBody {
    /// Defaults to the outstanding amount.
    pub amount: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub inactivation_on_date: Option<NaiveDate>,
}

fn charge_result(account_id: Option<DbId>, charge_id: Option<DbId>) -> CommandProcessingResult {
    CommandProcessingResult {
        resource_id: charge_id,
        savings_id: account_id,
        ..CommandProcessingResult::default()
    }
}

pub async fn add(
    state: &AppState,
    deposit_type: DepositAccountType,
    account_id: DbId,
    command: &CommandWrapper,
    input: &ChargeInput,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let def = find_charge(&state.pool, input.charge_id)
        .await?
        .to_definition()?;
    let mut uow = AccountTx::begin(state, deposit_type, account_id).await?;
    check_currency(&uow.account, &def.currency_code)?;
    let index = uow
        .account
        .add_charge(AccountCharge::from_definition(&def, input.overrides())?)?;

    let (_, result) = uow
        .commit(command, user_id, |account| {
            charge_result(account.id, account.charges.get(index).and_then(|c| c.id))
        })
        .await?;
    tracing::info!(account_id, charge_id = input.charge_id, "Charge added to account");
    Ok(result)
}

pub async fn update(
    state: &AppState,
    deposit_type: DepositAccountType,
    account_id: DbId,
    charge_id: DbId,
    command: &CommandWrapper,
    input: &UpdateAccountCharge,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut uow = AccountTx::begin(state, deposit_type, account_id).await?;
    uow.account
        .update_charge(charge_id, input.amount, input.due_date)?;

    let (_, result) = uow
        .commit(command, user_id, |account| {
            let mut result = charge_result(account.id, Some(charge_id));
            if let Some(changes) = command.json.as_object() {
                result.changes = changes.clone();
            }
            result
        })
        .await?;
    tracing::info!(account_id, charge_id, "Account charge updated");
    Ok(result)
}

pub async fn delete(
    state: &AppState,
    deposit_type: DepositAccountType,
    account_id: DbId,
    charge_id: DbId,
    command: &CommandWrapper,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut uow = AccountTx::begin(state, deposit_type, account_id).await?;
    uow.account.remove_charge(charge_id)?;

    let (_, result) = uow
        .commit(command, user_id, |account| {
            charge_result(account.id, Some(charge_id))
        })
        .await?;
    tracing::info!(account_id, charge_id, "Account charge removed");
    Ok(result)
}

/// `paycharge`, `waive` or `inactivate`.
pub async fn run_command(
    state: &AppState,
    deposit_type: DepositAccountType,
    account_id: DbId,
    charge_id: DbId,
    action: ChargeCommand,
    command: &CommandWrapper,
    body: &ChargeCommandBody,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let today = business_date();
    let mut uow = AccountTx::begin(state, deposit_type, account_id).await?;
    let account = &mut uow.account;

    let index = match action {
        ChargeCommand::PayCharge => {
            let amount = match body.amount {
                Some(amount) => amount,
                None => account.charge(charge_id)?.amount_outstanding,
            };
            let date = body.transaction_date.unwrap_or(today);
            Some(account.pay_charge(charge_id, amount, date, today)?)
        }
        ChargeCommand::Waive => Some(account.waive_charge(charge_id, today)?),
        ChargeCommand::Inactivate => {
            let date = body.inactivation_on_date.unwrap_or(today);
            account.inactivate_charge(charge_id, date)?;
            None
        }
    };

    let (_, result) = uow
        .commit(command, user_id, |account| {
            let transaction_id = index
                .and_then(|i| account.transactions.get(i))
                .and_then(|t| t.id);
            let mut result =
                charge_result(account.id, Some(charge_id)).with_sub_resource(transaction_id);
            if let Ok(charge) = account.charge(charge_id) {
                result = result
                    .with_change("amountOutstanding", json!(charge.amount_outstanding))
                    .with_change("active", charge.active);
            }
            result
        })
        .await?;

    tracing::info!(
        account_id,
        charge_id,
        action = action.action(),
        "Account charge command processed"
    );
    Ok(result)
}
