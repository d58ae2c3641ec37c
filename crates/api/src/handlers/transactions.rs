//! Handlers for `/{accounts}/{id}/transactions`.

use axum::extract::{Path, Query, State};
use axum::Json;
use savings_core::commands::{parse_command, CommandName};
use savings_core::enums::TransactionType;
use savings_core::error::CoreError;
use savings_core::types::DbId;
use serde_json::{json, Value};

use crate::commands::{CommandProcessingResult, CommandWrapper};
use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::kinds::AccountKind;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::query::CommandParam;
use crate::services::accounts::load_account;
use crate::services::business_date;
use crate::services::transactions::{self, TransactionBody};
use crate::state::AppState;
use crate::views::{self, transactions_json, CurrencyData, TransactionData};

/// GET /api/v1/{accounts}/{id}/transactions
///
/// Every transaction on the account, newest first.
pub async fn list<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(account_id): Path<DbId>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let account = load_account(&state, K::TYPE, account_id).await?;
    Ok(Json(transactions_json(&account)?))
}

/// GET /api/v1/{accounts}/{id}/transactions/template
///
/// Defaults for a new transaction: today's date, the currency and, for
/// recurring deposits, the installment amount due.
pub async fn template<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(account_id): Path<DbId>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let account = load_account(&state, K::TYPE, account_id).await?;
    let today = business_date();

    let mut body = json!({
        "accountId": account.id,
        "accountNo": account.account_no,
        "date": today,
        "currency": CurrencyData::from(&account.currency),
        "transactionTypeOptions": [TransactionType::Deposit.option(), TransactionType::Withdrawal.option()],
    });
    if let Some(details) = &account.deposit {
        if let Some(recurring) = &details.recurring {
            let due = recurring.amount_on(details.deposit_amount, today);
            views::insert(&mut body, "amount", json!(due));
        }
    }
    Ok(Json(body))
}

/// GET /api/v1/{accounts}/{id}/transactions/{transaction_id}
pub async fn get<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((account_id, transaction_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let account = load_account(&state, K::TYPE, account_id).await?;
    let transaction = account
        .transactions
        .iter()
        .find(|t| t.id == Some(transaction_id))
        .ok_or(CoreError::NotFound {
            entity: "SavingsAccountTransaction",
            id: transaction_id,
        })?;
    Ok(Json(views::to_json(&TransactionData::new(&account, transaction))?))
}

/// POST /api/v1/{accounts}/{id}/transactions?command=...
pub async fn create<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(account_id): Path<DbId>,
    Query(params): Query<CommandParam>,
    JsonBody(body, json): JsonBody<TransactionBody>,
) -> AppResult<Json<CommandProcessingResult>> {
    let action = parse_command("command", params.command.as_deref(), K::TRANSACTION_COMMANDS)?;
    let command = CommandWrapper::new(action.action(), K::ACCOUNT_ENTITY)
        .with_entity_id(account_id)
        .with_href(format!(
            "/{}/{account_id}/transactions?command={}",
            K::ACCOUNTS_PATH,
            action.name()
        ))
        .with_json(json);
    command.authorize(&auth)?;
    let result =
        transactions::create(&state, K::TYPE, account_id, action, &command, &body, auth.user_id)
            .await?;
    Ok(Json(result))
}

/// POST /api/v1/{accounts}/{id}/transactions/{transaction_id}?command=...
///
/// `undo`, `modify` or `releaseAmount` an existing transaction.
pub async fn adjust<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((account_id, transaction_id)): Path<(DbId, DbId)>,
    Query(params): Query<CommandParam>,
    JsonBody(body, json): JsonBody<TransactionBody>,
) -> AppResult<Json<CommandProcessingResult>> {
    let action = parse_command(
        "command",
        params.command.as_deref(),
        K::TRANSACTION_ADJUST_COMMANDS,
    )?;
    let command = CommandWrapper::new(action.action(), K::ACCOUNT_ENTITY)
        .with_entity_id(account_id)
        .with_sub_entity_id(transaction_id)
        .with_href(format!(
            "/{}/{account_id}/transactions/{transaction_id}?command={}",
            K::ACCOUNTS_PATH,
            action.name()
        ))
        .with_json(json);
    command.authorize(&auth)?;
    let result = transactions::adjust(
        &state,
        K::TYPE,
        account_id,
        transaction_id,
        action,
        &command,
        &body,
        auth.user_id,
    )
    .await?;
    Ok(Json(result))
}
