//! Handlers for `/{accounts}/{id}/charges`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use savings_core::commands::{parse_command, ChargeStatusFilter, CommandName, ACCOUNT_CHARGE_COMMANDS};
use savings_core::permissions::ENTITY_SAVINGS_ACCOUNT_CHARGE;
use savings_core::types::DbId;
use savings_db::repositories::ChargeRepo;
use serde_json::{json, Value};

use crate::commands::CommandWrapper;
use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::kinds::AccountKind;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::query::{ChargeStatusParams, CommandParam};
use crate::services::account_charges::{self, ChargeCommandBody, UpdateAccountCharge};
use crate::services::accounts::{load_account, ChargeInput};
use crate::state::AppState;
use crate::views::{self, charge_options, charges_json, AccountChargeData};

fn charges_href<K: AccountKind>(account_id: DbId, charge_id: Option<DbId>) -> String {
    match charge_id {
        Some(charge_id) => format!("/{}/{account_id}/charges/{charge_id}", K::ACCOUNTS_PATH),
        None => format!("/{}/{account_id}/charges", K::ACCOUNTS_PATH),
    }
}

/// GET /api/v1/{accounts}/{id}/charges?chargeStatus=all|active|inactive
pub async fn list<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(account_id): Path<DbId>,
    Query(params): Query<ChargeStatusParams>,
) -> AppResult<Json<Value>> {
    auth.require_read(ENTITY_SAVINGS_ACCOUNT_CHARGE)?;
    let filter = ChargeStatusFilter::parse(params.charge_status.as_deref())?;
    let account = load_account(&state, K::TYPE, account_id).await?;
    Ok(Json(charges_json(&account, filter)?))
}

/// GET /api/v1/{accounts}/{id}/charges/template
///
/// Active charges in the account's currency.
pub async fn template<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(account_id): Path<DbId>,
) -> AppResult<Json<Value>> {
    auth.require_read(ENTITY_SAVINGS_ACCOUNT_CHARGE)?;
    let account = load_account(&state, K::TYPE, account_id).await?;
    let options: Vec<_> = ChargeRepo::list(&state.pool)
        .await?
        .iter()
        .filter(|c| c.active && c.currency_code.eq_ignore_ascii_case(&account.currency.code))
        .map(|c| c.to_definition())
        .collect::<Result<_, _>>()?;

    let mut body = Value::Object(charge_options());
    views::insert(&mut body, "chargeOptions", json!(options));
    Ok(Json(body))
}

/// GET /api/v1/{accounts}/{id}/charges/{charge_id}
pub async fn get<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Value>> {
    auth.require_read(ENTITY_SAVINGS_ACCOUNT_CHARGE)?;
    let account = load_account(&state, K::TYPE, account_id).await?;
    let charge = account.charge(charge_id)?;
    Ok(Json(views::to_json(&AccountChargeData::new(&account, charge))?))
}

/// POST /api/v1/{accounts}/{id}/charges
pub async fn add<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(account_id): Path<DbId>,
    JsonBody(input, json): JsonBody<ChargeInput>,
) -> AppResult<impl IntoResponse> {
    let command = CommandWrapper::new("CREATE", ENTITY_SAVINGS_ACCOUNT_CHARGE)
        .with_entity_id(account_id)
        .with_href(charges_href::<K>(account_id, None))
        .with_json(json);
    command.authorize(&auth)?;
    let result =
        account_charges::add(&state, K::TYPE, account_id, &command, &input, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /api/v1/{accounts}/{id}/charges/{charge_id}
pub async fn update<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(DbId, DbId)>,
    JsonBody(input, json): JsonBody<UpdateAccountCharge>,
) -> AppResult<impl IntoResponse> {
    let command = CommandWrapper::new("UPDATE", ENTITY_SAVINGS_ACCOUNT_CHARGE)
        .with_entity_id(account_id)
        .with_sub_entity_id(charge_id)
        .with_href(charges_href::<K>(account_id, Some(charge_id)))
        .with_json(json);
    command.authorize(&auth)?;
    let result = account_charges::update(
        &state,
        K::TYPE,
        account_id,
        charge_id,
        &command,
        &input,
        auth.user_id,
    )
    .await?;
    Ok(Json(result))
}

/// DELETE /api/v1/{accounts}/{id}/charges/{charge_id}
pub async fn delete<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let command = CommandWrapper::new("DELETE", ENTITY_SAVINGS_ACCOUNT_CHARGE)
        .with_entity_id(account_id)
        .with_sub_entity_id(charge_id)
        .with_href(charges_href::<K>(account_id, Some(charge_id)));
    command.authorize(&auth)?;
    let result =
        account_charges::delete(&state, K::TYPE, account_id, charge_id, &command, auth.user_id)
            .await?;
    Ok(Json(result))
}

/// POST /api/v1/{accounts}/{id}/charges/{charge_id}?command=paycharge|waive|inactivate
pub async fn command<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(DbId, DbId)>,
    Query(params): Query<CommandParam>,
    JsonBody(body, json): JsonBody<ChargeCommandBody>,
) -> AppResult<impl IntoResponse> {
    let action = parse_command("command", params.command.as_deref(), ACCOUNT_CHARGE_COMMANDS)?;
    let command = CommandWrapper::new(action.action(), ENTITY_SAVINGS_ACCOUNT_CHARGE)
        .with_entity_id(account_id)
        .with_sub_entity_id(charge_id)
        .with_href(format!(
            "{}?command={}",
            charges_href::<K>(account_id, Some(charge_id)),
            action.name()
        ))
        .with_json(json);
    command.authorize(&auth)?;
    let result = account_charges::run_command(
        &state,
        K::TYPE,
        account_id,
        charge_id,
        action,
        &command,
        &body,
        auth.user_id,
    )
    .await?;
    Ok(Json(result))
}
