//! Handlers for savings, fixed deposit and recurring deposit accounts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use savings_core::commands::{is_command, parse_command, AccountCommand, ChargeStatusFilter, CommandName};
use savings_core::enums::DepositAccountType;
use savings_core::error::CoreError;
use savings_core::listing::{
    clamp_limit, clamp_offset, parse_csv_param, resolve_order_by, select_fields, Associations,
    SortOrder, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use savings_core::types::DbId;
use savings_db::repositories::savings_account_repo::{AccountListFilter, ORDER_BY_COLUMNS};
use savings_db::repositories::{ChargeRepo, ProductRepo, SavingsAccountRepo};
use serde_json::{json, Value};

use crate::commands::CommandWrapper;
use crate::error::AppResult;
use crate::extract::{deserialize, JsonBody};
use crate::kinds::AccountKind;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::query::{AccountDetailParams, AccountListParams, AccountTemplateParams, CommandParam};
use crate::response::Page;
use crate::services::accounts::{
    self, AccountCommandBody, ModifyAccount, SubmitAccount, WithholdTaxUpdate,
};
use crate::services::{business_date, products};
use crate::state::AppState;
use crate::views::{self, account_json, charges_json, term_options, transactions_json};

const UPDATE_WITHHOLD_TAX: &str = "updateWithHoldTax";

fn account_href<K: AccountKind>(id: DbId, command: Option<&str>) -> String {
    match command {
        Some(command) => format!("/{}/{id}?command={command}", K::ACCOUNTS_PATH),
        None => format!("/{}/{id}", K::ACCOUNTS_PATH),
    }
}

/// GET /api/v1/{accounts}
///
/// Paged list of account headers. Supports `offset`, `limit`, `orderBy`,
/// `sortOrder`, `externalId`, `clientId` and `fields`.
pub async fn list<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AccountListParams>,
) -> AppResult<Json<Page<Value>>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let order_by = resolve_order_by(params.order_by.as_deref(), ORDER_BY_COLUMNS, "id")?;
    let sort = SortOrder::parse(params.sort_order.as_deref())?;
    let filter = AccountListFilter {
        deposit_type: K::TYPE,
        external_id: params.external_id.clone(),
        client_id: params.client_id,
        status: None,
        order_by,
        descending: sort == SortOrder::Desc,
        limit: clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
        offset: clamp_offset(params.offset),
    };

    let total = SavingsAccountRepo::count(&state.pool, &filter).await?;
    let rows = SavingsAccountRepo::list(&state.pool, &filter).await?;
    let fields = parse_csv_param(params.fields.as_deref());
    let today = business_date();
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let account = row.into_header()?;
        items.push(select_fields(account_json(&account, today)?, &fields));
    }

    Ok(Json(Page {
        total_filtered_records: total,
        page_items: items,
    }))
}

/// GET /api/v1/{accounts}/template
///
/// Defaults for a new application. With `productId` the product's terms
/// and charges are included.
pub async fn template<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AccountTemplateParams>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let product_options: Vec<Value> = ProductRepo::list(&state.pool, K::TYPE)
        .await?
        .iter()
        .map(|p| json!({ "id": p.id, "name": p.name }))
        .collect();

    let mut body = Value::Object(term_options(K::TYPE));
    views::insert(&mut body, "clientId", json!(params.client_id));
    views::insert(&mut body, "groupId", json!(params.group_id));
    views::insert(&mut body, "productOptions", json!(product_options));

    if let Some(product_id) = params.product_id {
        let product = products::find_product(&state.pool, K::TYPE, product_id).await?;
        let view = products::product_view(&state.pool, &product).await?;
        let currency = product.currency_code.clone();
        views::insert(&mut body, "product", views::to_json(&view)?);

        let charge_options: Vec<_> = ChargeRepo::list(&state.pool)
            .await?
            .iter()
            .filter(|c| c.active && c.currency_code.eq_ignore_ascii_case(&currency))
            .map(|c| c.to_definition())
            .collect::<Result<_, _>>()?;
        views::insert(&mut body, "chargeOptions", json!(charge_options));
    }
    Ok(Json(body))
}

/// GET /api/v1/{accounts}/{id}
///
/// `associations=all|transactions|charges` expands sub-collections,
/// `chargeStatus` filters the charges, `template=true` merges the option
/// lists and `fields` trims the top-level keys.
pub async fn get<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<AccountDetailParams>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let associations = Associations::parse(params.associations.as_deref());
    let charge_filter = ChargeStatusFilter::parse(params.charge_status.as_deref())?;

    let account = accounts::load_account(&state, K::TYPE, id).await?;
    let mut body = account_json(&account, business_date())?;

    if associations.transactions {
        views::insert(&mut body, "transactions", transactions_json(&account)?);
        if K::TYPE == DepositAccountType::RecurringDeposit && account.activated_on.is_some() {
            let schedule = account.installment_schedule()?;
            views::insert(&mut body, "schedule", views::to_json(&schedule)?);
        }
    }
    if associations.charges {
        views::insert(&mut body, "charges", charges_json(&account, charge_filter)?);
    }
    if params.template {
        for (key, value) in term_options(K::TYPE) {
            views::insert(&mut body, &key, value);
        }
    }

    let mut fields = parse_csv_param(params.fields.as_deref());
    if !fields.is_empty() {
        fields.extend(associations.mandatory_fields());
    }
    Ok(Json(select_fields(body, &fields)))
}

/// POST /api/v1/{accounts}
///
/// Submit a new application.
pub async fn submit<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(input, json): JsonBody<SubmitAccount>,
) -> AppResult<impl IntoResponse> {
    let command = CommandWrapper::new("CREATE", K::ACCOUNT_ENTITY)
        .with_href(format!("/{}", K::ACCOUNTS_PATH))
        .with_json(json);
    command.authorize(&auth)?;
    let result = accounts::submit(&state, K::TYPE, &command, &input, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /api/v1/{accounts}/{id}
///
/// Without `command` modifies a pending application;
/// `command=updateWithHoldTax` toggles tax withholding.
pub async fn update<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<CommandParam>,
    JsonBody(_, json): JsonBody<Value>,
) -> AppResult<impl IntoResponse> {
    let raw = params.command.as_deref();
    let result = match raw {
        None => {
            let input: ModifyAccount = deserialize(json.clone())?;
            let command = CommandWrapper::new("UPDATE", K::ACCOUNT_ENTITY)
                .with_entity_id(id)
                .with_href(account_href::<K>(id, None))
                .with_json(json);
            command.authorize(&auth)?;
            accounts::modify(&state, K::TYPE, id, &command, &input, auth.user_id).await?
        }
        Some(_) if is_command(raw, UPDATE_WITHHOLD_TAX) => {
            let input: WithholdTaxUpdate = deserialize(json.clone())?;
            let command = CommandWrapper::new("UPDATEWITHHOLDTAX", K::ACCOUNT_ENTITY)
                .with_entity_id(id)
                .with_href(account_href::<K>(id, Some(UPDATE_WITHHOLD_TAX)))
                .with_json(json);
            command.authorize(&auth)?;
            accounts::update_withhold_tax(&state, K::TYPE, id, &command, &input, auth.user_id)
                .await?
        }
        Some(other) => {
            return Err(CoreError::UnrecognizedQueryParam {
                param: "command".into(),
                value: other.trim().to_string(),
                allowed: vec![UPDATE_WITHHOLD_TAX.to_string()],
            }
            .into());
        }
    };
    Ok(Json(result))
}

/// POST /api/v1/{accounts}/{id}?command=...
///
/// Lifecycle commands. `calculatePrematureAmount` returns the payout
/// preview without changing the account.
pub async fn command<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<CommandParam>,
    JsonBody(body, json): JsonBody<AccountCommandBody>,
) -> AppResult<Json<Value>> {
    let action = parse_command("command", params.command.as_deref(), K::COMMANDS)?;

    if action == AccountCommand::CalculatePrematureAmount {
        auth.require_permission(action.action(), K::ACCOUNT_ENTITY)?;
        let preview = accounts::premature_amount(&state, K::TYPE, id, &body).await?;
        return Ok(Json(preview));
    }

    let command = CommandWrapper::new(action.action(), K::ACCOUNT_ENTITY)
        .with_entity_id(id)
        .with_href(account_href::<K>(id, Some(action.name())))
        .with_json(json);
    command.authorize(&auth)?;
    let result =
        accounts::run_command(&state, K::TYPE, id, action, &command, &body, auth.user_id).await?;
    Ok(Json(views::to_json(&result)?))
}

/// DELETE /api/v1/{accounts}/{id}
///
/// Only submitted applications can be deleted.
pub async fn delete<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let command = CommandWrapper::new("DELETE", K::ACCOUNT_ENTITY)
        .with_entity_id(id)
        .with_href(account_href::<K>(id, None));
    command.authorize(&auth)?;
    let result = accounts::delete(&state, K::TYPE, id, &command, auth.user_id).await?;
    Ok(Json(result))
}

/// GET /api/v1/{deposit accounts}/{id}/template?command=close
///
/// Maturity figures and closure options for closing a deposit.
pub async fn close_template<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<CommandParam>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let raw = params.command.as_deref();
    if !is_command(raw, "close") {
        return Err(CoreError::UnrecognizedQueryParam {
            param: "command".into(),
            value: raw.unwrap_or_default().trim().to_string(),
            allowed: vec!["close".into()],
        }
        .into());
    }
    let account = accounts::load_account(&state, K::TYPE, id).await?;
    Ok(Json(accounts::close_template(&account)?))
}
