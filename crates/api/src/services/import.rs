//! Bulk import of accounts and transactions from CSV.
//!
//! A download template is a header-only CSV. An upload is processed row by
//! row: each row runs through the same service (and permission check) as the
//! matching single-record endpoint in its own transaction, so one bad row
//! never rolls back the others. An account row's submit, approve and
//! activate steps share that transaction: a row that fails leaves no
//! account behind. Failures are collected as `{"row": n, "error": "..."}`
//! on the stored import document.

use savings_core::commands::{parse_command, AccountCommand};
use savings_core::permissions::ENTITY_IMPORT;
use savings_core::types::DbId;
use savings_db::models::import_document::{ImportDocument, ImportOutcome};
use savings_db::repositories::ImportDocumentRepo;
use serde_json::{json, Map, Number, Value};

use crate::commands::CommandWrapper;
use crate::error::{AppError, AppResult};
use crate::extract::deserialize;
use crate::kinds::AccountKind;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::services::accounts::{self, AccountCommandBody, SubmitAccount};
use crate::services::transactions::{self, TransactionBody};
use crate::state::AppState;

/// Columns of an account upload, in template order.
pub const ACCOUNT_COLUMNS: &[&str] = &[
    "clientId",
    "groupId",
    "productId",
    "submittedOnDate",
    "externalId",
    "fieldOfficerId",
    "nominalAnnualInterestRate",
    "depositAmount",
    "depositPeriod",
    "depositPeriodFrequencyId",
    "mandatoryRecommendedDepositAmount",
    "recurringFrequency",
    "recurringFrequencyType",
    "expectedFirstDepositOnDate",
    "approvedOnDate",
    "activatedOnDate",
];

/// Columns of a transaction upload, in template order.
pub const TRANSACTION_COLUMNS: &[&str] = &[
    "accountId",
    "transactionType",
    "transactionDate",
    "transactionAmount",
    "note",
];

/// Columns whose cells are always strings.
const TEXT_COLUMNS: &[&str] = &["externalId", "transactionType", "note"];

/// Header-only CSV for `columns`.
pub fn template_csv(columns: &[&str]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalError(e.to_string()))
}

fn cell_value(column: &str, raw: &str) -> Value {
    if TEXT_COLUMNS.contains(&column) {
        return Value::String(raw.to_string());
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(Number::from(n));
    }
    match raw {
        "true" | "TRUE" => Value::Bool(true),
        "false" | "FALSE" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Parse an upload into one JSON object per data row, keyed by header.
/// Blank cells are omitted. Row numbers count the header as row 1.
pub fn parse_rows(data: &[u8]) -> AppResult<Vec<(usize, Map<String, Value>)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Unreadable CSV header: {e}")))?
        .clone();
    if headers.iter().all(str::is_empty) {
        return Err(AppError::BadRequest("CSV upload has no header row".into()));
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| AppError::BadRequest(format!("Unreadable CSV row {}: {e}", i + 2)))?;
        let mut row = Map::new();
        for (column, raw) in headers.iter().zip(record.iter()) {
            if !raw.is_empty() {
                row.insert(column.to_string(), cell_value(column, raw));
            }
        }
        if !row.is_empty() {
            rows.push((i + 2, row));
        }
    }
    Ok(rows)
}

fn take_date(row: &mut Map<String, Value>, key: &str) -> Option<Value> {
    row.remove(key)
}

/// Submit and, when the row carries the dates, approve and activate, all in
/// one transaction.
async fn import_account_row<K: AccountKind>(
    state: &AppState,
    user: &AuthUser,
    mut row: Map<String, Value>,
) -> AppResult<DbId> {
    let approved_on = take_date(&mut row, "approvedOnDate");
    let activated_on = take_date(&mut row, "activatedOnDate");
    let json = Value::Object(row);
    let input: SubmitAccount = deserialize(json.clone())?;

    let href = format!("/{}/uploadtemplate", K::ACCOUNTS_PATH);
    let command = CommandWrapper::new("CREATE", K::ACCOUNT_ENTITY)
        .with_href(href.clone())
        .with_json(json);
    command.authorize(user)?;
    let mut account = accounts::new_application(state, K::TYPE, &input).await?;

    let mut tx = state.pool.begin().await?;
    let created = accounts::insert_application(&mut tx, &mut account, &command, user.user_id).await?;
    let id = created
        .resource_id
        .ok_or_else(|| AppError::InternalError("submitted account has no id".into()))?;

    let steps = [
        (AccountCommand::Approve, "approvedOnDate", approved_on),
        (AccountCommand::Activate, "activatedOnDate", activated_on),
    ];
    for (action, field, date) in steps {
        let Some(date) = date else { break };
        let json = json!({ field: date });
        let body: AccountCommandBody = deserialize(json.clone())?;
        let command = CommandWrapper::new(action.action(), K::ACCOUNT_ENTITY)
            .with_entity_id(id)
            .with_href(href.clone())
            .with_json(json);
        command.authorize(user)?;
        accounts::advance_application(
            &mut tx,
            state.config.posting,
            K::TYPE,
            id,
            action,
            &command,
            &body,
            user.user_id,
        )
        .await?;
    }
    tx.commit().await?;
    tracing::debug!(account_id = id, "Imported account row");
    Ok(id)
}

async fn import_transaction_row<K: AccountKind>(
    state: &AppState,
    user: &AuthUser,
    mut row: Map<String, Value>,
) -> AppResult<DbId> {
    let account_id = row
        .remove("accountId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| AppError::BadRequest("accountId is required".into()))?;
    let kind = row.remove("transactionType");
    let action = parse_command(
        "transactionType",
        kind.as_ref().and_then(Value::as_str),
        K::TRANSACTION_COMMANDS,
    )?;
    let json = Value::Object(row);
    let body: TransactionBody = deserialize(json.clone())?;

    let command = CommandWrapper::new(action.action(), K::ACCOUNT_ENTITY)
        .with_entity_id(account_id)
        .with_href(format!("/{}/transactions/uploadtemplate", K::ACCOUNTS_PATH))
        .with_json(json);
    command.authorize(user)?;
    let result = transactions::create(
        state,
        K::TYPE,
        account_id,
        action,
        &command,
        &body,
        user.user_id,
    )
    .await?;
    Ok(result.resource_id.unwrap_or(account_id))
}

/// What an upload creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    Accounts,
    Transactions,
}

/// Process an uploaded CSV and return the completed import document.
pub async fn run_import<K: AccountKind>(
    state: &AppState,
    user: &AuthUser,
    target: ImportTarget,
    file_name: &str,
    data: &[u8],
) -> AppResult<ImportDocument> {
    user_can_import(user)?;
    let rows = parse_rows(data)?;
    let entity_type = match target {
        ImportTarget::Accounts => K::ACCOUNTS_PATH.to_string(),
        ImportTarget::Transactions => format!("{}/transactions", K::ACCOUNTS_PATH),
    };
    let document =
        ImportDocumentRepo::create(&state.pool, &entity_type, file_name, Some(user.user_id)).await?;

    let mut outcome = ImportOutcome {
        total_records: i32::try_from(rows.len()).unwrap_or(i32::MAX),
        ..ImportOutcome::default()
    };
    let mut errors = Vec::new();
    for (line, row) in rows {
        let result = match target {
            ImportTarget::Accounts => import_account_row::<K>(state, user, row).await,
            ImportTarget::Transactions => import_transaction_row::<K>(state, user, row).await,
        };
        match result {
            Ok(_) => outcome.success_count += 1,
            Err(e) => {
                tracing::debug!(import_id = document.id, row = line, error = %e, "Import row rejected");
                outcome.failure_count += 1;
                errors.push(json!({ "row": line, "error": e.to_string() }));
            }
        }
    }
    outcome.errors = Value::Array(errors);

    let document = ImportDocumentRepo::complete(&state.pool, document.id, &outcome)
        .await?
        .ok_or_else(|| AppError::InternalError("import document vanished".into()))?;
    tracing::info!(
        import_id = document.id,
        entity_type = %document.entity_type,
        total = document.total_records,
        succeeded = document.success_count,
        failed = document.failure_count,
        "Import completed"
    );
    Ok(document)
}

fn user_can_import(user: &AuthUser) -> AppResult<()> {
    user.require_permission("CREATE", ENTITY_IMPORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_the_header_line() {
        let csv = template_csv(TRANSACTION_COLUMNS).unwrap();
        assert_eq!(
            csv,
            "accountId,transactionType,transactionDate,transactionAmount,note\n"
        );
    }

    #[test]
    fn rows_become_typed_json_objects() {
        let data = b"accountId,transactionType,transactionDate,transactionAmount,note\n\
                     7,deposit,2024-02-01,150.25,1001\n\
                     ,,,,\n\
                     8,withdrawal,2024-02-02,20,\n";
        let rows = parse_rows(data).unwrap();
        assert_eq!(rows.len(), 2);

        let (line, first) = &rows[0];
        assert_eq!(*line, 2);
        assert_eq!(first["accountId"], json!(7));
        assert_eq!(first["transactionDate"], json!("2024-02-01"));
        assert_eq!(first["transactionAmount"], json!("150.25"));
        assert_eq!(first["note"], json!("1001"));

        let (line, second) = &rows[1];
        assert_eq!(*line, 4);
        assert!(!second.contains_key("note"));
        assert_eq!(second["transactionAmount"], json!(20));
    }

    #[test]
    fn booleans_are_recognised() {
        assert_eq!(cell_value("isMandatoryDeposit", "true"), json!(true));
        assert_eq!(cell_value("externalId", "true"), json!("true"));
    }

    #[test]
    fn account_row_deserializes_into_a_submission() {
        let data = b"clientId,productId,submittedOnDate,externalId,nominalAnnualInterestRate\n\
                     5,2,2024-01-15,42,4.5\n";
        let (_, row) = parse_rows(data).unwrap().remove(0);
        let input: SubmitAccount = deserialize(Value::Object(row)).unwrap();
        assert_eq!(input.client_id, Some(5));
        assert_eq!(input.external_id.as_deref(), Some("42"));
        assert_eq!(
            input.terms.nominal_annual_interest_rate,
            Some(rust_decimal::Decimal::new(45, 1))
        );
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(parse_rows(b"").is_err());
    }
}
