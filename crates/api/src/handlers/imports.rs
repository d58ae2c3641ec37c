//! Handlers for CSV bulk import.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use savings_core::error::CoreError;
use savings_core::permissions::ENTITY_IMPORT;
use savings_core::types::DbId;
use savings_db::models::import_document::ImportDocument;
use savings_db::repositories::ImportDocumentRepo;

use crate::error::{AppError, AppResult};
use crate::kinds::AccountKind;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::services::import::{
    run_import, template_csv, ImportTarget, ACCOUNT_COLUMNS, TRANSACTION_COLUMNS,
};
use crate::state::AppState;

fn csv_download(file_name: String, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
}

/// Read the first file part of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((file_name, data.to_vec()));
    }
    Err(AppError::BadRequest(
        "No file received in multipart upload".to_string(),
    ))
}

/// GET /api/v1/{accounts}/downloadtemplate
pub async fn download_accounts<K: AccountKind>(auth: AuthUser) -> AppResult<impl IntoResponse> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let body = template_csv(ACCOUNT_COLUMNS)?;
    Ok(csv_download(format!("{}.csv", K::ACCOUNTS_PATH), body))
}

/// GET /api/v1/{accounts}/transactions/downloadtemplate
pub async fn download_transactions<K: AccountKind>(
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    auth.require_read(K::ACCOUNT_ENTITY)?;
    let body = template_csv(TRANSACTION_COLUMNS)?;
    Ok(csv_download(
        format!("{}_transactions.csv", K::ACCOUNTS_PATH),
        body,
    ))
}

/// POST /api/v1/{accounts}/uploadtemplate
///
/// Multipart CSV upload. Returns the completed import document.
pub async fn upload_accounts<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let (file_name, data) = read_upload(multipart).await?;
    let document = run_import::<K>(&state, &auth, ImportTarget::Accounts, &file_name, &data).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// POST /api/v1/{accounts}/transactions/uploadtemplate
pub async fn upload_transactions<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    if K::TRANSACTION_COMMANDS.is_empty() {
        return Err(CoreError::Validation(format!(
            "{} do not accept transaction imports",
            K::ACCOUNTS_PATH
        ))
        .into());
    }
    let (file_name, data) = read_upload(multipart).await?;
    let document =
        run_import::<K>(&state, &auth, ImportTarget::Transactions, &file_name, &data).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/v1/imports/{id}
pub async fn get_import(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ImportDocument>> {
    auth.require_read(ENTITY_IMPORT)?;
    let document = ImportDocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ImportDocument",
            id,
        })?;
    Ok(Json(document))
}
