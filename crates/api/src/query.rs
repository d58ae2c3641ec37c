//! Shared query parameter types for API handlers.

use savings_core::types::DbId;
use serde::Deserialize;

/// `?command=` discriminator for POST/PUT endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct CommandParam {
    pub command: Option<String>,
}

/// Account list parameters. `orderBy` and `sortOrder` are validated by the
/// handler against a column whitelist.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order_by: Option<String>,
    pub sort_order: Option<String>,
    pub external_id: Option<String>,
    pub client_id: Option<DbId>,
    pub fields: Option<String>,
}

/// Single-account parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetailParams {
    pub associations: Option<String>,
    pub charge_status: Option<String>,
    #[serde(default)]
    pub template: bool,
    pub fields: Option<String>,
}

/// Parameters of the new-account template.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTemplateParams {
    pub client_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub product_id: Option<DbId>,
}

/// `?chargeStatus=all|active|inactive`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeStatusParams {
    pub charge_status: Option<String>,
}

/// `?fields=` on endpoints without other parameters.
#[derive(Debug, Default, Deserialize)]
pub struct FieldsParam {
    pub fields: Option<String>,
}
