//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` struct matching the database row
//! - Conversions between the row and the `savings_core` domain type
//! - `Deserialize` create/update DTOs where the API binds request bodies directly

pub mod account;
pub mod account_charge;
pub mod charge;
pub mod command_source;
pub mod deposit_amount_change;
pub mod import_document;
pub mod interest_rate_chart;
pub mod product;
pub mod transaction;
pub mod user;

use savings_core::error::{CoreError, CoreResult};

/// Decode a stored enumeration id. Stored values were validated on write,
/// so a failure here is an internal error rather than bad input.
pub(crate) fn stored_enum<T>(
    field: &str,
    id: i32,
    decode: fn(&str, i32) -> CoreResult<T>,
) -> CoreResult<T> {
    decode(field, id).map_err(|e| CoreError::Internal(format!("corrupt stored value: {e}")))
}

/// [`stored_enum`] for nullable columns.
pub(crate) fn stored_opt_enum<T>(
    field: &str,
    id: Option<i32>,
    decode: fn(&str, i32) -> CoreResult<T>,
) -> CoreResult<Option<T>> {
    id.map(|id| stored_enum(field, id, decode)).transpose()
}

/// Month/day columns are INTEGER; the domain uses `u32`.
pub(crate) fn to_u32(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

pub(crate) fn to_i32(value: Option<u32>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}
