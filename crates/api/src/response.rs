//! Shared response envelope types for API handlers.

use serde::Serialize;

/// Paged list envelope: `{ "totalFilteredRecords": n, "pageItems": [...] }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub total_filtered_records: i64,
    pub page_items: Vec<T>,
}

/// `{ "resourceId": n }` for endpoints that only report the created id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub resource_id: i64,
}
