//! Paging, sorting and field-selection helpers for list and detail endpoints.

use serde_json::{Map, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PAGE_LIMIT: i64 = 200;
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Clamp a user-provided limit to `[1, max]`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `?sortOrder=`; absent means ascending.
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(SortOrder::Asc),
            Some(v) if v.eq_ignore_ascii_case("asc") => Ok(SortOrder::Asc),
            Some(v) if v.eq_ignore_ascii_case("desc") => Ok(SortOrder::Desc),
            Some(v) => Err(CoreError::UnrecognizedQueryParam {
                param: "sortOrder".into(),
                value: v.into(),
                allowed: vec!["ASC".into(), "DESC".into()],
            }),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Resolve a camelCase `?orderBy=` value to a SQL column via `whitelist`
/// (`(wire_name, column)` pairs). Absent means `default_column`.
pub fn resolve_order_by(
    raw: Option<&str>,
    whitelist: &[(&str, &'static str)],
    default_column: &'static str,
) -> Result<&'static str, CoreError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default_column);
    };
    whitelist
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, column)| *column)
        .ok_or_else(|| CoreError::UnrecognizedQueryParam {
            param: "orderBy".into(),
            value: value.into(),
            allowed: whitelist.iter().map(|(n, _)| n.to_string()).collect(),
        })
}

// ---------------------------------------------------------------------------
// Field selection and associations
// ---------------------------------------------------------------------------

/// Parse a comma-separated list (`fields`, `associations`) into trimmed,
/// non-empty entries.
pub fn parse_csv_param(raw: Option<&str>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Keep only the requested top-level keys of `value` (or of each element
/// when `value` is an array). An empty `fields` list leaves it untouched.
pub fn select_fields(value: Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return value;
    }
    match value {
        Value::Object(map) => Value::Object(retain_keys(map, fields)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| select_fields(item, fields))
                .collect(),
        ),
        other => other,
    }
}

fn retain_keys(map: Map<String, Value>, fields: &[String]) -> Map<String, Value> {
    map.into_iter()
        .filter(|(k, _)| fields.iter().any(|f| f == k))
        .collect()
}

/// Sub-collections that `?associations=` can expand on an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Associations {
    pub transactions: bool,
    pub charges: bool,
}

impl Associations {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut assoc = Associations::default();
        for item in parse_csv_param(raw) {
            match item.to_ascii_lowercase().as_str() {
                "all" => {
                    assoc.transactions = true;
                    assoc.charges = true;
                }
                "transactions" => assoc.transactions = true,
                "charges" => assoc.charges = true,
                _ => {}
            }
        }
        assoc
    }

    /// Response keys that must survive `?fields=` because they were requested.
    pub fn mandatory_fields(self) -> Vec<String> {
        let mut keys = Vec::new();
        if self.transactions {
            keys.push("transactions".to_string());
        }
        if self.charges {
            keys.push("charges".to_string());
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    const WHITELIST: &[(&str, &str)] = &[("accountNo", "account_no"), ("id", "id")];

    #[test]
    fn clamp_limit_defaults_and_bounds() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(500), 20, 100), 100);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_offset(Some(-3)), 0);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!(SortOrder::parse(None).unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("desc")).unwrap(), SortOrder::Desc);
        assert_matches!(
            SortOrder::parse(Some("sideways")),
            Err(CoreError::UnrecognizedQueryParam { .. })
        );
    }

    #[test]
    fn order_by_uses_whitelist() {
        assert_eq!(resolve_order_by(None, WHITELIST, "id").unwrap(), "id");
        assert_eq!(
            resolve_order_by(Some("accountno"), WHITELIST, "id").unwrap(),
            "account_no"
        );
        assert_matches!(
            resolve_order_by(Some("id; DROP TABLE x"), WHITELIST, "id"),
            Err(CoreError::UnrecognizedQueryParam { ref param, .. }) if param == "orderBy"
        );
    }

    #[test]
    fn select_fields_trims_objects_and_arrays() {
        let fields = parse_csv_param(Some("id, accountNo"));
        let value = json!([{ "id": 1, "accountNo": "0001", "status": {} }]);
        assert_eq!(
            select_fields(value, &fields),
            json!([{ "id": 1, "accountNo": "0001" }])
        );
        let untouched = json!({ "id": 1 });
        assert_eq!(select_fields(untouched.clone(), &[]), untouched);
    }

    #[test]
    fn associations_parsing() {
        let all = Associations::parse(Some("all"));
        assert!(all.transactions && all.charges);
        let tx = Associations::parse(Some("Transactions"));
        assert!(tx.transactions && !tx.charges);
        assert_eq!(tx.mandatory_fields(), vec!["transactions".to_string()]);
        assert_eq!(Associations::parse(None), Associations::default());
    }
}
