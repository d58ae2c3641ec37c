//! Request body extraction.
//!
//! Write endpoints accept a JSON object but treat an empty (or
//! whitespace-only) body as `{}`, so commands without parameters can be sent
//! with no body at all. The raw JSON is kept for the command audit log.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// A parsed JSON body together with the raw object it came from.
///
/// ```ignore
/// async fn create(JsonBody(input, json): JsonBody<CreateThing>) -> AppResult<()> { .. }
/// ```
#[derive(Debug)]
pub struct JsonBody<T>(pub T, pub Value);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let json = parse_json(&bytes)?;
        let body = deserialize(json.clone())?;
        Ok(JsonBody(body, json))
    }
}

/// Parse a request body, treating blank input as an empty object.
pub fn parse_json(bytes: &[u8]) -> AppResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {e}")))?;
    if !value.is_object() {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".into(),
        ));
    }
    Ok(value)
}

/// Deserialize an already parsed body into `T`.
pub fn deserialize<T: DeserializeOwned>(json: Value) -> AppResult<T> {
    serde_json::from_value(json).map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        note: Option<String>,
    }

    #[test]
    fn blank_body_is_an_empty_object() {
        assert_eq!(parse_json(b"").unwrap(), json!({}));
        assert_eq!(parse_json(b"  \n ").unwrap(), json!({}));
        let note: Note = deserialize(parse_json(b"").unwrap()).unwrap();
        assert!(note.note.is_none());
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        assert_matches!(parse_json(b"{nope"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_json(b"[1, 2]"), Err(AppError::BadRequest(_)));
    }

    #[test]
    fn type_mismatch_is_a_bad_request() {
        let result: AppResult<Note> = deserialize(json!({"note": 5}));
        assert_matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("Invalid request body"));
    }
}
