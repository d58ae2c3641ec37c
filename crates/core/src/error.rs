use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A business rule rejected the operation. `code` is a stable dotted
    /// identifier such as `error.msg.savingsaccount.transaction.insufficient.account.balance`.
    #[error("{message}")]
    DomainRule { code: String, message: String },

    #[error("Unrecognized value '{value}' for query parameter '{param}'")]
    UnrecognizedQueryParam {
        param: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Concurrent modification or a serialization failure; the caller may retry.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a [`CoreError::DomainRule`] from a code suffix and message.
    ///
    /// The suffix is prefixed with `error.msg.` so callers write
    /// `CoreError::rule("savingsaccount.not.active", "...")`.
    pub fn rule(code: &str, message: impl Into<String>) -> Self {
        CoreError::DomainRule {
            code: format!("error.msg.{code}"),
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_prefixes_code() {
        let err = CoreError::rule("savingsaccount.not.active", "Account is not active");
        match err {
            CoreError::DomainRule { code, message } => {
                assert_eq!(code, "error.msg.savingsaccount.not.active");
                assert_eq!(message, "Account is not active");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
