use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::{error, warn};

/// Error types for the engine.
///
/// Every variant except `Database` and `Crypto` is a caller-facing outcome
/// and is passed through to the request boundary unchanged.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No, invalid or expired session token
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated but not allowed to touch the target
    #[error("You do not own this resource")]
    Forbidden,

    /// Missing entity; suspended cards are reported the same way
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Personal or enterprise quota exhausted; `limit` is the configured quota
    #[error("Quota exceeded: limit is {limit}")]
    QuotaExceeded { limit: i32 },

    /// Uniqueness violation (slug, e-mail, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation is not valid for the current state of the target
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Password hashing failures
    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl EngineError {
    pub fn not_found(entity: &'static str) -> Self {
        EngineError::NotFound { entity }
    }

    /// Classifies a failed insert or update: unique-constraint violations
    /// become [`EngineError::Conflict`] with `what` as the message, anything
    /// else stays a database error.
    pub fn from_write(err: DbErr, what: &str) -> Self {
        if is_unique_violation(&err) {
            warn!("Unique constraint violated: {}", what);
            EngineError::Conflict(what.to_string())
        } else {
            error!("Database write failed: {}", err);
            EngineError::Database(err)
        }
    }

    /// Whether the error is an expected, caller-correctable outcome.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Database(_) | EngineError::Crypto(_))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    message.contains("unique") || message.contains("duplicate key")
}

/// Type alias for Result with EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_text_maps_to_conflict() {
        let err = DbErr::Custom("UNIQUE constraint failed: cards.slug".to_string());
        let mapped = EngineError::from_write(err, "slug 'jane' is already taken");
        assert!(matches!(mapped, EngineError::Conflict(ref msg) if msg.contains("jane")));
    }

    #[test]
    fn other_write_errors_stay_internal() {
        let err = DbErr::Custom("disk I/O error".to_string());
        let mapped = EngineError::from_write(err, "ignored");
        assert!(matches!(mapped, EngineError::Database(_)));
        assert!(!mapped.is_client_error());
    }

    #[test]
    fn quota_message_reports_limit() {
        let err = EngineError::QuotaExceeded { limit: 3 };
        assert_eq!(err.to_string(), "Quota exceeded: limit is 3");
        assert!(err.is_client_error());
    }
}
