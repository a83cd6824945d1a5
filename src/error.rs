use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use engine::EngineError;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::schemas::ErrorResponse;

/// Error returned by every handler; rendered as an [`ErrorResponse`].
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Request body failed `validator` checks
    #[error("Validation error: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Invalid(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Engine(err) => match err {
                EngineError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
                EngineError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                EngineError::QuotaExceeded { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "QUOTA_EXCEEDED")
                }
                EngineError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                EngineError::InvalidOperation(_) => (StatusCode::CONFLICT, "INVALID_OPERATION"),
                EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                EngineError::Crypto(_) | EngineError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error while handling request: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases = [
            (EngineError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (EngineError::Forbidden, StatusCode::FORBIDDEN),
            (EngineError::not_found("Card"), StatusCode::NOT_FOUND),
            (
                EngineError::QuotaExceeded { limit: 2 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (EngineError::Conflict("slug".into()), StatusCode::CONFLICT),
            (EngineError::InvalidOperation("done".into()), StatusCode::CONFLICT),
            (EngineError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                EngineError::Database(DbErr::Custom("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn forbidden_message_mentions_ownership() {
        assert_eq!(
            ApiError::from(EngineError::Forbidden).to_string(),
            "You do not own this resource"
        );
    }
}
