use service_core::error::AppError;
use thiserror::Error;

use crate::models::InvitationState;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("invalid_token")]
    InvalidToken,

    #[error("expired")]
    Expired,

    #[error("already_used")]
    AlreadyUsed,

    #[error("already_{0}")]
    AlreadyProcessed(InvitationState),

    #[error("email_in_use")]
    EmailInUse,

    #[error("user_not_found")]
    UserNotFound,

    #[error("Email error: {0}")]
    Email(String),
}

impl ServiceError {
    /// Stable machine-readable code surfaced to clients.
    pub fn code(&self) -> String {
        match self {
            ServiceError::Database(_) | ServiceError::Internal(_) | ServiceError::Email(_) => {
                "internal_error".to_string()
            }
            ServiceError::Validation(_) => "validation_error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::EmailError(msg) => ServiceError::Email(msg),
            AppError::DatabaseError(e) => ServiceError::Internal(e),
            other => ServiceError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Email(e) => AppError::EmailError(e),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::InvalidToken | ServiceError::UserNotFound => {
                AppError::NotFound(anyhow::anyhow!(code))
            }
            ServiceError::Expired => AppError::Expired(anyhow::anyhow!(code)),
            ServiceError::AlreadyUsed
            | ServiceError::AlreadyProcessed(_)
            | ServiceError::EmailInUse => AppError::Conflict(anyhow::anyhow!(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn codes_are_snake_case() {
        assert_eq!(
            ServiceError::AlreadyProcessed(InvitationState::Accepted).code(),
            "already_accepted"
        );
        assert_eq!(ServiceError::EmailInUse.code(), "email_in_use");
        assert_eq!(ServiceError::Email("smtp down".into()).code(), "internal_error");
    }

    #[test]
    fn maps_to_http_status() {
        let cases = [
            (ServiceError::InvalidToken, StatusCode::NOT_FOUND),
            (ServiceError::UserNotFound, StatusCode::NOT_FOUND),
            (ServiceError::Expired, StatusCode::GONE),
            (ServiceError::AlreadyUsed, StatusCode::CONFLICT),
            (ServiceError::EmailInUse, StatusCode::CONFLICT),
            (ServiceError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Email("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }
}
