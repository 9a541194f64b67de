use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy of the reconciliation subsystem.
///
/// Every variant is recovered at the component boundary (resolver, coordinator,
/// tailoring engine). The document store is never left half-updated by any of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("No valid session for this operation")]
    Unauthorized,

    #[error("{target} is already being regenerated")]
    AlreadyInProgress { target: String },

    #[error("{target} no longer exists in the document")]
    StaleTarget { target: String },

    #[error("Profile source is unavailable")]
    SourceUnavailable,

    #[error("Value for {field} does not match its declared shape ({expected})")]
    ShapeMismatch { field: String, expected: String },

    #[error("No response from {operation} within {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Remote service failed: {0}")]
    RemoteFailure(RemoteFailure),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),
}

/// Explicit error reported by a remote service. Rate limits and exhausted
/// quotas are kept apart so the user can be told to wait rather than give up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteFailure {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("generation credits exhausted")]
    QuotaExhausted,

    #[error("{0}")]
    Service(String),
}

/// What the user can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Remedy {
    Retry,
    LogIn,
    WaitAndRetry,
    FixInput,
    ServiceUnavailable,
}

impl ProfileError {
    pub fn shape_mismatch(field: impl Into<String>, expected: impl Into<String>) -> Self {
        ProfileError::ShapeMismatch {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn remedy(&self) -> Remedy {
        match self {
            ProfileError::Unauthorized
            | ProfileError::SourceUnavailable
            | ProfileError::SessionNotFound(_) => Remedy::LogIn,
            ProfileError::AlreadyInProgress { .. }
            | ProfileError::RemoteFailure(RemoteFailure::RateLimited) => Remedy::WaitAndRetry,
            ProfileError::RemoteFailure(RemoteFailure::QuotaExhausted) => {
                Remedy::ServiceUnavailable
            }
            ProfileError::ShapeMismatch { .. } | ProfileError::MissingInput(_) => {
                Remedy::FixInput
            }
            ProfileError::StaleTarget { .. }
            | ProfileError::Timeout { .. }
            | ProfileError::RemoteFailure(RemoteFailure::Service(_))
            | ProfileError::NetworkFailure(_) => Remedy::Retry,
        }
    }

    /// Message shown to the user. Each kind gets its own wording.
    pub fn user_message(&self) -> String {
        match self {
            ProfileError::Unauthorized => {
                "Log in with your profile to use AI regeneration.".to_string()
            }
            ProfileError::AlreadyInProgress { target } => {
                format!("{target} is already regenerating. Wait for it to finish.")
            }
            ProfileError::StaleTarget { target } => format!(
                "{target} changed while it was being regenerated, so the result was discarded. Try again."
            ),
            ProfileError::SourceUnavailable => {
                "Could not load your imported profile. Log in again or continue with the sample."
                    .to_string()
            }
            ProfileError::ShapeMismatch { field, expected } => {
                format!("The value for {field} must be {expected}.")
            }
            ProfileError::Timeout { operation, .. } => {
                format!("The {operation} request took too long. Try again.")
            }
            ProfileError::RemoteFailure(RemoteFailure::RateLimited) => {
                "Rate limit exceeded. Please try again in a moment.".to_string()
            }
            ProfileError::RemoteFailure(RemoteFailure::QuotaExhausted) => {
                "AI credits are exhausted. Generation is unavailable until credits are added."
                    .to_string()
            }
            ProfileError::RemoteFailure(RemoteFailure::Service(msg)) => {
                format!("The generation service reported an error: {msg}. Try again.")
            }
            ProfileError::NetworkFailure(_) => {
                "Failed to connect to the server. Please try again.".to_string()
            }
            ProfileError::MissingInput(what) => format!("Please enter {what} first."),
            ProfileError::SessionNotFound(_) => {
                "Your editing session has expired. Start a new one.".to_string()
            }
        }
    }

    fn status_code(&self) -> (StatusCode, &'static str) {
        match self {
            ProfileError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ProfileError::AlreadyInProgress { .. } => (StatusCode::CONFLICT, "ALREADY_IN_PROGRESS"),
            ProfileError::StaleTarget { .. } => (StatusCode::CONFLICT, "STALE_TARGET"),
            ProfileError::SourceUnavailable => {
                (StatusCode::FAILED_DEPENDENCY, "SOURCE_UNAVAILABLE")
            }
            ProfileError::ShapeMismatch { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SHAPE_MISMATCH")
            }
            ProfileError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ProfileError::RemoteFailure(RemoteFailure::RateLimited) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
            }
            ProfileError::RemoteFailure(RemoteFailure::QuotaExhausted) => {
                (StatusCode::PAYMENT_REQUIRED, "QUOTA_EXHAUSTED")
            }
            ProfileError::RemoteFailure(RemoteFailure::Service(_)) => {
                (StatusCode::BAD_GATEWAY, "REMOTE_FAILURE")
            }
            ProfileError::NetworkFailure(_) => (StatusCode::BAD_GATEWAY, "NETWORK_FAILURE"),
            ProfileError::MissingInput(_) => (StatusCode::BAD_REQUEST, "MISSING_INPUT"),
            ProfileError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, remedy) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                Remedy::FixInput,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                Remedy::FixInput,
            ),
            AppError::Profile(err) => {
                let (status, code) = err.status_code();
                if status.is_server_error() {
                    tracing::error!("Profile operation failed: {err}");
                } else {
                    tracing::warn!("Profile operation rejected: {err}");
                }
                (status, code, err.user_message(), err.remedy())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "remedy": remedy,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_and_quota_have_distinct_remedies() {
        let rate = ProfileError::RemoteFailure(RemoteFailure::RateLimited);
        let quota = ProfileError::RemoteFailure(RemoteFailure::QuotaExhausted);
        assert_eq!(rate.remedy(), Remedy::WaitAndRetry);
        assert_eq!(quota.remedy(), Remedy::ServiceUnavailable);
        assert_ne!(rate.user_message(), quota.user_message());
    }

    #[test]
    fn test_unauthorized_asks_to_log_in() {
        assert_eq!(ProfileError::Unauthorized.remedy(), Remedy::LogIn);
    }

    #[test]
    fn test_already_in_progress_is_not_a_retry() {
        let err = ProfileError::AlreadyInProgress {
            target: "skills".to_string(),
        };
        assert_eq!(err.remedy(), Remedy::WaitAndRetry);
        assert!(err.user_message().contains("already regenerating"));
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::from(ProfileError::StaleTarget {
            target: "experience[1]".to_string(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::from(ProfileError::Timeout {
            operation: "regeneration".to_string(),
            seconds: 20,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
