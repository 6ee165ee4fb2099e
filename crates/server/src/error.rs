//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::claude::ClaudeError;
use crate::db::RepositoryError;
use crate::middleware::AuthError;
use crate::search::SearchError;
use crate::services::drafts::DraftError;
use crate::services::email::EmailError;
use crate::services::outreach::OutreachError;

/// Application-level error type for API handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Maps search API failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Claude API operation failed.
    #[error("Claude error: {0}")]
    Claude(#[from] ClaudeError),

    /// SMTP dispatch failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission (or credits).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Search(_) | Self::Claude(_) | Self::Email(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server and upstream errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Search(_) => "Search service error".to_string(),
            Self::Claude(_) => "AI service error".to_string(),
            // The dashboard surfaces SMTP failures so users can fix their account settings.
            Self::Email(e) => e.to_string(),
            _ => self.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::ProfileMissing(_) | DraftError::InsufficientCredits => {
                Self::Forbidden(err.to_string())
            }
            DraftError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<OutreachError> for AppError {
    fn from(err: OutreachError) -> Self {
        match err {
            OutreachError::Repository(e) => Self::Database(e),
            OutreachError::RunNotFound(_) => Self::NotFound(err.to_string()),
            OutreachError::EmptySelection | OutreachError::UnknownLeads(_) => {
                Self::BadRequest(err.to_string())
            }
            OutreachError::LeadsBusy(_)
            | OutreachError::NotResumable(_)
            | OutreachError::NotRunning(_) => Self::Conflict(err.to_string()),
            OutreachError::Email(e) => Self::Email(e),
        }
    }
}

/// Set the Sentry user context from the authenticated identity.
pub fn set_sentry_user(user_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("lead 42".to_string());
        assert_eq!(err.to_string(), "Not found: lead 42");

        let err = AppError::BadRequest("website is required".to_string());
        assert_eq!(err.to_string(), "Bad request: website is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_http() {
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption(
                "bad".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_errors_are_bad_gateway() {
        assert_eq!(
            get_status(AppError::Search(SearchError::Unauthorized)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Claude(ClaudeError::RateLimited(30))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Email(EmailError::InvalidAddress("x".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_credit_errors_are_forbidden() {
        assert_eq!(
            get_status(DraftError::InsufficientCredits.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(
                DraftError::ProfileMissing(autolead_core::UserId::new("user_1")).into()
            ),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_outreach_errors_map_to_http() {
        let run_id = autolead_core::OutreachRunId::generate();
        assert_eq!(
            get_status(OutreachError::RunNotFound(run_id).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OutreachError::EmptySelection.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OutreachError::LeadsBusy("busy".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OutreachError::NotRunning(run_id).into()),
            StatusCode::CONFLICT
        );
    }
}
