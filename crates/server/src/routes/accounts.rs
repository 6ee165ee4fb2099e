//! Connected SMTP accounts.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};

use autolead_core::EmailAccountId;

use crate::db::EmailAccountRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{EmailAccount, NewEmailAccount};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/email-accounts", get(list_accounts).post(create_account))
        .route("/api/email-accounts/{id}", delete(delete_account))
}

/// GET /api/email-accounts
async fn list_accounts(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
) -> Result<Json<Vec<EmailAccount>>, AppError> {
    let accounts = EmailAccountRepository::new(state.pool())
        .list_for_user(&identity.user_id)
        .await?;
    Ok(Json(accounts))
}

/// POST /api/email-accounts
async fn create_account(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Json(form): Json<NewEmailAccount>,
) -> Result<(StatusCode, Json<EmailAccount>), AppError> {
    if form.email_address.trim().is_empty() || form.smtp_host.trim().is_empty() {
        return Err(AppError::BadRequest(
            "email address and SMTP host are required".to_string(),
        ));
    }
    if form.smtp_port == 0 {
        return Err(AppError::BadRequest("SMTP port must be 1-65535".to_string()));
    }

    let account = EmailAccountRepository::new(state.pool())
        .create(&identity.user_id, &form)
        .await?;
    tracing::info!(account_id = %account.id, "Email account connected");
    Ok((StatusCode::CREATED, Json(account)))
}

/// DELETE /api/email-accounts/{id}
async fn delete_account(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(id): Path<EmailAccountId>,
) -> Result<StatusCode, AppError> {
    EmailAccountRepository::new(state.pool())
        .delete(&identity.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
