//! Caller's profile and credit balance.

use axum::{Json, Router, extract::State, routing::get};

use crate::db::ProfileRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::Profile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/user-credits", get(user_credits).post(user_credits))
}

/// The caller's profile, created with the starting balance on first use.
///
/// GET|POST /api/user-credits
async fn user_credits(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
) -> Result<Json<Profile>, AppError> {
    let profile = ProfileRepository::new(state.pool())
        .get_or_create(
            &identity.user_id,
            identity.email.as_deref().unwrap_or_default(),
            state.config().outreach.initial_credits,
        )
        .await?;
    Ok(Json(profile))
}
