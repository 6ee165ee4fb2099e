//! Admin profile management.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;

use autolead_core::UserId;

use crate::db::ProfileRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Profile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/profiles", get(list_profiles))
        .route("/api/admin/update-profile", post(update_profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileBody {
    pub target_user_id: String,
    pub new_credits: i32,
    pub make_admin: bool,
}

/// GET /api/admin/profiles - newest first.
async fn list_profiles(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = ProfileRepository::new(state.pool()).list_all().await?;
    Ok(Json(profiles))
}

/// POST /api/admin/update-profile
async fn update_profile(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<Profile>, AppError> {
    if body.new_credits < 0 {
        return Err(AppError::BadRequest("credits must be 0 or more".to_string()));
    }

    let target = UserId::new(body.target_user_id);
    let profile = ProfileRepository::new(state.pool())
        .update_admin_fields(&target, body.new_credits, body.make_admin)
        .await?;

    tracing::info!(
        admin = %admin.id,
        target = %target,
        credits = profile.credits,
        is_admin = profile.is_admin,
        "Profile updated by admin"
    );
    Ok(Json(profile))
}
