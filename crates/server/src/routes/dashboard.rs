//! Dashboard statistics.

use axum::{Json, Router, extract::State, routing::get};

use crate::db::LeadRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::DashboardStats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard/stats", get(stats))
}

/// GET /api/dashboard/stats
async fn stats(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = LeadRepository::new(state.pool())
        .dashboard_stats(&identity.user_id)
        .await?;
    Ok(Json(stats))
}
