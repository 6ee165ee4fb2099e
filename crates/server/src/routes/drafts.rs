//! AI email drafts.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::services::drafts::{DraftRequest, DraftStatus};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/generate-email", post(generate_email))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailBody {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateEmailResponse {
    pub email: String,
    pub status: DraftStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Draft a cold email, spending one credit.
///
/// POST /api/generate-email
async fn generate_email(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Json(body): Json<GenerateEmailBody>,
) -> Result<Json<GenerateEmailResponse>, AppError> {
    let request = DraftRequest {
        business_name: body.business_name,
        category: body.category,
        location: body.location,
        tone: body.tone,
    };

    let draft = state
        .drafts()
        .generate_for(&identity.user_id, &request)
        .await?;

    Ok(Json(GenerateEmailResponse {
        email: draft.text,
        status: draft.status,
        error: draft.error,
    }))
}
