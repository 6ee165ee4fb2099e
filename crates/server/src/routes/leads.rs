//! Saved leads.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use autolead_core::LeadId;

use crate::db::LeadRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{Lead, NewLead};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/leads", get(list_leads).post(save_leads))
        .route("/api/leads/{id}", get(get_lead))
}

#[derive(Debug, Deserialize)]
pub struct SaveLeadsBody {
    pub leads: Vec<NewLead>,
}

#[derive(Debug, Serialize)]
pub struct LeadList {
    pub leads: Vec<Lead>,
}

/// GET /api/leads - newest first.
async fn list_leads(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
) -> Result<Json<LeadList>, AppError> {
    let leads = LeadRepository::new(state.pool())
        .list_for_user(&identity.user_id)
        .await?;
    Ok(Json(LeadList { leads }))
}

/// POST /api/leads - store search results with status New.
async fn save_leads(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Json(body): Json<SaveLeadsBody>,
) -> Result<(StatusCode, Json<LeadList>), AppError> {
    if body.leads.is_empty() {
        return Err(AppError::BadRequest("no leads to save".to_string()));
    }

    let leads = LeadRepository::new(state.pool())
        .insert_many(&identity.user_id, &body.leads)
        .await?;
    tracing::info!(user_id = %identity.user_id, count = leads.len(), "Leads saved");
    Ok((StatusCode::CREATED, Json(LeadList { leads })))
}

/// GET /api/leads/{id}
async fn get_lead(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(id): Path<LeadId>,
) -> Result<Json<Lead>, AppError> {
    LeadRepository::new(state.pool())
        .get(&identity.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("lead {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use autolead_core::LeadStatus;

    #[test]
    fn test_save_body_cannot_preset_status() {
        let body: SaveLeadsBody = serde_json::from_str(
            r#"{"leads":[{"name":"Green Leaf Cafe","address":"12 Elm St","phone":"No Phone","category":"cafe","email":"owner@greenleaf.co","status":"Opened"}]}"#,
        )
        .unwrap();
        assert_eq!(body.leads.len(), 1);
        assert_eq!(body.leads[0].status, LeadStatus::New);
    }
}
