//! Maps search.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::NewLead;
use crate::search::normalize_places;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/search", post(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub keyword: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub leads: Vec<NewLead>,
}

/// Search for businesses and return them as unsaved leads.
///
/// POST /api/search
async fn search(
    State(state): State<AppState>,
    RequireUser(_identity): RequireUser,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResults>, AppError> {
    let keyword = body.keyword.trim();
    let location = body.location.trim();
    if keyword.is_empty() || location.is_empty() {
        return Err(AppError::BadRequest(
            "keyword and location are required".to_string(),
        ));
    }

    let places = state.search().search(keyword, location).await?;
    Ok(Json(SearchResults {
        leads: normalize_places(&places, keyword),
    }))
}
