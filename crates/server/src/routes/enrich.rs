//! Lead enrichment.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use autolead_core::LeadId;

use crate::db::LeadRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::Enrichment;
use crate::services::enrichment::has_website;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/enrich-lead", post(enrich_lead))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichBody {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    /// When set, the result is written back to this lead.
    #[serde(default)]
    pub lead_id: Option<LeadId>,
}

/// Find a contact email for a business.
///
/// POST /api/enrich-lead
///
/// A request without a website is rejected with 400; if it names a lead,
/// that lead is first marked No Website.
async fn enrich_lead(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Json(body): Json<EnrichBody>,
) -> Result<Json<Enrichment>, AppError> {
    let website = body.website.as_deref().unwrap_or_default();
    let repo = LeadRepository::new(state.pool());

    if !has_website(website) {
        if let Some(lead_id) = body.lead_id {
            repo.apply_enrichment(&identity.user_id, lead_id, &Enrichment::no_website())
                .await?;
        }
        return Err(AppError::BadRequest(
            "No website available for enrichment.".to_string(),
        ));
    }

    let enrichment = state.enricher().enrich(website).await;
    tracing::info!(
        business = body.business_name.as_deref().unwrap_or_default(),
        status = %enrichment.status,
        "Lead enriched"
    );

    if let Some(lead_id) = body.lead_id
        && !repo
            .apply_enrichment(&identity.user_id, lead_id, &enrichment)
            .await?
    {
        tracing::debug!(%lead_id, "Enrichment not written back");
    }

    Ok(Json(enrichment))
}
