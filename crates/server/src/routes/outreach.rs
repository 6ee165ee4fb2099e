//! Bulk outreach runs.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use autolead_core::{EmailAccountId, LeadId, OutreachRunId};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{RunProgress, RunSnapshot};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/outreach/runs", post(start_run))
        .route("/api/outreach/runs/{id}", get(get_run))
        .route("/api/outreach/runs/{id}/events", get(run_events))
        .route("/api/outreach/runs/{id}/cancel", post(cancel_run))
        .route("/api/outreach/runs/{id}/resume", post(resume_run))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunBody {
    pub lead_ids: Vec<LeadId>,
    #[serde(default)]
    pub account_id: Option<EmailAccountId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunResponse {
    pub run_id: OutreachRunId,
}

/// POST /api/outreach/runs
async fn start_run(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Json(body): Json<StartRunBody>,
) -> Result<(StatusCode, Json<StartRunResponse>), AppError> {
    let run_id = state
        .outreach()
        .start_run(&identity.user_id, &body.lead_ids, body.account_id)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(StartRunResponse { run_id })))
}

/// GET /api/outreach/runs/{id}
async fn get_run(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(id): Path<OutreachRunId>,
) -> Result<Json<RunSnapshot>, AppError> {
    let snapshot = state.outreach().snapshot(&identity.user_id, id).await?;
    Ok(Json(snapshot))
}

/// Progress as server-sent events until the run stops.
///
/// GET /api/outreach/runs/{id}/events
///
/// A run without a live worker yields its stored progress once.
async fn run_events(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(id): Path<OutreachRunId>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = state.outreach().subscribe(&identity.user_id, id).await?;

    let stream = async_stream::stream! {
        yield Ok(progress_event(&subscription.current));

        if let Some(mut rx) = subscription.updates {
            while rx.changed().await.is_ok() {
                let progress = rx.borrow_and_update().clone();
                let finished = progress.is_finished();
                yield Ok(progress_event(&progress));
                if finished {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn progress_event(progress: &RunProgress) -> Event {
    let json = serde_json::to_string(progress).unwrap_or_else(|_| {
        r#"{"type":"error","message":"Failed to serialize progress"}"#.to_string()
    });
    Event::default().event("progress").data(json)
}

/// POST /api/outreach/runs/{id}/cancel
async fn cancel_run(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(id): Path<OutreachRunId>,
) -> Result<StatusCode, AppError> {
    state.outreach().cancel_run(&identity.user_id, id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/outreach/runs/{id}/resume
async fn resume_run(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(id): Path<OutreachRunId>,
) -> Result<StatusCode, AppError> {
    state.outreach().resume_run(&identity.user_id, id).await?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_run_body_accepts_camel_case() {
        let body: StartRunBody = serde_json::from_str(
            r#"{"leadIds": ["1c9a3e5e-8d2b-4f59-9a65-2b7f6c1d0e4a"], "accountId": 3}"#,
        )
        .expect("deserialize");
        assert_eq!(body.lead_ids.len(), 1);
        assert_eq!(body.account_id, Some(EmailAccountId::new(3)));
    }

    #[test]
    fn test_start_run_response_shape() {
        let run_id = OutreachRunId::generate();
        let json = serde_json::to_value(StartRunResponse { run_id }).expect("serialize");
        assert_eq!(json["runId"], run_id.to_string());
    }
}
