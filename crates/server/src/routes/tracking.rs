//! Open-tracking pixel.

use axum::{
    Router,
    extract::{FromRef, Query, State, rejection::QueryRejection},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::services::tracking::{PIXEL, PIXEL_CACHE_CONTROL, record_open};

/// Only needs the pool, so any state that hands one out can mount it.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    PgPool: FromRef<S>,
{
    Router::new().route("/api/track-email", get(track_email))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuery {
    #[serde(default)]
    pub lead_id: Option<String>,
}

/// Always answers with the pixel, whatever the lead id.
///
/// GET /api/track-email?leadId=
async fn track_email(
    State(pool): State<PgPool>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> impl IntoResponse {
    let lead_id = query.ok().and_then(|Query(q)| q.lead_id);
    record_open(&pool, lead_id.as_deref()).await;

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, PIXEL_CACHE_CONTROL),
        ],
        PIXEL.as_slice(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// A pool whose every query fails: nothing listens on port 1.
    fn unreachable_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://autolead@127.0.0.1:1/autolead")
            .unwrap()
    }

    async fn fetch_pixel(uri: &str) {
        let app: Router = router().with_state(unreachable_pool());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            PIXEL_CACHE_CONTROL
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), PIXEL.as_slice(), "{uri}");
    }

    #[tokio::test]
    async fn test_pixel_served_without_lead_id() {
        fetch_pixel("/api/track-email").await;
        fetch_pixel("/api/track-email?leadId=").await;
    }

    #[tokio::test]
    async fn test_pixel_served_for_malformed_lead_id() {
        fetch_pixel("/api/track-email?leadId=not-a-uuid").await;
        fetch_pixel("/api/track-email?leadId=%ZZ&leadId=1").await;
    }

    #[tokio::test]
    async fn test_pixel_served_for_unknown_lead_when_store_fails() {
        fetch_pixel("/api/track-email?leadId=7d444840-9dc0-11d1-b245-5ffdce74fad2").await;
    }
}
