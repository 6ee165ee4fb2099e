//! Email open tracking.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sqlx::PgPool;
use tracing::instrument;

use autolead_core::LeadId;

use crate::db::LeadRepository;

const PIXEL_BASE64: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Transparent 1x1 GIF.
pub static PIXEL: LazyLock<Vec<u8>> =
    LazyLock::new(|| STANDARD.decode(PIXEL_BASE64).unwrap_or_default());

pub const PIXEL_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Mark the lead as opened. Missing, malformed and unknown ids are ignored,
/// and so are database failures: the caller always serves the pixel.
#[instrument(skip(pool))]
pub async fn record_open(pool: &PgPool, lead_id: Option<&str>) {
    let Some(raw) = lead_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return;
    };

    let Ok(id) = raw.parse::<LeadId>() else {
        tracing::debug!(lead_id = %raw, "Ignoring malformed lead id");
        return;
    };

    match LeadRepository::new(pool).mark_opened(id).await {
        Ok(true) => tracing::info!(%id, "Email opened"),
        Ok(false) => tracing::debug!(%id, "Open ignored for lead not in a contacted state"),
        Err(e) => tracing::warn!(%id, error = %e, "Failed to record email open"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_is_a_1x1_gif() {
        assert_eq!(PIXEL.len(), 42);
        assert!(PIXEL.starts_with(b"GIF89a"));
        assert_eq!(&PIXEL[6..10], &[1, 0, 1, 0]);
        assert_eq!(PIXEL.last(), Some(&0x3b));
    }
}
