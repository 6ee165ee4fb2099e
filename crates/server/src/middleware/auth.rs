//! Authentication extractors.
//!
//! Users sign in with the hosted auth provider. Its gateway forwards each API
//! request with the caller's identity in signed headers:
//!
//! - `x-auth-user-id` - provider subject id
//! - `x-auth-user-email` - primary email (optional)
//! - `x-auth-timestamp` - unix seconds when the gateway signed the request
//! - `x-auth-signature` - `v1=` + hex HMAC-SHA256 of `v1:{timestamp}:{user_id}`

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use autolead_core::UserId;

use crate::db::ProfileRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::Profile;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const USER_EMAIL_HEADER: &str = "x-auth-user-email";
pub const TIMESTAMP_HEADER: &str = "x-auth-timestamp";
pub const SIGNATURE_HEADER: &str = "x-auth-signature";

/// Maximum age (and clock skew) of a signed identity, in seconds.
const MAX_SIGNATURE_AGE_SECS: i64 = 300;

/// Errors verifying the gateway identity headers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("request timestamp too old")]
    Expired,

    #[error("signature mismatch")]
    BadSignature,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Compute the signature the gateway sends for `user_id` at `timestamp`.
#[must_use]
pub fn sign_identity(secret: &SecretString, timestamp: i64, user_id: &str) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(format!("v1:{timestamp}:{user_id}").as_bytes());
    format!("v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify the identity headers against the shared secret.
///
/// # Errors
///
/// Returns `AuthError` if a header is missing, the timestamp is stale, or the
/// signature does not match.
pub fn verify_identity(
    headers: &HeaderMap,
    secret: &SecretString,
    now: i64,
) -> Result<Identity, AuthError> {
    let user_id = header_str(headers, USER_ID_HEADER)?;
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;

    let ts: i64 = timestamp.parse().map_err(|_| AuthError::InvalidTimestamp)?;
    if (now - ts).abs() > MAX_SIGNATURE_AGE_SECS {
        return Err(AuthError::Expired);
    }

    let expected = sign_identity(secret, ts, user_id);
    if expected.is_empty() || !constant_time_compare(&expected, signature) {
        return Err(AuthError::BadSignature);
    }

    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(Identity {
        user_id: UserId::new(user_id),
        email,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingHeader(name))
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Extractor that requires a verified identity.
///
/// Rejects with 401 when the identity headers are missing or invalid.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> String {
///     format!("Hello, {}!", user.user_id)
/// }
/// ```
pub struct RequireUser(pub Identity);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let now = chrono::Utc::now().timestamp();
        let identity = verify_identity(&parts.headers, &state.config().auth.signing_secret, now)
            .inspect_err(|e| tracing::debug!(error = %e, "Rejected identity headers"))?;

        set_sentry_user(identity.user_id.as_str(), identity.email.as_deref());
        Ok(Self(identity))
    }
}

/// Extractor that requires an admin profile.
///
/// Rejects with 401 like [`RequireUser`], and with 403 when the caller has
/// no profile or the profile lacks the admin flag.
pub struct RequireAdmin(pub Profile);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(identity) = RequireUser::from_request_parts(parts, state).await?;

        let profile = ProfileRepository::new(state.pool())
            .get(&identity.user_id)
            .await?
            .filter(|p| p.is_admin)
            .ok_or_else(|| AppError::Forbidden("Admin access required".to_string()))?;

        Ok(Self(profile))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn secret() -> SecretString {
        SecretString::from("k9$Lm2@pQ7!xR4#tV8^wZ1&yB5*nC3%d")
    }

    fn signed_headers(user_id: &str, ts: i64) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(user_id).unwrap());
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&ts.to_string()).unwrap());
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&sign_identity(&secret(), ts, user_id)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_identity() {
        let mut headers = signed_headers("user_2xyz", NOW - 10);
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("owner@agency.test"));

        let identity = verify_identity(&headers, &secret(), NOW).unwrap();
        assert_eq!(identity.user_id, UserId::new("user_2xyz"));
        assert_eq!(identity.email.as_deref(), Some("owner@agency.test"));
    }

    #[test]
    fn test_missing_headers() {
        let headers = HeaderMap::new();
        assert_eq!(
            verify_identity(&headers, &secret(), NOW),
            Err(AuthError::MissingHeader(USER_ID_HEADER))
        );

        let mut headers = signed_headers("user_2xyz", NOW);
        headers.remove(SIGNATURE_HEADER);
        assert_eq!(
            verify_identity(&headers, &secret(), NOW),
            Err(AuthError::MissingHeader(SIGNATURE_HEADER))
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let headers = signed_headers("user_2xyz", NOW - 301);
        assert_eq!(
            verify_identity(&headers, &secret(), NOW),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut headers = signed_headers("user_2xyz", NOW);
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_static("yesterday"));
        assert_eq!(
            verify_identity(&headers, &secret(), NOW),
            Err(AuthError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_signature_for_other_user_rejected() {
        let mut headers = signed_headers("user_2xyz", NOW);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user_admin"));
        assert_eq!(
            verify_identity(&headers, &secret(), NOW),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let headers = signed_headers("user_2xyz", NOW);
        let other = SecretString::from("a-completely-different-signing-key!");
        assert_eq!(
            verify_identity(&headers, &other, NOW),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("v1=abc", "v1=abc"));
        assert!(!constant_time_compare("v1=abc", "v1=abd"));
        assert!(!constant_time_compare("v1=abc", "v1=ab"));
    }
}
