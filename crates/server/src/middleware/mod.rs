//! HTTP middleware and extractors.
//!
//! # Layer Order (outermost first, see `build_app`)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. CORS (dashboard origin only)
//!
//! Authentication is done per handler through the [`RequireUser`] and
//! [`RequireAdmin`] extractors rather than a layer, so the tracking pixel
//! and health checks stay public.

pub mod auth;

pub use auth::{AuthError, Identity, RequireAdmin, RequireUser};
