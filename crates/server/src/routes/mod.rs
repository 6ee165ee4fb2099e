//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Leads
//! POST /api/search                      - Maps search, normalized leads
//! GET  /api/leads                       - Caller's saved leads
//! POST /api/leads                       - Save leads
//! GET  /api/leads/{id}                  - One lead
//! POST /api/enrich-lead                 - Find a contact email
//!
//! # Outreach
//! POST /api/generate-email              - AI draft (one credit)
//! POST /api/send-email                  - Send one email
//! GET  /api/track-email?leadId=         - Open-tracking pixel (public)
//! POST /api/outreach/runs               - Start a bulk run
//! GET  /api/outreach/runs/{id}          - Run snapshot
//! GET  /api/outreach/runs/{id}/events   - Run progress (SSE)
//! POST /api/outreach/runs/{id}/cancel   - Stop before the next lead
//! POST /api/outreach/runs/{id}/resume   - Continue a stopped run
//!
//! # Account
//! GET|POST   /api/email-accounts        - Connected SMTP accounts
//! DELETE     /api/email-accounts/{id}   - Disconnect an account
//! GET|POST   /api/user-credits          - Profile and credit balance
//! GET        /api/dashboard/stats       - Lead counts and growth
//!
//! # Admin
//! GET  /api/admin/profiles              - All profiles
//! POST /api/admin/update-profile        - Set credits and admin flag
//! ```

use axum::Router;

use crate::state::AppState;

pub mod accounts;
pub mod admin;
pub mod credits;
pub mod dashboard;
pub mod drafts;
pub mod enrich;
pub mod leads;
pub mod outreach;
pub mod search;
pub mod send;
pub mod tracking;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(search::router())
        .merge(leads::router())
        .merge(enrich::router())
        .merge(drafts::router())
        .merge(send::router())
        .merge(tracking::router::<AppState>())
        .merge(outreach::router())
        .merge(accounts::router())
        .merge(credits::router())
        .merge(dashboard::router())
        .merge(admin::router())
}
