//! User profiles and credit balances.

use chrono::{DateTime, Utc};
use serde::Serialize;

use autolead_core::UserId;

/// A user profile.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    /// Remaining AI draft credits. Never negative.
    pub credits: i32,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
