//! Status enums for leads and outreach runs.
//!
//! JSON uses the labels the dashboard shows (`"Not Found"`, `"Contacted"`);
//! the database stores snake_case Postgres enum values.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a lead.
///
/// Pre-contact statuses (`New`, `Enriched`, `NotFound`, `NoWebsite`) describe
/// what enrichment found. After that a lead only moves forward:
/// `Contacted` → `Opened`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "lead_status", rename_all = "snake_case")
)]
pub enum LeadStatus {
    #[default]
    New,
    Enriched,
    #[serde(rename = "Not Found")]
    NotFound,
    #[serde(rename = "No Website")]
    NoWebsite,
    Contacted,
    Opened,
}

impl LeadStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Enriched,
        Self::NotFound,
        Self::NoWebsite,
        Self::Contacted,
        Self::Opened,
    ];

    /// Position in the lifecycle. Pre-contact statuses share rank 0.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::New | Self::Enriched | Self::NotFound | Self::NoWebsite => 0,
            Self::Contacted => 1,
            Self::Opened => 2,
        }
    }

    /// Whether an outreach email has been delivered to this lead.
    #[must_use]
    pub const fn is_contacted(self) -> bool {
        self.rank() >= 1
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Pre-contact statuses may be swapped freely (re-enrichment), every
    /// other move must not go backwards, and `Opened` is only reachable
    /// from `Contacted`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::Opened => matches!(self, Self::Contacted | Self::Opened),
            _ => next.rank() >= self.rank(),
        }
    }

    /// Label shown in the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Enriched => "Enriched",
            Self::NotFound => "Not Found",
            Self::NoWebsite => "No Website",
            Self::Contacted => "Contacted",
            Self::Opened => "Opened",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid lead status: {s}"))
    }
}

/// State of a bulk outreach run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "outreach_run_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, not yet started.
    #[default]
    Idle,
    /// A worker is processing leads.
    Running,
    /// Every lead has been processed.
    Completed,
    /// Stopped by the user between two leads.
    Cancelled,
    /// The process stopped while the run was in flight.
    Interrupted,
}

impl RunState {
    /// Whether a worker is (or is about to be) processing this run.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Idle | Self::Running)
    }

    /// Whether the remaining leads of the run may be picked up again.
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Cancelled | Self::Interrupted)
    }
}

/// Per-lead state inside a bulk outreach run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "outreach_lead_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LeadRunState {
    #[default]
    Pending,
    Drafting,
    Sending,
    /// Email sent and lead marked Contacted.
    Done,
    Failed,
    /// No usable email address; nothing was sent.
    Skipped,
}

impl LeadRunState {
    /// Whether the lead has been fully processed by the run.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }
}
