//! Bulk outreach run types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use autolead_core::{EmailAccountId, LeadId, LeadRunState, OutreachRunId, RunState, UserId};

/// A persisted bulk outreach run.
#[derive(Debug, Clone, Serialize)]
pub struct OutreachRun {
    pub id: OutreachRunId,
    pub user_id: UserId,
    /// Sender account; `None` uses the server's default SMTP account.
    pub email_account_id: Option<EmailAccountId>,
    pub state: RunState,
    pub total: i32,
    /// Leads settled so far (done, failed, or skipped).
    pub processed: i32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One selected lead inside a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLead {
    pub lead_id: LeadId,
    /// Selection order, starting at 0.
    pub position: i32,
    pub state: LeadRunState,
    pub error: Option<String>,
}

/// What happened to the most recently processed lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadOutcome {
    pub lead_id: LeadId,
    pub state: LeadRunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Live progress of a run, published after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    pub run_id: OutreachRunId,
    pub state: RunState,
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
    /// Lead being worked on and its sub-state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<LeadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<LeadOutcome>,
}

impl RunProgress {
    #[must_use]
    pub const fn new(run_id: OutreachRunId, processed: usize, total: usize) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            processed,
            total,
            percent: percent(processed, total),
            current: None,
            last: None,
        }
    }

    /// Build the progress view of a stored run (no live worker attached).
    #[must_use]
    pub fn from_run(run: &OutreachRun) -> Self {
        let total = usize::try_from(run.total).unwrap_or(0);
        let processed = usize::try_from(run.processed).unwrap_or(0).min(total);
        Self {
            state: run.state,
            ..Self::new(run.id, processed, total)
        }
    }

    /// Count one more settled lead.
    pub fn advance(&mut self, outcome: LeadOutcome) {
        self.processed = (self.processed + 1).min(self.total);
        self.percent = percent(self.processed, self.total);
        self.current = None;
        self.last = Some(outcome);
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        !self.state.is_active()
    }
}

/// A stored run with its per-lead outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    #[serde(flatten)]
    pub run: OutreachRun,
    pub progress: RunProgress,
    pub leads: Vec<RunLead>,
}

/// Whole-number percentage; an empty run counts as complete.
#[must_use]
pub const fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let p = processed.saturating_mul(100) / total;
    if p >= 100 {
        return 100;
    }
    #[allow(clippy::cast_possible_truncation)] // p < 100 here
    let p = p as u8;
    p
}
