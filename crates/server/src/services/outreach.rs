//! Bulk outreach runs.
//!
//! A run drafts and sends one email per selected lead, strictly one lead at
//! a time with a fixed pause in between. Each run is driven by a background
//! task that owns a [`RunContext`]; progress is published on a `watch`
//! channel and persisted after every lead so an interrupted run can be
//! resumed from where it stopped.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument};

use autolead_core::{
    Email, EmailAccountId, LeadId, LeadRunState, OutreachRunId, RunState, UserId,
    usable_recipient,
};

use crate::db::{
    EmailAccountRepository, LeadRepository, OutreachRunRepository, RepositoryError,
};
use crate::models::{
    EmailAccount, Lead, LeadOutcome, OutreachRun, RunLead, RunProgress, RunSnapshot,
};

use super::drafts::{DraftError, DraftRequest, DraftService, GeneratedDraft};
use super::email::{EmailError, EmailService, SmtpCredential, SmtpSender};

/// Errors from starting, resuming or inspecting a run.
#[derive(Debug, Error)]
pub enum OutreachError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("outreach run {0} not found")]
    RunNotFound(OutreachRunId),

    #[error("no leads selected")]
    EmptySelection,

    #[error("{0} selected lead(s) not found")]
    UnknownLeads(usize),

    #[error("{0}")]
    LeadsBusy(String),

    #[error("outreach run {0} cannot be resumed")]
    NotResumable(OutreachRunId),

    #[error("outreach run {0} is not running")]
    NotRunning(OutreachRunId),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Side effects of a run, one call per step.
#[async_trait]
pub trait OutreachBackend: Send + Sync {
    /// Write the email for a lead.
    async fn draft(&self, user_id: &UserId, lead: &Lead) -> Result<GeneratedDraft, DraftError>;

    /// Send the email.
    async fn dispatch(
        &self,
        to: &Email,
        subject: &str,
        body: &str,
        lead_id: LeadId,
    ) -> Result<(), EmailError>;

    /// Move the lead to Contacted.
    async fn mark_contacted(&self, user_id: &UserId, lead_id: LeadId)
    -> Result<bool, RepositoryError>;

    /// Persist a settled lead and the new processed count.
    async fn record(
        &self,
        run_id: OutreachRunId,
        outcome: &LeadOutcome,
        processed: usize,
    ) -> Result<(), RepositoryError>;

    /// Persist the final run state.
    async fn finish(&self, run_id: OutreachRunId, state: RunState) -> Result<(), RepositoryError>;
}

/// Everything the worker task needs to drive one run.
pub struct RunContext {
    pub run_id: OutreachRunId,
    pub user_id: UserId,
    /// Leads still to process, in selection order.
    pub leads: Vec<Lead>,
    pub total: usize,
    /// Leads already settled by an earlier attempt.
    pub processed: usize,
    pub delay: Duration,
    pub cancel: CancellationToken,
    pub progress: watch::Sender<RunProgress>,
}

impl RunContext {
    fn publish(&self, progress: &RunProgress) {
        self.progress.send_replace(progress.clone());
    }
}

/// Drive a run to completion or cancellation and return its final state.
///
/// Per-lead failures are logged and recorded; they never stop the run.
pub async fn run_outreach(ctx: RunContext, backend: &dyn OutreachBackend) -> RunState {
    let mut progress = RunProgress::new(ctx.run_id, ctx.processed, ctx.total);
    progress.state = RunState::Running;
    ctx.publish(&progress);

    let mut cancelled = false;
    for (index, lead) in ctx.leads.iter().enumerate() {
        if index > 0 {
            tokio::select! {
                () = ctx.cancel.cancelled() => {}
                () = tokio::time::sleep(ctx.delay) => {}
            }
        }
        if ctx.cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let outcome = process_lead(&ctx, backend, lead, &mut progress).await;
        progress.advance(outcome.clone());

        if let Err(e) = backend.record(ctx.run_id, &outcome, progress.processed).await {
            tracing::error!(lead_id = %lead.id, error = %e, "Failed to record lead outcome");
        }
        ctx.publish(&progress);
    }

    let state = if cancelled {
        RunState::Cancelled
    } else {
        RunState::Completed
    };
    if let Err(e) = backend.finish(ctx.run_id, state).await {
        tracing::error!(error = %e, "Failed to record final run state");
    }

    progress.state = state;
    progress.current = None;
    ctx.publish(&progress);

    tracing::info!(
        state = ?state,
        processed = progress.processed,
        total = progress.total,
        "Outreach run finished"
    );
    state
}

async fn process_lead(
    ctx: &RunContext,
    backend: &dyn OutreachBackend,
    lead: &Lead,
    progress: &mut RunProgress,
) -> LeadOutcome {
    let Some(to) = usable_recipient(Some(lead.email.as_str())) else {
        tracing::debug!(lead_id = %lead.id, "Skipping lead without email");
        return outcome(lead.id, LeadRunState::Skipped, None);
    };

    progress.current = Some(outcome(lead.id, LeadRunState::Drafting, None));
    ctx.publish(progress);

    let draft = match backend.draft(&ctx.user_id, lead).await {
        Ok(draft) => draft,
        Err(e) => {
            tracing::warn!(lead_id = %lead.id, error = %e, "Draft failed");
            return outcome(lead.id, LeadRunState::Failed, Some(e.to_string()));
        }
    };

    progress.current = Some(outcome(lead.id, LeadRunState::Sending, None));
    ctx.publish(progress);

    let subject = draft
        .subject
        .clone()
        .unwrap_or_else(|| format!("Inquiry for {}", lead.name));

    if let Err(e) = backend.dispatch(&to, &subject, &draft.body, lead.id).await {
        tracing::warn!(lead_id = %lead.id, error = %e, "Dispatch failed");
        return outcome(lead.id, LeadRunState::Failed, Some(e.to_string()));
    }

    if let Err(e) = backend.mark_contacted(&ctx.user_id, lead.id).await {
        tracing::error!(lead_id = %lead.id, error = %e, "Email sent but lead status not updated");
    }

    outcome(lead.id, LeadRunState::Done, None)
}

const fn outcome(lead_id: LeadId, state: LeadRunState, error: Option<String>) -> LeadOutcome {
    LeadOutcome {
        lead_id,
        state,
        error,
    }
}

/// [`OutreachBackend`] over the database, the draft service and SMTP.
pub struct PgOutreachBackend {
    pool: PgPool,
    drafts: DraftService,
    email: EmailService,
    /// Transport for the run's account, built once; `None` uses the default sender.
    sender: Option<SmtpSender>,
}

#[async_trait]
impl OutreachBackend for PgOutreachBackend {
    async fn draft(&self, user_id: &UserId, lead: &Lead) -> Result<GeneratedDraft, DraftError> {
        let request = DraftRequest {
            business_name: Some(lead.name.clone()),
            category: Some(lead.category.clone()),
            location: Some(lead.address.clone()),
            tone: None,
        };
        self.drafts.generate_for(user_id, &request).await
    }

    async fn dispatch(
        &self,
        to: &Email,
        subject: &str,
        body: &str,
        lead_id: LeadId,
    ) -> Result<(), EmailError> {
        self.email
            .send_outreach(
                to.as_str(),
                subject,
                body,
                Some(lead_id),
                self.sender.as_ref(),
            )
            .await
    }

    async fn mark_contacted(
        &self,
        user_id: &UserId,
        lead_id: LeadId,
    ) -> Result<bool, RepositoryError> {
        LeadRepository::new(&self.pool)
            .mark_contacted(user_id, lead_id)
            .await
    }

    async fn record(
        &self,
        run_id: OutreachRunId,
        outcome: &LeadOutcome,
        processed: usize,
    ) -> Result<(), RepositoryError> {
        let processed = i32::try_from(processed)
            .map_err(|_| RepositoryError::DataCorruption("processed count overflow".to_string()))?;
        OutreachRunRepository::new(&self.pool)
            .record_lead(
                run_id,
                outcome.lead_id,
                outcome.state,
                outcome.error.as_deref(),
                processed,
            )
            .await
    }

    async fn finish(&self, run_id: OutreachRunId, state: RunState) -> Result<(), RepositoryError> {
        OutreachRunRepository::new(&self.pool)
            .set_state(run_id, state)
            .await
    }
}

struct RunHandle {
    cancel: CancellationToken,
    progress: watch::Receiver<RunProgress>,
}

/// Runs that have a live worker in this process.
#[derive(Clone, Default)]
pub struct RunRegistry {
    runs: Arc<Mutex<HashMap<OutreachRunId, RunHandle>>>,
}

impl RunRegistry {
    fn insert(&self, run_id: OutreachRunId, handle: RunHandle) {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run_id, handle);
    }

    fn remove(&self, run_id: OutreachRunId) {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&run_id);
    }

    /// Signal a live run to stop before its next lead.
    fn cancel(&self, run_id: OutreachRunId) -> bool {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&run_id)
            .map(|handle| handle.cancel.cancel())
            .is_some()
    }

    fn subscribe(&self, run_id: OutreachRunId) -> Option<watch::Receiver<RunProgress>> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&run_id)
            .map(|handle| handle.progress.clone())
    }

    /// Number of runs with a live worker.
    #[must_use]
    pub fn active(&self) -> usize {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Current progress of a run, plus a live feed while a worker is attached.
pub struct RunSubscription {
    pub current: RunProgress,
    pub updates: Option<watch::Receiver<RunProgress>>,
}

/// Starts, resumes, cancels and reports on outreach runs.
#[derive(Clone)]
pub struct OutreachService {
    pool: PgPool,
    drafts: DraftService,
    email: EmailService,
    registry: RunRegistry,
    delay: Duration,
}

impl OutreachService {
    #[must_use]
    pub fn new(pool: PgPool, drafts: DraftService, email: EmailService, delay: Duration) -> Self {
        Self {
            pool,
            drafts,
            email,
            registry: RunRegistry::default(),
            delay,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Mark runs orphaned by a previous process as Interrupted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    pub async fn recover_interrupted(&self) -> Result<u64, RepositoryError> {
        let count = OutreachRunRepository::new(&self.pool)
            .interrupt_stale()
            .await?;
        if count > 0 {
            tracing::warn!(count, "Marked stale outreach runs as interrupted");
        }
        Ok(count)
    }

    /// Create a run over the selected leads and start it in the background.
    ///
    /// Duplicate ids are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `EmptySelection`, `UnknownLeads` when an id does not belong to
    /// the user, `LeadsBusy` when a lead is already in an active run, or a
    /// repository error (`NotFound` for an unknown account).
    #[instrument(skip(self, lead_ids), fields(user_id = %user_id, selected = lead_ids.len()))]
    pub async fn start_run(
        &self,
        user_id: &UserId,
        lead_ids: &[LeadId],
        account_id: Option<EmailAccountId>,
    ) -> Result<OutreachRunId, OutreachError> {
        let ids = dedupe(lead_ids);
        if ids.is_empty() {
            return Err(OutreachError::EmptySelection);
        }

        let leads = self.load_in_order(user_id, &ids).await?;
        if leads.len() != ids.len() {
            return Err(OutreachError::UnknownLeads(ids.len() - leads.len()));
        }
        let sender = self.account_sender(user_id, account_id).await?;

        // The row is created Running; nothing fallible may follow it.
        let run = OutreachRunRepository::new(&self.pool)
            .create(OutreachRunId::generate(), user_id, account_id, &ids)
            .await
            .map_err(busy_conflict)?;

        tracing::info!(run_id = %run.id, total = run.total, "Starting outreach run");
        self.spawn(&run, leads, 0, sender);
        Ok(run.id)
    }

    /// Continue a Cancelled or Interrupted run with its unsettled leads.
    ///
    /// A run started from a connected account resumes from that account or
    /// not at all.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound`, `NotResumable` for runs in other states,
    /// `LeadsBusy` when a lead has since joined another active run, or a
    /// repository error (`NotFound` when the run's account is gone).
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn resume_run(
        &self,
        user_id: &UserId,
        run_id: OutreachRunId,
    ) -> Result<(), OutreachError> {
        let repo = OutreachRunRepository::new(&self.pool);
        let stopped = self.owned_run(user_id, run_id).await?;
        let plan = ResumePlan::new(&stopped, &repo.leads(run_id).await?)?;
        let leads = self.load_in_order(user_id, &plan.pending).await?;
        let sender = self.account_sender(user_id, stopped.email_account_id).await?;

        // Claiming flips the row to Running; nothing fallible may follow it.
        let Some(run) = repo
            .claim_for_resume(user_id, run_id)
            .await
            .map_err(busy_conflict)?
        else {
            return Err(OutreachError::NotResumable(run_id));
        };

        tracing::info!(%run_id, pending = leads.len(), settled = plan.settled, "Resuming outreach run");
        self.spawn(&run, leads, plan.settled, sender);
        Ok(())
    }

    /// Ask a live run to stop before its next lead.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound` or `NotRunning` when no worker is attached.
    pub async fn cancel_run(
        &self,
        user_id: &UserId,
        run_id: OutreachRunId,
    ) -> Result<(), OutreachError> {
        self.owned_run(user_id, run_id).await?;
        if self.registry.cancel(run_id) {
            tracing::info!(%run_id, "Cancellation requested");
            Ok(())
        } else {
            Err(OutreachError::NotRunning(run_id))
        }
    }

    /// Stored run, per-lead outcomes and the freshest progress available.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound` or a repository error.
    pub async fn snapshot(
        &self,
        user_id: &UserId,
        run_id: OutreachRunId,
    ) -> Result<RunSnapshot, OutreachError> {
        let run = self.owned_run(user_id, run_id).await?;
        let leads = OutreachRunRepository::new(&self.pool).leads(run_id).await?;
        let progress = self.registry.subscribe(run_id).map_or_else(
            || RunProgress::from_run(&run),
            |rx| rx.borrow().clone(),
        );
        Ok(RunSnapshot {
            run,
            progress,
            leads,
        })
    }

    /// Current progress and, while the run is live, a receiver for updates.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound` or a repository error.
    pub async fn subscribe(
        &self,
        user_id: &UserId,
        run_id: OutreachRunId,
    ) -> Result<RunSubscription, OutreachError> {
        let run = self.owned_run(user_id, run_id).await?;
        Ok(match self.registry.subscribe(run_id) {
            Some(rx) => {
                let current = rx.borrow().clone();
                RunSubscription {
                    current,
                    updates: Some(rx),
                }
            }
            None => RunSubscription {
                current: RunProgress::from_run(&run),
                updates: None,
            },
        })
    }

    async fn owned_run(
        &self,
        user_id: &UserId,
        run_id: OutreachRunId,
    ) -> Result<OutreachRun, OutreachError> {
        OutreachRunRepository::new(&self.pool)
            .get(user_id, run_id)
            .await?
            .ok_or(OutreachError::RunNotFound(run_id))
    }

    /// The user's leads for `ids`, in the order of `ids`.
    async fn load_in_order(
        &self,
        user_id: &UserId,
        ids: &[LeadId],
    ) -> Result<Vec<Lead>, RepositoryError> {
        let mut by_id: HashMap<LeadId, Lead> = LeadRepository::new(&self.pool)
            .get_many(user_id, ids)
            .await?
            .into_iter()
            .map(|lead| (lead.id, lead))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Sender for `account_id`, or `None` for the default sender.
    async fn account_sender(
        &self,
        user_id: &UserId,
        account_id: Option<EmailAccountId>,
    ) -> Result<Option<SmtpSender>, OutreachError> {
        let Some(account_id) = account_id else {
            return Ok(None);
        };
        let account = EmailAccountRepository::new(&self.pool)
            .get(user_id, account_id)
            .await?;
        sender_for(account.as_ref(), self.email.from_name()).map(Some)
    }

    fn spawn(
        &self,
        run: &OutreachRun,
        leads: Vec<Lead>,
        processed: usize,
        sender: Option<SmtpSender>,
    ) {
        let total = usize::try_from(run.total).unwrap_or(0);
        let (tx, rx) = watch::channel(RunProgress::new(run.id, processed, total));
        let cancel = CancellationToken::new();
        self.registry.insert(
            run.id,
            RunHandle {
                cancel: cancel.clone(),
                progress: rx,
            },
        );

        let ctx = RunContext {
            run_id: run.id,
            user_id: run.user_id.clone(),
            leads,
            total,
            processed,
            delay: self.delay,
            cancel,
            progress: tx,
        };
        let backend = PgOutreachBackend {
            pool: self.pool.clone(),
            drafts: self.drafts.clone(),
            email: self.email.clone(),
            sender,
        };
        let registry = self.registry.clone();
        let run_id = run.id;

        tokio::spawn(
            async move {
                run_outreach(ctx, &backend).await;
                registry.remove(run_id);
            }
            .instrument(tracing::info_span!("outreach_run", %run_id)),
        );
    }
}

/// Where a stopped run picks up again.
#[derive(Debug, PartialEq, Eq)]
struct ResumePlan {
    settled: usize,
    /// Unsettled leads in selection order.
    pending: Vec<LeadId>,
}

impl ResumePlan {
    fn new(run: &OutreachRun, run_leads: &[RunLead]) -> Result<Self, OutreachError> {
        if !run.state.is_resumable() {
            return Err(OutreachError::NotResumable(run.id));
        }
        let mut ordered: Vec<&RunLead> = run_leads.iter().collect();
        ordered.sort_by_key(|l| l.position);

        let settled = ordered.iter().filter(|l| l.state.is_settled()).count();
        let pending = ordered
            .iter()
            .filter(|l| !l.state.is_settled())
            .map(|l| l.lead_id)
            .collect();
        Ok(Self { settled, pending })
    }
}

/// A chosen account that no longer exists is `NotFound`, never the default sender.
fn sender_for(account: Option<&EmailAccount>, from_name: &str) -> Result<SmtpSender, OutreachError> {
    let account = account.ok_or(RepositoryError::NotFound)?;
    let credential = SmtpCredential::from_account(account, from_name);
    SmtpSender::new(credential).map_err(|e| OutreachError::Email(e.into()))
}

fn dedupe(ids: &[LeadId]) -> Vec<LeadId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn busy_conflict(error: RepositoryError) -> OutreachError {
    match error {
        RepositoryError::Conflict(message) => OutreachError::LeadsBusy(message),
        other => OutreachError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use autolead_core::LeadStatus;

    use super::*;
    use crate::services::drafts::DraftStatus;

    #[derive(Default)]
    struct FakeBackend {
        fail_draft_for: Option<String>,
        fail_dispatch_for: Option<String>,
        /// Cancelled right after the first dispatch.
        cancel_after_dispatch: Option<CancellationToken>,
        dispatched: Mutex<Vec<(String, String)>>,
        statuses: Mutex<HashMap<LeadId, LeadStatus>>,
        recorded: Mutex<Vec<(LeadRunState, usize)>>,
        finished: Mutex<Option<RunState>>,
    }

    #[async_trait]
    impl OutreachBackend for FakeBackend {
        async fn draft(
            &self,
            _user_id: &UserId,
            lead: &Lead,
        ) -> Result<GeneratedDraft, DraftError> {
            if self.fail_draft_for.as_deref() == Some(lead.name.as_str()) {
                return Err(DraftError::InsufficientCredits);
            }
            Ok(GeneratedDraft {
                text: format!("Hello {}", lead.name),
                subject: None,
                body: format!("Hello {}", lead.name),
                status: DraftStatus::Success,
                error: None,
            })
        }

        async fn dispatch(
            &self,
            to: &Email,
            subject: &str,
            _body: &str,
            _lead_id: LeadId,
        ) -> Result<(), EmailError> {
            if self.fail_dispatch_for.as_deref() == Some(to.as_str()) {
                return Err(EmailError::InvalidAddress(to.as_str().to_string()));
            }
            self.dispatched
                .lock()
                .unwrap()
                .push((to.as_str().to_string(), subject.to_string()));
            if let Some(token) = &self.cancel_after_dispatch {
                token.cancel();
            }
            Ok(())
        }

        async fn mark_contacted(
            &self,
            _user_id: &UserId,
            lead_id: LeadId,
        ) -> Result<bool, RepositoryError> {
            self.statuses
                .lock()
                .unwrap()
                .insert(lead_id, LeadStatus::Contacted);
            Ok(true)
        }

        async fn record(
            &self,
            _run_id: OutreachRunId,
            outcome: &LeadOutcome,
            processed: usize,
        ) -> Result<(), RepositoryError> {
            self.recorded
                .lock()
                .unwrap()
                .push((outcome.state, processed));
            Ok(())
        }

        async fn finish(
            &self,
            _run_id: OutreachRunId,
            state: RunState,
        ) -> Result<(), RepositoryError> {
            *self.finished.lock().unwrap() = Some(state);
            Ok(())
        }
    }

    fn lead(name: &str, email: &str) -> Lead {
        Lead {
            id: LeadId::generate(),
            user_id: UserId::new("user_1"),
            name: name.to_string(),
            address: "1 Main St".to_string(),
            phone: "No Phone".to_string(),
            website: String::new(),
            category: "bakery".to_string(),
            email: email.to_string(),
            rating: 4.5,
            review_count: 12,
            status: LeadStatus::Enriched,
            created_at: Utc::now(),
            opened_at: None,
        }
    }

    fn context(leads: Vec<Lead>, delay: Duration) -> (RunContext, watch::Receiver<RunProgress>) {
        let run_id = OutreachRunId::generate();
        let total = leads.len();
        let (tx, rx) = watch::channel(RunProgress::new(run_id, 0, total));
        let ctx = RunContext {
            run_id,
            user_id: UserId::new("user_1"),
            leads,
            total,
            processed: 0,
            delay,
            cancel: CancellationToken::new(),
            progress: tx,
        };
        (ctx, rx)
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let a = LeadId::generate();
        let b = LeadId::generate();
        assert_eq!(dedupe(&[a, b, a, b]), vec![a, b]);
    }

    #[test]
    fn test_busy_conflict_mapping() {
        assert!(matches!(
            busy_conflict(RepositoryError::Conflict("busy".into())),
            OutreachError::LeadsBusy(msg) if msg == "busy"
        ));
        assert!(matches!(
            busy_conflict(RepositoryError::NotFound),
            OutreachError::Repository(RepositoryError::NotFound)
        ));
    }

    fn stopped_run(state: RunState) -> OutreachRun {
        OutreachRun {
            id: OutreachRunId::generate(),
            user_id: UserId::new("user_1"),
            email_account_id: Some(EmailAccountId::new(7)),
            state,
            total: 3,
            processed: 1,
            created_at: Utc::now(),
            finished_at: Some(Utc::now()),
        }
    }

    fn run_lead(position: i32, state: LeadRunState) -> RunLead {
        RunLead {
            lead_id: LeadId::generate(),
            position,
            state,
            error: None,
        }
    }

    #[test]
    fn test_resume_plan_keeps_unsettled_leads_in_order() {
        let leads = vec![
            run_lead(2, LeadRunState::Pending),
            run_lead(0, LeadRunState::Done),
            run_lead(1, LeadRunState::Sending),
        ];
        let plan = ResumePlan::new(&stopped_run(RunState::Interrupted), &leads).unwrap();
        assert_eq!(plan.settled, 1);
        assert_eq!(plan.pending, vec![leads[2].lead_id, leads[0].lead_id]);
    }

    #[test]
    fn test_resume_plan_rejects_active_and_completed_runs() {
        for state in [RunState::Idle, RunState::Running, RunState::Completed] {
            let run = stopped_run(state);
            assert!(matches!(
                ResumePlan::new(&run, &[]),
                Err(OutreachError::NotResumable(id)) if id == run.id
            ));
        }
        assert!(ResumePlan::new(&stopped_run(RunState::Cancelled), &[]).is_ok());
    }

    #[tokio::test]
    async fn test_missing_account_never_falls_back_to_default_sender() {
        assert!(matches!(
            sender_for(None, "AutoLead Pro"),
            Err(OutreachError::Repository(RepositoryError::NotFound))
        ));

        let account = EmailAccount {
            id: EmailAccountId::new(7),
            user_id: UserId::new("user_1"),
            email_address: "rosa@rosasbakery.com".to_string(),
            smtp_host: "smtp.rosasbakery.com".to_string(),
            smtp_port: 587,
            smtp_user: "rosa@rosasbakery.com".to_string(),
            smtp_pass: secrecy::SecretString::from("app-password-9x"),
            created_at: Utc::now(),
        };
        let sender = sender_for(Some(&account), "AutoLead Pro").unwrap();
        assert_eq!(sender.credential().from_address, "rosa@rosasbakery.com");
        assert_eq!(sender.credential().from_name, "AutoLead Pro");
    }

    #[tokio::test]
    async fn test_lead_without_email_is_skipped() {
        let leads = vec![
            lead("Rosa's Bakery", "hello@rosas.com"),
            lead("No Mail Deli", "N/A"),
            lead("Corner Cafe", "info@cornercafe.com"),
        ];
        let skipped_id = leads[1].id;
        let (ctx, rx) = context(leads, Duration::ZERO);
        let backend = FakeBackend::default();

        let state = run_outreach(ctx, &backend).await;

        assert_eq!(state, RunState::Completed);
        let dispatched = backend.dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 2);
        assert_eq!(dispatched[0].0, "hello@rosas.com");
        assert_eq!(dispatched[0].1, "Inquiry for Rosa's Bakery");
        assert_eq!(dispatched[1].0, "info@cornercafe.com");
        assert!(!backend.statuses.lock().unwrap().contains_key(&skipped_id));

        let recorded = backend.recorded.lock().unwrap();
        assert_eq!(
            *recorded,
            vec![
                (LeadRunState::Done, 1),
                (LeadRunState::Skipped, 2),
                (LeadRunState::Done, 3)
            ]
        );

        let last = rx.borrow().clone();
        assert_eq!(last.state, RunState::Completed);
        assert_eq!(last.percent, 100);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let leads = vec![
            lead("A", "a@a.co"),
            lead("B", "b@b.co"),
            lead("C", "c@c.co"),
            lead("D", "d@d.co"),
        ];
        let (ctx, mut rx) = context(leads, Duration::ZERO);
        let backend = Arc::new(FakeBackend::default());

        let worker = {
            let backend = backend.clone();
            tokio::spawn(async move { run_outreach(ctx, backend.as_ref()).await })
        };

        let mut seen = vec![rx.borrow_and_update().percent];
        while rx.changed().await.is_ok() {
            seen.push(rx.borrow_and_update().percent);
        }
        assert_eq!(worker.await.unwrap(), RunState::Completed);

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(backend.dispatched.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_run() {
        let leads = vec![
            lead("Broken Draft", "x@broken.co"),
            lead("Bounce", "bounce@fail.co"),
            lead("Fine", "ok@fine.co"),
        ];
        let (ctx, _rx) = context(leads, Duration::ZERO);
        let backend = FakeBackend {
            fail_draft_for: Some("Broken Draft".to_string()),
            fail_dispatch_for: Some("bounce@fail.co".to_string()),
            ..FakeBackend::default()
        };

        let state = run_outreach(ctx, &backend).await;

        assert_eq!(state, RunState::Completed);
        let recorded = backend.recorded.lock().unwrap();
        let states: Vec<_> = recorded.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![LeadRunState::Failed, LeadRunState::Failed, LeadRunState::Done]
        );
        assert_eq!(backend.dispatched.lock().unwrap().len(), 1);
        assert_eq!(backend.statuses.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_lead() {
        let leads = vec![
            lead("A", "a@a.co"),
            lead("B", "b@b.co"),
            lead("C", "c@c.co"),
        ];
        let (ctx, rx) = context(leads, Duration::from_secs(3600));
        let backend = FakeBackend {
            cancel_after_dispatch: Some(ctx.cancel.clone()),
            ..FakeBackend::default()
        };

        let state = run_outreach(ctx, &backend).await;

        assert_eq!(state, RunState::Cancelled);
        assert_eq!(backend.dispatched.lock().unwrap().len(), 1);
        assert_eq!(*backend.finished.lock().unwrap(), Some(RunState::Cancelled));
        let last = rx.borrow().clone();
        assert_eq!((last.processed, last.total), (1, 3));
        assert_eq!(last.state, RunState::Cancelled);
    }

    #[tokio::test]
    async fn test_empty_run_completes() {
        let (ctx, rx) = context(Vec::new(), Duration::ZERO);
        let backend = FakeBackend::default();

        assert_eq!(run_outreach(ctx, &backend).await, RunState::Completed);
        assert_eq!(rx.borrow().percent, 100);
    }
}
