//! AI outreach drafts gated by per-user credits.
//!
//! Generation itself never fails: when the model is unreachable or answers
//! with nothing, a static fallback email is returned instead. The credit-gated
//! entry point spends one credit up front and refunds it when the fallback
//! had to be used.

use std::sync::Arc;

use async_trait::async_trait;
use autolead_core::UserId;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::claude::{ClaudeClient, ClaudeError};
use crate::db::{CreditCheck, RepositoryError};

pub const DEFAULT_TONE: &str = "professional";
const DEFAULT_BUSINESS_NAME: &str = "Valued Business";
const DEFAULT_CATEGORY: &str = "your niche";
const DEFAULT_LOCATION: &str = "your area";

/// Produces free text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ClaudeError>;
}

#[async_trait]
impl TextGenerator for ClaudeClient {
    async fn generate(&self, prompt: &str) -> Result<String, ClaudeError> {
        self.complete(prompt).await
    }
}

/// Per-user credit balance.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Spend one credit if available.
    async fn try_consume(&self, user_id: &UserId) -> Result<CreditCheck, RepositoryError>;

    /// Return one credit.
    async fn refund(&self, user_id: &UserId) -> Result<(), RepositoryError>;
}

/// Errors from the credit-gated draft path.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no profile found for user {0}")]
    ProfileMissing(UserId),

    #[error("insufficient credits")]
    InsufficientCredits,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What the draft is about. Missing fields get neutral defaults.
#[derive(Debug, Clone, Default)]
pub struct DraftRequest {
    pub business_name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub tone: Option<String>,
}

impl DraftRequest {
    fn business_name(&self) -> &str {
        non_blank(self.business_name.as_deref()).unwrap_or(DEFAULT_BUSINESS_NAME)
    }

    fn category(&self) -> &str {
        non_blank(self.category.as_deref()).unwrap_or(DEFAULT_CATEGORY)
    }

    fn location(&self) -> &str {
        non_blank(self.location.as_deref()).unwrap_or(DEFAULT_LOCATION)
    }

    fn tone(&self) -> &str {
        non_blank(self.tone.as_deref()).unwrap_or(DEFAULT_TONE)
    }

    /// The prompt sent to the model.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "Write a {tone} cold email for {name} in {category} at {location}. Keep it short. \
             Start with a single line of the form \"Subject: ...\" followed by a blank line \
             and the body.",
            tone = self.tone(),
            name = self.business_name(),
            category = self.category(),
            location = self.location(),
        )
    }

    /// Static email used when generation fails.
    #[must_use]
    pub fn fallback(&self) -> String {
        format!(
            "Subject: Strategic Growth for {name}\n\n\
             Hi Team, \n\
             I noticed your work in {category}. We help businesses like yours scale with AI. \n\
             Would you be open to a quick chat?\n\n\
             Best regards,\n\
             AutoLead Pro Team",
            name = self.business_name(),
            category = self.category(),
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Whether the draft came from the model or the static fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DraftStatus {
    Success,
    Fallback,
}

/// A generated (or fallback) email.
#[derive(Debug, Clone)]
pub struct GeneratedDraft {
    /// Full text as produced, including any subject line.
    pub text: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: DraftStatus,
    /// Upstream failure that triggered the fallback.
    pub error: Option<String>,
}

impl GeneratedDraft {
    fn new(text: String, status: DraftStatus, error: Option<String>) -> Self {
        let (subject, body) = split_subject(&text);
        Self {
            text,
            subject,
            body,
            status,
            error,
        }
    }
}

/// Split a leading `Subject:` line off a draft.
///
/// Markdown emphasis around the label (`**Subject:**`) is tolerated.
#[must_use]
pub fn split_subject(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim_start();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let label = first.trim().trim_start_matches(['*', '#', ' ']);

    let subject = label
        .get(..8)
        .filter(|prefix| prefix.eq_ignore_ascii_case("subject:"))
        .and_then(|_| label.get(8..))
        .map(|value| value.trim().trim_matches('*').trim().to_string());

    match subject {
        Some(subject) if !subject.is_empty() => (Some(subject), rest.trim().to_string()),
        _ => (None, text.trim().to_string()),
    }
}

/// Draft generation with an optional credit gate.
#[derive(Clone)]
pub struct DraftService {
    generator: Arc<dyn TextGenerator>,
    ledger: Arc<dyn CreditLedger>,
}

impl DraftService {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, ledger: Arc<dyn CreditLedger>) -> Self {
        Self { generator, ledger }
    }

    /// Generate a draft, falling back to a static email on any failure.
    #[instrument(skip(self, request), fields(business = %request.business_name()))]
    pub async fn generate(&self, request: &DraftRequest) -> GeneratedDraft {
        match self.generator.generate(&request.prompt()).await {
            Ok(text) if !text.trim().is_empty() => {
                GeneratedDraft::new(text, DraftStatus::Success, None)
            }
            Ok(_) => {
                tracing::warn!("Model returned an empty draft, using fallback");
                GeneratedDraft::new(
                    request.fallback(),
                    DraftStatus::Fallback,
                    Some(ClaudeError::EmptyResponse.to_string()),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Draft generation failed, using fallback");
                GeneratedDraft::new(request.fallback(), DraftStatus::Fallback, Some(e.to_string()))
            }
        }
    }

    /// Spend one credit and generate a draft.
    ///
    /// The credit is refunded when the fallback was used.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::ProfileMissing` or `DraftError::InsufficientCredits`
    /// when the caller may not generate, and `DraftError::Repository` if the
    /// ledger is unavailable.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn generate_for(
        &self,
        user_id: &UserId,
        request: &DraftRequest,
    ) -> Result<GeneratedDraft, DraftError> {
        match self.ledger.try_consume(user_id).await? {
            CreditCheck::Consumed { remaining } => {
                tracing::debug!(remaining, "Credit consumed");
            }
            CreditCheck::Exhausted => return Err(DraftError::InsufficientCredits),
            CreditCheck::NoProfile => return Err(DraftError::ProfileMissing(user_id.clone())),
        }

        let draft = self.generate(request).await;
        if draft.status == DraftStatus::Fallback
            && let Err(e) = self.ledger.refund(user_id).await
        {
            tracing::error!(error = %e, "Failed to refund credit after fallback draft");
        }
        Ok(draft)
    }
}
