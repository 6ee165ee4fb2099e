//! Single email dispatch.

use axum::{Json, Router, extract::State, routing::post};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use autolead_core::{EmailAccountId, LeadId, usable_recipient};

use crate::db::{EmailAccountRepository, LeadRepository};
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::services::email::{EmailError, SmtpCredential, SmtpSender};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/send-email", post(send_email))
}

/// Inline SMTP settings supplied with the request.
#[derive(Deserialize)]
pub struct SmtpOverride {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: SecretString,
    /// Sender address; defaults to `user`.
    #[serde(default)]
    pub email: Option<String>,
}

impl std::fmt::Debug for SmtpOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpOverride")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    pub to: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub lead_id: Option<LeadId>,
    #[serde(default)]
    pub smtp_config: Option<SmtpOverride>,
    #[serde(default)]
    pub account_id: Option<EmailAccountId>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Send one outreach email, with a tracking image when `leadId` is given.
///
/// POST /api/send-email
///
/// The sender is the inline `smtpConfig`, else the connected account
/// `accountId`, else the server default. A successful send to a known lead
/// marks it Contacted.
async fn send_email(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Json(body): Json<SendEmailBody>,
) -> Result<Json<SendEmailResponse>, AppError> {
    let Some(to) = usable_recipient(Some(body.to.as_str())) else {
        return Err(AppError::BadRequest(format!(
            "invalid recipient: {}",
            body.to
        )));
    };

    let from_name = state.email().from_name();
    let credential = match (body.smtp_config, body.account_id) {
        (Some(smtp), _) => Some(SmtpCredential {
            from_address: smtp.email.unwrap_or_else(|| smtp.user.clone()),
            host: smtp.host,
            port: smtp.port,
            username: smtp.user,
            password: smtp.pass,
            from_name: from_name.to_string(),
        }),
        (None, Some(account_id)) => {
            let account = EmailAccountRepository::new(state.pool())
                .get(&identity.user_id, account_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("email account {account_id}")))?;
            Some(SmtpCredential::from_account(&account, from_name))
        }
        (None, None) => None,
    };
    let sender = credential
        .map(SmtpSender::new)
        .transpose()
        .map_err(EmailError::from)?;

    state
        .email()
        .send_outreach(
            to.as_str(),
            &body.subject,
            &body.message,
            body.lead_id,
            sender.as_ref(),
        )
        .await?;

    if let Some(lead_id) = body.lead_id
        && let Err(e) = LeadRepository::new(state.pool())
            .mark_contacted(&identity.user_id, lead_id)
            .await
    {
        tracing::error!(%lead_id, error = %e, "Email sent but lead status not updated");
    }

    Ok(Json(SendEmailResponse {
        success: true,
        message: "Email sent successfully!",
    }))
}
