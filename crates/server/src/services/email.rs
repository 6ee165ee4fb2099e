//! Outreach email delivery.
//!
//! Uses SMTP via lettre with Askama templates for the HTML and plain text
//! parts. When a lead id is known the HTML part carries a 1x1 tracking image
//! pointing back at `/api/track-email`.

use askama::Template;
use autolead_core::LeadId;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::EmailConfig;
use crate::models::EmailAccount;

/// Implicit TLS port; anything else negotiates STARTTLS.
const SMTPS_PORT: u16 = 465;

/// HTML body of an outreach email.
#[derive(Template)]
#[template(path = "email/outreach.html")]
struct OutreachEmailHtml<'a> {
    lines: Vec<&'a str>,
    tracking_url: Option<&'a str>,
}

/// Plain text body of an outreach email.
#[derive(Template)]
#[template(path = "email/outreach.txt")]
struct OutreachEmailText<'a> {
    message: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Everything needed to send as one mailbox.
#[derive(Clone)]
pub struct SmtpCredential {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub from_name: String,
}

impl SmtpCredential {
    /// The process-wide sender.
    #[must_use]
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: config.smtp_username.clone(),
            password: config.smtp_password.clone(),
            from_address: config.from_address.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// A user's connected account, shown under `from_name`.
    #[must_use]
    pub fn from_account(account: &EmailAccount, from_name: &str) -> Self {
        Self {
            host: account.smtp_host.clone(),
            port: account.smtp_port,
            username: account.smtp_user.clone(),
            password: account.smtp_pass.clone(),
            from_address: account.email_address.clone(),
            from_name: from_name.to_string(),
        }
    }

    fn mailbox(&self) -> Result<Mailbox, EmailError> {
        let address = self
            .from_address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?;
        Ok(Mailbox::new(Some(self.from_name.clone()), address))
    }
}

impl std::fmt::Debug for SmtpCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredential")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

/// Build an SMTP transport for a credential.
///
/// # Errors
///
/// Returns error if the relay host is invalid.
pub fn build_transport(
    credential: &SmtpCredential,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpError> {
    let credentials = Credentials::new(
        credential.username.clone(),
        credential.password.expose_secret().to_string(),
    );

    let builder = if credential.port == SMTPS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&credential.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&credential.host)?
    };

    Ok(builder
        .port(credential.port)
        .credentials(credentials)
        .build())
}

/// Public URL of the open-tracking image for a lead.
#[must_use]
pub fn tracking_url(public_url: &Url, lead_id: LeadId) -> String {
    format!(
        "{}/api/track-email?leadId={lead_id}",
        public_url.as_str().trim_end_matches('/')
    )
}

/// Render the HTML part: one `<br>` per line break plus the tracking image.
///
/// # Errors
///
/// Returns error if the template fails to render.
pub fn render_html(message: &str, tracking_url: Option<&str>) -> Result<String, EmailError> {
    Ok(OutreachEmailHtml {
        lines: message.lines().collect(),
        tracking_url,
    }
    .render()?)
}

/// A pooled transport bound to one mailbox.
///
/// Build it once per sender and reuse it; every clone shares the pool.
#[derive(Clone)]
pub struct SmtpSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    credential: SmtpCredential,
}

impl SmtpSender {
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(credential: SmtpCredential) -> Result<Self, SmtpError> {
        let mailer = build_transport(&credential)?;
        Ok(Self { mailer, credential })
    }

    #[must_use]
    pub const fn credential(&self) -> &SmtpCredential {
        &self.credential
    }
}

impl std::fmt::Debug for SmtpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSender")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

/// Email service for outreach messages.
#[derive(Clone)]
pub struct EmailService {
    default_sender: SmtpSender,
    public_url: Url,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, public_url: Url) -> Result<Self, SmtpError> {
        Ok(Self {
            default_sender: SmtpSender::new(SmtpCredential::from_config(config))?,
            public_url,
        })
    }

    /// Display name used for connected accounts.
    #[must_use]
    pub fn from_name(&self) -> &str {
        &self.default_sender.credential.from_name
    }

    /// Send an outreach email through `sender` when given or the default
    /// sender otherwise. Failures are returned as-is; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, message, sender))]
    pub async fn send_outreach(
        &self,
        to: &str,
        subject: &str,
        message: &str,
        lead_id: Option<LeadId>,
        sender: Option<&SmtpSender>,
    ) -> Result<(), EmailError> {
        let pixel = lead_id.map(|id| tracking_url(&self.public_url, id));

        let html = render_html(message, pixel.as_deref())?;
        let text = OutreachEmailText { message }.render()?;

        let sender = sender.unwrap_or(&self.default_sender);
        Self::send_multipart_email(
            &sender.mailer,
            &sender.credential,
            to,
            subject,
            &text,
            &html,
        )
        .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        sender: &SmtpCredential,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(sender.mailbox()?)
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, from = %sender.from_address, "Email sent successfully");
        Ok(())
    }
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("default_sender", &self.default_sender)
            .field("public_url", &self.public_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credential(port: u16) -> SmtpCredential {
        SmtpCredential {
            host: "smtp.example.com".to_string(),
            port,
            username: "sender@example.com".to_string(),
            password: SecretString::from("app-password-9x"),
            from_address: "sender@example.com".to_string(),
            from_name: "AutoLead Pro".to_string(),
        }
    }

    #[test]
    fn test_tracking_url() {
        let id: LeadId = "1c9a3e5e-8d2b-4f59-9a65-2b7f6c1d0e4a".parse().unwrap();
        let public = Url::parse("https://leads.autolead.app").unwrap();
        assert_eq!(
            tracking_url(&public, id),
            "https://leads.autolead.app/api/track-email?leadId=1c9a3e5e-8d2b-4f59-9a65-2b7f6c1d0e4a"
        );
    }

    #[test]
    fn test_html_converts_newlines_and_embeds_pixel() {
        let html = render_html(
            "Hi Rosa,\nLoved the croissants.\nBest",
            Some("https://leads.autolead.app/api/track-email?leadId=abc"),
        )
        .unwrap();

        assert!(html.contains("Hi Rosa,<br>"));
        assert!(html.contains("Loved the croissants.<br>"));
        assert!(!html.contains("Best<br>"));
        assert!(html.contains(
            r#"<img src="https://leads.autolead.app/api/track-email?leadId=abc" width="1" height="1""#
        ));
    }

    #[test]
    fn test_html_without_lead_has_no_pixel() {
        let html = render_html("Hello", None).unwrap();
        assert!(html.contains("Hello"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_html_escapes_message() {
        let html = render_html("<script>alert(1)</script>", None).unwrap();
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_text_part_is_verbatim() {
        let text = OutreachEmailText {
            message: "Hi <Rosa>\nBye",
        }
        .render()
        .unwrap();
        assert!(text.starts_with("Hi <Rosa>\nBye"));
    }

    #[test]
    fn test_mailbox_uses_display_name() {
        let mailbox = credential(465).mailbox().unwrap();
        let rendered = mailbox.to_string();
        assert!(rendered.contains("AutoLead Pro"));
        assert!(rendered.ends_with("<sender@example.com>"));
    }

    #[test]
    fn test_mailbox_rejects_bad_address() {
        let mut bad = credential(465);
        bad.from_address = "not-an-address".to_string();
        assert!(matches!(bad.mailbox(), Err(EmailError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_build_transport_for_both_ports() {
        assert!(build_transport(&credential(465)).is_ok());
        assert!(build_transport(&credential(587)).is_ok());
    }

    #[tokio::test]
    async fn test_sender_keeps_credential_and_redacts() {
        let sender = SmtpSender::new(credential(587)).unwrap();
        let clone = sender.clone();
        assert_eq!(clone.credential().from_address, "sender@example.com");
        assert_eq!(clone.credential().port, 587);

        let debug = format!("{sender:?}");
        assert!(debug.contains("smtp.example.com"));
        assert!(!debug.contains("app-password-9x"));
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let debug = format!("{:?}", credential(587));
        assert!(!debug.contains("app-password-9x"));
        assert!(debug.contains("[REDACTED]"));
    }
}
