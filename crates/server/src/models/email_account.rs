//! SMTP sender accounts.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use autolead_core::{EmailAccountId, UserId};

/// A connected SMTP account. The password is never serialized.
#[derive(Clone, Serialize)]
pub struct EmailAccount {
    pub id: EmailAccountId,
    pub user_id: UserId,
    pub email_address: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    #[serde(skip)]
    pub smtp_pass: SecretString,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for EmailAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAccount")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("email_address", &self.email_address)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_pass", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Form submitted by the settings page to connect an account.
#[derive(Deserialize)]
pub struct NewEmailAccount {
    pub email_address: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: SecretString,
}

impl std::fmt::Debug for NewEmailAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewEmailAccount")
            .field("email_address", &self.email_address)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_pass", &"[REDACTED]")
            .finish()
    }
}
