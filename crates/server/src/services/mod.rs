//! Business logic services.
//!
//! # Services
//!
//! - `drafts` - AI outreach drafts behind a credit gate
//! - `enrichment` - Contact email discovery from lead websites
//! - `email` - Outreach delivery via SMTP with an open-tracking image
//! - `tracking` - Recording email opens
//! - `outreach` - Sequential bulk outreach runs

pub mod drafts;
pub mod email;
pub mod enrichment;
pub mod outreach;
pub mod tracking;

pub use drafts::{DraftError, DraftRequest, DraftService, DraftStatus, GeneratedDraft};
pub use email::{EmailError, EmailService, SmtpCredential, SmtpSender};
pub use enrichment::Enricher;
pub use outreach::{OutreachError, OutreachService};
