//! Domain models.

pub mod email_account;
pub mod lead;
pub mod outreach;
pub mod profile;

pub use email_account::{EmailAccount, NewEmailAccount};
pub use lead::{DailyCount, DashboardStats, Enrichment, Lead, NewLead};
pub use outreach::{LeadOutcome, OutreachRun, RunLead, RunProgress, RunSnapshot};
pub use profile::Profile;
