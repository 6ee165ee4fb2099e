//! Lead domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autolead_core::{LeadId, LeadStatus, NO_EMAIL, UserId};

/// A stored lead (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Lead {
    pub id: LeadId,
    pub user_id: UserId,
    pub name: String,
    pub address: String,
    pub phone: String,
    /// Empty when the business lists no website.
    pub website: String,
    /// The search keyword that produced this lead.
    pub category: String,
    /// Discovered address, guessed `info@` address, or `"N/A"`.
    pub email: String,
    pub rating: f64,
    pub review_count: i32,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
}

/// A normalized search result that has not been stored yet.
///
/// Returned by `/api/search` and accepted back by `POST /api/leads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub website: String,
    pub category: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i32,
    /// Always New when stored; clients cannot pick a status.
    #[serde(skip_deserializing)]
    pub status: LeadStatus,
}

fn default_email() -> String {
    NO_EMAIL.to_string()
}

/// Result of enriching one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub email: String,
    pub status: LeadStatus,
}

impl Enrichment {
    /// The lead has no website to look at.
    #[must_use]
    pub fn no_website() -> Self {
        Self {
            email: NO_EMAIL.to_string(),
            status: LeadStatus::NoWebsite,
        }
    }

    /// An address was found on the lead's website.
    #[must_use]
    pub const fn discovered(email: String) -> Self {
        Self {
            email,
            status: LeadStatus::Enriched,
        }
    }

    /// Nothing was found; `email` is a synthesized guess.
    #[must_use]
    pub const fn guessed(email: String) -> Self {
        Self {
            email,
            status: LeadStatus::NotFound,
        }
    }
}

/// Lead counts for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    /// Leads whose status is Contacted or Opened.
    pub contacted: i64,
    /// Rounded percentage of contacted over total.
    pub conversion: i64,
    pub growth: Vec<DailyCount>,
}

/// Number of leads created on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

impl DashboardStats {
    /// Assemble stats from raw counts. `growth` is expected oldest first.
    #[must_use]
    pub fn new(total: i64, contacted: i64, growth: Vec<DailyCount>) -> Self {
        Self {
            total,
            contacted,
            conversion: conversion_percent(contacted, total),
            growth,
        }
    }
}

/// `contacted / total` as a rounded percentage, 0 for an empty table.
#[must_use]
pub fn conversion_percent(contacted: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    // Integer rounding: (2c * 100 + t) / 2t
    (contacted * 200 + total) / (total * 2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_percent_rounds() {
        assert_eq!(conversion_percent(0, 0), 0);
        assert_eq!(conversion_percent(1, 3), 33);
        assert_eq!(conversion_percent(2, 3), 67);
        assert_eq!(conversion_percent(1, 8), 13);
        assert_eq!(conversion_percent(5, 5), 100);
    }

    #[test]
    fn test_new_lead_defaults_when_deserialized() {
        let lead: NewLead = serde_json::from_str(
            r#"{"name":"Rosa's Bakery","address":"1 Main St","phone":"No Phone","category":"bakery"}"#,
        )
        .unwrap();
        assert_eq!(lead.email, "N/A");
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.website.is_empty());
        assert_eq!(lead.review_count, 0);
    }

    #[test]
    fn test_new_lead_ignores_submitted_status() {
        let lead: NewLead = serde_json::from_str(
            r#"{"name":"Rosa's Bakery","address":"1 Main St","phone":"No Phone","category":"bakery","status":"Opened"}"#,
        )
        .unwrap();
        assert_eq!(lead.status, LeadStatus::New);

        let lead: NewLead = serde_json::from_str(
            r#"{"name":"Rosa's Bakery","address":"1 Main St","phone":"No Phone","category":"bakery","status":"Contacted"}"#,
        )
        .unwrap();
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_new_lead_still_serializes_status() {
        let lead: NewLead = serde_json::from_str(
            r#"{"name":"Rosa's Bakery","address":"1 Main St","phone":"No Phone","category":"bakery"}"#,
        )
        .unwrap();
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["status"], "New");
    }

    #[test]
    fn test_enrichment_statuses() {
        assert_eq!(Enrichment::no_website().status, LeadStatus::NoWebsite);
        assert_eq!(Enrichment::no_website().email, "N/A");
        assert_eq!(
            Enrichment::discovered("a@b.co".into()).status,
            LeadStatus::Enriched
        );
        assert_eq!(
            Enrichment::guessed("info@b.co".into()).status,
            LeadStatus::NotFound
        );
    }

    #[test]
    fn test_lead_status_serializes_as_label() {
        let json = serde_json::to_value(Enrichment::guessed("info@b.co".into())).unwrap();
        assert_eq!(json["status"], "Not Found");
    }
}
