//! Raw place → lead draft.

use autolead_core::{LeadStatus, NO_EMAIL};

use super::types::RawPlace;
use crate::models::NewLead;

pub const UNKNOWN_BUSINESS: &str = "Unknown Business";
pub const NO_ADDRESS: &str = "No Address";
pub const NO_PHONE: &str = "No Phone";

/// Map a raw search result to a lead draft, filling placeholders for
/// missing fields. `keyword` becomes the lead's category.
#[must_use]
pub fn normalize_place(place: &RawPlace, keyword: &str) -> NewLead {
    NewLead {
        name: text_or(place.title.as_deref(), UNKNOWN_BUSINESS),
        address: text_or(place.address.as_deref(), NO_ADDRESS),
        phone: text_or(place.phone_number.as_deref(), NO_PHONE),
        website: text_or(place.website.as_deref(), ""),
        category: keyword.trim().to_string(),
        email: NO_EMAIL.to_string(),
        rating: place.rating.filter(|r| r.is_finite() && *r >= 0.0).unwrap_or(0.0),
        review_count: place
            .rating_count
            .and_then(|n| i32::try_from(n).ok())
            .filter(|n| *n >= 0)
            .unwrap_or(0),
        status: LeadStatus::New,
    }
}

/// Normalize a whole result list, keeping order.
#[must_use]
pub fn normalize_places(places: &[RawPlace], keyword: &str) -> Vec<NewLead> {
    places.iter().map(|p| normalize_place(p, keyword)).collect()
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
