//! Wire types for the Serper Maps API.

use serde::{Deserialize, Serialize};

/// Request body.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub q: &'a str,
}

/// Response body. Only the place list is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, alias = "maps")]
    pub places: Vec<RawPlace>,
}

/// One place as returned by the API. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    pub title: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    /// Google's own category, unused (leads take the search keyword).
    #[serde(rename = "type")]
    pub place_type: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_places_response() {
        let json = r#"{
            "searchParameters": {"q": "dentist in Austin", "type": "maps"},
            "places": [
                {
                    "position": 1,
                    "title": "Bright Smile Dental",
                    "address": "100 Congress Ave, Austin, TX",
                    "rating": 4.8,
                    "ratingCount": 212,
                    "type": "Dentist",
                    "website": "https://brightsmile.example/",
                    "phoneNumber": "(512) 555-0100"
                },
                {"position": 2, "title": "Walk-in Dental"}
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.places.len(), 2);

        let first = &response.places[0];
        assert_eq!(first.title.as_deref(), Some("Bright Smile Dental"));
        assert_eq!(first.phone_number.as_deref(), Some("(512) 555-0100"));
        assert_eq!(first.rating_count, Some(212));

        let second = &response.places[1];
        assert!(second.website.is_none());
        assert!(second.rating.is_none());
    }

    #[test]
    fn test_parse_legacy_maps_key() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"maps": [{"title": "Joe's Pizza"}]}"#).unwrap();
        assert_eq!(response.places.len(), 1);
    }

    #[test]
    fn test_parse_empty_response() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.places.is_empty());
    }
}
