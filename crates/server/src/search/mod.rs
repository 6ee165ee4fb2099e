//! Google Maps search via the Serper API.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://google.serper.dev/maps`
//! - Authentication: `X-API-KEY` header
//! - Body: `{"q": "<keyword> in <location>"}`
//! - Response: `{"places": [...]}` (older accounts return `maps`)

mod client;
mod error;
mod normalize;
mod types;

pub use client::SerperClient;
pub use error::SearchError;
pub use normalize::{normalize_place, normalize_places};
pub use types::{RawPlace, SearchResponse};
