//! Claude API integration for outreach drafts.
//!
//! Only the non-streaming Messages API is used: a draft is generated in one
//! request and returned whole.

mod client;
mod error;
mod types;

pub use client::ClaudeClient;
pub use error::ClaudeError;
pub use types::{ChatResponse, ContentBlock, Message, StopReason, Usage};
