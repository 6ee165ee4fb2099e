//! AutoLead Core - Shared domain types.
//!
//! This crate provides the types shared by every AutoLead component:
//! - `server` - JSON API for search, enrichment, drafting and outreach
//! - `cli` - Command-line tools for migrations and profile management
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email addresses and lead/run status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
