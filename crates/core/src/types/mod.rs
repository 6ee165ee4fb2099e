//! Core types for AutoLead.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod status;

pub use email::{Email, EmailError, NO_EMAIL, usable_recipient};
pub use id::*;
pub use status::*;
