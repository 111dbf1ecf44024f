//! Axum handlers. Each one extracts its inputs, calls into
//! [`crate::services`], and picks the response status.

pub mod accounts;
pub mod admin;
pub mod claims;
pub mod participants;
pub mod persons;
pub mod policies;
