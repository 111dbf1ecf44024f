//! Core types and trait definitions for the insurance policy service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the access-scope rules, the participant and claim
//! lifecycle logic, and the traits that storage, identity, and notification
//! backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod cascade;
pub mod claim;
pub mod error;
pub mod notify;
pub mod person;
pub mod policy;
pub mod role;
pub mod scope;
pub mod store;
pub mod validate;

pub use error::{Entity, Error, Result};
