//! SQLite backend for the insurance service.
//!
//! One [`SqliteStore`] implements every persistence-facing trait in
//! `insure-core`: the domain store, the identity provider, and an outbox
//! notifier. Access goes through [`tokio_rusqlite`] so queries run on a
//! dedicated thread without blocking the async runtime, and every multi-row
//! write is a single SQLite transaction.

mod encode;
mod identity;
mod outbox;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use outbox::OutboxMessage;
pub use store::SqliteStore;
