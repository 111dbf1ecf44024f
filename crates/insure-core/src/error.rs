//! Error types for `insure-core`.

use serde::Serialize;
use thiserror::Error;

use crate::validate::ValidationErrors;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Person,
  Insurance,
  Participant,
  Claim,
  Account,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("{entity} {id} not found")]
  NotFound { entity: Entity, id: String },

  /// A non-privileged caller has no profile through which to see records.
  #[error("no accessible profile for the caller")]
  Unauthorized,

  #[error("operation requires {0} access")]
  Forbidden(&'static str),

  #[error("{entity} {id} was modified concurrently")]
  ConcurrencyConflict { entity: Entity, id: String },

  #[error("{entity} {id} is still referenced by {dependents}")]
  ReferentialIntegrity {
    entity:     Entity,
    id:         String,
    dependents: String,
  },

  #[error("invalid or expired token")]
  InvalidToken,

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("an account with email {0:?} already exists")]
  EmailTaken(String),

  #[error("notification to {to} failed: {source}")]
  Notification {
    to:     String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  pub fn not_found(entity: Entity, id: impl ToString) -> Self {
    Self::NotFound { entity, id: id.to_string() }
  }

  pub fn conflict(entity: Entity, id: impl ToString) -> Self {
    Self::ConcurrencyConflict { entity, id: id.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
