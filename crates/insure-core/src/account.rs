//! Identity accounts as seen by the core.
//!
//! Password hashes never leave the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::RoleSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub id:              Uuid,
  pub email:           String,
  pub full_name:       String,
  pub email_confirmed: bool,
  pub created_at:      DateTime<Utc>,
}

/// An account together with its current roles, for the admin user list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountWithRoles {
  #[serde(flatten)]
  pub account: Account,
  pub roles:   RoleSet,
}

/// How the new account's password is supplied.
#[derive(Debug, Clone)]
pub enum Credential {
  /// Plain text; hashed by the provider.
  Password(String),
  /// A pre-computed argon2 PHC string (used for the bootstrap admin).
  Hash(String),
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:           String,
  pub full_name:       String,
  pub credential:      Credential,
  /// Seeded accounts skip the confirmation round-trip.
  pub email_confirmed: bool,
}

#[derive(Debug, Clone)]
pub enum CreateAccountOutcome {
  Created(Account),
  EmailTaken,
}

/// What a one-time token authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TokenPurpose {
  ConfirmEmail,
  ResetPassword,
}
