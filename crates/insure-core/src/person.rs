//! The insured-person profile, optionally linked to a login identity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  validate::{MAX_NAME_LEN, MAX_POST_CODE_LEN, ValidationErrors, check_phone},
};

pub type PersonId = i64;

/// Contact and personal data owned by the person (or by staff on their
/// behalf). The identity link is deliberately not part of the profile so no
/// update path can repoint it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProfile {
  pub full_name:     String,
  pub date_of_birth: NaiveDate,
  #[serde(default)]
  pub phone:         String,
  #[serde(default)]
  pub street:        String,
  #[serde(default)]
  pub city:          String,
  #[serde(default)]
  pub country:       String,
  #[serde(default)]
  pub post_code:     String,
}

impl PersonProfile {
  pub fn check(&self, errors: &mut ValidationErrors) {
    errors.require_text("full_name", &self.full_name, MAX_NAME_LEN);
    errors.limit_text("street", &self.street, MAX_NAME_LEN);
    errors.limit_text("city", &self.city, MAX_NAME_LEN);
    errors.limit_text("country", &self.country, MAX_NAME_LEN);
    errors.limit_text("post_code", &self.post_code, MAX_POST_CODE_LEN);
    check_phone(errors, "phone", &self.phone);
  }

  pub fn validate(&self) -> Result<()> {
    let mut errors = ValidationErrors::new();
    self.check(&mut errors);
    errors.into_result()
  }
}

/// A persisted person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:          PersonId,
  #[serde(flatten)]
  pub profile:     PersonProfile,
  /// The linked identity account; `None` for staff-created records whose
  /// owner has not registered.
  pub identity_id: Option<Uuid>,
  /// Optimistic-concurrency token, bumped on every write.
  pub version:     i64,
}
