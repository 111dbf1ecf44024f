//! Claims and their status lifecycle.
//!
//! Status is server-authoritative on creation (always [`ClaimStatus::New`]).
//! Afterwards it changes only through an explicit edit, checked against the
//! configured [`TransitionPolicy`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  person::PersonId,
  policy::InsuranceId,
  validate::{MAX_DESCRIPTION_LEN, ValidationErrors},
};

pub type ClaimId = i64;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ClaimStatus {
  #[default]
  New,
  InProgress,
  Complete,
}

impl ClaimStatus {
  fn rank(self) -> u8 {
    match self {
      Self::New => 0,
      Self::InProgress => 1,
      Self::Complete => 2,
    }
  }
}

/// Which status changes an edit may make.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
  /// Any status may move to any other, backwards included.
  #[default]
  Free,
  /// Status may only advance: New → InProgress → Complete (skipping allowed).
  ForwardOnly,
}

impl TransitionPolicy {
  pub fn permits(self, from: ClaimStatus, to: ClaimStatus) -> bool {
    match self {
      Self::Free => true,
      Self::ForwardOnly => to.rank() >= from.rank(),
    }
  }

  pub fn check(self, from: ClaimStatus, to: ClaimStatus) -> Result<()> {
    if self.permits(from, to) {
      return Ok(());
    }
    let mut errors = ValidationErrors::new();
    errors.push("status", format!("cannot change from {from} to {to}"));
    errors.into_result()
  }
}

// ─── Claim ───────────────────────────────────────────────────────────────────

/// A persisted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
  pub id:               ClaimId,
  pub description:      String,
  pub occurred_on:      NaiveDate,
  pub estimated_damage: Decimal,
  pub status:           ClaimStatus,
  pub insurance_id:     InsuranceId,
  /// The claimant: the owner of the insurance when the claim was filed.
  pub person_id:        PersonId,
  pub version:          i64,
}

/// Caller-supplied fields for a new claim.
///
/// `status` is accepted for wire compatibility but ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
  pub insurance_id:     InsuranceId,
  pub description:      String,
  pub occurred_on:      NaiveDate,
  pub estimated_damage: Decimal,
  #[serde(default)]
  pub status:           Option<ClaimStatus>,
}

/// A validated claim ready to be written; status is always `New`.
#[derive(Debug, Clone)]
pub struct ClaimRecord {
  pub insurance_id:     InsuranceId,
  pub person_id:        PersonId,
  pub description:      String,
  pub occurred_on:      NaiveDate,
  pub estimated_damage: Decimal,
}

/// Fields an edit may overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimUpdate {
  pub description:      String,
  pub occurred_on:      NaiveDate,
  pub estimated_damage: Decimal,
  pub status:           ClaimStatus,
}

/// The pre- and post-edit state of a claim, read and written in one unit of
/// work.
#[derive(Debug, Clone)]
pub struct ClaimEdit {
  pub before: Claim,
  pub after:  Claim,
}

impl ClaimEdit {
  pub fn status_changed(&self) -> bool { self.before.status != self.after.status }
}

/// Validate the mutable claim fields against `today`.
pub fn check_fields(
  errors: &mut ValidationErrors,
  description: &str,
  occurred_on: NaiveDate,
  estimated_damage: Decimal,
  today: NaiveDate,
) {
  errors.require_text("description", description, MAX_DESCRIPTION_LEN);
  if occurred_on > today {
    errors.push("occurred_on", "cannot be in the future");
  }
  if estimated_damage < Decimal::ZERO {
    errors.push("estimated_damage", "must not be negative");
  }
}

impl NewClaim {
  pub fn validate(&self, today: NaiveDate) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_fields(
      &mut errors,
      &self.description,
      self.occurred_on,
      self.estimated_damage,
      today,
    );
    errors.into_result()
  }
}

impl ClaimUpdate {
  pub fn validate(&self, today: NaiveDate) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_fields(
      &mut errors,
      &self.description,
      self.occurred_on,
      self.estimated_damage,
      today,
    );
    errors.into_result()
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn free_policy_allows_everything() {
    for from in ClaimStatus::iter() {
      for to in ClaimStatus::iter() {
        assert!(TransitionPolicy::Free.permits(from, to));
      }
    }
  }

  #[test]
  fn forward_only_blocks_backwards() {
    use ClaimStatus::*;
    let p = TransitionPolicy::ForwardOnly;
    assert!(p.permits(New, InProgress));
    assert!(p.permits(New, Complete));
    assert!(p.permits(InProgress, InProgress));
    assert!(!p.permits(Complete, New));
    assert!(!p.permits(InProgress, New));
    assert!(p.check(Complete, InProgress).is_err());
  }

  #[test]
  fn future_and_negative_rejected() {
    let claim = NewClaim {
      insurance_id:     1,
      description:      "Burst pipe".into(),
      occurred_on:      day(2025, 6, 2),
      estimated_damage: Decimal::new(-1, 0),
      status:           Some(ClaimStatus::Complete),
    };
    let err = claim.validate(day(2025, 6, 1)).unwrap_err();
    let crate::Error::Validation(errors) = err else { panic!("expected validation error") };
    assert!(errors.has("occurred_on"));
    assert!(errors.has("estimated_damage"));
  }

  #[test]
  fn today_and_zero_damage_accepted() {
    let update = ClaimUpdate {
      description:      "Hail".into(),
      occurred_on:      day(2025, 6, 1),
      estimated_damage: Decimal::ZERO,
      status:           ClaimStatus::InProgress,
    };
    update.validate(day(2025, 6, 1)).unwrap();
  }

  #[test]
  fn column_encoding() {
    for s in ClaimStatus::iter() {
      assert_eq!(s.as_ref().parse::<ClaimStatus>().unwrap(), s);
    }
    assert_eq!(ClaimStatus::InProgress.as_ref(), "in_progress");
    assert!("InProgress".parse::<ClaimStatus>().is_err());
  }
}
