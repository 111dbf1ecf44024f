//! Insurance policies and their participants.
//!
//! Every insurance has exactly one `PolicyHolder` participant and any number
//! of `Insured` participants. Storage does not enforce that invariant; the
//! write paths here do. Creation always writes the holder, and
//! [`ParticipantPlan`] is the only way an update may touch it.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  claim::Claim,
  person::{Person, PersonId},
  validate::{MAX_NAME_LEN, ValidationErrors},
};

pub type InsuranceId = i64;
pub type ParticipantId = i64;

/// Inclusive bounds on the insured amount.
pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 1_000_000;

// ─── Participants ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParticipantRole {
  PolicyHolder,
  Insured,
}

/// The join between an insurance and a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
  pub id:           ParticipantId,
  pub role:         ParticipantRole,
  pub insurance_id: InsuranceId,
  pub person_id:    PersonId,
}

/// Filter for participant listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ParticipantFilter {
  pub insurance_id: Option<InsuranceId>,
  pub role:         Option<ParticipantRole>,
}

/// One row of the per-policy participant report, grouped by insurance name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantReportRow {
  pub insurance_name:       String,
  pub total_participants:   u64,
  pub total_insured:        u64,
  pub total_policy_holders: u64,
}

// ─── Insurance ───────────────────────────────────────────────────────────────

/// A persisted insurance policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
  pub id:         InsuranceId,
  pub name:       String,
  /// What is insured (a house, a car, ...).
  pub subject:    String,
  pub amount:     i64,
  pub valid_from: NaiveDate,
  pub valid_to:   NaiveDate,
  /// The owning person; always the current policy holder.
  pub person_id:  PersonId,
  pub version:    i64,
}

/// Input to policy creation and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceInput {
  pub name:               String,
  pub subject:            String,
  pub amount:             i64,
  pub valid_from:         NaiveDate,
  pub valid_to:           NaiveDate,
  pub policy_holder_id:   PersonId,
  #[serde(default)]
  pub insured_person_ids: Vec<PersonId>,
}

impl InsuranceInput {
  pub fn check(&self, errors: &mut ValidationErrors) {
    errors.require_text("name", &self.name, MAX_NAME_LEN);
    errors.require_text("subject", &self.subject, MAX_NAME_LEN);
    if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&self.amount) {
      errors.push(
        "amount",
        format!("must be between {MIN_AMOUNT} and {MAX_AMOUNT}"),
      );
    }
    if self.valid_to < self.valid_from {
      errors.push("valid_to", "must not precede valid_from");
    }
  }

  pub fn validate(&self) -> Result<()> {
    let mut errors = ValidationErrors::new();
    self.check(&mut errors);
    errors.into_result()
  }

  /// Every person id referenced by this input, holder first.
  pub fn person_ids(&self) -> Vec<PersonId> {
    let mut ids = Vec::with_capacity(1 + self.insured_person_ids.len());
    ids.push(self.policy_holder_id);
    ids.extend(&self.insured_person_ids);
    ids
  }
}

/// An insurance with its owner and participants loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
  #[serde(flatten)]
  pub insurance:    Insurance,
  pub owner:        Person,
  pub participants: Vec<Participant>,
}

impl PolicyRecord {
  pub fn policy_holder(&self) -> Option<&Participant> {
    self
      .participants
      .iter()
      .find(|p| p.role == ParticipantRole::PolicyHolder)
  }

  pub fn insured(&self) -> impl Iterator<Item = &Participant> {
    self
      .participants
      .iter()
      .filter(|p| p.role == ParticipantRole::Insured)
  }
}

/// A policy as shown on its detail page: the record plus its claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDetail {
  #[serde(flatten)]
  pub record: PolicyRecord,
  pub claims: Vec<Claim>,
}

// ─── Participant plan ────────────────────────────────────────────────────────

/// What to do with the policy-holder participant on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderChange {
  Unchanged,
  /// Point the existing holder participant at another person.
  Repoint {
    participant: ParticipantId,
    to:          PersonId,
  },
  /// No holder participant exists yet; create one.
  Create(PersonId),
}

/// The participant rows an update must add, remove, or repoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantPlan {
  pub holder:         HolderChange,
  /// Insured participants whose person is no longer listed.
  pub remove_insured: Vec<ParticipantId>,
  /// Persons newly listed as insured, in request order, deduplicated.
  pub add_insured:    Vec<PersonId>,
}

impl ParticipantPlan {
  /// Diff the existing participants of one insurance against the requested
  /// holder and insured set. Insured participants whose person stays listed
  /// are left untouched so their ids survive.
  pub fn compute(
    existing: &[Participant],
    holder_id: PersonId,
    insured_ids: &[PersonId],
  ) -> Self {
    let holder = match existing
      .iter()
      .find(|p| p.role == ParticipantRole::PolicyHolder)
    {
      Some(p) if p.person_id == holder_id => HolderChange::Unchanged,
      Some(p) => HolderChange::Repoint { participant: p.id, to: holder_id },
      None => HolderChange::Create(holder_id),
    };

    let requested: HashSet<PersonId> = insured_ids.iter().copied().collect();
    let insured: Vec<&Participant> = existing
      .iter()
      .filter(|p| p.role == ParticipantRole::Insured)
      .collect();

    let remove_insured = insured
      .iter()
      .filter(|p| !requested.contains(&p.person_id))
      .map(|p| p.id)
      .collect();

    let mut seen: HashSet<PersonId> = insured.iter().map(|p| p.person_id).collect();
    let add_insured = insured_ids
      .iter()
      .copied()
      .filter(|id| seen.insert(*id))
      .collect();

    Self { holder, remove_insured, add_insured }
  }

  pub fn is_noop(&self) -> bool {
    self.holder == HolderChange::Unchanged
      && self.remove_insured.is_empty()
      && self.add_insured.is_empty()
  }
}
