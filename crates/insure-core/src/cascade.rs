//! Dependency-ordered deletion of a person and everything that references it.
//!
//! Every foreign key in the store is `RESTRICT`, so rows must be removed
//! leaf-first: claims and participants, then insurances, then the person,
//! then the linked identity account. The plan is computed here from a
//! snapshot of the person's graph and executed by the store inside a single
//! transaction.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  claim::ClaimId,
  person::PersonId,
  policy::{InsuranceId, ParticipantId},
};

/// An insurance owned by the person being deleted, with every row that
/// references it (regardless of which person those rows belong to).
#[derive(Debug, Clone, Default)]
pub struct OwnedPolicy {
  pub insurance_id:    InsuranceId,
  pub claim_ids:       Vec<ClaimId>,
  pub participant_ids: Vec<ParticipantId>,
}

/// Snapshot of everything that references a person.
#[derive(Debug, Clone)]
pub struct PersonGraph {
  pub person_id:        PersonId,
  pub identity_id:      Option<Uuid>,
  pub owned_policies:   Vec<OwnedPolicy>,
  /// Claims filed by the person, including ones on policies they don't own.
  pub own_claims:       Vec<ClaimId>,
  /// The person's participations, including ones on foreign policies.
  pub own_participants: Vec<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "ids", rename_all = "snake_case")]
pub enum DeletionStep {
  Claims(Vec<ClaimId>),
  Participants(Vec<ParticipantId>),
  Insurances(Vec<InsuranceId>),
  Person(PersonId),
  Account(Uuid),
}

/// The ordered list of deletes that removes a person without tripping a
/// foreign-key constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
  pub steps: Vec<DeletionStep>,
}

impl DeletionPlan {
  pub fn for_person(graph: &PersonGraph) -> Self {
    let mut steps = Vec::new();
    let mut gone_claims: HashSet<ClaimId> = HashSet::new();
    let mut gone_participants: HashSet<ParticipantId> = HashSet::new();

    for policy in &graph.owned_policies {
      if !policy.claim_ids.is_empty() {
        gone_claims.extend(&policy.claim_ids);
        steps.push(DeletionStep::Claims(policy.claim_ids.clone()));
      }
      if !policy.participant_ids.is_empty() {
        gone_participants.extend(&policy.participant_ids);
        steps.push(DeletionStep::Participants(policy.participant_ids.clone()));
      }
    }

    if !graph.owned_policies.is_empty() {
      steps.push(DeletionStep::Insurances(
        graph.owned_policies.iter().map(|p| p.insurance_id).collect(),
      ));
    }

    // Second pass: rows the person holds on policies owned by someone else.
    let claims: Vec<ClaimId> = graph
      .own_claims
      .iter()
      .copied()
      .filter(|id| !gone_claims.contains(id))
      .collect();
    if !claims.is_empty() {
      steps.push(DeletionStep::Claims(claims));
    }

    let participants: Vec<ParticipantId> = graph
      .own_participants
      .iter()
      .copied()
      .filter(|id| !gone_participants.contains(id))
      .collect();
    if !participants.is_empty() {
      steps.push(DeletionStep::Participants(participants));
    }

    steps.push(DeletionStep::Person(graph.person_id));
    if let Some(identity) = graph.identity_id {
      steps.push(DeletionStep::Account(identity));
    }

    Self { steps }
  }
}
