//! The `InsuranceStore` and `IdentityProvider` traits.
//!
//! Both are implemented by storage backends (e.g. `insure-store-sqlite`).
//! Higher layers (`insure-api`) depend on these abstractions, not on any
//! concrete backend.
//!
//! Infrastructure failures surface as `Self::Error`. Domain outcomes that a
//! caller is expected to branch on (a row vanished, a version moved, a delete
//! is blocked) are returned as typed outcome values instead.

use std::future::Future;

use uuid::Uuid;

use crate::{
  account::{Account, CreateAccountOutcome, NewAccount, TokenPurpose},
  cascade::DeletionPlan,
  claim::{Claim, ClaimEdit, ClaimId, ClaimRecord, ClaimUpdate},
  person::{Person, PersonId, PersonProfile},
  policy::{
    InsuranceId, InsuranceInput, Participant, ParticipantFilter, ParticipantId,
    ParticipantReportRow, PolicyRecord,
  },
  role::{Role, RoleSet},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of an optimistic-concurrency update.
#[derive(Debug, Clone)]
pub enum UpdateOutcome<T> {
  Updated(T),
  /// The row no longer exists.
  Missing,
  /// The row exists but its version no longer matches the expected one.
  Conflict,
}

/// Result of deleting a row guarded by `RESTRICT` foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted,
  Missing,
  /// Dependent rows still reference the target; nothing was deleted.
  Referenced { claims: u64, participants: u64 },
}

// ─── InsuranceStore ──────────────────────────────────────────────────────────

/// Persistence for persons, policies, participants, and claims.
///
/// Every method that writes more than one row does so atomically.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait InsuranceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Persons ───────────────────────────────────────────────────────────

  fn insert_person(
    &self,
    profile: PersonProfile,
    identity_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// The person linked to an identity account, if any.
  fn person_by_identity(
    &self,
    identity_id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// List persons; `owner` restricts the result to that single person.
  fn list_persons(
    &self,
    owner: Option<PersonId>,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Of `ids`, return those with no person row.
  fn missing_persons(
    &self,
    ids: Vec<PersonId>,
  ) -> impl Future<Output = Result<Vec<PersonId>, Self::Error>> + Send + '_;

  /// Overwrite the profile if the stored version equals `expected_version`.
  fn update_person(
    &self,
    id: PersonId,
    profile: PersonProfile,
    expected_version: i64,
  ) -> impl Future<Output = Result<UpdateOutcome<Person>, Self::Error>> + Send + '_;

  /// Delete a person and everything referencing it, including the linked
  /// identity account, in one transaction. Returns the executed plan, or
  /// `None` if the person does not exist.
  fn delete_person_cascade(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<DeletionPlan>, Self::Error>> + Send + '_;

  // ── Policies ──────────────────────────────────────────────────────────

  /// Insert the insurance, its policy-holder participant, and one insured
  /// participant per listed id, atomically.
  fn create_insurance(
    &self,
    input: InsuranceInput,
  ) -> impl Future<Output = Result<PolicyRecord, Self::Error>> + Send + '_;

  fn get_policy(
    &self,
    id: InsuranceId,
  ) -> impl Future<Output = Result<Option<PolicyRecord>, Self::Error>> + Send + '_;

  fn list_policies(
    &self,
    owner: Option<PersonId>,
  ) -> impl Future<Output = Result<Vec<PolicyRecord>, Self::Error>> + Send + '_;

  /// Overwrite scalar fields and apply the participant diff atomically.
  fn update_insurance(
    &self,
    id: InsuranceId,
    input: InsuranceInput,
    expected_version: i64,
  ) -> impl Future<Output = Result<UpdateOutcome<PolicyRecord>, Self::Error>> + Send + '_;

  /// Delete the insurance row only. Blocked while claims or participants
  /// reference it.
  fn delete_insurance(
    &self,
    id: InsuranceId,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  // ── Participants ──────────────────────────────────────────────────────

  fn list_participants(
    &self,
    filter: ParticipantFilter,
  ) -> impl Future<Output = Result<Vec<Participant>, Self::Error>> + Send + '_;

  fn get_participant(
    &self,
    id: ParticipantId,
  ) -> impl Future<Output = Result<Option<Participant>, Self::Error>> + Send + '_;

  fn participant_report(
    &self,
  ) -> impl Future<Output = Result<Vec<ParticipantReportRow>, Self::Error>> + Send + '_;

  // ── Claims ────────────────────────────────────────────────────────────

  /// Persist a new claim with status `New`.
  fn insert_claim(
    &self,
    record: ClaimRecord,
  ) -> impl Future<Output = Result<Claim, Self::Error>> + Send + '_;

  fn get_claim(
    &self,
    id: ClaimId,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  /// List claims, optionally restricted to one claimant and/or one policy.
  fn list_claims(
    &self,
    owner: Option<PersonId>,
    insurance: Option<InsuranceId>,
  ) -> impl Future<Output = Result<Vec<Claim>, Self::Error>> + Send + '_;

  /// Read the pre-edit snapshot and write the update in one transaction.
  fn update_claim(
    &self,
    id: ClaimId,
    update: ClaimUpdate,
    expected_version: i64,
  ) -> impl Future<Output = Result<UpdateOutcome<ClaimEdit>, Self::Error>> + Send + '_;

  /// Delete a claim. Returns `false` if it did not exist.
  fn delete_claim(
    &self,
    id: ClaimId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── IdentityProvider ────────────────────────────────────────────────────────

/// Login identities, roles, and one-time tokens.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Verify an email/password pair. Returns `None` on any mismatch.
  fn authenticate(
    &self,
    email: String,
    password: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn account_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn list_accounts(
    &self,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  fn create_account(
    &self,
    new: NewAccount,
  ) -> impl Future<Output = Result<CreateAccountOutcome, Self::Error>> + Send + '_;

  /// Delete an account with its roles and tokens. Returns `false` if absent.
  fn delete_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn roles_of(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<RoleSet, Self::Error>> + Send + '_;

  fn add_role(
    &self,
    id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Replace every role of the account with `roles`.
  fn set_roles(
    &self,
    id: Uuid,
    roles: RoleSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn accounts_in_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  /// Change the password if `old` verifies. Returns `false` otherwise.
  fn change_password(
    &self,
    id: Uuid,
    old: String,
    new: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Issue a fresh single-use token. The plain token is returned once and
  /// only its digest is stored.
  fn issue_token(
    &self,
    id: Uuid,
    purpose: TokenPurpose,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Redeem a confirm-email token. Returns `false` if it is invalid, used,
  /// or expired.
  fn confirm_email_with_token(
    &self,
    id: Uuid,
    token: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Redeem a reset-password token and set `new_password`.
  fn reset_password_with_token(
    &self,
    id: Uuid,
    token: String,
    new_password: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
