//! Claim lifecycle: filing, staff edits with status notifications, deletion.

use insure_core::{
  Entity, Error,
  claim::{Claim, ClaimId, ClaimRecord, ClaimStatus, ClaimUpdate, NewClaim},
  notify::{Message, Notifier},
  person::PersonId,
  policy::InsuranceId,
  role::{Caller, Role},
  store::UpdateOutcome,
};
use serde::{Deserialize, Serialize};

use super::{deliver, resolve_scope, today};
use crate::{AppState, Backend, error::ApiError};

/// Staff edit of a claim, with an optional concurrency token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEditRequest {
  #[serde(flatten)]
  pub update:  ClaimUpdate,
  #[serde(default)]
  pub version: Option<i64>,
}

/// Email of the account linked to `person_id`, if the person has one.
async fn contact_of<S: Backend>(store: &S, person_id: PersonId) -> Result<Option<String>, ApiError> {
  let Some(identity) = store
    .get_person(person_id)
    .await
    .map_err(ApiError::store)?
    .and_then(|p| p.identity_id)
  else {
    return Ok(None);
  };
  let account = store.account(identity).await.map_err(ApiError::store)?;
  Ok(account.map(|a| a.email))
}

async fn admin_emails<S: Backend>(store: &S) -> Result<Vec<String>, ApiError> {
  let admins = store
    .accounts_in_role(Role::Admin)
    .await
    .map_err(ApiError::store)?;
  Ok(admins.into_iter().map(|a| a.email).collect())
}

// ─── Read ────────────────────────────────────────────────────────────────────

pub async fn list<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  insurance: Option<InsuranceId>,
) -> Result<Vec<Claim>, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  state
    .store
    .list_claims(scope.owner(), insurance)
    .await
    .map_err(ApiError::store)
}

pub async fn details<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: ClaimId,
) -> Result<Claim, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  state
    .store
    .get_claim(id)
    .await
    .map_err(ApiError::store)?
    .filter(|c| scope.permits(c.person_id))
    .ok_or_else(|| Error::not_found(Entity::Claim, id).into())
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// File a claim against a policy in the caller's scope.
///
/// The claimant is the policy owner and the status always starts at
/// [`ClaimStatus::New`]. The claimant and every admin are notified.
pub async fn create<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  new: NewClaim,
) -> Result<Claim, ApiError>
where
  S: Backend,
  N: Notifier,
{
  new.validate(today())?;
  let scope = resolve_scope(state, caller).await?;

  let policy = state
    .store
    .get_policy(new.insurance_id)
    .await
    .map_err(ApiError::store)?
    .filter(|r| scope.permits(r.insurance.person_id))
    .ok_or_else(|| Error::not_found(Entity::Insurance, new.insurance_id))?;

  if new.status.is_some_and(|s| s != ClaimStatus::New) {
    tracing::debug!(requested = ?new.status, "ignoring client-supplied claim status");
  }

  let record = ClaimRecord {
    insurance_id:     policy.insurance.id,
    person_id:        policy.insurance.person_id,
    description:      new.description,
    occurred_on:      new.occurred_on,
    estimated_damage: new.estimated_damage,
  };
  let claim = state
    .store
    .insert_claim(record)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    claim_id = claim.id,
    insurance_id = claim.insurance_id,
    by = %caller.email,
    "claim filed",
  );

  if let Some(to) = contact_of(state.store.as_ref(), claim.person_id).await? {
    deliver(state, Message::claim_created(&to, &claim)).await?;
  }
  let customer = &policy.owner.profile.full_name;
  for to in admin_emails(state.store.as_ref()).await? {
    deliver(state, Message::claim_filed(&to, &claim, customer)).await?;
  }

  Ok(claim)
}

// ─── Edit ────────────────────────────────────────────────────────────────────

/// Staff edit. A status change notifies the claimant, and every admin when
/// the editor is an agent.
pub async fn edit<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: ClaimId,
  request: ClaimEditRequest,
) -> Result<Claim, ApiError>
where
  S: Backend,
  N: Notifier,
{
  caller.require_staff()?;
  let ClaimEditRequest { update, version } = request;
  update.validate(today())?;

  let current = state
    .store
    .get_claim(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found(Entity::Claim, id))?;
  state
    .settings
    .transition_policy
    .check(current.status, update.status)?;

  let expected = version.unwrap_or(current.version);
  let edit = match state
    .store
    .update_claim(id, update, expected)
    .await
    .map_err(ApiError::store)?
  {
    UpdateOutcome::Updated(edit) => edit,
    UpdateOutcome::Missing => return Err(Error::not_found(Entity::Claim, id).into()),
    UpdateOutcome::Conflict => return Err(Error::conflict(Entity::Claim, id).into()),
  };
  tracing::info!(
    claim_id = id,
    from = %edit.before.status,
    to = %edit.after.status,
    by = %caller.email,
    "claim updated",
  );

  if edit.status_changed() {
    let claim = &edit.after;
    if let Some(to) = contact_of(state.store.as_ref(), claim.person_id).await? {
      deliver(state, Message::claim_status_changed(&to, claim)).await?;
    }
    if caller.roles.contains(Role::Agent) {
      for to in admin_emails(state.store.as_ref()).await? {
        deliver(state, Message::claim_changed_by_agent(&to, &caller.full_name, claim)).await?;
      }
    }
  }

  Ok(edit.after)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// Staff only. Deleting a claim that is already gone succeeds.
pub async fn delete<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: ClaimId,
) -> Result<(), ApiError>
where
  S: Backend,
{
  caller.require_staff()?;
  let deleted = state
    .store
    .delete_claim(id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(claim_id = id, deleted, "claim delete");
  Ok(())
}
