//! Policy registry.

use insure_core::{
  Entity, Error,
  person::PersonId,
  policy::{InsuranceId, InsuranceInput, PolicyDetail, PolicyRecord},
  role::Caller,
  store::{DeleteOutcome, UpdateOutcome},
  validate::ValidationErrors,
};
use serde::{Deserialize, Serialize};

use super::resolve_scope;
use crate::{AppState, Backend, error::ApiError};

/// Policy edit with an optional concurrency token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyUpdate {
  #[serde(flatten)]
  pub input:   InsuranceInput,
  #[serde(default)]
  pub version: Option<i64>,
}

/// Field checks plus existence of every referenced person.
async fn validate_input<S: Backend>(store: &S, input: &InsuranceInput) -> Result<(), ApiError> {
  let mut errors = ValidationErrors::new();
  input.check(&mut errors);

  let missing: Vec<PersonId> = store
    .missing_persons(input.person_ids())
    .await
    .map_err(ApiError::store)?;
  if missing.contains(&input.policy_holder_id) {
    errors.push("policy_holder_id", format!("person {} does not exist", input.policy_holder_id));
  }
  let unknown_insured: Vec<String> = input
    .insured_person_ids
    .iter()
    .filter(|id| missing.contains(*id))
    .map(ToString::to_string)
    .collect();
  if !unknown_insured.is_empty() {
    errors.push(
      "insured_person_ids",
      format!("unknown persons: {}", unknown_insured.join(", ")),
    );
  }

  Ok(errors.into_result()?)
}

// ─── Read ────────────────────────────────────────────────────────────────────

pub async fn list<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
) -> Result<Vec<PolicyRecord>, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  state
    .store
    .list_policies(scope.owner())
    .await
    .map_err(ApiError::store)
}

/// The policy with its participants and the claims the caller may see.
pub async fn details<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: InsuranceId,
) -> Result<PolicyDetail, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  let record = state
    .store
    .get_policy(id)
    .await
    .map_err(ApiError::store)?
    .filter(|r| scope.permits(r.insurance.person_id))
    .ok_or_else(|| Error::not_found(Entity::Insurance, id))?;

  let claims = state
    .store
    .list_claims(scope.owner(), Some(id))
    .await
    .map_err(ApiError::store)?;

  Ok(PolicyDetail { record, claims })
}

// ─── Write ───────────────────────────────────────────────────────────────────

pub async fn create<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  input: InsuranceInput,
) -> Result<PolicyRecord, ApiError>
where
  S: Backend,
{
  caller.require_staff()?;
  validate_input(state.store.as_ref(), &input).await?;

  let record = state
    .store
    .create_insurance(input)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    insurance_id = record.insurance.id,
    holder = record.insurance.person_id,
    participants = record.participants.len(),
    "policy created",
  );
  Ok(record)
}

pub async fn update<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: InsuranceId,
  update: PolicyUpdate,
) -> Result<PolicyRecord, ApiError>
where
  S: Backend,
{
  caller.require_staff()?;
  validate_input(state.store.as_ref(), &update.input).await?;

  let expected = match update.version {
    Some(v) => v,
    None => {
      state
        .store
        .get_policy(id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| Error::not_found(Entity::Insurance, id))?
        .insurance
        .version
    }
  };

  match state
    .store
    .update_insurance(id, update.input, expected)
    .await
    .map_err(ApiError::store)?
  {
    UpdateOutcome::Updated(record) => {
      tracing::info!(
        insurance_id = id,
        version = record.insurance.version,
        "policy updated",
      );
      Ok(record)
    }
    UpdateOutcome::Missing => Err(Error::not_found(Entity::Insurance, id).into()),
    UpdateOutcome::Conflict => Err(Error::conflict(Entity::Insurance, id).into()),
  }
}

/// Delete the insurance row. Refused while claims or participants still
/// reference it, which in practice is always: the PolicyHolder participant
/// is created with the policy and nothing removes it short of the owner's
/// person cascade.
pub async fn delete<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: InsuranceId,
) -> Result<(), ApiError>
where
  S: Backend,
{
  caller.require_staff()?;

  match state
    .store
    .delete_insurance(id)
    .await
    .map_err(ApiError::store)?
  {
    DeleteOutcome::Deleted => {
      tracing::info!(insurance_id = id, "policy deleted");
      Ok(())
    }
    DeleteOutcome::Missing => Err(Error::not_found(Entity::Insurance, id).into()),
    DeleteOutcome::Referenced { claims, participants } => {
      Err(Error::ReferentialIntegrity {
        entity:     Entity::Insurance,
        id:         id.to_string(),
        dependents: format!("{claims} claim(s) and {participants} participant(s)"),
      }
      .into())
    }
  }
}
