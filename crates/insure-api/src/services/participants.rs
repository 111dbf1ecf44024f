//! Read-only participant views. Participants change only through policy
//! create and update.

use insure_core::{
  Entity, Error,
  policy::{Participant, ParticipantFilter, ParticipantId, ParticipantReportRow},
  role::Caller,
  scope::Scope,
};

use super::resolve_scope;
use crate::{AppState, Backend, error::ApiError};

/// Participants of policies the caller may see.
pub async fn list<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  filter: ParticipantFilter,
) -> Result<Vec<Participant>, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  let participants = state
    .store
    .list_participants(filter)
    .await
    .map_err(ApiError::store)?;

  match scope {
    Scope::All => Ok(participants),
    Scope::Owner(_) => {
      let visible: Vec<_> = state
        .store
        .list_policies(scope.owner())
        .await
        .map_err(ApiError::store)?
        .into_iter()
        .map(|r| r.insurance.id)
        .collect();
      Ok(
        participants
          .into_iter()
          .filter(|p| visible.contains(&p.insurance_id))
          .collect(),
      )
    }
  }
}

pub async fn details<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: ParticipantId,
) -> Result<Participant, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  let participant = state
    .store
    .get_participant(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found(Entity::Participant, id))?;

  if let Scope::Owner(_) = scope {
    let owner = state
      .store
      .get_policy(participant.insurance_id)
      .await
      .map_err(ApiError::store)?
      .map(|r| r.insurance.person_id);
    if !owner.is_some_and(|o| scope.permits(o)) {
      return Err(Error::not_found(Entity::Participant, id).into());
    }
  }
  Ok(participant)
}

/// Per-policy participant counts. Staff only.
pub async fn report<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
) -> Result<Vec<ParticipantReportRow>, ApiError>
where
  S: Backend,
{
  caller.require_staff()?;
  state
    .store
    .participant_report()
    .await
    .map_err(ApiError::store)
}
