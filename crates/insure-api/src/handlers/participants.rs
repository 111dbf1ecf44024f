//! Handlers for `/participants` endpoints (read-only).

use axum::{
  Json,
  extract::{Path, Query, State},
};
use insure_core::{
  notify::Notifier,
  policy::{Participant, ParticipantFilter, ParticipantId, ParticipantReportRow},
};

use crate::{AppState, Backend, auth::Authenticated, error::ApiError, services::participants};

/// `GET /participants[?insurance_id=<id>&role=policy_holder|insured]`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Query(filter): Query<ParticipantFilter>,
) -> Result<Json<Vec<Participant>>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(participants::list(&state, &caller, filter).await?))
}

/// `GET /participants/{id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<ParticipantId>,
) -> Result<Json<Participant>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(participants::details(&state, &caller, id).await?))
}

/// `GET /participants/report`
pub async fn report<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Vec<ParticipantReportRow>>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(participants::report(&state, &caller).await?))
}
