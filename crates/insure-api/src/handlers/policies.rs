//! Handlers for `/policies` endpoints.
//!
//! | Method   | Path             | Notes |
//! |----------|------------------|-------|
//! | `GET`    | `/policies`      | Scoped to the caller |
//! | `POST`   | `/policies`      | Staff only |
//! | `GET`    | `/policies/{id}` | Policy, participants and visible claims |
//! | `PUT`    | `/policies/{id}` | Staff only; optional `version` |
//! | `DELETE` | `/policies/{id}` | Staff only; 409 while referenced, see below |
//!
//! Every policy keeps its PolicyHolder participant and no endpoint removes
//! participants, so `DELETE /policies/{id}` answers 409 for every existing
//! policy. Policies go away through the person cascade
//! (`DELETE /persons/{id}` on the owner).

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use insure_core::{
  notify::Notifier,
  policy::{InsuranceId, InsuranceInput, PolicyDetail, PolicyRecord},
};

use crate::{
  AppState, Backend,
  auth::Authenticated,
  error::ApiError,
  services::policies::{self, PolicyUpdate},
};

/// `GET /policies`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Vec<PolicyRecord>>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(policies::list(&state, &caller).await?))
}

/// `POST /policies`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<InsuranceInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  let record = policies::create(&state, &caller, body).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /policies/{id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<InsuranceId>,
) -> Result<Json<PolicyDetail>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(policies::details(&state, &caller, id).await?))
}

/// `PUT /policies/{id}`
pub async fn update<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<InsuranceId>,
  Json(body): Json<PolicyUpdate>,
) -> Result<Json<PolicyRecord>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(policies::update(&state, &caller, id, body).await?))
}

/// `DELETE /policies/{id}`
///
/// Always 409 for an existing policy, since its holder participant still
/// references it.
pub async fn delete<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<InsuranceId>,
) -> Result<StatusCode, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  policies::delete(&state, &caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
