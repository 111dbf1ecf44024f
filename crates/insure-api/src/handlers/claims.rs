//! Handlers for `/claims` endpoints.
//!
//! | Method   | Path           | Notes |
//! |----------|----------------|-------|
//! | `GET`    | `/claims`      | Optional `?insurance_id=` |
//! | `POST`   | `/claims`      | Status is always `New` |
//! | `GET`    | `/claims/{id}` | 404 if missing or out of scope |
//! | `PUT`    | `/claims/{id}` | Staff only; optional `version` |
//! | `DELETE` | `/claims/{id}` | Staff only; idempotent |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use insure_core::{
  claim::{Claim, ClaimId, NewClaim},
  notify::Notifier,
  policy::InsuranceId,
};
use serde::Deserialize;

use crate::{
  AppState, Backend,
  auth::Authenticated,
  error::ApiError,
  services::claims::{self, ClaimEditRequest},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub insurance_id: Option<InsuranceId>,
}

/// `GET /claims[?insurance_id=<id>]`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Claim>>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(claims::list(&state, &caller, params.insurance_id).await?))
}

/// `POST /claims`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewClaim>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  let claim = claims::create(&state, &caller, body).await?;
  Ok((StatusCode::CREATED, Json(claim)))
}

/// `GET /claims/{id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<ClaimId>,
) -> Result<Json<Claim>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(claims::details(&state, &caller, id).await?))
}

/// `PUT /claims/{id}`
pub async fn update<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<ClaimId>,
  Json(body): Json<ClaimEditRequest>,
) -> Result<Json<Claim>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(claims::edit(&state, &caller, id, body).await?))
}

/// `DELETE /claims/{id}`
pub async fn delete<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<ClaimId>,
) -> Result<StatusCode, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  claims::delete(&state, &caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
