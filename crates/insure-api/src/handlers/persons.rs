//! Handlers for `/persons` endpoints.
//!
//! | Method   | Path            | Notes |
//! |----------|-----------------|-------|
//! | `GET`    | `/persons`      | Scoped to the caller |
//! | `POST`   | `/persons`      | Staff only; profile + `email` + `password` |
//! | `GET`    | `/persons/me`   | The caller's own profile |
//! | `GET`    | `/persons/{id}` | 404 if missing or out of scope |
//! | `PUT`    | `/persons/{id}` | Owner or staff; optional `version` |
//! | `DELETE` | `/persons/{id}` | Staff only; returns the executed deletion plan |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use insure_core::{
  cascade::DeletionPlan,
  notify::Notifier,
  person::{Person, PersonId},
};

use crate::{
  AppState, Backend,
  auth::Authenticated,
  error::ApiError,
  services::persons::{self, PersonUpdate, RegisterRequest},
};

/// `GET /persons`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Person>>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(persons::list(&state, &caller).await?))
}

/// `POST /persons`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  let person = persons::staff_create(&state, &caller, body).await?;
  Ok((StatusCode::CREATED, Json(person)))
}

/// `GET /persons/me`
pub async fn me<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Person>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(persons::me(&state, &caller).await?))
}

/// `GET /persons/{id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<PersonId>,
) -> Result<Json<Person>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(persons::details(&state, &caller, id).await?))
}

/// `PUT /persons/{id}`
pub async fn update<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<PersonId>,
  Json(body): Json<PersonUpdate>,
) -> Result<Json<Person>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(persons::update(&state, &caller, id, body).await?))
}

/// `DELETE /persons/{id}`
pub async fn delete<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<PersonId>,
) -> Result<Json<DeletionPlan>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(persons::delete(&state, &caller, id).await?))
}
