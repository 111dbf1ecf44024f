//! Handlers for `/admin` endpoints. Admin role required.

use axum::{
  Json,
  extract::{Path, State},
};
use insure_core::{account::AccountWithRoles, notify::Notifier, role::Role};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Backend, auth::Authenticated, error::ApiError, services::admin};

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: Role,
}

/// `GET /admin/users`
pub async fn users<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Vec<AccountWithRoles>>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(admin::list_users(&state, &caller).await?))
}

/// `PUT /admin/users/{id}/role` with body `{"role":"Agent"}`
pub async fn change_role<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<RoleBody>,
) -> Result<Json<AccountWithRoles>, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(admin::change_role(&state, &caller, id, body.role).await?))
}
