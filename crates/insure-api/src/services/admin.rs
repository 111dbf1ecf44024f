//! User and role administration. Admin only.

use insure_core::{
  Entity, Error,
  account::AccountWithRoles,
  role::{Caller, Role},
};
use uuid::Uuid;

use crate::{AppState, Backend, error::ApiError};

pub async fn list_users<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
) -> Result<Vec<AccountWithRoles>, ApiError>
where
  S: Backend,
{
  caller.require_admin()?;

  let accounts = state.store.list_accounts().await.map_err(ApiError::store)?;
  let mut users = Vec::with_capacity(accounts.len());
  for account in accounts {
    let roles = state.store.roles_of(account.id).await.map_err(ApiError::store)?;
    users.push(AccountWithRoles { account, roles });
  }
  Ok(users)
}

/// Replace every role of `user_id` with `role`.
pub async fn change_role<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  user_id: Uuid,
  role: Role,
) -> Result<AccountWithRoles, ApiError>
where
  S: Backend,
{
  caller.require_admin()?;

  let account = state
    .store
    .account(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found(Entity::Account, user_id))?;

  state
    .store
    .set_roles(user_id, role.into())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(account_id = %user_id, role = %role, by = %caller.email, "role changed");

  Ok(AccountWithRoles { account, roles: role.into() })
}
