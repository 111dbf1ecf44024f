//! Account self-service: email confirmation and password management.

use insure_core::{
  Error,
  account::TokenPurpose,
  notify::{Message, Notifier},
  role::Caller,
  validate::{ValidationErrors, check_password},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::deliver;
use crate::{AppState, Backend, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmEmail {
  pub account_id: Uuid,
  pub token:      String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePassword {
  pub old_password: String,
  pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPassword {
  pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPassword {
  pub account_id: Uuid,
  pub token:      String,
  pub password:   String,
}

fn validate_password(field: &'static str, password: &str) -> Result<(), Error> {
  let mut errors = ValidationErrors::new();
  check_password(&mut errors, field, password);
  errors.into_result()
}

pub async fn confirm_email<S, N>(
  state: &AppState<S, N>,
  request: ConfirmEmail,
) -> Result<(), ApiError>
where
  S: Backend,
{
  let confirmed = state
    .store
    .confirm_email_with_token(request.account_id, request.token)
    .await
    .map_err(ApiError::store)?;
  if !confirmed {
    return Err(Error::InvalidToken.into());
  }
  tracing::info!(account_id = %request.account_id, "email confirmed");
  Ok(())
}

pub async fn change_password<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  request: ChangePassword,
) -> Result<(), ApiError>
where
  S: Backend,
{
  validate_password("new_password", &request.new_password)?;

  let changed = state
    .store
    .change_password(caller.identity_id, request.old_password, request.new_password)
    .await
    .map_err(ApiError::store)?;
  if !changed {
    return Err(Error::InvalidCredentials.into());
  }
  tracing::info!(account_id = %caller.identity_id, "password changed");
  Ok(())
}

/// Send a reset link. Unknown and unconfirmed addresses get the same silent
/// success so the endpoint cannot be used to probe for accounts.
pub async fn forgot_password<S, N>(
  state: &AppState<S, N>,
  request: ForgotPassword,
) -> Result<(), ApiError>
where
  S: Backend,
  N: Notifier,
{
  let account = state
    .store
    .account_by_email(request.email.trim().to_owned())
    .await
    .map_err(ApiError::store)?;
  let Some(account) = account.filter(|a| a.email_confirmed) else {
    tracing::debug!("password reset requested for unknown or unconfirmed address");
    return Ok(());
  };

  let token = state
    .store
    .issue_token(account.id, TokenPurpose::ResetPassword)
    .await
    .map_err(ApiError::store)?;
  let link = state.settings.link(&format!(
    "/account/reset-password?account_id={}&token={token}",
    account.id
  ));
  deliver(
    state,
    Message::reset_password(&account.email, &state.settings.reset_template, &link),
  )
  .await
}

pub async fn reset_password<S, N>(
  state: &AppState<S, N>,
  request: ResetPassword,
) -> Result<(), ApiError>
where
  S: Backend,
{
  validate_password("password", &request.password)?;

  let reset = state
    .store
    .reset_password_with_token(request.account_id, request.token, request.password)
    .await
    .map_err(ApiError::store)?;
  if !reset {
    return Err(Error::InvalidToken.into());
  }
  tracing::info!(account_id = %request.account_id, "password reset");
  Ok(())
}
