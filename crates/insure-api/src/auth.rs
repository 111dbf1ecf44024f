//! HTTP Basic-auth extractor.
//!
//! Credentials are checked against the identity provider on every request and
//! the caller's roles are re-read each time, so a role change takes effect on
//! the next request.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use insure_core::{notify::Notifier, role::Caller};

use crate::{AppState, Backend, error::ApiError};

/// The authenticated caller with the role snapshot for this request.
pub struct Authenticated(pub Caller);

/// Pull `(email, password)` out of an `Authorization: Basic ...` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthenticated)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthenticated)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthenticated)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthenticated)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthenticated)?;
  Ok((email.to_owned(), password.to_owned()))
}

/// Verify the request credentials and build the [`Caller`].
pub async fn authenticate<S: Backend>(
  store: &S,
  headers: &HeaderMap,
) -> Result<Caller, ApiError> {
  let (email, password) = basic_credentials(headers)?;

  let account = store
    .authenticate(email, password)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthenticated)?;

  let roles = store.roles_of(account.id).await.map_err(ApiError::store)?;

  Ok(Caller {
    identity_id: account.id,
    email: account.email,
    full_name: account.full_name,
    roles,
  })
}

impl<S, N> FromRequestParts<AppState<S, N>> for Authenticated
where
  S: Backend,
  N: Notifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, N>,
  ) -> Result<Self, Self::Rejection> {
    let caller = authenticate(state.store.as_ref(), &parts.headers).await?;
    Ok(Authenticated(caller))
  }
}
