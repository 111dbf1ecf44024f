//! Business operations behind the HTTP handlers.
//!
//! Each service takes the shared [`AppState`] and the authenticated
//! [`Caller`] (where one is required), enforces roles and scope, and talks to
//! the store. Nothing in here knows about HTTP.

pub mod accounts;
pub mod admin;
pub mod claims;
pub mod participants;
pub mod persons;
pub mod policies;

use chrono::{NaiveDate, Utc};
use insure_core::{
  Error,
  notify::{Message, NotificationPolicy, Notifier},
  role::Caller,
  scope::Scope,
  store::InsuranceStore as _,
};

use crate::{AppState, Backend, error::ApiError};

/// Send one message, honouring the configured [`NotificationPolicy`].
///
/// The data change that triggered the message has already committed, so an
/// isolated failure is only logged.
pub(crate) async fn deliver<S, N>(state: &AppState<S, N>, message: Message) -> Result<(), ApiError>
where
  N: Notifier,
{
  let to = message.to.clone();
  match state.notifier.send(message).await {
    Ok(()) => Ok(()),
    Err(e) => match state.settings.notification_policy {
      NotificationPolicy::Isolate => {
        tracing::warn!(to = %to, error = %e, "notification failed");
        Ok(())
      }
      NotificationPolicy::Propagate => {
        Err(Error::Notification { to, source: Box::new(e) }.into())
      }
    },
  }
}

/// The records `caller` may see, based on their roles and linked person.
pub(crate) async fn resolve_scope<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
) -> Result<Scope, ApiError>
where
  S: Backend,
{
  if caller.is_staff() {
    return Ok(Scope::All);
  }
  let linked = state
    .store
    .person_by_identity(caller.identity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Scope::resolve(caller, linked.as_ref())?)
}

/// Today's date in UTC, the reference for "not in the future" checks.
pub(crate) fn today() -> NaiveDate { Utc::now().date_naive() }
