//! Person directory: registration, profile upkeep and cascading delete.

use insure_core::{
  Entity, Error,
  account::{Account, CreateAccountOutcome, Credential, NewAccount, TokenPurpose},
  cascade::DeletionPlan,
  notify::{Message, Notifier},
  person::{Person, PersonId, PersonProfile},
  role::{Caller, Role},
  store::UpdateOutcome,
  validate::{ValidationErrors, check_email, check_password},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deliver, resolve_scope};
use crate::{AppState, Backend, error::ApiError};

/// Profile plus login credentials, used by both self-registration and staff
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
  #[serde(flatten)]
  pub profile:  PersonProfile,
  pub email:    String,
  pub password: String,
}

impl RegisterRequest {
  fn validate(&self) -> Result<(), Error> {
    let mut errors = ValidationErrors::new();
    self.profile.check(&mut errors);
    check_email(&mut errors, "email", &self.email);
    check_password(&mut errors, "password", &self.password);
    errors.into_result()
  }
}

/// Profile edit with an optional concurrency token. Without `version` the
/// edit applies over whatever is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonUpdate {
  #[serde(flatten)]
  pub profile: PersonProfile,
  #[serde(default)]
  pub version: Option<i64>,
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// Create the identity account, grant it the Client role, then insert the
/// linked person. If either later step fails the account is removed again
/// so no orphan identity is left behind.
async fn create_linked<S: Backend>(
  store: &S,
  request: RegisterRequest,
) -> Result<(Account, Person), ApiError> {
  request.validate()?;

  let RegisterRequest { profile, email, password } = request;
  let new = NewAccount {
    email:           email.clone(),
    full_name:       profile.full_name.clone(),
    credential:      Credential::Password(password),
    email_confirmed: false,
  };

  let account = match store.create_account(new).await.map_err(ApiError::store)? {
    CreateAccountOutcome::Created(account) => account,
    CreateAccountOutcome::EmailTaken => return Err(Error::EmailTaken(email).into()),
  };

  if let Err(e) = store.add_role(account.id, Role::Client).await {
    discard_account(store, account.id, "role grant").await;
    return Err(ApiError::store(e));
  }

  match store.insert_person(profile, Some(account.id)).await {
    Ok(person) => Ok((account, person)),
    Err(e) => {
      discard_account(store, account.id, "person insert").await;
      Err(ApiError::store(e))
    }
  }
}

/// Compensation for a half-finished [`create_linked`].
async fn discard_account<S: Backend>(store: &S, account_id: Uuid, failed_step: &str) {
  if let Err(undo) = store.delete_account(account_id).await {
    tracing::error!(
      %account_id,
      error = %undo,
      failed_step,
      "failed to remove account after registration step failed",
    );
  }
}

/// Self-registration. Sends the confirm-email link to the new address.
pub async fn register<S, N>(
  state: &AppState<S, N>,
  request: RegisterRequest,
) -> Result<Person, ApiError>
where
  S: Backend,
  N: Notifier,
{
  let (account, person) = create_linked(state.store.as_ref(), request).await?;
  tracing::info!(person_id = person.id, account_id = %account.id, "person registered");

  let token = state
    .store
    .issue_token(account.id, TokenPurpose::ConfirmEmail)
    .await
    .map_err(ApiError::store)?;
  let link = state.settings.link(&format!(
    "/account/confirm?account_id={}&token={token}",
    account.id
  ));
  deliver(state, Message::confirm_email(&account.email, &account.full_name, &link)).await?;

  Ok(person)
}

/// Staff-created client. No confirmation message is sent.
pub async fn staff_create<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  request: RegisterRequest,
) -> Result<Person, ApiError>
where
  S: Backend,
{
  caller.require_staff()?;
  let (account, person) = create_linked(state.store.as_ref(), request).await?;
  tracing::info!(
    person_id = person.id,
    account_id = %account.id,
    by = %caller.email,
    "person created by staff",
  );
  Ok(person)
}

// ─── Read ────────────────────────────────────────────────────────────────────

pub async fn list<S, N>(state: &AppState<S, N>, caller: &Caller) -> Result<Vec<Person>, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  state
    .store
    .list_persons(scope.owner())
    .await
    .map_err(ApiError::store)
}

/// A person outside the caller's scope is reported as missing.
pub async fn details<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: PersonId,
) -> Result<Person, ApiError>
where
  S: Backend,
{
  let scope = resolve_scope(state, caller).await?;
  state
    .store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .filter(|p| scope.permits(p.id))
    .ok_or_else(|| Error::not_found(Entity::Person, id).into())
}

/// The person linked to the caller's identity.
pub async fn me<S, N>(state: &AppState<S, N>, caller: &Caller) -> Result<Person, ApiError>
where
  S: Backend,
{
  state
    .store
    .person_by_identity(caller.identity_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found(Entity::Person, caller.identity_id).into())
}

// ─── Update ──────────────────────────────────────────────────────────────────

pub async fn update<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: PersonId,
  update: PersonUpdate,
) -> Result<Person, ApiError>
where
  S: Backend,
{
  update.profile.validate()?;

  let current = details(state, caller, id).await?;
  let expected = update.version.unwrap_or(current.version);

  match state
    .store
    .update_person(id, update.profile, expected)
    .await
    .map_err(ApiError::store)?
  {
    UpdateOutcome::Updated(person) => {
      tracing::info!(person_id = id, version = person.version, "person updated");
      Ok(person)
    }
    UpdateOutcome::Missing => Err(Error::not_found(Entity::Person, id).into()),
    UpdateOutcome::Conflict => Err(Error::conflict(Entity::Person, id).into()),
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// Remove the person with every dependent row and their login identity.
pub async fn delete<S, N>(
  state: &AppState<S, N>,
  caller: &Caller,
  id: PersonId,
) -> Result<DeletionPlan, ApiError>
where
  S: Backend,
{
  caller.require_staff()?;

  let plan = state
    .store
    .delete_person_cascade(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found(Entity::Person, id))?;

  tracing::info!(person_id = id, steps = plan.steps.len(), "person deleted");
  Ok(plan)
}
