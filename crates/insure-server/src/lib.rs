//! Runtime wiring for the insurance server: configuration, notifier
//! selection and the bootstrap admin account.

use std::{convert::Infallible, path::PathBuf};

use insure_api::Settings;
use insure_core::{
  account::{CreateAccountOutcome, Credential, NewAccount},
  claim::TransitionPolicy,
  notify::{Message, NotificationPolicy, Notifier},
  role::Role,
  store::IdentityProvider,
};
use insure_store_sqlite::SqliteStore;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("admin_email is set but admin_password_hash is missing")]
  IncompleteAdmin,
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Where outbound messages go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
  /// Log each message through `tracing`.
  #[default]
  Log,
  /// Queue messages in the store's outbox table for an external relay.
  Outbox,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `INSURE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  /// Public URL prefix for links in outbound messages.
  pub base_url:            String,
  pub store_path:          PathBuf,
  pub admin_email:         Option<String>,
  pub admin_full_name:     Option<String>,
  /// Argon2 PHC string, as printed by `--hash-password`.
  pub admin_password_hash: Option<String>,
  #[serde(default)]
  pub notifier:            NotifierKind,
  #[serde(default)]
  pub notification_policy: NotificationPolicy,
  #[serde(default)]
  pub transition_policy:   TransitionPolicy,
  /// HTML file with a `{{ResetLink}}` placeholder; the built-in body is
  /// used when unset.
  pub reset_template_path: Option<PathBuf>,
}

/// The account created at startup when none exists for `email`.
#[derive(Debug, Clone)]
pub struct AdminSeed {
  pub email:         String,
  pub full_name:     String,
  pub password_hash: String,
}

impl ServerConfig {
  pub fn admin_seed(&self) -> Result<Option<AdminSeed>, Error> {
    let Some(email) = &self.admin_email else {
      return Ok(None);
    };
    let password_hash = self
      .admin_password_hash
      .clone()
      .ok_or(Error::IncompleteAdmin)?;
    Ok(Some(AdminSeed {
      email: email.clone(),
      full_name: self
        .admin_full_name
        .clone()
        .unwrap_or_else(|| "Administrator".to_owned()),
      password_hash,
    }))
  }

  pub fn settings(&self, reset_template: String) -> Settings {
    Settings {
      base_url: self.base_url.clone(),
      notification_policy: self.notification_policy,
      transition_policy: self.transition_policy,
      reset_template,
    }
  }

  pub fn notifier(&self, store: &SqliteStore) -> ServerNotifier {
    match self.notifier {
      NotifierKind::Log => ServerNotifier::Log(TracingNotifier),
      NotifierKind::Outbox => ServerNotifier::Outbox(store.clone()),
    }
  }
}

// ─── Notifiers ───────────────────────────────────────────────────────────────

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  type Error = Infallible;

  async fn send(&self, message: Message) -> Result<(), Infallible> {
    tracing::info!(
      to = %message.to,
      subject = %message.subject,
      body = %message.body_html,
      "notification",
    );
    Ok(())
  }
}

/// The notifier selected by [`NotifierKind`].
#[derive(Clone)]
pub enum ServerNotifier {
  Log(TracingNotifier),
  Outbox(SqliteStore),
}

impl Notifier for ServerNotifier {
  type Error = insure_store_sqlite::Error;

  async fn send(&self, message: Message) -> Result<(), Self::Error> {
    match self {
      Self::Log(log) => match log.send(message).await {
        Ok(()) => Ok(()),
        Err(never) => match never {},
      },
      Self::Outbox(store) => store.send(message).await,
    }
  }
}

// ─── Bootstrap ───────────────────────────────────────────────────────────────

/// Create the admin account unless one with the same email exists. Returns
/// the new account id when one was created.
pub async fn seed_admin<S: IdentityProvider>(
  store: &S,
  seed: &AdminSeed,
) -> Result<Option<Uuid>, S::Error> {
  if store.account_by_email(seed.email.clone()).await?.is_some() {
    tracing::debug!(email = %seed.email, "admin account already present");
    return Ok(None);
  }

  let new = NewAccount {
    email:           seed.email.clone(),
    full_name:       seed.full_name.clone(),
    credential:      Credential::Hash(seed.password_hash.clone()),
    email_confirmed: true,
  };
  let CreateAccountOutcome::Created(account) = store.create_account(new).await? else {
    return Ok(None);
  };
  store.add_role(account.id, Role::Admin).await?;

  tracing::info!(email = %account.email, "seeded admin account");
  Ok(Some(account.id))
}
