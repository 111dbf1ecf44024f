//! JSON REST API for the insurance service.
//!
//! Exposes an axum [`Router`] backed by any store that implements both
//! [`InsuranceStore`] and [`IdentityProvider`], plus a [`Notifier`]. Every
//! route except the anonymous account flows requires HTTP Basic auth; roles
//! are re-read from the identity provider on every request.
//!
//! The business rules live in [`services`]; [`handlers`] only adapt them to
//! HTTP.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use insure_core::{
  claim::TransitionPolicy,
  notify::{DEFAULT_RESET_TEMPLATE, NotificationPolicy, Notifier},
  store::{IdentityProvider, InsuranceStore},
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use handlers::{accounts, admin, claims, participants, persons, policies};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Everything the API needs from persistence.
pub trait Backend:
  InsuranceStore + IdentityProvider + Clone + Send + Sync + 'static
{
}

impl<T> Backend for T where
  T: InsuranceStore + IdentityProvider + Clone + Send + Sync + 'static
{
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// Behavioural knobs injected at startup.
#[derive(Debug, Clone)]
pub struct Settings {
  /// Public base URL used to build links in outbound messages.
  pub base_url:            String,
  pub notification_policy: NotificationPolicy,
  pub transition_policy:   TransitionPolicy,
  /// Body of the password reset message; must contain `{{ResetLink}}`.
  pub reset_template:      String,
}

impl Settings {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:            base_url.into(),
      notification_policy: NotificationPolicy::default(),
      transition_policy:   TransitionPolicy::default(),
      reset_template:      DEFAULT_RESET_TEMPLATE.to_owned(),
    }
  }

  /// `base_url` joined with `path` (which must start with `/`).
  pub fn link(&self, path: &str) -> String {
    format!("{}{path}", self.base_url.trim_end_matches('/'))
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, N> {
  pub store:    Arc<S>,
  pub notifier: Arc<N>,
  pub settings: Arc<Settings>,
}

impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      notifier: self.notifier.clone(),
      settings: self.settings.clone(),
    }
  }
}

impl<S, N> AppState<S, N> {
  pub fn new(store: S, notifier: N, settings: Settings) -> Self {
    Self {
      store:    Arc::new(store),
      notifier: Arc::new(notifier),
      settings: Arc::new(settings),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, N>(state: AppState<S, N>) -> Router
where
  S: Backend,
  N: Notifier + 'static,
{
  Router::new()
    // Persons
    .route("/persons", get(persons::list::<S, N>).post(persons::create::<S, N>))
    .route("/persons/me", get(persons::me::<S, N>))
    .route(
      "/persons/{id}",
      get(persons::get_one::<S, N>)
        .put(persons::update::<S, N>)
        .delete(persons::delete::<S, N>),
    )
    // Policies
    .route("/policies", get(policies::list::<S, N>).post(policies::create::<S, N>))
    .route(
      "/policies/{id}",
      get(policies::get_one::<S, N>)
        .put(policies::update::<S, N>)
        .delete(policies::delete::<S, N>),
    )
    // Claims
    .route("/claims", get(claims::list::<S, N>).post(claims::create::<S, N>))
    .route(
      "/claims/{id}",
      get(claims::get_one::<S, N>)
        .put(claims::update::<S, N>)
        .delete(claims::delete::<S, N>),
    )
    // Participants (read-only)
    .route("/participants", get(participants::list::<S, N>))
    .route("/participants/report", get(participants::report::<S, N>))
    .route("/participants/{id}", get(participants::get_one::<S, N>))
    // Accounts
    .route("/register", post(accounts::register::<S, N>))
    .route("/account/confirm", get(accounts::confirm::<S, N>))
    .route("/account/password", post(accounts::change_password::<S, N>))
    .route("/account/forgot-password", post(accounts::forgot_password::<S, N>))
    .route("/account/reset-password", post(accounts::reset_password::<S, N>))
    // Admin
    .route("/admin/users", get(admin::users::<S, N>))
    .route("/admin/users/{id}/role", put(admin::change_role::<S, N>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
