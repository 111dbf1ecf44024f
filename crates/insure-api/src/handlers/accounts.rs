//! Account handlers. Everything except `POST /account/password` is anonymous.
//!
//! | Method | Path                       | Body / query |
//! |--------|----------------------------|--------------|
//! | `POST` | `/register`                | profile + `email` + `password` |
//! | `GET`  | `/account/confirm`         | `?account_id=&token=` (the emailed link) |
//! | `POST` | `/account/password`        | `old_password`, `new_password` |
//! | `POST` | `/account/forgot-password` | `email`; always 202 |
//! | `POST` | `/account/reset-password`  | `account_id`, `token`, `password` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use insure_core::notify::Notifier;

use crate::{
  AppState, Backend,
  auth::Authenticated,
  error::ApiError,
  services::{
    accounts::{self, ChangePassword, ConfirmEmail, ForgotPassword, ResetPassword},
    persons::{self, RegisterRequest},
  },
};

/// `POST /register`
pub async fn register<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  let person = persons::register(&state, body).await?;
  Ok((StatusCode::CREATED, Json(person)))
}

/// `GET /account/confirm?account_id=..&token=..`
pub async fn confirm<S, N>(
  State(state): State<AppState<S, N>>,
  Query(params): Query<ConfirmEmail>,
) -> Result<StatusCode, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  accounts::confirm_email(&state, params).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /account/password`
pub async fn change_password<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<ChangePassword>,
) -> Result<StatusCode, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  accounts::change_password(&state, &caller, body).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /account/forgot-password`
pub async fn forgot_password<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<ForgotPassword>,
) -> Result<StatusCode, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  accounts::forgot_password(&state, body).await?;
  Ok(StatusCode::ACCEPTED)
}

/// `POST /account/reset-password`
pub async fn reset_password<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<ResetPassword>,
) -> Result<StatusCode, ApiError>
where
  S: Backend,
  N: Notifier + 'static,
{
  accounts::reset_password(&state, body).await?;
  Ok(StatusCode::NO_CONTENT)
}
