//! Outbound notifications.
//!
//! The core decides *who* is told *what*; delivery belongs to a [`Notifier`]
//! implementation. Bodies are HTML strings. Templates use literal
//! `{{Placeholder}}` substitution and nothing more.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::claim::Claim;

/// Built-in password reset template; `{{ResetLink}}` is replaced with the
/// generated link.
pub const DEFAULT_RESET_TEMPLATE: &str = "<p>A password reset was requested for your account.</p>\
<p><a href='{{ResetLink}}'>Reset password</a></p>\
<p>If you did not request this, you can ignore this message.</p>";

/// A single message to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub to:        String,
  pub subject:   String,
  pub body_html: String,
}

/// Delivers messages. One attempt per call; no retry, no delivery receipt.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    message: Message,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// What to do when a notification fails after the data change committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
  /// Log the failure and report the operation as successful.
  #[default]
  Isolate,
  /// Fail the operation with the notification error.
  Propagate,
}

/// Replace every `{{key}}` in `template` with its value.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
  let mut out = template.to_owned();
  for (key, value) in vars {
    out = out.replace(&format!("{{{{{key}}}}}"), value);
  }
  out
}

impl Message {
  fn new(to: &str, subject: &str, body_html: String) -> Self {
    Self { to: to.to_owned(), subject: subject.to_owned(), body_html }
  }

  /// To the claimant, after a claim is filed.
  pub fn claim_created(to: &str, claim: &Claim) -> Self {
    Self::new(
      to,
      "An incident has been created",
      format!(
        "Your incident {} has been successfully created with status {}",
        claim.id, claim.status
      ),
    )
  }

  /// To each admin, after a claim is filed.
  pub fn claim_filed(to: &str, claim: &Claim, customer: &str) -> Self {
    Self::new(
      to,
      "A new incident",
      format!(
        "A new incident no. {} has been created for customer {customer}",
        claim.id
      ),
    )
  }

  /// To the claimant, after the claim status changed.
  pub fn claim_status_changed(to: &str, claim: &Claim) -> Self {
    Self::new(
      to,
      "Change incident status",
      format!(
        "The status of your incident no. {} has been changed to {}",
        claim.id, claim.status
      ),
    )
  }

  /// To each admin, after an agent changed a claim status.
  pub fn claim_changed_by_agent(to: &str, agent: &str, claim: &Claim) -> Self {
    Self::new(
      to,
      "The incident has been changed",
      format!(
        "Agent {agent} changed the status of incident no. {} to {}",
        claim.id, claim.status
      ),
    )
  }

  pub fn confirm_email(to: &str, full_name: &str, link: &str) -> Self {
    Self::new(
      to,
      "Confirm your email",
      format!(
        "Hello {full_name},<br/>Click on the link to confirm your email: \
         <a href='{link}'>Confirm email</a>"
      ),
    )
  }

  pub fn reset_password(to: &str, template: &str, link: &str) -> Self {
    Self::new(
      to,
      "Reset Password",
      render_template(template, &[("ResetLink", link)]),
    )
  }
}
