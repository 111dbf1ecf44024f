//! Field-level validation shared by every write path.
//!
//! Validation never touches storage. Each check appends to a
//! [`ValidationErrors`] collector so callers get every violated field in one
//! response rather than the first one only.

use std::fmt;

use serde::Serialize;

use crate::{Error, Result};

/// Maximum length of names, subjects and other short required strings.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a claim description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of a postal code.
pub const MAX_POST_CODE_LEN: usize = 10;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

/// An ordered collection of [`FieldError`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
    self.0.push(FieldError { field, message: message.into() });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn fields(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  /// Whether a violation was recorded for `field`.
  pub fn has(&self, field: &str) -> bool {
    self.0.iter().any(|e| e.field == field)
  }

  /// A required string must be non-blank and at most `max` characters.
  pub fn require_text(&mut self, field: &'static str, value: &str, max: usize) {
    if value.trim().is_empty() {
      self.push(field, "is required");
    } else if value.chars().count() > max {
      self.push(field, format!("can have a maximum of {max} characters"));
    }
  }

  /// An optional string may be empty but is still bounded to `max` characters.
  pub fn limit_text(&mut self, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
      self.push(field, format!("can have a maximum of {max} characters"));
    }
  }

  /// Convert into `Ok(())` when empty, or [`Error::Validation`] otherwise.
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(self))
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for e in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      write!(f, "{} {}", e.field, e.message)?;
      first = false;
    }
    Ok(())
  }
}

/// Loose email shape check: one `@` with a non-empty local part and a dotted
/// domain. Deliverability is the notifier's problem.
pub fn check_email(errors: &mut ValidationErrors, field: &'static str, email: &str) {
  let valid = match email.trim().split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
    }
    None => false,
  };
  if !valid {
    errors.push(field, "is not a valid email address");
  }
}

/// Phone numbers may contain digits, spaces, and `+ - ( ) /`.
pub fn check_phone(errors: &mut ValidationErrors, field: &'static str, phone: &str) {
  if phone.is_empty() {
    return;
  }
  let allowed = phone
    .chars()
    .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '/'));
  if !allowed || !phone.chars().any(|c| c.is_ascii_digit()) {
    errors.push(field, "is not a valid phone number");
  }
}

/// Password policy: minimum length plus one digit, one lowercase, one
/// uppercase, and one non-alphanumeric character.
pub fn check_password(errors: &mut ValidationErrors, field: &'static str, password: &str) {
  if password.chars().count() < MIN_PASSWORD_LEN {
    errors.push(field, format!("must be at least {MIN_PASSWORD_LEN} characters"));
  }
  if !password.chars().any(|c| c.is_ascii_digit()) {
    errors.push(field, "must contain a digit");
  }
  if !password.chars().any(char::is_lowercase) {
    errors.push(field, "must contain a lowercase letter");
  }
  if !password.chars().any(char::is_uppercase) {
    errors.push(field, "must contain an uppercase letter");
  }
  if password.chars().all(char::is_alphanumeric) {
    errors.push(field, "must contain a non-alphanumeric character");
  }
}
