//! Access scope resolution.
//!
//! Staff callers see every record. Everyone else sees only records owned by
//! the person linked to their identity. Scope is resolved from the role
//! snapshot of the current request and never cached.

use crate::{
  Error, Result,
  person::{Person, PersonId},
  role::Caller,
};

/// The set of records a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  All,
  /// Only records whose owning person is this one.
  Owner(PersonId),
}

impl Scope {
  /// Resolve the scope for `caller`, given the person linked to their
  /// identity (if any).
  ///
  /// Fails with [`Error::Unauthorized`] for a non-staff caller without a
  /// linked person.
  pub fn resolve(caller: &Caller, linked: Option<&Person>) -> Result<Self> {
    if caller.is_staff() {
      return Ok(Self::All);
    }
    match linked {
      Some(p) if p.identity_id == Some(caller.identity_id) => Ok(Self::Owner(p.id)),
      _ => Err(Error::Unauthorized),
    }
  }

  /// The owner filter to apply to list queries; `None` means unfiltered.
  pub fn owner(self) -> Option<PersonId> {
    match self {
      Self::All => None,
      Self::Owner(id) => Some(id),
    }
  }

  /// Whether a record owned by `owner` is visible in this scope.
  pub fn permits(self, owner: PersonId) -> bool {
    match self {
      Self::All => true,
      Self::Owner(id) => id == owner,
    }
  }
}
