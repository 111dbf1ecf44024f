//! Roles, role sets, and the authenticated caller.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{Error, Result};

/// A role granted to an identity account.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
  strum::AsRefStr,
)]
pub enum Role {
  Admin,
  Agent,
  Client,
}

impl Role {
  fn bit(self) -> u8 {
    match self {
      Self::Admin => 0b001,
      Self::Agent => 0b010,
      Self::Client => 0b100,
    }
  }
}

/// A typed set of [`Role`]s. Serialises as a list of role names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Role>", from = "Vec<Role>")]
pub struct RoleSet(u8);

impl RoleSet {
  pub fn empty() -> Self { Self(0) }

  pub fn insert(&mut self, role: Role) { self.0 |= role.bit(); }

  pub fn contains(self, role: Role) -> bool { self.0 & role.bit() != 0 }

  pub fn is_empty(self) -> bool { self.0 == 0 }

  pub fn iter(self) -> impl Iterator<Item = Role> {
    Role::iter().filter(move |r| self.contains(*r))
  }

  pub fn has_elevated_access(self) -> bool { has_elevated_access(self) }
}

/// Staff (Admin or Agent) see every record; everyone else is owner-scoped.
pub fn has_elevated_access(roles: RoleSet) -> bool {
  roles.contains(Role::Admin) || roles.contains(Role::Agent)
}

impl From<Role> for RoleSet {
  fn from(role: Role) -> Self { Self(role.bit()) }
}

impl FromIterator<Role> for RoleSet {
  fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
    let mut set = Self::empty();
    for role in iter {
      set.insert(role);
    }
    set
  }
}

impl From<Vec<Role>> for RoleSet {
  fn from(roles: Vec<Role>) -> Self { roles.into_iter().collect() }
}

impl From<RoleSet> for Vec<Role> {
  fn from(set: RoleSet) -> Self { set.iter().collect() }
}

// ─── Caller ──────────────────────────────────────────────────────────────────

/// An authenticated identity together with the role snapshot taken for the
/// current request.
#[derive(Debug, Clone)]
pub struct Caller {
  pub identity_id: Uuid,
  pub email:       String,
  pub full_name:   String,
  pub roles:       RoleSet,
}

impl Caller {
  pub fn is_staff(&self) -> bool { self.roles.has_elevated_access() }

  pub fn require_staff(&self) -> Result<()> {
    if self.is_staff() {
      Ok(())
    } else {
      Err(Error::Forbidden("admin or agent"))
    }
  }

  pub fn require_admin(&self) -> Result<()> {
    if self.roles.contains(Role::Admin) {
      Ok(())
    } else {
      Err(Error::Forbidden("admin"))
    }
  }
}
