//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339 strings,
//! UUIDs as hyphenated lowercase strings and money as decimal strings so no
//! precision is lost to floating point.

use chrono::{DateTime, NaiveDate, Utc};
use insure_core::{
  account::Account,
  claim::{Claim, ClaimStatus},
  person::{Person, PersonProfile},
  policy::{Insurance, Participant, ParticipantRole, PolicyRecord},
  role::Role,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(s.parse::<Decimal>()?) }

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_participant_role(s: &str) -> Result<ParticipantRole> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "participants.role",
    value:  s.to_owned(),
  })
}

pub fn decode_status(s: &str) -> Result<ClaimStatus> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "claims.status",
    value:  s.to_owned(),
  })
}

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "account_roles.role",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "person_id, full_name, date_of_birth, phone, street, city, \
                                  country, post_code, identity_id, version";

pub struct RawPerson {
  pub person_id:     i64,
  pub full_name:     String,
  pub date_of_birth: String,
  pub phone:         String,
  pub street:        String,
  pub city:          String,
  pub country:       String,
  pub post_code:     String,
  pub identity_id:   Option<String>,
  pub version:       i64,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:     row.get(0)?,
      full_name:     row.get(1)?,
      date_of_birth: row.get(2)?,
      phone:         row.get(3)?,
      street:        row.get(4)?,
      city:          row.get(5)?,
      country:       row.get(6)?,
      post_code:     row.get(7)?,
      identity_id:   row.get(8)?,
      version:       row.get(9)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:          self.person_id,
      profile:     PersonProfile {
        full_name:     self.full_name,
        date_of_birth: decode_date(&self.date_of_birth)?,
        phone:         self.phone,
        street:        self.street,
        city:          self.city,
        country:       self.country,
        post_code:     self.post_code,
      },
      identity_id: self.identity_id.as_deref().map(decode_uuid).transpose()?,
      version:     self.version,
    })
  }
}

pub const INSURANCE_COLUMNS: &str =
  "insurance_id, name, subject, amount, valid_from, valid_to, person_id, version";

pub struct RawInsurance {
  pub insurance_id: i64,
  pub name:         String,
  pub subject:      String,
  pub amount:       i64,
  pub valid_from:   String,
  pub valid_to:     String,
  pub person_id:    i64,
  pub version:      i64,
}

impl RawInsurance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      insurance_id: row.get(0)?,
      name:         row.get(1)?,
      subject:      row.get(2)?,
      amount:       row.get(3)?,
      valid_from:   row.get(4)?,
      valid_to:     row.get(5)?,
      person_id:    row.get(6)?,
      version:      row.get(7)?,
    })
  }

  pub fn into_insurance(self) -> Result<Insurance> {
    Ok(Insurance {
      id:         self.insurance_id,
      name:       self.name,
      subject:    self.subject,
      amount:     self.amount,
      valid_from: decode_date(&self.valid_from)?,
      valid_to:   decode_date(&self.valid_to)?,
      person_id:  self.person_id,
      version:    self.version,
    })
  }
}

pub const PARTICIPANT_COLUMNS: &str = "participant_id, role, insurance_id, person_id";

pub struct RawParticipant {
  pub participant_id: i64,
  pub role:           String,
  pub insurance_id:   i64,
  pub person_id:      i64,
}

impl RawParticipant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      participant_id: row.get(0)?,
      role:           row.get(1)?,
      insurance_id:   row.get(2)?,
      person_id:      row.get(3)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      id:           self.participant_id,
      role:         decode_participant_role(&self.role)?,
      insurance_id: self.insurance_id,
      person_id:    self.person_id,
    })
  }
}

/// An insurance row with its owner and participant rows.
pub struct RawPolicy {
  pub insurance:    RawInsurance,
  pub owner:        RawPerson,
  pub participants: Vec<RawParticipant>,
}

impl RawPolicy {
  pub fn into_policy(self) -> Result<PolicyRecord> {
    Ok(PolicyRecord {
      insurance:    self.insurance.into_insurance()?,
      owner:        self.owner.into_person()?,
      participants: self
        .participants
        .into_iter()
        .map(RawParticipant::into_participant)
        .collect::<Result<_>>()?,
    })
  }
}

pub const CLAIM_COLUMNS: &str = "claim_id, description, occurred_on, estimated_damage, status, \
                                 insurance_id, person_id, version";

pub struct RawClaim {
  pub claim_id:         i64,
  pub description:      String,
  pub occurred_on:      String,
  pub estimated_damage: String,
  pub status:           String,
  pub insurance_id:     i64,
  pub person_id:        i64,
  pub version:          i64,
}

impl RawClaim {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      claim_id:         row.get(0)?,
      description:      row.get(1)?,
      occurred_on:      row.get(2)?,
      estimated_damage: row.get(3)?,
      status:           row.get(4)?,
      insurance_id:     row.get(5)?,
      person_id:        row.get(6)?,
      version:          row.get(7)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      id:               self.claim_id,
      description:      self.description,
      occurred_on:      decode_date(&self.occurred_on)?,
      estimated_damage: decode_decimal(&self.estimated_damage)?,
      status:           decode_status(&self.status)?,
      insurance_id:     self.insurance_id,
      person_id:        self.person_id,
      version:          self.version,
    })
  }
}

pub const ACCOUNT_COLUMNS: &str = "account_id, email, full_name, email_confirmed, created_at";

pub struct RawAccount {
  pub account_id:      String,
  pub email:           String,
  pub full_name:       String,
  pub email_confirmed: bool,
  pub created_at:      String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:      row.get(0)?,
      email:           row.get(1)?,
      full_name:       row.get(2)?,
      email_confirmed: row.get(3)?,
      created_at:      row.get(4)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      id:              decode_uuid(&self.account_id)?,
      email:           self.email,
      full_name:       self.full_name,
      email_confirmed: self.email_confirmed,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
