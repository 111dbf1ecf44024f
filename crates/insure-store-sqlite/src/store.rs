//! [`SqliteStore`], the SQLite implementation of [`InsuranceStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, params};
use uuid::Uuid;

use insure_core::{
  cascade::{DeletionPlan, DeletionStep, OwnedPolicy, PersonGraph},
  claim::{Claim, ClaimEdit, ClaimId, ClaimRecord, ClaimStatus, ClaimUpdate},
  person::{Person, PersonId, PersonProfile},
  policy::{
    HolderChange, InsuranceId, InsuranceInput, Participant, ParticipantFilter,
    ParticipantId, ParticipantPlan, ParticipantReportRow, ParticipantRole, PolicyRecord,
  },
  store::{DeleteOutcome, InsuranceStore, UpdateOutcome},
};

use crate::{
  Result,
  encode::{
    CLAIM_COLUMNS, INSURANCE_COLUMNS, PARTICIPANT_COLUMNS, PERSON_COLUMNS, RawClaim,
    RawInsurance, RawParticipant, RawPerson, RawPolicy, decode_uuid, encode_date,
    encode_decimal, encode_uuid,
  },
  error::in_call,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The insurance store, identity provider and outbox, backed by a single
/// SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These take `&Connection` so they work both on a bare connection and inside
// a `Transaction` (which derefs to one).

fn row_exists(conn: &rusqlite::Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params![id], |_| Ok(())).optional()?.is_some())
}

fn select_ids(conn: &rusqlite::Connection, sql: &str, id: i64) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = conn.prepare(sql)?;
  let ids = stmt
    .query_map(params![id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

fn select_person(conn: &rusqlite::Connection, id: PersonId) -> rusqlite::Result<Option<RawPerson>> {
  conn
    .query_row(
      &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE person_id = ?1"),
      params![id],
      RawPerson::from_row,
    )
    .optional()
}

fn select_participants(
  conn: &rusqlite::Connection,
  insurance_id: InsuranceId,
) -> rusqlite::Result<Vec<RawParticipant>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PARTICIPANT_COLUMNS} FROM participants
     WHERE insurance_id = ?1
     ORDER BY participant_id"
  ))?;
  let rows = stmt
    .query_map(params![insurance_id], RawParticipant::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn load_policy(conn: &rusqlite::Connection, insurance: RawInsurance) -> rusqlite::Result<RawPolicy> {
  let owner = select_person(conn, insurance.person_id)?
    .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
  let participants = select_participants(conn, insurance.insurance_id)?;
  Ok(RawPolicy { insurance, owner, participants })
}

fn select_policy(conn: &rusqlite::Connection, id: InsuranceId) -> rusqlite::Result<Option<RawPolicy>> {
  let insurance = conn
    .query_row(
      &format!("SELECT {INSURANCE_COLUMNS} FROM insurances WHERE insurance_id = ?1"),
      params![id],
      RawInsurance::from_row,
    )
    .optional()?;
  insurance.map(|i| load_policy(conn, i)).transpose()
}

fn select_claim(conn: &rusqlite::Connection, id: ClaimId) -> rusqlite::Result<Option<RawClaim>> {
  conn
    .query_row(
      &format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = ?1"),
      params![id],
      RawClaim::from_row,
    )
    .optional()
}

fn insert_participant(
  conn: &rusqlite::Connection,
  role: ParticipantRole,
  insurance_id: InsuranceId,
  person_id: PersonId,
) -> rusqlite::Result<ParticipantId> {
  conn.execute(
    "INSERT INTO participants (role, insurance_id, person_id) VALUES (?1, ?2, ?3)",
    params![role.as_ref(), insurance_id, person_id],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Remove an account with its role and token rows. Returns whether the
/// account row existed.
pub(crate) fn delete_account_rows(
  conn: &rusqlite::Connection,
  account_id: &str,
) -> rusqlite::Result<bool> {
  conn.execute("DELETE FROM account_roles WHERE account_id = ?1", params![account_id])?;
  conn.execute("DELETE FROM account_tokens WHERE account_id = ?1", params![account_id])?;
  let n = conn.execute("DELETE FROM accounts WHERE account_id = ?1", params![account_id])?;
  Ok(n > 0)
}

/// Collect every row that references a person, for cascade planning.
fn person_graph(
  conn: &rusqlite::Connection,
  person_id: PersonId,
  identity_id: Option<Uuid>,
) -> rusqlite::Result<PersonGraph> {
  let insurance_ids = select_ids(
    conn,
    "SELECT insurance_id FROM insurances WHERE person_id = ?1 ORDER BY insurance_id",
    person_id,
  )?;

  let mut owned_policies = Vec::with_capacity(insurance_ids.len());
  for insurance_id in insurance_ids {
    owned_policies.push(OwnedPolicy {
      insurance_id,
      claim_ids: select_ids(
        conn,
        "SELECT claim_id FROM claims WHERE insurance_id = ?1 ORDER BY claim_id",
        insurance_id,
      )?,
      participant_ids: select_ids(
        conn,
        "SELECT participant_id FROM participants WHERE insurance_id = ?1 ORDER BY participant_id",
        insurance_id,
      )?,
    });
  }

  Ok(PersonGraph {
    person_id,
    identity_id,
    owned_policies,
    own_claims: select_ids(
      conn,
      "SELECT claim_id FROM claims WHERE person_id = ?1 ORDER BY claim_id",
      person_id,
    )?,
    own_participants: select_ids(
      conn,
      "SELECT participant_id FROM participants WHERE person_id = ?1 ORDER BY participant_id",
      person_id,
    )?,
  })
}

fn execute_step(conn: &rusqlite::Connection, step: &DeletionStep) -> rusqlite::Result<()> {
  match step {
    DeletionStep::Claims(ids) => {
      for id in ids {
        conn.execute("DELETE FROM claims WHERE claim_id = ?1", params![id])?;
      }
    }
    DeletionStep::Participants(ids) => {
      for id in ids {
        conn.execute("DELETE FROM participants WHERE participant_id = ?1", params![id])?;
      }
    }
    DeletionStep::Insurances(ids) => {
      for id in ids {
        conn.execute("DELETE FROM insurances WHERE insurance_id = ?1", params![id])?;
      }
    }
    DeletionStep::Person(id) => {
      conn.execute("DELETE FROM persons WHERE person_id = ?1", params![id])?;
    }
    DeletionStep::Account(id) => {
      delete_account_rows(conn, &encode_uuid(*id))?;
    }
  }
  Ok(())
}

fn decode_outcome<R, T>(
  outcome: UpdateOutcome<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<UpdateOutcome<T>> {
  Ok(match outcome {
    UpdateOutcome::Updated(raw) => UpdateOutcome::Updated(decode(raw)?),
    UpdateOutcome::Missing => UpdateOutcome::Missing,
    UpdateOutcome::Conflict => UpdateOutcome::Conflict,
  })
}

// ─── InsuranceStore impl ─────────────────────────────────────────────────────

impl InsuranceStore for SqliteStore {
  type Error = crate::Error;

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn insert_person(
    &self,
    profile: PersonProfile,
    identity_id: Option<Uuid>,
  ) -> Result<Person> {
    let row          = profile.clone();
    let dob_str      = encode_date(profile.date_of_birth);
    let identity_str = identity_id.map(encode_uuid);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO persons (
             full_name, date_of_birth, phone, street, city, country, post_code, identity_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            row.full_name,
            dob_str,
            row.phone,
            row.street,
            row.city,
            row.country,
            row.post_code,
            identity_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Person { id, profile, identity_id, version: 1 })
  }

  async fn get_person(&self, id: PersonId) -> Result<Option<Person>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_person(conn, id)?))
      .await?;
    raw.map(RawPerson::into_person).transpose()
  }

  async fn person_by_identity(&self, identity_id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(identity_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE identity_id = ?1"),
            params![id_str],
            RawPerson::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn list_persons(&self, owner: Option<PersonId>) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons
           WHERE ?1 IS NULL OR person_id = ?1
           ORDER BY person_id"
        ))?;
        let rows = stmt
          .query_map(params![owner], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn missing_persons(&self, ids: Vec<PersonId>) -> Result<Vec<PersonId>> {
    let missing = self
      .conn
      .call(move |conn| {
        let mut missing: Vec<PersonId> = Vec::new();
        for id in ids {
          if missing.contains(&id) {
            continue;
          }
          if !row_exists(conn, "SELECT 1 FROM persons WHERE person_id = ?1", id)? {
            missing.push(id);
          }
        }
        Ok(missing)
      })
      .await?;
    Ok(missing)
  }

  async fn update_person(
    &self,
    id: PersonId,
    profile: PersonProfile,
    expected_version: i64,
  ) -> Result<UpdateOutcome<Person>> {
    let dob_str = encode_date(profile.date_of_birth);

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE persons SET
             full_name = ?2, date_of_birth = ?3, phone = ?4, street = ?5,
             city = ?6, country = ?7, post_code = ?8, version = version + 1
           WHERE person_id = ?1 AND version = ?9",
          params![
            id,
            profile.full_name,
            dob_str,
            profile.phone,
            profile.street,
            profile.city,
            profile.country,
            profile.post_code,
            expected_version,
          ],
        )?;

        if changed == 0 {
          return Ok(
            if row_exists(conn, "SELECT 1 FROM persons WHERE person_id = ?1", id)? {
              UpdateOutcome::Conflict
            } else {
              UpdateOutcome::Missing
            },
          );
        }

        Ok(match select_person(conn, id)? {
          Some(raw) => UpdateOutcome::Updated(raw),
          None => UpdateOutcome::Missing,
        })
      })
      .await?;

    decode_outcome(outcome, RawPerson::into_person)
  }

  async fn delete_person_cascade(&self, id: PersonId) -> Result<Option<DeletionPlan>> {
    let plan = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(person) = select_person(&tx, id)? else {
          return Ok(None);
        };
        let identity_id = person
          .identity_id
          .as_deref()
          .map(decode_uuid)
          .transpose()
          .map_err(in_call)?;

        let graph = person_graph(&tx, id, identity_id)?;
        let plan = DeletionPlan::for_person(&graph);
        for step in &plan.steps {
          execute_step(&tx, step)?;
        }

        tx.commit()?;
        Ok(Some(plan))
      })
      .await?;

    if let Some(plan) = &plan {
      tracing::debug!(person_id = id, steps = plan.steps.len(), "person cascade committed");
    }
    Ok(plan)
  }

  // ── Policies ──────────────────────────────────────────────────────────────

  async fn create_insurance(&self, input: InsuranceInput) -> Result<PolicyRecord> {
    let from_str = encode_date(input.valid_from);
    let to_str   = encode_date(input.valid_to);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO insurances (name, subject, amount, valid_from, valid_to, person_id)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            input.name,
            input.subject,
            input.amount,
            from_str,
            to_str,
            input.policy_holder_id,
          ],
        )?;
        let insurance_id = tx.last_insert_rowid();

        insert_participant(&tx, ParticipantRole::PolicyHolder, insurance_id, input.policy_holder_id)?;
        // One row per listed id, duplicates included.
        for person_id in &input.insured_person_ids {
          insert_participant(&tx, ParticipantRole::Insured, insurance_id, *person_id)?;
        }

        let raw = select_policy(&tx, insurance_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_policy()
  }

  async fn get_policy(&self, id: InsuranceId) -> Result<Option<PolicyRecord>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_policy(conn, id)?))
      .await?;
    raw.map(RawPolicy::into_policy).transpose()
  }

  async fn list_policies(&self, owner: Option<PersonId>) -> Result<Vec<PolicyRecord>> {
    let raws: Vec<RawPolicy> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INSURANCE_COLUMNS} FROM insurances
           WHERE ?1 IS NULL OR person_id = ?1
           ORDER BY insurance_id"
        ))?;
        let insurances = stmt
          .query_map(params![owner], RawInsurance::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let policies = insurances
          .into_iter()
          .map(|i| load_policy(conn, i))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(policies)
      })
      .await?;

    raws.into_iter().map(RawPolicy::into_policy).collect()
  }

  async fn update_insurance(
    &self,
    id: InsuranceId,
    input: InsuranceInput,
    expected_version: i64,
  ) -> Result<UpdateOutcome<PolicyRecord>> {
    let from_str = encode_date(input.valid_from);
    let to_str   = encode_date(input.valid_to);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The owning person is fixed at creation; only the holder
        // participant is repointed below.
        let changed = tx.execute(
          "UPDATE insurances SET
             name = ?2, subject = ?3, amount = ?4, valid_from = ?5, valid_to = ?6,
             version = version + 1
           WHERE insurance_id = ?1 AND version = ?7",
          params![
            id,
            input.name,
            input.subject,
            input.amount,
            from_str,
            to_str,
            expected_version,
          ],
        )?;

        if changed == 0 {
          return Ok(
            if row_exists(&tx, "SELECT 1 FROM insurances WHERE insurance_id = ?1", id)? {
              UpdateOutcome::Conflict
            } else {
              UpdateOutcome::Missing
            },
          );
        }

        let existing: Vec<Participant> = select_participants(&tx, id)?
          .into_iter()
          .map(RawParticipant::into_participant)
          .collect::<Result<_>>()
          .map_err(in_call)?;

        let plan = ParticipantPlan::compute(
          &existing,
          input.policy_holder_id,
          &input.insured_person_ids,
        );

        match plan.holder {
          HolderChange::Unchanged => {}
          HolderChange::Repoint { participant, to } => {
            tx.execute(
              "UPDATE participants SET person_id = ?2 WHERE participant_id = ?1",
              params![participant, to],
            )?;
          }
          HolderChange::Create(person_id) => {
            insert_participant(&tx, ParticipantRole::PolicyHolder, id, person_id)?;
          }
        }
        for participant_id in &plan.remove_insured {
          tx.execute(
            "DELETE FROM participants WHERE participant_id = ?1",
            params![participant_id],
          )?;
        }
        for person_id in &plan.add_insured {
          insert_participant(&tx, ParticipantRole::Insured, id, *person_id)?;
        }

        let raw = select_policy(&tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(UpdateOutcome::Updated(raw))
      })
      .await?;

    decode_outcome(outcome, RawPolicy::into_policy)
  }

  async fn delete_insurance(&self, id: InsuranceId) -> Result<DeleteOutcome> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(&tx, "SELECT 1 FROM insurances WHERE insurance_id = ?1", id)? {
          return Ok(DeleteOutcome::Missing);
        }

        let claims: i64 = tx.query_row(
          "SELECT COUNT(*) FROM claims WHERE insurance_id = ?1",
          params![id],
          |r| r.get(0),
        )?;
        let participants: i64 = tx.query_row(
          "SELECT COUNT(*) FROM participants WHERE insurance_id = ?1",
          params![id],
          |r| r.get(0),
        )?;
        if claims > 0 || participants > 0 {
          return Ok(DeleteOutcome::Referenced {
            claims:       claims as u64,
            participants: participants as u64,
          });
        }

        tx.execute("DELETE FROM insurances WHERE insurance_id = ?1", params![id])?;
        tx.commit()?;
        Ok(DeleteOutcome::Deleted)
      })
      .await?;
    Ok(outcome)
  }

  // ── Participants ──────────────────────────────────────────────────────────

  async fn list_participants(&self, filter: ParticipantFilter) -> Result<Vec<Participant>> {
    let role_str = filter.role.map(|r| r.as_ref().to_owned());
    let insurance_id = filter.insurance_id;

    let raws: Vec<RawParticipant> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PARTICIPANT_COLUMNS} FROM participants
           WHERE (?1 IS NULL OR insurance_id = ?1)
             AND (?2 IS NULL OR role = ?2)
           ORDER BY participant_id"
        ))?;
        let rows = stmt
          .query_map(params![insurance_id, role_str], RawParticipant::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawParticipant::into_participant).collect()
  }

  async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE participant_id = ?1"),
            params![id],
            RawParticipant::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawParticipant::into_participant).transpose()
  }

  async fn participant_report(&self) -> Result<Vec<ParticipantReportRow>> {
    let rows: Vec<(String, i64, i64, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT
             i.name,
             COUNT(*),
             SUM(CASE WHEN p.role = 'insured'       THEN 1 ELSE 0 END),
             SUM(CASE WHEN p.role = 'policy_holder' THEN 1 ELSE 0 END)
           FROM participants p
           JOIN insurances   i ON i.insurance_id = p.insurance_id
           GROUP BY i.name
           ORDER BY i.name",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(insurance_name, total, insured, holders)| ParticipantReportRow {
          insurance_name,
          total_participants: total as u64,
          total_insured: insured as u64,
          total_policy_holders: holders as u64,
        })
        .collect(),
    )
  }

  // ── Claims ────────────────────────────────────────────────────────────────

  async fn insert_claim(&self, record: ClaimRecord) -> Result<Claim> {
    let occurred_str = encode_date(record.occurred_on);
    let damage_str   = encode_decimal(record.estimated_damage);
    let description  = record.description.clone();
    let insurance_id = record.insurance_id;
    let person_id    = record.person_id;
    let status       = ClaimStatus::New;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO claims (
             description, occurred_on, estimated_damage, status, insurance_id, person_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            description,
            occurred_str,
            damage_str,
            status.as_ref(),
            insurance_id,
            person_id,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Claim {
      id,
      description: record.description,
      occurred_on: record.occurred_on,
      estimated_damage: record.estimated_damage,
      status,
      insurance_id,
      person_id,
      version: 1,
    })
  }

  async fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_claim(conn, id)?))
      .await?;
    raw.map(RawClaim::into_claim).transpose()
  }

  async fn list_claims(
    &self,
    owner: Option<PersonId>,
    insurance: Option<InsuranceId>,
  ) -> Result<Vec<Claim>> {
    let raws: Vec<RawClaim> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CLAIM_COLUMNS} FROM claims
           WHERE (?1 IS NULL OR person_id = ?1)
             AND (?2 IS NULL OR insurance_id = ?2)
           ORDER BY claim_id"
        ))?;
        let rows = stmt
          .query_map(params![owner, insurance], RawClaim::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClaim::into_claim).collect()
  }

  async fn update_claim(
    &self,
    id: ClaimId,
    update: ClaimUpdate,
    expected_version: i64,
  ) -> Result<UpdateOutcome<ClaimEdit>> {
    let occurred_str = encode_date(update.occurred_on);
    let damage_str   = encode_decimal(update.estimated_damage);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(before) = select_claim(&tx, id)? else {
          return Ok(UpdateOutcome::Missing);
        };

        let changed = tx.execute(
          "UPDATE claims SET
             description = ?2, occurred_on = ?3, estimated_damage = ?4, status = ?5,
             version = version + 1
           WHERE claim_id = ?1 AND version = ?6",
          params![
            id,
            update.description,
            occurred_str,
            damage_str,
            update.status.as_ref(),
            expected_version,
          ],
        )?;
        if changed == 0 {
          return Ok(UpdateOutcome::Conflict);
        }

        let after = select_claim(&tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(UpdateOutcome::Updated((before, after)))
      })
      .await?;

    decode_outcome(outcome, |(before, after)| {
      Ok(ClaimEdit { before: before.into_claim()?, after: after.into_claim()? })
    })
  }

  async fn delete_claim(&self, id: ClaimId) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM claims WHERE claim_id = ?1", params![id])?))
      .await?;
    Ok(n > 0)
  }
}
