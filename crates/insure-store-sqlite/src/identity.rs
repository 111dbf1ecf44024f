//! The [`IdentityProvider`] implementation: accounts, roles and one-time
//! tokens.
//!
//! Password hashing and verification run on tokio's blocking pool, never on
//! the connection thread or an executor worker.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use chrono::{Duration, SecondsFormat, Utc};
use rand_core::{OsRng, RngCore as _};
use rusqlite::{OptionalExtension as _, params};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use insure_core::{
  account::{Account, CreateAccountOutcome, Credential, NewAccount, TokenPurpose},
  role::{Role, RoleSet},
  store::IdentityProvider,
};

use crate::{
  Error, Result, SqliteStore,
  encode::{ACCOUNT_COLUMNS, RawAccount, decode_role, encode_dt, encode_uuid},
  store::delete_account_rows,
};

/// How long an issued token stays redeemable.
const TOKEN_LIFETIME_HOURS: i64 = 24;

// ─── Secrets ─────────────────────────────────────────────────────────────────

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Hash on the blocking pool; argon2 is too slow for an executor thread.
async fn hash_blocking(password: String) -> Result<String> {
  tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

async fn verify_blocking(password: String, hash: String) -> Result<bool> {
  Ok(tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?)
}

/// 32 random bytes, hex-encoded.
fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Fixed-width UTC timestamp so expiry comparisons can be done on the
/// column text.
fn encode_expiry(at: chrono::DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Consume a token. Returns `false` if no unexpired token matches.
fn redeem_token(
  conn: &rusqlite::Connection,
  account_id: &str,
  digest: &str,
  purpose: TokenPurpose,
) -> rusqlite::Result<bool> {
  let n = conn.execute(
    "DELETE FROM account_tokens
     WHERE token_hash = ?1 AND account_id = ?2 AND purpose = ?3 AND expires_at > ?4",
    params![digest, account_id, purpose.as_ref(), encode_expiry(Utc::now())],
  )?;
  Ok(n > 0)
}

fn select_account_by_email(
  conn: &rusqlite::Connection,
  email: &str,
) -> rusqlite::Result<Option<(RawAccount, String)>> {
  conn
    .query_row(
      &format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE email = ?1"),
      params![email],
      |row| Ok((RawAccount::from_row(row)?, row.get(5)?)),
    )
    .optional()
}

// ─── IdentityProvider impl ───────────────────────────────────────────────────

impl IdentityProvider for SqliteStore {
  type Error = Error;

  async fn authenticate(&self, email: String, password: String) -> Result<Option<Account>> {
    let found = self
      .conn
      .call(move |conn| Ok(select_account_by_email(conn, &email)?))
      .await?;

    let Some((raw, hash)) = found else {
      return Ok(None);
    };
    if !verify_blocking(password, hash).await? {
      return Ok(None);
    }
    raw.into_account().map(Some)
  }

  async fn account(&self, id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
            params![id_str],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn account_by_email(&self, email: String) -> Result<Option<Account>> {
    let found = self
      .conn
      .call(move |conn| Ok(select_account_by_email(conn, &email)?))
      .await?;
    found.map(|(raw, _)| raw.into_account()).transpose()
  }

  async fn list_accounts(&self) -> Result<Vec<Account>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY email"))?;
        let rows = stmt
          .query_map([], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn create_account(&self, new: NewAccount) -> Result<CreateAccountOutcome> {
    let password_hash = match new.credential {
      Credential::Password(password) => hash_blocking(password).await?,
      Credential::Hash(hash) => hash,
    };

    let account = Account {
      id:              Uuid::new_v4(),
      email:           new.email.trim().to_owned(),
      full_name:       new.full_name,
      email_confirmed: new.email_confirmed,
      created_at:      Utc::now(),
    };

    let id_str    = encode_uuid(account.id);
    let email     = account.email.clone();
    let full_name = account.full_name.clone();
    let confirmed = account.email_confirmed;
    let at_str    = encode_dt(account.created_at);

    let created = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row("SELECT 1 FROM accounts WHERE email = ?1", params![email], |_| Ok(()))
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO accounts (
             account_id, email, full_name, password_hash, email_confirmed, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, email, full_name, password_hash, confirmed, at_str],
        )?;
        Ok(true)
      })
      .await?;

    Ok(if created {
      CreateAccountOutcome::Created(account)
    } else {
      CreateAccountOutcome::EmailTaken
    })
  }

  async fn delete_account(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted = delete_account_rows(&tx, &id_str)?;
        tx.commit()?;
        Ok(deleted)
      })
      .await?;
    Ok(deleted)
  }

  async fn roles_of(&self, id: Uuid) -> Result<RoleSet> {
    let id_str = encode_uuid(id);

    let names: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare("SELECT role FROM account_roles WHERE account_id = ?1")?;
        let rows = stmt
          .query_map(params![id_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    names.iter().map(|n| decode_role(n)).collect()
  }

  async fn add_role(&self, id: Uuid, role: Role) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO account_roles (account_id, role) VALUES (?1, ?2)",
          params![id_str, role.as_ref()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_roles(&self, id: Uuid, roles: RoleSet) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM account_roles WHERE account_id = ?1", params![id_str])?;
        for role in roles.iter() {
          tx.execute(
            "INSERT INTO account_roles (account_id, role) VALUES (?1, ?2)",
            params![id_str, role.as_ref()],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn accounts_in_role(&self, role: Role) -> Result<Vec<Account>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT a.account_id, a.email, a.full_name, a.email_confirmed, a.created_at
           FROM accounts a
           JOIN account_roles r ON r.account_id = a.account_id
           WHERE r.role = ?1
           ORDER BY a.email",
        )?;
        let rows = stmt
          .query_map(params![role.as_ref()], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn change_password(&self, id: Uuid, old: String, new: String) -> Result<bool> {
    let id_str = encode_uuid(id);
    let lookup = id_str.clone();

    let current: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT password_hash FROM accounts WHERE account_id = ?1",
            params![lookup],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    let Some(current) = current else {
      return Ok(false);
    };
    if !verify_blocking(old, current.clone()).await? {
      return Ok(false);
    }

    let new_hash = hash_blocking(new).await?;
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET password_hash = ?2 WHERE account_id = ?1 AND password_hash = ?3",
          params![id_str, new_hash, current],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn issue_token(&self, id: Uuid, purpose: TokenPurpose) -> Result<String> {
    let token      = new_token();
    let digest     = token_digest(&token);
    let id_str     = encode_uuid(id);
    let expires_at = encode_expiry(Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS));

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO account_tokens (token_hash, account_id, purpose, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![digest, id_str, purpose.as_ref(), expires_at],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(account_id = %id, purpose = purpose.as_ref(), "token issued");
    Ok(token)
  }

  async fn confirm_email_with_token(&self, id: Uuid, token: String) -> Result<bool> {
    let digest = token_digest(&token);
    let id_str = encode_uuid(id);

    let confirmed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !redeem_token(&tx, &id_str, &digest, TokenPurpose::ConfirmEmail)? {
          return Ok(false);
        }
        tx.execute(
          "UPDATE accounts SET email_confirmed = 1 WHERE account_id = ?1",
          params![id_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(confirmed)
  }

  async fn reset_password_with_token(
    &self,
    id: Uuid,
    token: String,
    new_password: String,
  ) -> Result<bool> {
    let digest   = token_digest(&token);
    let id_str   = encode_uuid(id);
    let new_hash = hash_blocking(new_password).await?;

    let reset = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !redeem_token(&tx, &id_str, &digest, TokenPurpose::ResetPassword)? {
          return Ok(false);
        }
        tx.execute(
          "UPDATE accounts SET password_hash = ?2 WHERE account_id = ?1",
          params![id_str, new_hash],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(reset)
  }
}
