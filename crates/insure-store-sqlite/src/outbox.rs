//! Outbox notifier: messages are written to the `outbox` table, where an
//! external mail relay picks them up.

use chrono::{DateTime, Utc};
use rusqlite::params;

use insure_core::notify::{Message, Notifier};

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_dt, encode_dt},
};

/// A queued message as stored in the outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
  pub id:         i64,
  pub message:    Message,
  pub created_at: DateTime<Utc>,
}

struct RawMessage {
  message_id: i64,
  to_address: String,
  subject:    String,
  body_html:  String,
  created_at: String,
}

impl SqliteStore {
  /// Every queued message, oldest first.
  pub async fn outbox(&self) -> Result<Vec<OutboxMessage>> {
    let rows: Vec<RawMessage> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT message_id, to_address, subject, body_html, created_at
           FROM outbox ORDER BY message_id",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawMessage {
              message_id: r.get(0)?,
              to_address: r.get(1)?,
              subject:    r.get(2)?,
              body_html:  r.get(3)?,
              created_at: r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|row| {
        Ok(OutboxMessage {
          id:         row.message_id,
          message:    Message {
            to:        row.to_address,
            subject:   row.subject,
            body_html: row.body_html,
          },
          created_at: decode_dt(&row.created_at)?,
        })
      })
      .collect()
  }
}

impl Notifier for SqliteStore {
  type Error = Error;

  async fn send(&self, message: Message) -> Result<()> {
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO outbox (to_address, subject, body_html, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![message.to, message.subject, message.body_html, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
