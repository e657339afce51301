//! "Email me this" intents.
//!
//! Rows are only queued here. Delivery belongs to an external consumer that
//! polls [`Store::due_emails`] and reports back through
//! [`Store::record_email_status`].

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use tracing::info;
use uuid::Uuid;

use crate::{
    Store,
    codec::{col_parse, col_ts, col_uuid, now, ts},
    errors::{StoreError, StoreResult},
    models::{Email, EmailStatus, NewEmail},
};

const EMAIL_COLUMNS: &str = "id, user_id, triage_run_id, created_at, send_after, to_email, \
     subject, body_md, status, provider_message_id, error";

fn map_email(row: &Row<'_>) -> rusqlite::Result<Email> {
    Ok(Email {
        id: col_uuid(row, 0)?,
        user_id: row.get(1)?,
        triage_run_id: col_uuid(row, 2)?,
        created_at: col_ts(row, 3)?,
        send_after: col_ts(row, 4)?,
        to_email: row.get(5)?,
        subject: row.get(6)?,
        body_md: row.get(7)?,
        status: col_parse(row, 8)?,
        provider_message_id: row.get(9)?,
        error: row.get(10)?,
    })
}

impl Store {
    pub fn queue_email(&self, new: NewEmail<'_>) -> StoreResult<Email> {
        let to_email = new.to_email.trim();
        if !to_email.contains('@') {
            return Err(StoreError::Invalid {
                field: "to_email",
                reason: format!("`{to_email}` is not an email address"),
            });
        }

        let created_at = now();
        let email = Email {
            id: Uuid::new_v4(),
            user_id: new.user_id.to_string(),
            triage_run_id: new.triage_run_id,
            created_at,
            send_after: new.send_after.unwrap_or(created_at),
            to_email: to_email.to_string(),
            subject: new.subject.to_string(),
            body_md: new.body_md.to_string(),
            status: EmailStatus::Queued,
            provider_message_id: None,
            error: None,
        };

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO emails ({EMAIL_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL)"
            ),
            params![
                email.id.to_string(),
                email.user_id,
                email.triage_run_id.to_string(),
                ts(&email.created_at),
                ts(&email.send_after),
                email.to_email,
                email.subject,
                email.body_md,
                email.status.as_str(),
            ],
        )?;
        info!(email_id = %email.id, run_id = %email.triage_run_id, "email queued");
        Ok(email)
    }

    /// Queued emails whose `send_after` has passed, oldest first.
    pub fn due_emails(&self, at: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Email>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EMAIL_COLUMNS} FROM emails
             WHERE status = 'queued' AND send_after <= ?1
             ORDER BY send_after, rowid
             LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![ts(&at), limit], map_email)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Records a delivery outcome reported by the external consumer.
    pub fn record_email_status(
        &self,
        email_id: Uuid,
        status: EmailStatus,
        provider_message_id: Option<&str>,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE emails
             SET status = ?2,
                 provider_message_id = COALESCE(?3, provider_message_id),
                 error = ?4
             WHERE id = ?1",
            params![email_id.to_string(), status.as_str(), provider_message_id, error],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("email", email_id));
        }
        info!(email_id = %email_id, status = %status, "email status recorded");
        Ok(())
    }
}
